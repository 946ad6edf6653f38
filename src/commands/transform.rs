//! Commands that read frames, restructure them and write the result.

use super::models::{CombineArgs, FilterArgs};
use crate::output::{read_literal, write_literal};
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::Path;
use std::time::Instant;

/// Keep the rows whose metric reaches a threshold
pub fn execute_filter(args: &FilterArgs) -> Result<()> {
    let start_time = Instant::now();
    info!("Filtering {} on {} >= {}", args.input.display(), args.metric, args.min);

    let gf = read_literal(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    if !gf.table().has_column(&args.metric) {
        anyhow::bail!("Unknown metric '{}'", args.metric);
    }

    let metric = args.metric.as_str();
    let min = args.min;
    let filtered = gf
        .filter(
            |row| row.number(metric).map_or(false, |v| v >= min),
            args.squash,
        )
        .context("Filter failed")?;

    debug!(
        "Filtered frame: {} nodes, {} rows",
        filtered.graph().len(),
        filtered.table().len()
    );

    write_literal(&filtered, &args.output).context("Failed to write filtered frame")?;
    info!("✓ Filtered frame written to: {}", args.output.display());
    info!("Filter completed in {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Merge same-frame siblings and write the result
pub fn execute_normalize(input: &Path, output: &Path) -> Result<()> {
    info!("Normalizing {}", input.display());

    let gf = read_literal(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let normalized = gf.normalize().context("Normalize failed")?;

    info!(
        "Merged {} nodes into {}",
        gf.graph().len(),
        normalized.graph().len()
    );

    write_literal(&normalized, output).context("Failed to write normalized frame")?;
    info!("✓ Normalized frame written to: {}", output.display());
    Ok(())
}

/// Unify two frames and apply an element-wise operation
pub fn execute_combine(args: &CombineArgs) -> Result<()> {
    info!(
        "Combining {} {:?} {}",
        args.left.display(),
        args.op,
        args.right.display()
    );

    let left = read_literal(&args.left)
        .with_context(|| format!("Failed to read {}", args.left.display()))?;
    let right = read_literal(&args.right)
        .with_context(|| format!("Failed to read {}", args.right.display()))?;

    let combined = left
        .combine(&right, args.op)
        .context("Failed to combine frames")?;

    write_literal(&combined, &args.output).context("Failed to write combined frame")?;
    info!("✓ Combined frame written to: {}", args.output.display());
    Ok(())
}
