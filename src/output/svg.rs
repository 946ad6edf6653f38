//! Flamegraph output: folded-stack text and rendered SVG files.

use super::writer::write_text;
use crate::flamegraph::{generate_flamegraph, CollapsedStack, FlamegraphConfig};
use crate::utils::error::OutputError;
use log::{debug, info};
use std::path::Path;

/// Write already rendered SVG content to a file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::InvalidPath` - Path is invalid
pub fn write_svg(svg_content: &str, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!("Writing SVG to: {}", output_path.display());

    if output_path.extension().map_or(true, |ext| ext != "svg") {
        debug!("File does not have .svg extension: {}", output_path.display());
    }

    let size = write_text(svg_content, output_path)?;
    info!(
        "SVG written successfully ({} bytes, {:.2} KB)",
        size,
        size as f64 / 1024.0
    );
    Ok(())
}

/// Write collapsed stacks as folded text, one `a;b;c weight` line each
pub fn write_folded(
    stacks: &[CollapsedStack],
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    let text: String = stacks
        .iter()
        .map(|s| format!("{}\n", s.to_line()))
        .collect();
    write_text(&text, output_path)?;
    info!(
        "Folded stacks written to: {} ({} lines)",
        output_path.display(),
        stacks.len()
    );
    Ok(())
}

/// Render collapsed stacks with inferno and write the SVG
///
/// # Errors
/// * `OutputError::Flamegraph` - no stacks, or inferno failed to render
/// * `OutputError::WriteFailed` / `OutputError::InvalidPath` - as for [`write_svg`]
pub fn write_flamegraph(
    stacks: &[CollapsedStack],
    config: &FlamegraphConfig,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let svg = generate_flamegraph(stacks, Some(config))?;
    write_svg(&svg, output_path)
}
