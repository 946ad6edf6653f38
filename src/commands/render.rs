//! Flamegraph command implementation.

use super::models::FlamegraphArgs;
use crate::flamegraph::build_collapsed_stacks;
use crate::output::{read_literal, write_flamegraph, write_folded};
use anyhow::{Context, Result};
use log::{debug, info};

/// Render a frame as an SVG flamegraph
pub fn execute_flamegraph(args: &FlamegraphArgs) -> Result<()> {
    info!("Rendering flamegraph for {}", args.input.display());

    let gf = read_literal(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let stacks = build_collapsed_stacks(&gf, args.metric.as_deref())
        .context("Failed to build collapsed stacks")?;
    debug!("Built {} stacks", stacks.len());

    if let Some(folded) = &args.folded {
        write_folded(&stacks, folded)
            .with_context(|| format!("Failed to write folded stacks to {}", folded.display()))?;
        info!("✓ Folded stacks written to: {}", folded.display());
    }

    write_flamegraph(&stacks, &args.config, &args.output)
        .context("Failed to write flamegraph SVG")?;

    info!("✓ Flamegraph written to: {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flamegraph::FlamegraphConfig;
    use crate::graph::ListNode;
    use crate::graphframe::GraphFrame;
    use crate::output::write_literal;

    #[test]
    fn test_flamegraph_command() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        let gf = GraphFrame::from_lists(&[ListNode::branch("main", vec!["solve".into()])]).unwrap();
        write_literal(&gf, &input).unwrap();

        let args = FlamegraphArgs {
            input,
            metric: None,
            output: dir.path().join("out.svg"),
            folded: Some(dir.path().join("out.folded")),
            config: FlamegraphConfig::new(),
        };
        execute_flamegraph(&args).unwrap();

        assert!(args.output.exists());
        let folded = std::fs::read_to_string(dir.path().join("out.folded")).unwrap();
        assert_eq!(folded, "main 1\nmain;solve 1\n");
    }
}
