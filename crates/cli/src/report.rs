use std::io::{self, Write};

use cpuprof_protocol::{AnalysisResult, format_duration};

/// Frames shown per critical path before eliding the middle.
const PATH_FRAMES: usize = 6;

/// Write a plain-text summary of `result`: totals, ranked hotspots, and
/// critical paths.
pub fn write_text(out: &mut impl Write, result: &AnalysisResult) -> io::Result<()> {
    writeln!(
        out,
        "{}{}: {} over {} samples (mean interval {})",
        result.meta.source_format,
        if result.meta.compressed { " (gzip)" } else { "" },
        format_duration(result.total_time),
        result.sample_count,
        format_duration(result.mean_sample_interval),
    )?;
    if result.duration() > 0.0 {
        writeln!(out, "Recorded span: {}", format_duration(result.duration()))?;
    }

    writeln!(out)?;
    writeln!(out, "Hotspots")?;
    if result.hotspots.is_empty() {
        writeln!(out, "  (none above threshold)")?;
    }
    for hotspot in &result.hotspots {
        writeln!(
            out,
            "  {:>3}. {:>6.2}% self {:>6.2}% total  {:<7} {}",
            hotspot.rank,
            hotspot.self_percent,
            hotspot.total_percent,
            hotspot.kind.to_string(),
            hotspot.call_frame.key(),
        )?;
    }

    writeln!(out)?;
    writeln!(
        out,
        "Critical paths (top {} of {})",
        result.critical_paths.len(),
        result.call_tree.leaf_count(),
    )?;
    for (i, path) in result.critical_paths.iter().enumerate() {
        let names: Vec<&str> = result
            .call_tree
            .path_nodes(&path.nodes)
            .map(|n| n.call_frame.function_name.as_str())
            .collect();
        writeln!(
            out,
            "  {}. {:>6.2}%  {}",
            i + 1,
            path.cumulative_percent,
            elide(&names),
        )?;
    }
    Ok(())
}

fn elide(names: &[&str]) -> String {
    if names.len() <= PATH_FRAMES {
        return names.join(" > ");
    }
    let head = &names[..PATH_FRAMES / 2];
    let tail = &names[names.len() - PATH_FRAMES / 2..];
    format!(
        "{} > … ({} frames) > {}",
        head.join(" > "),
        names.len() - PATH_FRAMES,
        tail.join(" > ")
    )
}
