use cpuprof_protocol::{CallFrame, FunctionStats, Hotspot, HotspotKind};

const APP_SCHEMES: [&str; 3] = ["http://", "https://", "file://"];

/// Classify a function by its source URL. Native markers are checked first,
/// so a dependency under `node_modules/` is native even though it has a path.
pub fn classify(url: &str) -> HotspotKind {
    if url.is_empty()
        || url.starts_with("native ")
        || url.contains("(native)")
        || url.contains("node_modules")
        || url.contains("internal/")
    {
        HotspotKind::Native
    } else if APP_SCHEMES.iter().any(|s| url.starts_with(s)) || url.contains(['/', '\\']) {
        HotspotKind::App
    } else {
        HotspotKind::Unknown
    }
}

/// Rank functions by self time.
///
/// Keeps functions whose self percent is at least `threshold`, sorts them
/// heaviest first (stable, so ties keep aggregation order), and keeps at
/// most `max` of them.
pub fn rank_hotspots(functions: &[FunctionStats], threshold: f64, max: usize) -> Vec<Hotspot> {
    let mut selected: Vec<&FunctionStats> = functions
        .iter()
        .filter(|f| f.self_percent >= threshold)
        .collect();
    selected.sort_by(|a, b| b.self_time.total_cmp(&a.self_time));
    selected.truncate(max);

    selected
        .into_iter()
        .enumerate()
        .map(|(i, f)| Hotspot {
            rank: i + 1,
            kind: classify(&f.key.url),
            call_frame: CallFrame {
                function_name: f.key.function_name.clone(),
                url: f.key.url.clone(),
                line_number: f.key.line_number,
                column_number: f.key.column_number,
                script_id: f.script_id.clone(),
            },
            self_time: f.self_time,
            total_time: f.total_time,
            self_percent: f.self_percent,
            total_percent: f.total_percent,
            hit_count: f.hit_count,
            callers: f.callers.iter().cloned().collect(),
            callees: f.callees.iter().cloned().collect(),
        })
        .collect()
}
