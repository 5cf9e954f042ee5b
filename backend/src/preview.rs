//! Human-readable renderings of records.

use std::fmt::Write;

use corelib::{Record, RenderZone};

/// One-line tick summary, e.g.
/// `[LIVE] 2025-01-01 12:01:00 | 105.0000 | +5.0000 (+5.0000%) | up | vel: 5.0000/min (0.0833/s)`
pub fn summary_line(record: &Record, zone: RenderZone) -> String {
    let ts = record.timestamp.render(zone);

    if !record.has_previous {
        return format!(
            "[LIVE] {ts} | {:.4} | NaN | {} | vel: NaN/min",
            record.value, record.direction
        );
    }

    let pct = record
        .pct_change
        .map(|p| format!("{p:+.4}%"))
        .unwrap_or_else(|| "NaN%".to_string());

    format!(
        "[LIVE] {ts} | {:.4} | {:+.4} ({pct}) | {} | vel: {:.4}/min ({:.4}/s)",
        record.value,
        record.delta,
        record.direction,
        record.velocity_per_minute,
        record.velocity_per_second
    )
}

/// Fixed-width table of the first `limit` records. Fields without a previous
/// reference print as `NaN`.
pub fn preview_table(records: &[Record], zone: RenderZone, limit: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20}{:<12}{:<12}{:<8}{:<14}{:<14}",
        "timestamp", "value", "change", "dir", "vel/min", "vel/sec"
    );

    for r in records.iter().take(limit) {
        let (change, vmin, vsec) = if r.has_previous {
            (
                format!("{:.4}", r.delta),
                format!("{:.4}", r.velocity_per_minute),
                format!("{:.4}", r.velocity_per_second),
            )
        } else {
            ("NaN".into(), "NaN".into(), "NaN".into())
        };

        let _ = writeln!(
            out,
            "{:<20}{:<12}{:<12}{:<8}{:<14}{:<14}",
            r.timestamp.render(zone),
            format!("{:.4}", r.value),
            change,
            r.direction.as_str(),
            vmin,
            vsec
        );
    }

    out
}
