use crate::session::PointsReport;

/// Shorten a wallet address for log lines: `0x7E5F...5Bdf`
pub fn short_address(address: &str) -> String {
    if address.len() <= 12 || !address.is_ascii() {
        address.to_string()
    } else {
        format!("{}...{}", &address[..6], &address[address.len() - 4..])
    }
}

/// Format a point total, dropping the fraction when it is whole
pub fn format_points(points: f64) -> String {
    if points.fract() == 0.0 && points.abs() < 1e15 {
        format!("{}", points as i64)
    } else {
        format!("{:.2}", points)
    }
}

/// One-line summary of a points poll
pub fn describe_points(report: &PointsReport) -> String {
    match report.gained {
        None => format!("Current points: {}", format_points(report.total)),
        Some(gain) if gain > 0.0 => format!(
            "Points gained: +{} (total: {})",
            format_points(gain),
            format_points(report.total)
        ),
        Some(_) => format!("No new points (total: {})", format_points(report.total)),
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}
