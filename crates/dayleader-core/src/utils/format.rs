use chrono::NaiveDate;

/// Format a date for display: "Mar 02, 2026"
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

/// `part / whole * 100`, rounded to 2 decimals. Zero when `whole` is zero.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = part as f64 / whole as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Human-readable signed hour span: "in 5h", "in 2d 3h", "3h overdue"
pub fn format_hours(hours: i64) -> String {
    let magnitude = hours.unsigned_abs();
    let span = if magnitude >= 24 {
        let days = magnitude / 24;
        let rest = magnitude % 24;
        if rest == 0 {
            format!("{}d", days)
        } else {
            format!("{}d {}h", days, rest)
        }
    } else {
        format!("{}h", magnitude)
    };

    if hours < 0 {
        format!("{} overdue", span)
    } else {
        format!("in {}", span)
    }
}
