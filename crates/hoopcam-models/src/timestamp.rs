//! Timestamp formatting utilities.
//!
//! Video timestamps are carried as seconds (`f64`) throughout; these helpers
//! render them for logs, prompts and reports.

/// Format seconds into HH:MM:SS or HH:MM:SS.mmm string.
pub fn format_seconds(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;

    // Include milliseconds if present
    if (secs - secs.floor()).abs() > 0.0001 {
        format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs.floor() as u32)
    }
}

/// Format a `[start, end]` range as `HH:MM:SS.mmm-HH:MM:SS.mmm`.
pub fn format_range(start: f64, end: f64) -> String {
    format!("{}-{}", format_seconds(start), format_seconds(end))
}

/// Nominal frame interval for a frame rate, in seconds.
pub fn frame_interval(fps: f64) -> f64 {
    if fps > 0.0 {
        1.0 / fps
    } else {
        0.0
    }
}
