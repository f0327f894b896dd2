//! Common utilities shared across domain models

/// Display string used while a lesson's real duration is unknown
pub const UNRESOLVED_DURATION: &str = "--:--";

/// Formats seconds as `M:SS`.
///
/// Minutes are not padded and may exceed 59. Negative or non-finite input
/// formats as `0:00`.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };
    let minutes = (total / 60.0).floor() as u64;
    let secs = (total % 60.0).floor() as u64;
    format!("{}:{:02}", minutes, secs)
}
