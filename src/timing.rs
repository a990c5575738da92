use chrono::Local;
use std::time::{Duration, Instant};
use tracing::info;

/// Local wall-clock stamp `YYYYMMDDHHMMSS`, used to name run artifacts
pub fn timestamp_id() -> String {
    Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Runs `f` and logs how long it took
pub fn timed<T>(label: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    info!("{} took {}", label, human_duration(start.elapsed()));
    result
}

/// Seconds under a minute, minutes under an hour, hours beyond
pub fn human_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        format!("{:.4} seconds", secs)
    } else if secs <= 3600.0 {
        format!("{:.4} minutes", secs / 60.0)
    } else {
        format!("{:.4} hours", secs / 3600.0)
    }
}
