//! Small shared helpers.

/// Wall-clock time rendered for chat lines and notices.
pub fn clock_time() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
