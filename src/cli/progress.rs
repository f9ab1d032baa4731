//! Progress bar utilities for CLI output
//!
//! Console helpers shared by the command handlers, the hashing progress bar
//! and the writer used to tee log output into the log file.

use crate::hashing::HashProgress;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::{Duration, Instant};

// ============================================================================
// Styles - Consistent visual appearance
// ============================================================================

/// Get the progress bar style for hashing
fn progress_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} [{bar:40.cyan/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━╾─")
}

/// Get the style for completed progress bars
fn completed_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  ✓ [{bar:40.green/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━━")
}

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 4);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║{}║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

/// Print a section divider
pub fn print_divider() {
    println!();
    println!("{}", "─".repeat(60));
    println!();
}

/// Print a success message with checkmark
pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an info message with bullet
pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("  ⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

// ============================================================================
// Hashing progress tracker
// ============================================================================

/// Progress bar fed by [`HashProgress`] updates from the hashing workers
pub struct HashProgressBar {
    progress_bar: ProgressBar,
    start_time: Instant,
}

impl HashProgressBar {
    /// Create a visible progress bar over `total_files`
    pub fn new(total_files: u64) -> Self {
        let progress_bar = ProgressBar::new(total_files);
        progress_bar.set_style(progress_bar_style());
        progress_bar.enable_steady_tick(Duration::from_millis(100));
        progress_bar.set_message("Hashing...");

        Self {
            progress_bar,
            start_time: Instant::now(),
        }
    }

    /// Create a tracker that draws nothing (used for machine-readable output)
    pub fn hidden() -> Self {
        Self {
            progress_bar: ProgressBar::hidden(),
            start_time: Instant::now(),
        }
    }

    /// Apply a progress update
    pub fn update(&self, progress: &HashProgress) {
        if self.progress_bar.length() != Some(progress.total as u64) {
            self.progress_bar.set_length(progress.total as u64);
        }
        self.progress_bar.set_position(progress.current as u64);

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            progress.current as f64 / elapsed
        } else {
            0.0
        };

        if progress.errors > 0 {
            self.progress_bar.set_message(format!(
                "{:.0} files/s, {} unreadable",
                rate, progress.errors
            ));
        } else {
            self.progress_bar.set_message(format!("{:.0} files/s", rate));
        }
    }

    /// Finish the progress display
    pub fn finish(&self) {
        if self.progress_bar.is_hidden() {
            return;
        }
        self.progress_bar.set_style(completed_style());
        self.progress_bar.finish_with_message(format!(
            "Complete in {}",
            format_duration(self.start_time.elapsed())
        ));
    }

    /// Finish with an error
    pub fn finish_with_error(&self, msg: &str) {
        self.progress_bar.abandon_with_message(format!("✗ {}", msg));
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

// ============================================================================
// Utility functions
// ============================================================================

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, mins)
    } else if secs >= 60 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

// ============================================================================
// Dual writer for file + console logging
// ============================================================================

/// A writer that writes to both console and file
///
/// Used for logging to both stderr and a log file simultaneously.
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.console.write(buf);
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 bytes");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1.00 MB");
        assert_eq!(format_bytes(1073741824), "1.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30.0s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m");
    }

    #[test]
    fn test_hidden_progress_accepts_updates() {
        let bar = HashProgressBar::hidden();
        bar.update(&HashProgress {
            current: 100,
            total: 250,
            current_file: Some(PathBuf::from("/t/a.txt")),
            hashed: 99,
            errors: 1,
        });
        assert_eq!(bar.progress_bar.position(), 100);
        assert_eq!(bar.progress_bar.length(), Some(250));
        bar.finish();
    }

    #[test]
    fn test_dual_writer_writes_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("chksum.log");
        let file = std::fs::File::create(&path).unwrap();

        let mut writer = DualWriter {
            console: std::io::stderr(),
            file,
        };
        writer.write_all(b"[test] line\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[test] line\n");
    }
}
