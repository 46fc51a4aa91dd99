//! CLI Output Formatting Module
//! Provides consistent, colorized output for terminal UX

use colored::Colorize;

use crate::engine::updater::events::UpdateEvent;

pub struct CliFormatter;

impl CliFormatter {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green().bold(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue().bold(), message);
    }

    /// Print a key-value pair
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", key.bright_white().bold(), value);
    }

    /// Print a progress bar line
    pub fn progress(percent: u8, message: &str) {
        let filled = (percent / 5) as usize;
        println!(
            "  {} [{}{}] {}% {}",
            "▶".bright_blue(),
            "█".repeat(filled).bright_green(),
            "░".repeat(20 - filled.min(20)).bright_black(),
            percent,
            message
        );
    }

    /// Print one updater notification
    pub fn event(event: &UpdateEvent) {
        match event {
            UpdateEvent::NeedUpdate { needs_update, versions } => {
                if *needs_update {
                    Self::warning("snapshot should be updated");
                } else {
                    Self::success("snapshot already up to date");
                }
                Self::kv("current", &versions.current);
                Self::kv("available", &versions.available);
            }
            UpdateEvent::Downloading { percent } => {
                if should_report_percent(*percent) {
                    Self::progress(*percent, "downloading");
                }
            }
            UpdateEvent::Downloaded => Self::success("downloaded"),
            UpdateEvent::Diffing { table } => Self::info(&format!("diffing {}", table)),
            UpdateEvent::DiffDone { .. } => Self::success("diff done"),
            UpdateEvent::Error { message } => Self::error(message),
            UpdateEvent::StateChanged { .. } => {}
        }
    }
}

/// Keep the terminal quiet: only every tenth percent
pub fn should_report_percent(percent: u8) -> bool {
    percent % 10 == 0
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500.00 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
    }

    #[test]
    fn test_percent_filter() {
        assert!(should_report_percent(0));
        assert!(should_report_percent(50));
        assert!(should_report_percent(100));
        assert!(!should_report_percent(33));
    }
}
