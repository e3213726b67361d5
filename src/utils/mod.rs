//! Common utilities and helpers

use std::time::Duration;

pub mod path;

pub use path::WorkspaceLayout;

/// Formatting helpers for log lines and the batch summary
pub struct Utils;

impl Utils {
    /// `1h 2m 3s`, dropping leading zero units
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// `0h 2m 5s`, every unit always present; used by the batch summary
    pub fn format_hms(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        format!(
            "{}h {}m {}s",
            total_seconds / 3600,
            (total_seconds % 3600) / 60,
            total_seconds % 60
        )
    }

    /// Format file size for display
    pub fn format_file_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Size in mebibytes, as printed in the batch summary
    pub fn megabytes(size: u64) -> f64 {
        size as f64 / (1024.0 * 1024.0)
    }

    /// Input over output size; `None` when nothing was produced
    pub fn compression_ratio(input: u64, output: u64) -> Option<f64> {
        (output > 0).then(|| input as f64 / output as f64)
    }

    /// Percentage saved going from `input` to `output` bytes
    pub fn size_reduction_percent(input: u64, output: u64) -> f64 {
        if input == 0 {
            0.0
        } else {
            (1.0 - output as f64 / input as f64) * 100.0
        }
    }
}
