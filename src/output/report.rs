//! Batch timing and size report

use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::info;

use crate::utils::Utils;

/// Timing and size figures for one processed file
#[derive(Debug, Clone)]
pub struct ProcessingStats {
    pub file_name: String,
    pub started: DateTime<Local>,
    pub finished: Option<DateTime<Local>>,
    pub input_size: u64,
    pub output_size: u64,
    pub segment_count: usize,
    pub audio_tracks: usize,
}

impl ProcessingStats {
    pub fn start(file_name: impl Into<String>, input_size: u64) -> Self {
        Self {
            file_name: file_name.into(),
            started: Local::now(),
            finished: None,
            input_size,
            output_size: 0,
            segment_count: 0,
            audio_tracks: 0,
        }
    }

    pub fn finish(&mut self, output_size: u64) {
        self.output_size = output_size;
        self.finished = Some(Local::now());
    }

    /// Wall-clock time, zero while unfinished
    pub fn duration(&self) -> Duration {
        self.finished
            .and_then(|end| (end - self.started).to_std().ok())
            .unwrap_or_default()
    }

    pub fn compression_ratio(&self) -> Option<f64> {
        Utils::compression_ratio(self.input_size, self.output_size)
    }

    /// One summary line
    pub fn summary_line(&self) -> String {
        let ratio = self
            .compression_ratio()
            .map(|r| format!("{:.2}", r))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "{}: {}, {} segments, {} audio track(s), {:.2} MB -> {:.2} MB, ratio {}",
            self.file_name,
            Utils::format_hms(self.duration()),
            self.segment_count,
            self.audio_tracks,
            Utils::megabytes(self.input_size),
            Utils::megabytes(self.output_size),
            ratio
        )
    }
}

/// Start time, end time and completed files of one batch run
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub started: DateTime<Local>,
    pub finished: Option<DateTime<Local>>,
    /// Files that reached the end of the pipeline, in processing order
    pub files: Vec<ProcessingStats>,
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            started: Local::now(),
            finished: None,
            files: Vec::new(),
        }
    }

    pub fn record(&mut self, stats: ProcessingStats) {
        self.files.push(stats);
    }

    pub fn finish(&mut self) {
        self.finished = Some(Local::now());
    }

    pub fn total_duration(&self) -> Duration {
        let end = self.finished.unwrap_or_else(Local::now);
        (end - self.started).to_std().unwrap_or_default()
    }

    pub fn summary_lines(&self) -> Vec<String> {
        const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

        let mut lines = vec![
            "Processing summary".to_string(),
            format!("Start Time: {}", self.started.format(TIME_FORMAT)),
        ];
        if let Some(end) = self.finished {
            lines.push(format!("End Time: {}", end.format(TIME_FORMAT)));
        }
        lines.push(format!(
            "Total Duration: {}",
            Utils::format_hms(self.total_duration())
        ));
        lines.push(format!("Files completed: {}", self.files.len()));
        lines.extend(self.files.iter().map(ProcessingStats::summary_line));
        lines
    }

    pub fn log_summary(&self) {
        for line in self.summary_lines() {
            info!("{}", line);
        }
    }
}
