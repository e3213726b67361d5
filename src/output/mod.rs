//! Per-file statistics and the end-of-batch summary

pub mod report;

pub use report::{BatchReport, ProcessingStats};
