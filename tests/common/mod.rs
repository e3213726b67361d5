//! Scripted tool runner and workspace helpers shared by the integration tests.
//!
//! Every "media file" written here is an ffprobe-style JSON report padded
//! past the validator's size floor. The fake ffprobe simply prints the file
//! back, and the fake ffmpeg/ab-av1 derive their outputs from their inputs'
//! reports, so stream counts flow through the pipeline the way they would
//! with the real tools.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use chunkenc::adapters::FfprobeAdapter;
use chunkenc::app::{AppContainer, BatchInteractor, DefaultAppContainer};
use chunkenc::domain::model::PipelineConfig;
use chunkenc::engine::StageRuntime;
use chunkenc::error::ToolError;
use chunkenc::ports::*;
use chunkenc::probe::Validator;
use chunkenc::utils::WorkspaceLayout;

const PADDED_SIZE: usize = 2048;

/// Stream layout of a fake media file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeMedia {
    pub video: usize,
    pub audio: Vec<u32>,
    pub subtitles: usize,
    pub chapters: usize,
    pub duration: f64,
}

impl FakeMedia {
    pub fn video_only(duration: f64) -> Self {
        Self {
            video: 1,
            duration,
            ..Self::default()
        }
    }

    pub fn render(&self) -> String {
        let mut streams = Vec::new();
        for _ in 0..self.video {
            streams.push(json!({"codec_type": "video", "codec_name": "av1"}));
        }
        for channels in &self.audio {
            streams.push(json!({"codec_type": "audio", "codec_name": "opus", "channels": channels}));
        }
        for _ in 0..self.subtitles {
            streams.push(json!({"codec_type": "subtitle", "codec_name": "subrip"}));
        }
        let chapters: Vec<Value> = (0..self.chapters).map(|id| json!({"id": id})).collect();
        let body = json!({
            "streams": streams,
            "chapters": chapters,
            "format": {
                "format_name": "matroska,webm",
                "duration": format!("{:.6}", self.duration),
            }
        })
        .to_string();
        format!("{:<width$}", body, width = PADDED_SIZE)
    }

    pub fn write(&self, path: &Path) {
        std::fs::write(path, self.render()).unwrap();
    }

    pub fn read(path: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        let value: Value = serde_json::from_str(text.trim()).ok()?;
        let streams = value["streams"].as_array()?;

        let kind = |k: &str| {
            streams
                .iter()
                .filter(|s| s["codec_type"] == k)
                .collect::<Vec<_>>()
        };
        Some(Self {
            video: kind("video").len(),
            audio: kind("audio")
                .iter()
                .map(|s| s["channels"].as_u64().unwrap_or(2) as u32)
                .collect(),
            subtitles: kind("subtitle").len(),
            chapters: value["chapters"].as_array().map_or(0, |c| c.len()),
            duration: value["format"]["duration"]
                .as_str()
                .and_then(|d| d.parse().ok())
                .unwrap_or(0.0),
        })
    }
}

/// Tool runner that emulates ffmpeg, ffprobe, ab-av1 and mediainfo on fake media
#[derive(Default)]
pub struct FakeTools {
    invocations: Mutex<Vec<ToolInvocation>>,
    failing_segments: Mutex<HashSet<u32>>,
    slow_segments: Mutex<HashMap<u32, Duration>>,
    concat_orders: Mutex<Vec<Vec<u32>>>,
    drop_remux_audio: AtomicBool,
    missing_tools: Mutex<HashSet<Tool>>,
}

fn ok(stdout: impl Into<String>) -> ToolOutput {
    ToolOutput {
        code: Some(0),
        stdout: stdout.into(),
        stderr: String::new(),
    }
}

fn failed(stderr: impl Into<String>) -> ToolOutput {
    ToolOutput {
        code: Some(1),
        stdout: String::new(),
        stderr: stderr.into(),
    }
}

fn arg_str(invocation: &ToolInvocation, flag: &str) -> Option<String> {
    invocation.value_after(flag).map(|a| a.to_string())
}

impl FakeTools {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make ab-av1 exit non-zero for this segment ordinal
    pub fn fail_segment(&self, ordinal: u32) {
        self.failing_segments.lock().unwrap().insert(ordinal);
    }

    /// Hold the encode of this segment ordinal for `delay` before it starts
    pub fn delay_segment(&self, ordinal: u32, delay: Duration) {
        self.slow_segments.lock().unwrap().insert(ordinal, delay);
    }

    /// Make the remux silently lose the last audio track
    pub fn drop_audio_in_remux(&self) {
        self.drop_remux_audio.store(true, Ordering::SeqCst);
    }

    pub fn mark_missing(&self, tool: Tool) {
        self.missing_tools.lock().unwrap().insert(tool);
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn invocations_of(&self, tool: Tool) -> Vec<ToolInvocation> {
        self.invocations()
            .into_iter()
            .filter(|i| i.tool == tool)
            .collect()
    }

    /// ffmpeg calls recognised by a distinguishing flag
    pub fn ffmpeg_calls_with(&self, flag: &str) -> Vec<ToolInvocation> {
        self.invocations_of(Tool::Ffmpeg)
            .into_iter()
            .filter(|i| i.has_flag(flag))
            .collect()
    }

    pub fn concat_calls(&self) -> Vec<ToolInvocation> {
        self.invocations_of(Tool::Ffmpeg)
            .into_iter()
            .filter(|i| arg_str(i, "-f").as_deref() == Some("concat"))
            .collect()
    }

    /// Ordinals in the order each concat manifest listed them
    pub fn concat_orders(&self) -> Vec<Vec<u32>> {
        self.concat_orders.lock().unwrap().clone()
    }

    fn segment(&self, invocation: &ToolInvocation) -> ToolOutput {
        let source = match invocation.inputs().first().and_then(|p| FakeMedia::read(p)) {
            Some(media) => media,
            None => return failed("Invalid data found when processing input"),
        };
        let seconds: f64 = arg_str(invocation, "-segment_time")
            .and_then(|s| s.parse().ok())
            .unwrap_or(60.0);
        let dir = match invocation.last_path().and_then(Path::parent) {
            Some(dir) => dir.to_path_buf(),
            None => return failed("no output pattern"),
        };

        let mut remaining = source.duration;
        let mut ordinal = 0;
        while remaining > 0.0 {
            let length = remaining.min(seconds);
            FakeMedia::video_only(length).write(&dir.join(format!("{:04}.mkv", ordinal)));
            remaining -= length;
            ordinal += 1;
        }
        ok("")
    }

    fn encode_ordinal(invocation: &ToolInvocation) -> u32 {
        invocation
            .value_after("--input")
            .and_then(ToolArg::as_path)
            .and_then(Path::file_stem)
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or(u32::MAX)
    }

    fn encode_delay(&self, invocation: &ToolInvocation) -> Option<Duration> {
        let ordinal = Self::encode_ordinal(invocation);
        self.slow_segments.lock().unwrap().get(&ordinal).copied()
    }

    fn encode(&self, invocation: &ToolInvocation) -> ToolOutput {
        let input = invocation.value_after("--input").and_then(ToolArg::as_path);
        let output = invocation.value_after("--output").and_then(ToolArg::as_path);
        let (input, output) = match (input, output) {
            (Some(i), Some(o)) => (i, o),
            _ => return failed("missing --input/--output"),
        };

        let ordinal = Self::encode_ordinal(invocation);
        if self.failing_segments.lock().unwrap().contains(&ordinal) {
            return failed(format!("Error: Failed to find a suitable crf for {:04}", ordinal));
        }

        match FakeMedia::read(input) {
            Some(media) => {
                FakeMedia::video_only(media.duration).write(output);
                ok("")
            }
            None => failed("input unreadable"),
        }
    }

    fn concat(&self, invocation: &ToolInvocation) -> ToolOutput {
        let manifest = match invocation.inputs().first() {
            Some(path) => path.to_path_buf(),
            None => return failed("no manifest"),
        };
        let text = match std::fs::read_to_string(&manifest) {
            Ok(text) => text,
            Err(e) => return failed(e.to_string()),
        };

        let mut order = Vec::new();
        let mut duration = 0.0;
        for line in text.lines() {
            let path = line
                .trim()
                .trim_start_matches("file '")
                .trim_end_matches('\'');
            let path = Path::new(path);
            match FakeMedia::read(path) {
                Some(media) => duration += media.duration,
                None => return failed(format!("{}: No such file or directory", path.display())),
            }
            let ordinal = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or(u32::MAX);
            order.push(ordinal);
        }
        self.concat_orders.lock().unwrap().push(order);

        match invocation.last_path() {
            Some(out) => {
                FakeMedia::video_only(duration).write(out);
                ok("")
            }
            None => failed("no output"),
        }
    }

    fn audio(&self, invocation: &ToolInvocation) -> ToolOutput {
        let source = match invocation.inputs().first().and_then(|p| FakeMedia::read(p)) {
            Some(media) => media,
            None => return failed("source unreadable"),
        };
        let index: usize = arg_str(invocation, "-map")
            .and_then(|m| m.strip_prefix("0:a:").and_then(|n| n.parse().ok()))
            .unwrap_or(usize::MAX);
        let channels = match source.audio.get(index) {
            Some(channels) => *channels,
            None => return failed("Stream map matches no streams"),
        };

        match invocation.last_path() {
            Some(out) => {
                FakeMedia {
                    audio: vec![channels],
                    duration: source.duration,
                    ..FakeMedia::default()
                }
                .write(out);
                ok("")
            }
            None => failed("no output"),
        }
    }

    fn remux(&self, invocation: &ToolInvocation) -> ToolOutput {
        let inputs: Vec<PathBuf> = invocation
            .inputs()
            .into_iter()
            .map(Path::to_path_buf)
            .collect();
        for input in &inputs {
            if !input.exists() {
                return failed(format!("{}: No such file or directory", input.display()));
            }
        }

        let video = match inputs.first().and_then(|p| FakeMedia::read(p)) {
            Some(media) => media,
            None => return failed("video unreadable"),
        };
        let maps: Vec<String> = invocation
            .values_after("-map")
            .into_iter()
            .map(|a| a.to_string())
            .collect();
        let input_index = |selector: &str| -> Option<usize> {
            selector.split(':').next().and_then(|n| n.parse().ok())
        };

        let mut output = FakeMedia {
            video: video.video,
            duration: video.duration,
            ..FakeMedia::default()
        };
        for selector in &maps {
            let Some(index) = input_index(selector) else {
                continue;
            };
            let Some(media) = inputs.get(index).and_then(|p| FakeMedia::read(p)) else {
                return failed("input unreadable");
            };
            if selector.ends_with(":a") || selector.ends_with(":a?") {
                if media.audio.is_empty() && selector.ends_with(":a") {
                    return failed("Stream map matches no streams");
                }
                output.audio.extend(media.audio);
            } else if selector.ends_with(":s?") {
                output.subtitles += media.subtitles;
            }
        }
        if let Some(index) = arg_str(invocation, "-map_chapters").and_then(|c| c.parse::<usize>().ok()) {
            output.chapters = inputs
                .get(index)
                .and_then(|p| FakeMedia::read(p))
                .map_or(0, |m| m.chapters);
        }
        if self.drop_remux_audio.load(Ordering::SeqCst) {
            output.audio.pop();
        }

        match invocation.last_path() {
            Some(out) => {
                output.write(out);
                ok("")
            }
            None => failed("no output"),
        }
    }
}

#[async_trait]
impl ToolPort for FakeTools {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        self.invocations.lock().unwrap().push(invocation.clone());

        let output = match invocation.tool {
            Tool::Ffprobe => match invocation.last_path().map(std::fs::read_to_string) {
                Some(Ok(text)) => ok(text.trim().to_string()),
                _ => failed("No such file or directory"),
            },
            Tool::Mediainfo => ok(r#"{"media":{"track":[]}}"#),
            Tool::AbAv1 => {
                if let Some(delay) = self.encode_delay(invocation) {
                    tokio::time::sleep(delay).await;
                }
                self.encode(invocation)
            }
            Tool::Ffmpeg => {
                if arg_str(invocation, "-f").as_deref() == Some("segment") {
                    self.segment(invocation)
                } else if arg_str(invocation, "-f").as_deref() == Some("concat") {
                    self.concat(invocation)
                } else if invocation.has_flag("-c:a") {
                    self.audio(invocation)
                } else if invocation.has_flag("-map_chapters") {
                    self.remux(invocation)
                } else {
                    failed("unexpected ffmpeg call")
                }
            }
        };
        Ok(output)
    }

    async fn ensure_available(&self, tool: Tool) -> Result<(), ToolError> {
        if self.missing_tools.lock().unwrap().contains(&tool) {
            return Err(ToolError::Missing {
                tool: tool.name().to_string(),
            });
        }
        Ok(())
    }
}

/// Temporary base directory with the full layout and a matching config
pub struct Workspace {
    pub dir: TempDir,
    pub config: PipelineConfig,
    pub layout: WorkspaceLayout,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig {
            base_dir: dir.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        let layout = WorkspaceLayout::new(dir.path());
        layout.create_all().unwrap();
        Self {
            dir,
            config,
            layout,
        }
    }

    /// Write a source file into input/
    pub fn add_source(&self, name: &str, media: &FakeMedia) -> PathBuf {
        let path = self.layout.input.join(name);
        media.write(&path);
        path
    }

    pub fn batch(&self, tools: &Arc<FakeTools>) -> Arc<BatchInteractor> {
        let tools: Arc<dyn ToolPort> = tools.clone();
        DefaultAppContainer::with_tools(tools, self.config.clone()).batch_interactor()
    }

    /// Stage runtime probing through the fake ffprobe
    pub fn runtime(&self, tools: &Arc<FakeTools>) -> StageRuntime {
        let tools: Arc<dyn ToolPort> = tools.clone();
        let probe = Arc::new(FfprobeAdapter::new(Arc::clone(&tools), None));
        let validator = Arc::new(Validator::new(probe, self.config.min_file_size));
        StageRuntime::new(tools, validator, None)
    }

    /// Sorted file names in a directory
    pub fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
