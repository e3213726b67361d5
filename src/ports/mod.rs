// Ports - Interface definitions (contracts)

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::model::*;
use crate::error::{PipelineError, PipelineResult, ToolError};

/// External collaborators the pipeline drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Demux/remux/transcode primitive
    Ffmpeg,
    /// Stream inspection primitive
    Ffprobe,
    /// Quality-targeted video encoder
    AbAv1,
    /// Dynamic-range metadata detector
    Mediainfo,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
            Tool::AbAv1 => "ab-av1",
            Tool::Mediainfo => "mediainfo",
        }
    }

    /// Tools without which no file can be processed
    pub fn required() -> [Tool; 3] {
        [Tool::Ffmpeg, Tool::Ffprobe, Tool::AbAv1]
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One typed command-line argument
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArg {
    /// Option name such as `-map` or `--input`
    Flag(String),
    /// Plain value
    Value(String),
    /// Filesystem path, passed through without lossy conversion
    Path(PathBuf),
}

impl ToolArg {
    pub fn as_os(&self) -> OsString {
        match self {
            ToolArg::Flag(flag) => OsString::from(flag),
            ToolArg::Value(value) => OsString::from(value),
            ToolArg::Path(path) => path.as_os_str().to_os_string(),
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ToolArg::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ToolArg::Flag(s) | ToolArg::Value(s) => Some(s),
            ToolArg::Path(_) => None,
        }
    }
}

impl fmt::Display for ToolArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolArg::Flag(flag) => f.write_str(flag),
            ToolArg::Value(value) => f.write_str(value),
            ToolArg::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A fully described external tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool: Tool,
    pub args: Vec<ToolArg>,
    /// Human description used in logs and error messages
    pub description: String,
    pub timeout: Option<Duration>,
}

impl ToolInvocation {
    pub fn builder(tool: Tool, description: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            invocation: ToolInvocation {
                tool,
                args: Vec::new(),
                description: description.into(),
                timeout: None,
            },
        }
    }

    pub fn os_args(&self) -> Vec<OsString> {
        self.args.iter().map(ToolArg::as_os).collect()
    }

    /// Printable command line for logs; not meant to be fed to a shell
    pub fn command_line(&self) -> String {
        let mut line = self.tool.name().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string());
        }
        line
    }

    /// Every argument that directly follows `flag`
    pub fn values_after(&self, flag: &str) -> Vec<&ToolArg> {
        self.args
            .windows(2)
            .filter(|pair| matches!(&pair[0], ToolArg::Flag(f) if f == flag))
            .map(|pair| &pair[1])
            .collect()
    }

    /// First argument that directly follows `flag`
    pub fn value_after(&self, flag: &str) -> Option<&ToolArg> {
        self.values_after(flag).into_iter().next()
    }

    /// Paths given with `-i`, in order
    pub fn inputs(&self) -> Vec<&Path> {
        self.values_after("-i")
            .into_iter()
            .filter_map(ToolArg::as_path)
            .collect()
    }

    /// Trailing path argument, the output for ffmpeg-style calls
    pub fn last_path(&self) -> Option<&Path> {
        self.args.last().and_then(ToolArg::as_path)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args
            .iter()
            .any(|arg| matches!(arg, ToolArg::Flag(f) if f == flag))
    }
}

/// Ordered builder for tool arguments
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    invocation: ToolInvocation,
}

impl CommandBuilder {
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.invocation.args.push(ToolArg::Flag(flag.into()));
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.invocation.args.push(ToolArg::Value(value.into()));
        self
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.invocation.args.push(ToolArg::Path(path.into()));
        self
    }

    /// `flag value`
    pub fn opt(self, flag: impl Into<String>, value: impl Into<String>) -> Self {
        self.flag(flag).value(value)
    }

    /// `flag path`
    pub fn opt_path(self, flag: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.flag(flag).path(path)
    }

    /// `-i path`
    pub fn input(self, path: impl Into<PathBuf>) -> Self {
        self.opt_path("-i", path)
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.invocation.timeout = timeout;
        self
    }

    pub fn build(self) -> ToolInvocation {
        self.invocation
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into `PipelineError::ToolFailed`
    pub fn ensure_success(self, invocation: &ToolInvocation) -> PipelineResult<ToolOutput> {
        if self.success() {
            return Ok(self);
        }
        Err(PipelineError::ToolFailed {
            tool: invocation.tool.name().to_string(),
            description: invocation.description.clone(),
            code: self.code,
            stderr: self.stderr,
        })
    }
}

/// Port for running external tools.
///
/// Every process the pipeline starts goes through this trait, so stage logic
/// can be exercised with a scripted implementation.
#[async_trait]
pub trait ToolPort: Send + Sync {
    /// Run the tool to completion. A non-zero exit is returned as output, not as an error.
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError>;

    /// Check that the tool can be started at all
    async fn ensure_available(&self, tool: Tool) -> Result<(), ToolError>;
}

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe stream layout, chapters and duration; side-effect free
    async fn probe(&self, path: &Path) -> PipelineResult<MediaMetadata>;
}
