//! Process execution adapter
//!
//! Runs external tools with `tokio::process`, capturing stdout and stderr.

use std::process::Stdio;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::model::ToolPaths;
use crate::error::ToolError;
use crate::ports::*;

/// Tool runner backed by real child processes
pub struct ProcessToolAdapter {
    paths: ToolPaths,
}

impl ProcessToolAdapter {
    /// Create new process adapter
    pub fn new(paths: ToolPaths) -> Self {
        Self { paths }
    }

    /// Configured binary for a tool
    fn program(&self, tool: Tool) -> &str {
        match tool {
            Tool::Ffmpeg => &self.paths.ffmpeg,
            Tool::Ffprobe => &self.paths.ffprobe,
            Tool::AbAv1 => &self.paths.ab_av1,
            Tool::Mediainfo => &self.paths.mediainfo,
        }
    }
}

#[async_trait]
impl ToolPort for ProcessToolAdapter {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let program = self.program(invocation.tool);
        debug!("Running {}: {}", invocation.description, invocation.command_line());

        let child = tokio::process::Command::new(program)
            .args(invocation.os_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                tool: invocation.tool.name().to_string(),
                source,
            })?;

        // Dropping the future on timeout drops the child, which kills it
        let finished = child.wait_with_output();
        let output = match invocation.timeout {
            Some(limit) => match tokio::time::timeout(limit, finished).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        "{} exceeded {}s, killed",
                        invocation.description,
                        limit.as_secs()
                    );
                    return Err(ToolError::TimedOut {
                        tool: invocation.tool.name().to_string(),
                        timeout: limit,
                    });
                }
            },
            None => finished.await,
        }
        .map_err(|source| ToolError::Spawn {
            tool: invocation.tool.name().to_string(),
            source,
        })?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if result.success() {
            debug!("{} finished", invocation.description);
        } else {
            warn!(
                "{} exited with {:?}: {}",
                invocation.description,
                result.code,
                invocation.command_line()
            );
        }
        Ok(result)
    }

    async fn ensure_available(&self, tool: Tool) -> Result<(), ToolError> {
        // Bare names are searched on PATH, explicit paths are checked in place
        let program = self.program(tool);
        match which::which(program) {
            Ok(path) => {
                debug!("Found {} at {}", tool, path.display());
                Ok(())
            }
            Err(e) => {
                debug!("{} not usable: {}", program, e);
                Err(ToolError::Missing {
                    tool: program.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_uses_configured_paths() {
        let mut paths = ToolPaths::default();
        paths.ab_av1 = "/opt/bin/ab-av1".to_string();
        let adapter = ProcessToolAdapter::new(paths);
        assert_eq!(adapter.program(Tool::AbAv1), "/opt/bin/ab-av1");
        assert_eq!(adapter.program(Tool::Ffprobe), "ffprobe");
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let mut paths = ToolPaths::default();
        paths.mediainfo = "definitely-not-a-real-binary-7f3a".to_string();
        let adapter = ProcessToolAdapter::new(paths);
        let err = adapter.ensure_available(Tool::Mediainfo).await.unwrap_err();
        assert!(matches!(err, ToolError::Missing { .. }));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_a_tool_error() {
        let mut paths = ToolPaths::default();
        paths.ffmpeg = "definitely-not-a-real-binary-7f3a".to_string();
        let adapter = ProcessToolAdapter::new(paths);
        let invocation = ToolInvocation::builder(Tool::Ffmpeg, "Version check")
            .flag("-version")
            .build();
        let err = adapter.run(&invocation).await.unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_executable_file_is_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let fake = dir.path().join("ab-av1");
        std::fs::write(&fake, "#!/bin/sh\n").unwrap();

        let mut paths = ToolPaths::default();
        paths.ab_av1 = fake.to_string_lossy().to_string();
        let adapter = ProcessToolAdapter::new(paths);
        let err = adapter.ensure_available(Tool::AbAv1).await.unwrap_err();
        assert!(matches!(err, ToolError::Missing { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_explicit_executable_path_is_found() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let fake = dir.path().join("ab-av1");
        std::fs::write(&fake, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut paths = ToolPaths::default();
        paths.ab_av1 = fake.to_string_lossy().to_string();
        let adapter = ProcessToolAdapter::new(paths);
        adapter.ensure_available(Tool::AbAv1).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_the_tool() {
        let mut paths = ToolPaths::default();
        paths.ab_av1 = "sleep".to_string();
        let adapter = ProcessToolAdapter::new(paths);
        let invocation = ToolInvocation::builder(Tool::AbAv1, "Slow encode")
            .value("5")
            .timeout(Some(std::time::Duration::from_millis(100)))
            .build();

        let started = std::time::Instant::now();
        let err = adapter.run(&invocation).await.unwrap_err();
        assert!(matches!(err, ToolError::TimedOut { .. }));
        assert!(started.elapsed() < std::time::Duration::from_secs(4));
    }
}
