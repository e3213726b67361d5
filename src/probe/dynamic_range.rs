//! Dolby Vision detection via mediainfo
//!
//! The result is recorded on the file context and logged. No stage reads it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::ports::{Tool, ToolInvocation, ToolPort};

const DOLBY_VISION_MARKER: &str = "Dolby Vision";

pub struct DynamicRangeDetector {
    tools: Arc<dyn ToolPort>,
    timeout: Option<Duration>,
}

impl DynamicRangeDetector {
    pub fn new(tools: Arc<dyn ToolPort>, timeout: Option<Duration>) -> Self {
        Self { tools, timeout }
    }

    /// `true` when mediainfo reports Dolby Vision; any failure counts as `false`
    pub async fn detect(&self, path: &Path) -> bool {
        let invocation = ToolInvocation::builder(
            Tool::Mediainfo,
            format!("Dynamic-range check of {}", path.display()),
        )
        .flag("--Output=JSON")
        .path(path)
        .timeout(self.timeout)
        .build();

        match self.tools.run(&invocation).await {
            Ok(output) if output.success() => {
                let found = output.stdout.contains(DOLBY_VISION_MARKER);
                if found {
                    info!("Dolby Vision metadata detected");
                }
                found
            }
            Ok(output) => {
                warn!(
                    "mediainfo exited with {:?}, assuming no Dolby Vision",
                    output.code
                );
                false
            }
            Err(e) => {
                warn!("Dynamic-range check skipped: {}", e);
                false
            }
        }
    }
}
