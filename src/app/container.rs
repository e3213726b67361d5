use std::sync::Arc;

use crate::adapters::{FfprobeAdapter, ProcessToolAdapter};
use crate::app::batch_interactor::BatchInteractor;
use crate::domain::model::PipelineConfig;
use crate::ports::{ProbePort, ToolPort};

pub trait AppContainer: Send + Sync {
    fn batch_interactor(&self) -> Arc<BatchInteractor>;
}

/// Wires the production adapters into the batch interactor
pub struct DefaultAppContainer {
    batch_interactor: Arc<BatchInteractor>,
}

impl DefaultAppContainer {
    pub fn new(config: PipelineConfig) -> Self {
        let tools: Arc<dyn ToolPort> = Arc::new(ProcessToolAdapter::new(config.tools.clone()));
        Self::with_tools(tools, config)
    }

    /// Use a different tool runner; probing still goes through ffprobe on that runner
    pub fn with_tools(tools: Arc<dyn ToolPort>, config: PipelineConfig) -> Self {
        let probe: Arc<dyn ProbePort> = Arc::new(FfprobeAdapter::new(
            Arc::clone(&tools),
            config.stage_timeout(),
        ));

        Self {
            batch_interactor: Arc::new(BatchInteractor::new(tools, probe, config)),
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn batch_interactor(&self) -> Arc<BatchInteractor> {
        Arc::clone(&self.batch_interactor)
    }
}
