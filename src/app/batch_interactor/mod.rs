// Batch interactor - Runs every input file through the stage sequence

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, info_span, warn, Instrument};

use crate::domain::model::*;
use crate::domain::rules::OutputNaming;
use crate::engine::{file_size, ChunkEncoder, Concatenator, Segmenter, StageRuntime};
use crate::error::{PipelineError, PipelineResult};
use crate::output::{BatchReport, ProcessingStats};
use crate::ports::*;
use crate::probe::{DynamicRangeDetector, Validator};
use crate::streams::{AudioTranscoder, Remuxer};
use crate::utils::{Utils, WorkspaceLayout};

/// State of the file currently going through the pipeline
struct FileRun {
    source: PathBuf,
    state: FileState,
}

impl FileRun {
    fn new(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            state: FileState::Discovered,
        }
    }

    fn advance(&mut self, next: FileState) -> PipelineResult<()> {
        self.state = self.state.advance(next)?;
        Ok(())
    }

    /// Move to `Failed(stage)` and wrap the cause
    fn fail(&mut self, stage: Stage, cause: PipelineError) -> PipelineError {
        if let Ok(failed) = self.state.advance(FileState::Failed(stage)) {
            self.state = failed;
        }
        PipelineError::FileFailed {
            file: self.source.clone(),
            stage,
            source: Box::new(cause),
        }
    }
}

/// Interactor for the batch transcode use case
pub struct BatchInteractor {
    tools: Arc<dyn ToolPort>,
    config: PipelineConfig,
    layout: WorkspaceLayout,
    validator: Arc<Validator>,
    detector: DynamicRangeDetector,
    segmenter: Segmenter,
    encoder: ChunkEncoder,
    concatenator: Concatenator,
    audio: AudioTranscoder,
    remuxer: Remuxer,
}

impl BatchInteractor {
    /// Create new batch interactor with injected ports
    pub fn new(tools: Arc<dyn ToolPort>, probe: Arc<dyn ProbePort>, config: PipelineConfig) -> Self {
        let timeout = config.stage_timeout();
        let validator = Arc::new(Validator::new(probe, config.min_file_size));
        let runtime = StageRuntime::new(Arc::clone(&tools), Arc::clone(&validator), timeout);

        Self {
            layout: WorkspaceLayout::new(&config.base_dir),
            detector: DynamicRangeDetector::new(Arc::clone(&tools), timeout),
            segmenter: Segmenter::new(runtime.clone(), config.segment_duration_secs),
            encoder: ChunkEncoder::new(
                runtime.clone(),
                config.encoder.clone(),
                config.resolved_workers(),
            ),
            concatenator: Concatenator::new(runtime.clone()),
            audio: AudioTranscoder::new(runtime.clone(), config.audio.clone()),
            remuxer: Remuxer::new(runtime, config.remux.clone()),
            tools,
            validator,
            config,
        }
    }

    /// Fail if a required tool cannot be found; a missing mediainfo only warns
    pub async fn check_tools(&self) -> PipelineResult<()> {
        for tool in Tool::required() {
            self.tools.ensure_available(tool).await?;
        }
        if let Err(e) = self.tools.ensure_available(Tool::Mediainfo).await {
            warn!("{}; Dolby Vision detection disabled", e);
        }
        Ok(())
    }

    /// Process every input file in order, stopping at the first failure.
    ///
    /// The summary of completed files is logged either way.
    pub async fn run(&self) -> PipelineResult<BatchReport> {
        let mut report = BatchReport::new();
        let result = self.run_files(&mut report).await;
        report.finish();
        report.log_summary();
        result.map(|_| report)
    }

    async fn run_files(&self, report: &mut BatchReport) -> PipelineResult<()> {
        self.layout.create_all()?;
        let inputs = self.layout.discover_inputs(&self.config)?;
        info!(
            "Found {} input file(s) in {}",
            inputs.len(),
            self.layout.input.display()
        );

        for (position, source) in inputs.iter().enumerate() {
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let span = info_span!("file", name = %name);

            async {
                info!("Processing file {}/{}", position + 1, inputs.len());
                let stats = self.process_file(source).await?;
                info!(
                    "Finished in {} ({} -> {})",
                    Utils::format_duration(stats.duration()),
                    Utils::format_file_size(stats.input_size),
                    Utils::format_file_size(stats.output_size)
                );
                report.record(stats);
                Ok::<(), PipelineError>(())
            }
            .instrument(span)
            .await?;
        }
        Ok(())
    }

    /// Build the per-file context after the source has passed the probe gate
    async fn context(&self, source: &Path, metadata: MediaMetadata) -> FileContext {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        let output_path = self
            .layout
            .output_path(&OutputNaming::output_file_name(&stem, &extension));
        let dolby_vision = self.detector.detect(source).await;

        FileContext {
            source: source.to_path_buf(),
            stem,
            extension,
            metadata,
            dolby_vision,
            segments_dir: self.layout.segments.clone(),
            encoded_dir: self.layout.encoded.clone(),
            working_dir: self.layout.working.clone(),
            output_path,
        }
    }

    /// Run one file from probe to cleanup
    pub async fn process_file(&self, source: &Path) -> PipelineResult<ProcessingStats> {
        let mut run = FileRun::new(source);
        let input_size = file_size(source).await;
        let mut stats = ProcessingStats::start(
            source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            input_size,
        );

        let stage_started = Instant::now();
        let metadata = match self.validator.validate(source, Stage::Probe).await {
            Ok(metadata) => metadata,
            Err(e) => return Err(run.fail(Stage::Probe, e)),
        };
        Validator::require_video(Stage::Probe, &metadata).map_err(|e| run.fail(Stage::Probe, e))?;
        let context = self.context(source, metadata).await;
        info!(
            "Probed in {}: {} audio track(s), {} subtitle stream(s), chapters: {}, Dolby Vision: {}",
            Utils::format_duration(stage_started.elapsed()),
            context.metadata.audio_track_count(),
            context.metadata.subtitle_streams,
            context.metadata.has_chapters,
            context.dolby_vision
        );
        run.advance(FileState::Probed)?;

        // No leftovers from an earlier file or an earlier failed run
        self.layout
            .reset_scratch()
            .map_err(|e| run.fail(Stage::Cleanup, e))?;

        let stage_started = Instant::now();
        let segments = self
            .segmenter
            .segment(&context.source, &context.segments_dir)
            .await
            .map_err(|e| run.fail(Stage::Segment, e))?;
        stats.segment_count = segments.len();
        info!(
            "Segmentation done in {}",
            Utils::format_duration(stage_started.elapsed())
        );
        run.advance(FileState::Segmented)?;

        let encoded = self
            .encoder
            .encode_all(&segments, &context.encoded_dir)
            .await
            .map_err(|e| run.fail(Stage::Encode, e))?;
        run.advance(FileState::Encoded)?;

        let stage_started = Instant::now();
        let video = context.video_path();
        self.concatenator
            .concatenate(&segments, &encoded, &context.working_dir, &video)
            .await
            .map_err(|e| run.fail(Stage::Concatenate, e))?;
        info!(
            "Concatenation done in {}",
            Utils::format_duration(stage_started.elapsed())
        );
        run.advance(FileState::Concatenated)?;

        let stage_started = Instant::now();
        let audio = self
            .audio
            .transcode_all(&context)
            .await
            .map_err(|e| run.fail(Stage::AudioTranscode, e))?;
        stats.audio_tracks = audio.len();
        info!(
            "Audio done in {}",
            Utils::format_duration(stage_started.elapsed())
        );
        run.advance(FileState::AudioDone)?;

        let stage_started = Instant::now();
        self.remuxer
            .remux(&context, &video, &audio)
            .await
            .map_err(|e| run.fail(Stage::Remux, e))?;
        info!(
            "Remux done in {}",
            Utils::format_duration(stage_started.elapsed())
        );
        run.advance(FileState::Remuxed)?;

        self.layout
            .reset_scratch()
            .map_err(|e| run.fail(Stage::Cleanup, e))?;
        run.advance(FileState::CleanedUp)?;

        stats.finish(file_size(&context.output_path).await);
        Ok(stats)
    }
}
