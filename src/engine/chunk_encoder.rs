//! Quality-targeted encoding of segments through ab-av1
//!
//! Segments are independent, so they run on a bounded worker pool. Once any
//! segment fails no new segment is started; the ones already running are
//! allowed to finish, then the lowest-ordinal failure is reported.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn, Instrument};

use crate::domain::model::*;
use crate::domain::rules::SegmentRules;
use crate::engine::{file_size, StageRuntime};
use crate::error::{PipelineError, PipelineResult};
use crate::ports::*;
use crate::probe::Validator;
use crate::utils::Utils;

#[derive(Clone)]
pub struct ChunkEncoder {
    runtime: StageRuntime,
    settings: Arc<EncoderSettings>,
    workers: usize,
}

/// Outcome of one segment, keyed by ordinal regardless of completion order
struct SegmentOutcome {
    ordinal: u32,
    input_bytes: u64,
    output_bytes: u64,
    result: PipelineResult<EncodedSegment>,
}

impl ChunkEncoder {
    pub fn new(runtime: StageRuntime, settings: EncoderSettings, workers: usize) -> Self {
        Self {
            runtime,
            settings: Arc::new(settings),
            workers: workers.max(1),
        }
    }

    fn vmaf_arg(min_vmaf: f32) -> String {
        if min_vmaf.fract() == 0.0 {
            format!("{:.0}", min_vmaf)
        } else {
            min_vmaf.to_string()
        }
    }

    pub fn invocation(&self, segment: &Segment, output: &Path) -> ToolInvocation {
        let settings = &self.settings;
        let mut builder = ToolInvocation::builder(
            Tool::AbAv1,
            format!("Encoding segment {:04}", segment.ordinal),
        )
        .value("auto-encode")
        .opt("-e", settings.encoder.as_str());

        for param in &settings.svt_params {
            builder = builder.opt("--svt", param.as_str());
        }

        builder = builder
            .opt("--keyint", settings.keyint.as_str())
            .opt("--min-vmaf", Self::vmaf_arg(settings.min_vmaf))
            .opt("--preset", settings.preset.to_string())
            .opt("--vmaf", settings.vmaf_options.as_str())
            .opt("--samples", settings.samples.to_string())
            .opt("--sample-duration", settings.sample_duration.as_str());

        if settings.passthrough_frame_rate {
            builder = builder.opt("--enc", "fps_mode=passthrough");
        }

        builder
            .opt_path("--input", &segment.path)
            .opt_path("--output", output)
            .timeout(self.runtime.timeout)
            .build()
    }

    /// Encode one segment into `output_dir` and validate the result
    pub async fn encode_segment(
        &self,
        segment: &Segment,
        output_dir: &Path,
    ) -> PipelineResult<EncodedSegment> {
        let output = output_dir.join(segment_file_name(segment.ordinal));
        self.run_one(segment, &output)
            .await
            .map_err(|cause| PipelineError::Encode {
                ordinal: segment.ordinal,
                cause: Box::new(cause),
            })
    }

    async fn run_one(&self, segment: &Segment, output: &Path) -> PipelineResult<EncodedSegment> {
        let invocation = self.invocation(segment, output);
        self.runtime
            .tools
            .run(&invocation)
            .await?
            .ensure_success(&invocation)?;

        let metadata = self.runtime.validator.validate(output, Stage::Encode).await?;
        Validator::require_video(Stage::Encode, &metadata)?;

        Ok(EncodedSegment {
            ordinal: segment.ordinal,
            path: output.to_path_buf(),
        })
    }

    async fn timed(self, segment: Segment, output_dir: PathBuf) -> SegmentOutcome {
        let started = Instant::now();
        let input_bytes = file_size(&segment.path).await;
        let result = self.encode_segment(&segment, &output_dir).await;

        let output_bytes = match &result {
            Ok(encoded) => {
                let size = file_size(&encoded.path).await;
                info!(
                    "Segment {:04} encoded in {}: {} -> {} (ratio {:.2})",
                    segment.ordinal,
                    Utils::format_duration(started.elapsed()),
                    Utils::format_file_size(input_bytes),
                    Utils::format_file_size(size),
                    Utils::compression_ratio(input_bytes, size).unwrap_or(0.0)
                );
                size
            }
            Err(e) => {
                warn!("Segment {:04} failed: {}", segment.ordinal, e);
                0
            }
        };

        SegmentOutcome {
            ordinal: segment.ordinal,
            input_bytes,
            output_bytes,
            result,
        }
    }

    /// Encode every segment; all in-flight work settles before an error is returned
    pub async fn encode_all(
        &self,
        segments: &[Segment],
        output_dir: &Path,
    ) -> PipelineResult<Vec<EncodedSegment>> {
        let started = Instant::now();
        let total = segments.len();
        info!(
            "Encoding {} segments with {} worker(s), min VMAF {}",
            total,
            self.workers,
            Self::vmaf_arg(self.settings.min_vmaf)
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let failed = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();

        let mut ordered: Vec<Segment> = segments.to_vec();
        ordered.sort_by_key(|s| s.ordinal);

        for segment in ordered {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            if failed.load(Ordering::SeqCst) {
                info!(
                    "Not starting segment {:04} after an earlier failure",
                    segment.ordinal
                );
                break;
            }

            let encoder = self.clone();
            let failed = Arc::clone(&failed);
            let dir = output_dir.to_path_buf();
            let span = tracing::Span::current();
            tasks.spawn(
                async move {
                    let outcome = encoder.timed(segment, dir).await;
                    if outcome.result.is_err() {
                        failed.store(true, Ordering::SeqCst);
                    }
                    drop(permit);
                    outcome
                }
                .instrument(span),
            );
        }

        let mut encoded = Vec::with_capacity(total);
        let mut failures: Vec<(u32, PipelineError)> = Vec::new();
        let mut input_bytes = 0;
        let mut output_bytes = 0;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    input_bytes += outcome.input_bytes;
                    output_bytes += outcome.output_bytes;
                    match outcome.result {
                        Ok(segment) => encoded.push(segment),
                        Err(e) => failures.push((outcome.ordinal, e)),
                    }
                }
                Err(e) => failures.push((u32::MAX, PipelineError::WorkerLost(e.to_string()))),
            }
        }

        if let Some((_, err)) = failures.into_iter().min_by_key(|(ordinal, _)| *ordinal) {
            return Err(err);
        }

        let encoded = SegmentRules::sort_encoded(encoded);
        SegmentRules::check_one_to_one(segments, &encoded)?;

        info!(
            "Encoded {} segments in {}: {} -> {} ({:.1}% smaller)",
            encoded.len(),
            Utils::format_duration(started.elapsed()),
            Utils::format_file_size(input_bytes),
            Utils::format_file_size(output_bytes),
            Utils::size_reduction_percent(input_bytes, output_bytes)
        );
        Ok(encoded)
    }
}
