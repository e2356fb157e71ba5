//! Pipeline wiring.
//!
//! One `Pipeline` owns the remote clients and drives the stages in order:
//! sample, upload, extract, gap-fill, script, synthesize, persist. Stages
//! hand their output to the next immutably; nothing is shared across them.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use vnar_audio::sampler::sample_frames;
use vnar_genai::{GenerationClient, RetryConfig, TtsClient, VoiceCatalog};
use vnar_models::PipelineOutput;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::RunLogger;
use crate::{script, synth, timeline};

/// The narration pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    generation: GenerationClient,
    tts: TtsClient,
    catalog: VoiceCatalog,
}

impl Pipeline {
    /// Create a pipeline with explicit clients (tests point these at a mock
    /// server).
    pub fn new(config: PipelineConfig, generation: GenerationClient, tts: TtsClient) -> Self {
        Self {
            config,
            generation,
            tts,
            catalog: VoiceCatalog::default(),
        }
    }

    /// Create a pipeline from environment credentials.
    pub fn from_env(config: PipelineConfig) -> PipelineResult<Self> {
        let retry = RetryConfig::default().with_max_retries(config.max_retries);
        let mut generation = GenerationClient::from_env()?.with_retry(retry.clone());
        if let Some(model) = &config.model {
            generation = generation.with_model(model);
        }
        let tts = TtsClient::from_env()?.with_retry(retry);
        Ok(Self::new(config, generation, tts))
    }

    /// Run the pipeline end to end and persist the result.
    pub async fn run(
        &self,
        video: impl AsRef<Path>,
        out_dir: impl AsRef<Path>,
    ) -> PipelineResult<PipelineOutput> {
        let video = video.as_ref();
        let out_dir = out_dir.as_ref();
        if !video.exists() {
            return Err(PipelineError::missing_input(format!(
                "video not found: {}",
                video.display()
            )));
        }

        let run_id = Uuid::new_v4().to_string();
        let work_dir = Path::new(&self.config.work_dir).join(&run_id);
        tokio::fs::create_dir_all(&work_dir).await?;
        tokio::fs::create_dir_all(out_dir).await?;

        let logger = RunLogger::new(&run_id, "sample");
        logger.log_start(&format!("sampling {}", video.display()));
        let sampled = sample_frames(
            video,
            self.config.sample_interval_secs,
            work_dir.join("frames"),
        )
        .await?;
        if sampled.frames.is_empty() {
            return Err(PipelineError::missing_input(
                "no frames could be sampled from the video",
            ));
        }
        logger.log_completion(&format!(
            "{} frames over {:.1}s",
            sampled.frames.len(),
            sampled.duration_sec
        ));

        let logger = logger.stage("timeline");
        logger.log_start("uploading frames and extracting events");
        let uploaded = timeline::upload_frames(&self.generation, &sampled.frames).await?;
        let events = timeline::extract_timeline(&self.generation, &uploaded).await?;
        let events = timeline::fill_gaps(
            &self.generation,
            events,
            &uploaded,
            self.config.max_gap_secs,
        )
        .await;
        logger.log_completion(&format!("{} timeline events", events.len()));

        let logger = logger.stage("script");
        logger.log_start("writing narration lines");
        let lines = script::generate_script(
            &self.generation,
            &events,
            self.config.trailing_allowance_secs,
        )
        .await;
        let script_text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        logger.log_completion(&format!("{} lines", lines.len()));

        let logger = logger.stage("synthesize");
        let audio_path = out_dir.join("narration.mp3");
        synth::synthesize_track(
            &self.tts,
            &self.catalog,
            self.config.voice.as_deref(),
            &lines,
            &audio_path,
            &logger,
        )
        .await?;

        let output = PipelineOutput {
            timeline: events,
            lines,
            script: script_text,
            duration_sec: sampled.duration_sec,
            audio_path,
        };
        persist_result(&output, out_dir).await?;
        logger.log_completion("result.json written");
        Ok(output)
    }
}

/// Write `result.json` durably and echo it to stdout for the caller.
async fn persist_result(output: &PipelineOutput, out_dir: &Path) -> PipelineResult<()> {
    let json = serde_json::to_string(output)?;
    let path = out_dir.join("result.json");
    let mut file = tokio::fs::File::create(&path).await?;
    file.write_all(json.as_bytes()).await?;
    file.sync_all().await?;
    println!("{json}");
    Ok(())
}
