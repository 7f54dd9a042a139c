//! Episode driver: feeds every step through a [`StepProcessor`] and writes the
//! results out.

use std::io::Write;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::{InspectConfig, MalformedStepPolicy, PreprocessConfig};
use crate::error::{PreprocessError, Result};
use crate::step::{Episode, StepRecord};
use crate::StepProcessor;

/// Counts for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub episodes: usize,
    /// Steps transformed successfully.
    pub steps: usize,
    /// Steps dropped under [`MalformedStepPolicy::Skip`].
    pub skipped: usize,
}

pub struct Preprocessor {
    processor: Box<dyn StepProcessor>,
    policy: MalformedStepPolicy,
}

impl std::fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preprocessor")
            .field("dataset", &self.processor.dataset_name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Preprocessor {
    pub fn new(processor: Box<dyn StepProcessor>, policy: MalformedStepPolicy) -> Self {
        Self { processor, policy }
    }

    pub fn from_config(config: &PreprocessConfig) -> Result<Self> {
        Ok(Self::new(config.processor()?, config.on_malformed))
    }

    pub fn processor(&self) -> &dyn StepProcessor {
        self.processor.as_ref()
    }

    /// Transforms one step, applying the malformed-step policy.
    ///
    /// `Ok(None)` means the step was skipped.
    fn transform(
        &self,
        episode: usize,
        index: usize,
        step: StepRecord,
        summary: &mut RunSummary,
    ) -> Result<Option<StepRecord>> {
        match self.processor.process_step(step) {
            Ok(step) => {
                summary.steps += 1;
                Ok(Some(step))
            }
            Err(err) if self.policy == MalformedStepPolicy::Skip && err.is_record_error() => {
                warn!(episode, step = index, error = %err, "skipping malformed step");
                summary.skipped += 1;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Transforms every step of `episode`, keeping its other fields.
    pub fn process_episode(
        &self,
        index: usize,
        episode: Episode,
        summary: &mut RunSummary,
    ) -> Result<Episode> {
        let Episode { steps, extra } = episode;
        let mut out = Vec::with_capacity(steps.len());
        for (i, step) in steps.into_iter().enumerate() {
            if let Some(step) = self.transform(index, i, step, summary)? {
                out.push(step);
            }
        }
        summary.episodes += 1;
        debug!(episode = index, steps = out.len(), "processed episode");
        Ok(Episode { steps: out, extra })
    }

    /// Pretty-prints the first `limits.steps` transformed steps of the first
    /// `limits.episodes` episodes.
    ///
    /// Steps past the limit are neither transformed nor validated.
    #[instrument(skip_all, fields(dataset = self.processor.dataset_name()))]
    pub fn inspect<I, W>(
        &self,
        episodes: I,
        limits: InspectConfig,
        out: &mut W,
    ) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Result<Episode>>,
        W: Write,
    {
        let mut summary = RunSummary::default();

        for (e, episode) in episodes.into_iter().take(limits.episodes).enumerate() {
            let episode = episode?;
            summary.episodes += 1;

            let mut printed = 0;
            for (i, step) in episode.steps.into_iter().enumerate() {
                if printed == limits.steps {
                    break;
                }
                let Some(step) = self.transform(e, i, step, &mut summary)? else {
                    continue;
                };
                serde_json::to_writer_pretty(&mut *out, &step).map_err(write_error)?;
                writeln!(out).map_err(PreprocessError::Write)?;
                printed += 1;
            }
        }

        out.flush().map_err(PreprocessError::Write)?;
        info!(?summary, "inspection finished");
        Ok(summary)
    }

    /// Transforms whole episodes and writes each as one JSON line.
    ///
    /// `limit` caps the number of episodes; `None` processes all of them.
    #[instrument(skip_all, fields(dataset = self.processor.dataset_name()))]
    pub fn convert<I, W>(
        &self,
        episodes: I,
        limit: Option<usize>,
        out: &mut W,
    ) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Result<Episode>>,
        W: Write,
    {
        let mut summary = RunSummary::default();

        for (e, episode) in episodes
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .enumerate()
        {
            let episode = self.process_episode(e, episode?, &mut summary)?;
            serde_json::to_writer(&mut *out, &episode).map_err(write_error)?;
            writeln!(out).map_err(PreprocessError::Write)?;
        }

        out.flush().map_err(PreprocessError::Write)?;
        info!(?summary, "conversion finished");
        Ok(summary)
    }
}

// Records are already valid JSON values, so a serializer failure is a sink failure.
fn write_error(err: serde_json::Error) -> PreprocessError {
    if err.is_io() {
        PreprocessError::Write(err.into())
    } else {
        PreprocessError::Json(err)
    }
}
