//! Run configuration.
//!
//! Defaults reproduce the one-off inspection run: the `roboturk` dataset under
//! `data/datasets/openx_embod`, first step of the first episode.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PreprocessError, Result};
use crate::instruction::ReplacementTable;
use crate::roboturk::{self, Roboturk};
use crate::StepProcessor;

pub const DEFAULT_DATASET_DIR: &str = "data/datasets/openx_embod";

/// What the driver does with a step the transform rejects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedStepPolicy {
    /// Stop the run with the step's error.
    #[default]
    Abort,
    /// Log a warning, drop the step and keep going.
    Skip,
}

impl FromStr for MalformedStepPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            other => Err(format!(
                "unknown malformed-step policy `{other}` (expected abort or skip)"
            )),
        }
    }
}

impl fmt::Display for MalformedStepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Abort => "abort",
            Self::Skip => "skip",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
    /// Episodes to print.
    pub episodes: usize,
    /// Steps to print per episode.
    pub steps: usize,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            episodes: 1,
            steps: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub dataset_dir: PathBuf,
    pub dataset_name: String,
    pub inspect: InspectConfig,
    pub on_malformed: MalformedStepPolicy,
    /// Replaces the dataset's built-in instruction table when set.
    pub replacements: Option<ReplacementTable>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from(DEFAULT_DATASET_DIR),
            dataset_name: roboturk::DATASET_NAME.to_string(),
            inspect: InspectConfig::default(),
            on_malformed: MalformedStepPolicy::default(),
            replacements: None,
        }
    }
}

impl PreprocessConfig {
    /// Loads a JSON config file; absent keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|err| PreprocessError::Io(err, path.to_owned()))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Builds the step processor for `dataset_name`.
    pub fn processor(&self) -> Result<Box<dyn StepProcessor>> {
        let processor: Box<dyn StepProcessor> = match self.dataset_name.as_str() {
            roboturk::DATASET_NAME => Box::new(match &self.replacements {
                Some(table) => Roboturk::with_replacements(table.clone()),
                None => Roboturk::new(),
            }),
            other => return Err(PreprocessError::UnknownDataset(other.to_string())),
        };
        Ok(processor)
    }
}
