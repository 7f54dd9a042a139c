//! Open X-Embodiment dataset preprocessing.
//!
//! This crate defines:
//! - [`StepProcessor`]: the per-dataset contract turning a raw step into the unified schema.
//! - [`roboturk::Roboturk`]: the RoboTurk implementation.
//! - [`action`]: the 8-channel arm-action schema shared by every dataset.
//! - [`dataset`]: a directory-backed episode source.
//! - [`pipeline::Preprocessor`]: the driver that inspects or converts a dataset.

pub mod action;
pub mod config;
pub mod dataset;
pub mod error;
pub mod geometry;
pub mod instruction;
pub mod pipeline;
pub mod roboturk;
pub mod step;

pub use action::{ArmAction, RawAction, ARM_ACTION_CHANNELS, ARM_ACTION_FORMAT, ARM_CONCAT_LEN};
pub use config::{InspectConfig, MalformedStepPolicy, PreprocessConfig};
pub use dataset::{dataset_to_path, DatasetReader};
pub use error::{PreprocessError, Result};
pub use geometry::{euler_to_quaternion, quaternion_to_euler};
pub use instruction::{clean_task_instruction, ReplacementTable};
pub use pipeline::{Preprocessor, RunSummary};
pub use step::{Episode, StepRecord};

/// Converts one dataset's native step encoding into the unified arm-action
/// schema and cleans its instruction.
///
/// Implementations are stateless: each step is handled on its own, so a caller
/// may fan steps out across threads.
pub trait StepProcessor: Send + Sync {
    /// Directory name of the dataset this processor understands.
    fn dataset_name(&self) -> &str;

    /// Adds `terminate`, `arm_concat` and `format` to the step's action and
    /// replaces its instruction with the cleaned text.
    ///
    /// Every input is validated before anything is written.
    fn process_step(&self, step: StepRecord) -> Result<StepRecord>;
}
