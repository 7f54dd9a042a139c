//! RoboTurk (Open X-Embodiment) step preprocessing.
//!
//! RoboTurk records end-effector deltas as a position vector plus Euler angles,
//! a signed gripper closedness and a float terminate flag. It has no base
//! motion and no proprioceptive state.

use tracing::trace;

use crate::action::{ArmAction, RawAction};
use crate::error::Result;
use crate::instruction::{clean_task_instruction, ReplacementTable};
use crate::step::StepRecord;
use crate::StepProcessor;

pub const DATASET_NAME: &str = "roboturk";

/// Instruction artifacts left by RoboTurk's task file names.
const REPLACEMENTS: [(&str, &str); 7] = [
    ("_", " "),
    ("1f", " "),
    ("4f", " "),
    ("-", " "),
    ("50", " "),
    ("55", " "),
    ("56", " "),
];

pub fn replacements() -> ReplacementTable {
    ReplacementTable::from_literals(&REPLACEMENTS)
}

#[derive(Debug, Clone)]
pub struct Roboturk {
    replacements: ReplacementTable,
}

impl Default for Roboturk {
    fn default() -> Self {
        Self::new()
    }
}

impl Roboturk {
    pub fn new() -> Self {
        Self::with_replacements(replacements())
    }

    /// Uses a custom instruction table instead of the built-in one.
    pub fn with_replacements(replacements: ReplacementTable) -> Self {
        Self { replacements }
    }

    pub fn replacements(&self) -> &ReplacementTable {
        &self.replacements
    }
}

impl StepProcessor for Roboturk {
    fn dataset_name(&self) -> &str {
        DATASET_NAME
    }

    fn process_step(&self, mut step: StepRecord) -> Result<StepRecord> {
        let raw = RawAction::from_map(step.action()?)?;
        let arm = ArmAction::from_raw(&raw)?;
        let instruction = clean_task_instruction(step.instruction()?, &self.replacements);

        arm.write_into(step.action_mut()?)?;
        trace!(%instruction, terminate = arm.terminate, "processed step");
        step.set_instruction(instruction)?;
        Ok(step)
    }
}

/// Processes one step with the built-in RoboTurk table.
pub fn process_step(step: StepRecord) -> Result<StepRecord> {
    Roboturk::new().process_step(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ARM_ACTION_FORMAT, ARM_CONCAT_LEN};
    use crate::error::PreprocessError;
    use serde_json::{json, Value};

    fn step(value: Value) -> StepRecord {
        StepRecord::from_value(value).expect("object step")
    }

    fn sample_step() -> StepRecord {
        step(json!({
            "action": {
                "terminate_episode": 0.0,
                "world_vector": [0.1, 0.0, -0.05],
                "rotation_delta": [0.0, 0.0, 0.0],
                "gripper_closedness_action": -1.0,
            },
            "observation": {
                "natural_language_instruction": "pick_up_the_1f_block-50",
                "image": "frame-000.png",
            },
            "is_first": true,
        }))
    }

    #[test]
    fn builtin_table_passes_validation() {
        let checked = ReplacementTable::from_pairs(REPLACEMENTS).expect("non-empty patterns");
        assert_eq!(replacements(), checked);
    }

    #[test]
    fn out_of_range_world_vector_fails_the_step() {
        let mut raw = sample_step().into_value();
        raw["action"]["world_vector"] = json!([1e40, 0.0, 0.0]);
        let err = process_step(step(raw)).unwrap_err();
        assert!(matches!(err, PreprocessError::InvalidType { expected: "finite f32", .. }));
    }

    #[test]
    fn replacement_table_strips_file_name_artifacts() {
        assert_eq!(replacements().len(), REPLACEMENTS.len());
        assert_eq!(
            replacements().apply("pick_up_the_1f_block-50"),
            "pick up the   block  "
        );
    }

    #[test]
    fn transforms_reference_step() {
        let out = process_step(sample_step()).expect("well-formed step");
        let action = out.action().unwrap();

        assert_eq!(action["terminate"], json!(false));
        let concat: Vec<f32> = action["arm_concat"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap() as f32)
            .collect();
        assert_eq!(concat, vec![0.1, 0.0, -0.05, 0.0, 0.0, 0.0, 1.0, 1.0]);
        assert_eq!(action["format"], json!(ARM_ACTION_FORMAT));

        assert_eq!(out.instruction().unwrap(), "pick up the block");
    }

    #[test]
    fn keeps_raw_and_unrelated_fields() {
        let out = process_step(sample_step()).unwrap();

        assert_eq!(out.action().unwrap()["terminate_episode"], json!(0.0));
        assert_eq!(out.observation().unwrap()["image"], json!("frame-000.png"));
        assert_eq!(out.fields()["is_first"], json!(true));
        assert!(!out.fields().contains_key("state"));
    }

    #[test]
    fn arm_concat_is_always_eight_channels() {
        for (rot, grip, term) in [
            ([0.5, -0.25, 3.0], 0.0, 1.0),
            ([-1.2, 0.7, -2.9], 0.9, -2.0),
            ([0.0, 1.5, 0.0], -0.01, 0.0),
        ] {
            let out = process_step(step(json!({
                "action": {
                    "terminate_episode": term,
                    "world_vector": [1.0, 2.0, 3.0],
                    "rotation_delta": rot,
                    "gripper_closedness_action": [grip],
                },
                "observation": { "natural_language_instruction": "x" },
            })))
            .unwrap();

            let action = out.action().unwrap();
            assert_eq!(action["arm_concat"].as_array().unwrap().len(), ARM_CONCAT_LEN);
            assert_eq!(action["terminate"], json!(term != 0.0));
            let expected_grip = if grip < 0.0 { 1.0 } else { 0.0 };
            assert_eq!(action["arm_concat"][7], json!(expected_grip));
        }
    }

    #[test]
    fn cleaned_instruction_is_a_fixed_point() {
        let cleaned = process_step(sample_step()).unwrap();
        let once = cleaned.instruction().unwrap().to_owned();
        assert_eq!(replacements().apply(&once), once);
    }

    #[test]
    fn malformed_step_fails_without_partial_output() {
        let err = process_step(step(json!({
            "action": {
                "terminate_episode": 0.0,
                "world_vector": [0.1, 0.0, -0.05, 9.0],
                "rotation_delta": [0.0, 0.0, 0.0],
                "gripper_closedness_action": 1.0,
            },
            "observation": { "natural_language_instruction": "x" },
        })))
        .unwrap_err();
        assert!(matches!(err, PreprocessError::ShapeMismatch { expected: 3, actual: 4, .. }));

        let err = process_step(step(json!({
            "action": {
                "terminate_episode": 0.0,
                "world_vector": [0.1, 0.0, -0.05],
                "rotation_delta": [0.0, 0.0, 0.0],
                "gripper_closedness_action": 1.0,
            },
            "observation": {},
        })))
        .unwrap_err();
        assert!(
            matches!(err, PreprocessError::MissingField(ref f) if f == "observation.natural_language_instruction")
        );
    }

    #[test]
    fn custom_table_overrides_builtin() {
        let table = ReplacementTable::from_pairs([("block", "cube")]).unwrap();
        let out = Roboturk::with_replacements(table)
            .process_step(sample_step())
            .unwrap();
        assert_eq!(out.instruction().unwrap(), "pick_up_the_1f_cube-50");
    }
}
