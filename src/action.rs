//! The unified arm-action schema.
//!
//! Every preprocessed dataset emits `arm_concat` as eight channels in the order
//! listed by [`ARM_ACTION_CHANNELS`]. Downstream consumers index into the vector
//! by position, so the order never changes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{json_type_name, PreprocessError, Result};
use crate::geometry::{euler_to_quaternion, Vector3D};

pub const ARM_CONCAT_LEN: usize = 8;

pub const ARM_ACTION_CHANNELS: [&str; ARM_CONCAT_LEN] = [
    "eef_delta_pos_x",
    "eef_delta_pos_y",
    "eef_delta_pos_z",
    "eef_delta_angle_x",
    "eef_delta_angle_y",
    "eef_delta_angle_z",
    "eef_delta_angle_w",
    "gripper_open",
];

/// Value of the `format` field attached to every transformed action.
pub const ARM_ACTION_FORMAT: &str = "eef_delta_pos_x,eef_delta_pos_y,eef_delta_pos_z,eef_delta_angle_x,eef_delta_angle_y,eef_delta_angle_z,eef_delta_angle_w,gripper_open";

/// `true` iff the raw flag is not exactly zero. `-0.0` counts as zero, NaN does not.
pub fn terminate_act_to_bool(terminate_episode: f32) -> bool {
    terminate_episode != 0.0
}

/// `1.0` (open) for strictly negative closedness, else `0.0`.
pub fn gripper_open(gripper_closedness_action: f32) -> f32 {
    if gripper_closedness_action < 0.0 {
        1.0
    } else {
        0.0
    }
}

/// The raw per-step action fields RoboTurk records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    pub terminate_episode: f32,
    pub world_vector: [f32; 3],
    pub rotation_delta: [f32; 3],
    pub gripper_closedness_action: f32,
}

impl RawAction {
    /// Extracts the raw fields from a step's `action` object.
    ///
    /// Scalars may be stored either as a number or as a one-element array.
    pub fn from_map(action: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            terminate_episode: scalar_f32(action, "terminate_episode")?,
            world_vector: vector_f32(action, "world_vector")?,
            rotation_delta: vector_f32(action, "rotation_delta")?,
            gripper_closedness_action: scalar_f32(action, "gripper_closedness_action")?,
        })
    }
}

/// A step's action in the unified schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmAction {
    pub terminate: bool,
    pub eef_delta_pos: Vector3D,
    /// Orientation delta as `(x, y, z, w)`.
    pub eef_delta_angle: [f32; 4],
    pub gripper_open: f32,
}

impl ArmAction {
    pub fn from_raw(raw: &RawAction) -> Result<Self> {
        Ok(Self {
            terminate: terminate_act_to_bool(raw.terminate_episode),
            eef_delta_pos: Vector3D::from(raw.world_vector),
            eef_delta_angle: euler_to_quaternion(raw.rotation_delta)?,
            gripper_open: gripper_open(raw.gripper_closedness_action),
        })
    }

    /// The eight channels in [`ARM_ACTION_CHANNELS`] order.
    pub fn concat(&self) -> [f32; ARM_CONCAT_LEN] {
        let [px, py, pz] = self.eef_delta_pos.to_array();
        let [ax, ay, az, aw] = self.eef_delta_angle;
        [px, py, pz, ax, ay, az, aw, self.gripper_open]
    }

    /// Writes `terminate`, `arm_concat` and `format` into `action`.
    ///
    /// Fails without touching `action` if any channel is non-finite.
    pub fn write_into(&self, action: &mut Map<String, Value>) -> Result<()> {
        let channels = self
            .concat()
            .iter()
            .zip(ARM_ACTION_CHANNELS)
            .map(|(&c, name)| {
                serde_json::Number::from_f64(f64::from(c))
                    .map(Value::Number)
                    .ok_or_else(|| PreprocessError::InvalidType {
                        field: format!("action.arm_concat.{name}"),
                        expected: "finite f32",
                        actual: "non-finite number",
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        action.insert("terminate".to_owned(), Value::Bool(self.terminate));
        action.insert("arm_concat".to_owned(), Value::Array(channels));
        action.insert(
            "format".to_owned(),
            Value::String(ARM_ACTION_FORMAT.to_owned()),
        );
        Ok(())
    }
}

fn field<'a>(action: &'a Map<String, Value>, key: &str) -> Result<&'a Value> {
    action
        .get(key)
        .ok_or_else(|| PreprocessError::MissingField(format!("action.{key}")))
}

// Finite JSON numbers beyond the f32 range would cast to infinity.
fn number_f32(value: &Value, path: impl FnOnce() -> String) -> Result<f32> {
    let Some(v) = value.as_f64() else {
        return Err(PreprocessError::InvalidType {
            field: path(),
            expected: "number",
            actual: json_type_name(value),
        });
    };
    let narrowed = v as f32;
    if !narrowed.is_finite() {
        return Err(PreprocessError::InvalidType {
            field: path(),
            expected: "finite f32",
            actual: "out-of-range number",
        });
    }
    Ok(narrowed)
}

fn scalar_f32(action: &Map<String, Value>, key: &str) -> Result<f32> {
    match field(action, key)? {
        Value::Array(items) => match items.as_slice() {
            [only] => number_f32(only, || format!("action.{key}[0]")),
            _ => Err(PreprocessError::ShapeMismatch {
                field: format!("action.{key}"),
                expected: 1,
                actual: items.len(),
            }),
        },
        other => number_f32(other, || format!("action.{key}")),
    }
}

fn vector_f32<const N: usize>(action: &Map<String, Value>, key: &str) -> Result<[f32; N]> {
    let value = field(action, key)?;
    let items = value.as_array().ok_or_else(|| PreprocessError::InvalidType {
        field: format!("action.{key}"),
        expected: "array",
        actual: json_type_name(value),
    })?;
    if items.len() != N {
        return Err(PreprocessError::ShapeMismatch {
            field: format!("action.{key}"),
            expected: N,
            actual: items.len(),
        });
    }

    let mut out = [0.0; N];
    for (i, (slot, item)) in out.iter_mut().zip(items).enumerate() {
        *slot = number_f32(item, || format!("action.{key}[{i}]"))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn action(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn format_lists_channels_in_order() {
        let channels: Vec<&str> = ARM_ACTION_FORMAT.split(',').collect();
        assert_eq!(channels, ARM_ACTION_CHANNELS);
    }

    #[test]
    fn terminate_flag_is_exact_nonzero() {
        assert!(!terminate_act_to_bool(0.0));
        assert!(!terminate_act_to_bool(-0.0));
        assert!(terminate_act_to_bool(1.0));
        assert!(terminate_act_to_bool(-1.0));
        assert!(terminate_act_to_bool(1e-30));
    }

    #[test]
    fn gripper_zero_is_closed() {
        assert_eq!(gripper_open(-0.5), 1.0);
        assert_eq!(gripper_open(0.3), 0.0);
        assert_eq!(gripper_open(0.0), 0.0);
        assert_eq!(gripper_open(-0.0), 0.0);
    }

    #[test]
    fn raw_action_accepts_scalars_and_singletons() {
        let raw = RawAction::from_map(&action(json!({
            "terminate_episode": 0.0,
            "world_vector": [0.1, 0.2, 0.3],
            "rotation_delta": [0.0, 0.0, 0.0],
            "gripper_closedness_action": [-1.0],
        })))
        .expect("well-formed action");

        assert_eq!(raw.gripper_closedness_action, -1.0);
        assert_eq!(raw.world_vector, [0.1, 0.2, 0.3]);
    }

    #[test]
    fn raw_action_reports_missing_and_misshapen_fields() {
        let missing = RawAction::from_map(&action(json!({
            "terminate_episode": 0.0,
            "rotation_delta": [0.0, 0.0, 0.0],
            "gripper_closedness_action": 1.0,
        })));
        assert!(matches!(missing, Err(PreprocessError::MissingField(f)) if f == "action.world_vector"));

        let short = RawAction::from_map(&action(json!({
            "terminate_episode": 0.0,
            "world_vector": [0.1, 0.2],
            "rotation_delta": [0.0, 0.0, 0.0],
            "gripper_closedness_action": 1.0,
        })));
        assert!(matches!(
            short,
            Err(PreprocessError::ShapeMismatch { expected: 3, actual: 2, .. })
        ));

        let wrong = RawAction::from_map(&action(json!({
            "terminate_episode": "no",
            "world_vector": [0.1, 0.2, 0.3],
            "rotation_delta": [0.0, 0.0, 0.0],
            "gripper_closedness_action": 1.0,
        })));
        assert!(matches!(
            wrong,
            Err(PreprocessError::InvalidType { expected: "number", actual: "string", .. })
        ));
    }

    #[test]
    fn concat_has_fixed_layout() {
        let arm = ArmAction::from_raw(&RawAction {
            terminate_episode: 0.0,
            world_vector: [0.1, 0.0, -0.05],
            rotation_delta: [0.0, 0.0, 0.0],
            gripper_closedness_action: -1.0,
        })
        .expect("finite rotation");

        assert!(!arm.terminate);
        assert_eq!(arm.concat(), [0.1, 0.0, -0.05, 0.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn write_into_keeps_raw_fields() {
        let mut map = action(json!({ "terminate_episode": 1.0 }));
        let arm = ArmAction {
            terminate: true,
            eef_delta_pos: Vector3D::new(0.0, 0.0, 0.0),
            eef_delta_angle: [0.0, 0.0, 0.0, 1.0],
            gripper_open: 0.0,
        };
        arm.write_into(&mut map).unwrap();

        assert_eq!(map["terminate_episode"], json!(1.0));
        assert_eq!(map["terminate"], json!(true));
        assert_eq!(map["arm_concat"].as_array().map(Vec::len), Some(ARM_CONCAT_LEN));
        assert_eq!(map["format"], json!(ARM_ACTION_FORMAT));
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        let huge = RawAction::from_map(&action(json!({
            "terminate_episode": 0.0,
            "world_vector": [1e40, 0.0, 0.0],
            "rotation_delta": [0.0, 0.0, 0.0],
            "gripper_closedness_action": 1.0,
        })));
        assert!(matches!(
            huge,
            Err(PreprocessError::InvalidType { ref field, expected: "finite f32", .. })
                if field == "action.world_vector[0]"
        ));

        let huge_scalar = RawAction::from_map(&action(json!({
            "terminate_episode": 0.0,
            "world_vector": [0.0, 0.0, 0.0],
            "rotation_delta": [0.0, 0.0, 0.0],
            "gripper_closedness_action": [-1e300],
        })));
        assert!(matches!(
            huge_scalar,
            Err(PreprocessError::InvalidType { expected: "finite f32", .. })
        ));
    }

    #[test]
    fn write_into_refuses_non_finite_channels() {
        let mut map = action(json!({ "terminate_episode": 0.0 }));
        let arm = ArmAction {
            terminate: false,
            eef_delta_pos: Vector3D::new(f32::INFINITY, 0.0, 0.0),
            eef_delta_angle: [0.0, 0.0, 0.0, 1.0],
            gripper_open: 0.0,
        };

        assert!(arm.write_into(&mut map).is_err());
        assert!(!map.contains_key("arm_concat"));
        assert!(!map.contains_key("terminate"));
    }
}
