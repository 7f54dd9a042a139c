//! Step and episode records.
//!
//! Records stay as JSON objects so that fields the transform does not touch
//! (images, rewards, episode metadata) pass through unchanged and in order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{json_type_name, PreprocessError, Result};

/// One timestep: an `action` object, an `observation` object and anything else
/// the dataset recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepRecord(Map<String, Value>);

impl StepRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(PreprocessError::InvalidType {
                field: "step".to_owned(),
                expected: "object",
                actual: json_type_name(&other),
            }),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn action(&self) -> Result<&Map<String, Value>> {
        object(&self.0, "action")
    }

    pub fn action_mut(&mut self) -> Result<&mut Map<String, Value>> {
        object_mut(&mut self.0, "action")
    }

    pub fn observation(&self) -> Result<&Map<String, Value>> {
        object(&self.0, "observation")
    }

    pub fn observation_mut(&mut self) -> Result<&mut Map<String, Value>> {
        object_mut(&mut self.0, "observation")
    }

    /// `observation.natural_language_instruction`.
    pub fn instruction(&self) -> Result<&str> {
        let value = self
            .observation()?
            .get(INSTRUCTION_KEY)
            .ok_or_else(|| PreprocessError::MissingField(instruction_path()))?;
        value.as_str().ok_or_else(|| PreprocessError::InvalidType {
            field: instruction_path(),
            expected: "string",
            actual: json_type_name(value),
        })
    }

    pub fn set_instruction(&mut self, instruction: String) -> Result<()> {
        self.observation_mut()?
            .insert(INSTRUCTION_KEY.to_owned(), Value::String(instruction));
        Ok(())
    }
}

const INSTRUCTION_KEY: &str = "natural_language_instruction";

fn instruction_path() -> String {
    format!("observation.{INSTRUCTION_KEY}")
}

fn object<'a>(fields: &'a Map<String, Value>, key: &str) -> Result<&'a Map<String, Value>> {
    let value = fields
        .get(key)
        .ok_or_else(|| PreprocessError::MissingField(key.to_owned()))?;
    value.as_object().ok_or_else(|| PreprocessError::InvalidType {
        field: key.to_owned(),
        expected: "object",
        actual: json_type_name(value),
    })
}

fn object_mut<'a>(
    fields: &'a mut Map<String, Value>,
    key: &str,
) -> Result<&'a mut Map<String, Value>> {
    match fields.get_mut(key) {
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(PreprocessError::InvalidType {
            field: key.to_owned(),
            expected: "object",
            actual: json_type_name(other),
        }),
        None => Err(PreprocessError::MissingField(key.to_owned())),
    }
}

/// A full task demonstration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub steps: Vec<StepRecord>,
    /// Everything besides `steps`, e.g. `episode_metadata`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
