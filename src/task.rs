//! Work units leased from the tracker
//!
//! On the wire a task looks like
//! `{"id": ..., "service": "isgd", "generator_type": "chain", "generator_options": {...}}`.
//! The id is opaque; trackers have been seen sending both strings and integers.

use crate::generator::GeneratorOptions;
use crate::GeneratorError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque task identifier, kept in the textual form sent back to the tracker
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTaskId {
    Text(String),
    Number(serde_json::Number),
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawTaskId::deserialize(deserializer)? {
            RawTaskId::Text(text) => Self(text),
            RawTaskId::Number(number) => Self(number.to_string()),
        })
    }
}

impl Serialize for TaskId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// A leased, immutable unit of enumeration work for one service
///
/// The generator description is kept as sent. It is decoded by
/// [`Task::generator`] when the task is run, so a task the worker cannot
/// interpret still leases cleanly and can be skipped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Task {
    pub id: TaskId,
    pub service: String,
    pub generator_type: String,
    pub generator_options: serde_json::Value,
}

impl Task {
    /// Builds a task from already decoded generator options
    pub fn new(id: TaskId, service: impl Into<String>, generator: &GeneratorOptions) -> Self {
        Self {
            id,
            service: service.into(),
            generator_type: generator.kind().to_string(),
            generator_options: generator.to_value(),
        }
    }

    /// Decodes the generator description
    ///
    /// # Errors
    ///
    /// * `GeneratorError::UnknownType` - `generator_type` names no known generator
    /// * `GeneratorError::InvalidOptions` - the options do not fit the generator type
    pub fn generator(&self) -> Result<GeneratorOptions, GeneratorError> {
        GeneratorOptions::from_parts(&self.generator_type, self.generator_options.clone())
    }
}
