//! Deterministic shortcode generators
//!
//! A task never carries its codes explicitly (except for the `list` kind); it carries a
//! compact description from which every worker reproduces the identical sequence.
//! Three kinds exist:
//! - `chain`: pseudorandom codes from an MD5 hash chain
//! - `sequence`: every code between a start and stop code, odometer style
//! - `list`: a literal list of codes
//!
//! Generators are plain iterators. They are restartable by building a new one from the
//! same options, but they cannot be resumed mid-stream.

mod chain;
mod sequence;

pub use chain::{ChainGenerator, DIGEST_SIZE};
pub use sequence::SequenceGenerator;

use crate::GeneratorError;
use serde::{Deserialize, Serialize};

/// Options for the `chain` generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainOptions {
    /// Characters that may appear in a code
    pub charset: String,

    /// Initial hash chain input
    pub seed: String,

    /// Number of codes to emit
    pub count: u64,

    /// Length of every emitted code
    pub length: usize,
}

/// Options for the `sequence` generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceOptions {
    /// Characters in digit order
    pub charset: String,

    /// First code (inclusive)
    pub start: String,

    /// Last code (inclusive)
    pub stop: String,
}

/// Options for the `list` generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    #[serde(alias = "codes")]
    pub list: Vec<String>,
}

/// Generator description, keyed by the tracker's `generator_type`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorOptions {
    Chain(ChainOptions),
    Sequence(SequenceOptions),
    List(ListOptions),
}

impl GeneratorOptions {
    /// Decodes the tracker's `generator_type` / `generator_options` pair
    pub fn from_parts(kind: &str, options: serde_json::Value) -> Result<Self, GeneratorError> {
        let invalid = |e: serde_json::Error| GeneratorError::InvalidOptions {
            kind: kind.to_string(),
            message: e.to_string(),
        };

        match kind {
            "chain" => serde_json::from_value(options)
                .map(Self::Chain)
                .map_err(invalid),
            "sequence" => serde_json::from_value(options)
                .map(Self::Sequence)
                .map_err(invalid),
            "list" => serde_json::from_value(options)
                .map(Self::List)
                .map_err(invalid),
            other => Err(GeneratorError::UnknownType(other.to_string())),
        }
    }

    /// Returns the wire name of this generator kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chain(_) => "chain",
            Self::Sequence(_) => "sequence",
            Self::List(_) => "list",
        }
    }

    /// Encodes the options payload for the wire
    pub fn to_value(&self) -> serde_json::Value {
        let value = match self {
            Self::Chain(options) => serde_json::to_value(options),
            Self::Sequence(options) => serde_json::to_value(options),
            Self::List(options) => serde_json::to_value(options),
        };
        // Plain structs of strings and integers always serialize
        value.unwrap_or(serde_json::Value::Null)
    }
}

/// A lazy, finite sequence of shortcodes
#[derive(Debug, Clone)]
pub enum Generator {
    Chain(ChainGenerator),
    Sequence(SequenceGenerator),
    List(std::vec::IntoIter<String>),
}

impl Generator {
    /// Builds a generator, validating the options up front
    ///
    /// # Errors
    ///
    /// Fails when the chain code length exceeds the MD5 digest size, when a charset is
    /// empty, or when sequence endpoints use characters outside the charset.
    pub fn new(options: &GeneratorOptions) -> Result<Self, GeneratorError> {
        match options {
            GeneratorOptions::Chain(options) => ChainGenerator::new(options).map(Self::Chain),
            GeneratorOptions::Sequence(options) => {
                SequenceGenerator::new(options).map(Self::Sequence)
            }
            GeneratorOptions::List(options) => Ok(Self::List(options.list.clone().into_iter())),
        }
    }
}

impl Iterator for Generator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self {
            Self::Chain(generator) => generator.next(),
            Self::Sequence(generator) => generator.next(),
            Self::List(codes) => codes.next(),
        }
    }
}
