// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use crate::value::ValueType;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the parameter library.
pub type Result<T, E = ParamsError> = std::result::Result<T, E>;

/// Top-level error enum for the bench-params crate.
#[derive(Error, Debug)]
pub enum BenchParamsError {
  #[error("Parameter error")]
  Params(#[from] ParamsError),

  #[error("Configuration error")]
  Config(#[from] ConfigError),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON serialization/deserialization error: {0}")]
  Json(#[from] serde_json::Error),
}

/// Errors raised by parameter lists, dictionaries and override resolution.
#[derive(Error, Debug)]
pub enum ParamsError {
  #[error("Key '{key}' is not declared in the parameter schema")]
  UnknownKey { key: String },

  #[error("Type mismatch for '{key}': expected {expected}, got {found}")]
  TypeMismatch {
    key: String,
    expected: ValueType,
    found: ValueType,
  },

  #[error("Key '{key}' is not changeable")]
  NotChangeable { key: String },

  #[error("Key '{key}' does not apply to family '{family}' (list '{list}')")]
  NotApplicable {
    list: String,
    key: String,
    family: String,
  },

  #[error("Key '{key}' has no value")]
  NotSet { key: String },

  #[error("List '{list}' has no family value under key '{family_key}'")]
  MissingFamily { list: String, family_key: String },

  #[error("Parameter list not found: {name}")]
  ListNotFound { name: String },

  #[error("No override applies to layer {layer}")]
  NoOverrideForLayer { layer: usize },

  #[error("Malformed override for '{key}': '{spec}' ({reason})")]
  BadOverrideSpec {
    key: String,
    spec: String,
    reason: String,
  },

  #[error("Failed to parse value for '{key}'")]
  Parse {
    key: String,
    #[source]
    source: ParseError,
  },
}

/// Textual value parse failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
  #[error("'{text}' is not an unsigned integer")]
  Int {
    text: String,
    #[source]
    source: std::num::ParseIntError,
  },

  #[error("'{text}' is not a floating point number")]
  Float {
    text: String,
    #[source]
    source: std::num::ParseFloatError,
  },

  #[error("'{text}' is not a boolean literal")]
  Bool { text: String },

  #[error("a scalar {0} value cannot be built from {1} elements")]
  NotScalar(ValueType, usize),
}

/// Errors related to configuration resolution (src/config.rs).
#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Config file not found: {0}")]
  FileNotFound(PathBuf),

  #[error("Failed to load configuration sources")]
  Load(#[source] Box<figment::Error>),

  #[error("Malformed assignment '{0}', expected LIST.KEY=VALUE")]
  Assignment(String),

  #[error("Unknown policy '{name}'. Available: {available:?}")]
  UnknownPolicy {
    name: String,
    available: Vec<&'static str>,
  },

  #[error("Key '{key}' matches several parameters ignoring case: {candidates:?}")]
  AmbiguousKey { key: String, candidates: Vec<String> },
}

impl From<figment::Error> for ConfigError {
  fn from(e: figment::Error) -> Self {
    ConfigError::Load(Box::new(e))
  }
}
