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
use crate::cli::SourceArgs;
use crate::dictionary::ParameterDictionary;
use crate::error::BenchParamsError;
use crate::error::ConfigError;
use crate::example::ExamplePolicy;
use crate::schema::ParamsPolicy;
use crate::value::VECTOR_DELIMITER;
use figment::Figment;
use figment::providers::Env;
use figment::providers::Format;
use figment::providers::Json;
use figment::providers::Toml;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Prefix of environment variables merged into the configuration.
pub const ENV_PREFIX: &str = "BPARAMS_";

/// Names accepted by `--policy`.
pub const POLICY_NAMES: [&str; 1] = [ExamplePolicy::NAME];

/// Looks up a built-in policy by name.
pub fn builtin_policy(name: &str) -> Result<Arc<dyn ParamsPolicy>, ConfigError> {
  match name {
    ExamplePolicy::NAME => Ok(Arc::new(ExamplePolicy::new())),
    _ => Err(ConfigError::UnknownPolicy {
      name: name.to_string(),
      available: POLICY_NAMES.to_vec(),
    }),
  }
}

/// A scalar as written in a config file or environment variable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
  Bool(bool),
  Int(i64),
  Float(f64),
  Text(String),
}

impl fmt::Display for RawScalar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RawScalar::Bool(b) => write!(f, "{b}"),
      RawScalar::Int(i) => write!(f, "{i}"),
      RawScalar::Float(x) => write!(f, "{x:?}"),
      RawScalar::Text(s) => f.write_str(s),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
  List(Vec<RawScalar>),
  Scalar(RawScalar),
}

impl RawValue {
  /// Comma-joined text, the form `add_map` parses.
  pub fn to_text(&self) -> String {
    match self {
      RawValue::Scalar(s) => s.to_string(),
      RawValue::List(items) => items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(&VECTOR_DELIMITER.to_string()),
    }
  }

  /// Every override spec held by this value; arrays hold one spec per item.
  pub fn to_specs(&self) -> Vec<String> {
    match self {
      RawValue::Scalar(s) => vec![s.to_string()],
      RawValue::List(items) => items.iter().map(ToString::to_string).collect(),
    }
  }
}

type RawTable = BTreeMap<String, BTreeMap<String, RawValue>>;

/// The merged file and environment sources.
#[derive(Debug, Default, Deserialize)]
pub struct RawSources {
  #[serde(default)]
  pub lists: RawTable,

  #[serde(default)]
  pub overrides: RawTable,
}

/// Merges the config file (if any) with `BPARAMS_*` environment variables.
pub fn load_sources(config_path: Option<&Path>) -> Result<RawSources, ConfigError> {
  let mut figment = Figment::new();
  if let Some(path) = config_path {
    if !path.exists() {
      return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    figment = match path.extension().and_then(|e| e.to_str()) {
      Some("json") => figment.merge(Json::file(path)),
      _ => figment.merge(Toml::file(path)),
    };
  }
  figment = figment.merge(env_source());
  Ok(figment.extract()?)
}

/// `BPARAMS_*` variables keyed as `section.list.key`. The section and list
/// are lowercased; the parameter key keeps its case.
fn env_source() -> Env {
  Env::prefixed(ENV_PREFIX)
    .split("__")
    .lowercase(false)
    .map(|key| lowercase_path_head(key.as_str()).into())
}

fn lowercase_path_head(key: &str) -> String {
  key
    .splitn(3, '.')
    .enumerate()
    .map(|(i, part)| if i < 2 { part.to_ascii_lowercase() } else { part.to_string() })
    .collect::<Vec<_>>()
    .join(".")
}

/// Maps a key from an outside source onto the schema. An exact match wins;
/// otherwise the key must match one schema key ignoring ASCII case.
pub fn resolve_key(policy: &dyn ParamsPolicy, key: &str) -> Result<String, ConfigError> {
  let schema = policy.expected_params();
  if schema.contains(key) {
    return Ok(key.to_string());
  }
  let candidates: Vec<&str> = schema
    .iter()
    .map(|(name, _)| name)
    .filter(|name| name.eq_ignore_ascii_case(key))
    .collect();
  match candidates.as_slice() {
    [] => Ok(key.to_string()),
    [single] => Ok(single.to_string()),
    _ => Err(ConfigError::AmbiguousKey {
      key: key.to_string(),
      candidates: candidates.iter().map(ToString::to_string).collect(),
    }),
  }
}

/// One `LIST.KEY=VALUE` assignment from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
  pub list: String,
  pub key: String,
  pub value: String,
}

impl std::str::FromStr for Assignment {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let malformed = || ConfigError::Assignment(s.to_string());
    let (target, value) = s.split_once('=').ok_or_else(malformed)?;
    let (list, key) = target.split_once('.').ok_or_else(malformed)?;
    if list.is_empty() || key.is_empty() {
      return Err(malformed());
    }
    Ok(Assignment {
      list: list.to_string(),
      key: key.to_string(),
      value: value.to_string(),
    })
  }
}

/// Fully resolved configuration: a policy plus raw text per list.
#[derive(Debug)]
pub struct Config {
  pub policy: Arc<dyn ParamsPolicy>,
  /// `list -> key -> text`, command line over environment over file.
  pub lists: BTreeMap<String, BTreeMap<String, String>>,
  /// `list -> key -> specs`, file specs first, command-line specs last.
  pub overrides: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl TryFrom<SourceArgs> for Config {
  type Error = ConfigError;

  fn try_from(
    SourceArgs {
      config,
      policy,
      sets,
      overrides: cli_overrides,
    }: SourceArgs,
  ) -> Result<Self, Self::Error> {
    let policy = builtin_policy(&policy)?;
    let sources = load_sources(config.as_deref())?;

    let policy_ref: &dyn ParamsPolicy = &*policy;

    let mut lists: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for (name, kv) in sources.lists {
      let entry = lists.entry(name).or_default();
      for (key, value) in kv {
        entry.insert(resolve_key(policy_ref, &key)?, value.to_text());
      }
    }
    for assignment in sets {
      let Assignment { list, key, value } = assignment.parse::<Assignment>()?;
      let key = resolve_key(policy_ref, &key)?;
      lists.entry(list).or_default().insert(key, value);
    }

    let mut overrides: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
    for (name, kv) in sources.overrides {
      let entry = overrides.entry(name).or_default();
      for (key, value) in kv {
        let key = resolve_key(policy_ref, &key)?;
        entry.entry(key).or_default().extend(value.to_specs());
      }
    }
    for assignment in cli_overrides {
      let Assignment { list, key, value } = assignment.parse::<Assignment>()?;
      let key = resolve_key(policy_ref, &key)?;
      overrides
        .entry(list)
        .or_default()
        .entry(key)
        .or_default()
        .push(value);
    }

    Ok(Config {
      policy,
      lists,
      overrides,
    })
  }
}

impl Config {
  /// Builds the dictionary and applies the policy's defaults.
  pub fn into_dictionary(self) -> Result<ParameterDictionary, BenchParamsError> {
    let mut dictionary = ParameterDictionary::new(self.policy);
    for (name, kv) in &self.lists {
      dictionary.add_map(name, kv)?;
    }
    for (name, kv) in &self.overrides {
      for (key, specs) in kv {
        dictionary.add_override(name, specs.iter().map(|spec| (key, spec)))?;
      }
    }
    dictionary.set_defaults()?;
    tracing::info!(lists = dictionary.len(), "Parameter dictionary resolved");
    Ok(dictionary)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(sets: &[&str], overrides: &[&str]) -> SourceArgs {
    SourceArgs {
      config: None,
      policy: "example".to_string(),
      sets: sets.iter().map(ToString::to_string).collect(),
      overrides: overrides.iter().map(ToString::to_string).collect(),
    }
  }

  #[test]
  fn parses_assignments() {
    let a: Assignment = "foo.integer=7".parse().unwrap();
    assert_eq!(a.list, "foo");
    assert_eq!(a.key, "integer");
    assert_eq!(a.value, "7");
    let a: Assignment = "foo.ivec=1,2=3".parse().unwrap();
    assert_eq!(a.value, "1,2=3");
    assert!("foo=7".parse::<Assignment>().is_err());
    assert!(".x=7".parse::<Assignment>().is_err());
  }

  #[test]
  fn rejects_unknown_policy() {
    let mut a = args(&[], &[]);
    a.policy = "nope".to_string();
    assert!(matches!(
      Config::try_from(a),
      Err(ConfigError::UnknownPolicy { .. })
    ));
  }

  #[test]
  fn command_line_values_reach_the_dictionary() {
    let config = Config::try_from(args(
      &["foo.integer=7", "foo.family=mammalia"],
      &["foo.integer=99@lev2-4", "foo.integer=11@lev3"],
    ))
    .unwrap();
    let dict = config.into_dictionary().unwrap();
    assert_eq!(dict.get("foo").unwrap().get_int("integer").unwrap(), 7);
    assert_eq!(dict.get_on_layer("foo", 2).unwrap().get_int("integer").unwrap(), 99);
    assert_eq!(dict.get_on_layer("foo", 3).unwrap().get_int("integer").unwrap(), 11);
  }

  #[test]
  fn raw_values_render_as_text() {
    let list = RawValue::List(vec![RawScalar::Int(1), RawScalar::Float(2.5)]);
    assert_eq!(list.to_text(), "1,2.5");
    assert_eq!(RawValue::Scalar(RawScalar::Bool(true)).to_text(), "true");
    assert_eq!(RawValue::Scalar(RawScalar::Float(1.0)).to_text(), "1.0");
  }

  #[test]
  fn toml_floats_keep_their_fraction() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("params.toml");
    std::fs::write(&path, "[lists.foo]\nfamily = \"mammalia\"\nstring = 1.0\n").unwrap();
    let sources = load_sources(Some(&path)).unwrap();
    assert_eq!(sources.lists["foo"]["string"].to_text(), "1.0");
  }

  #[test]
  fn environment_keys_keep_their_case() {
    assert_eq!(
      lowercase_path_head("LISTS.FOO.integerX"),
      "lists.foo.integerX"
    );
    assert_eq!(lowercase_path_head("LISTS"), "lists");

    let policy = ExamplePolicy::new();
    assert_eq!(resolve_key(&policy, "integerX").unwrap(), "integerX");
    assert_eq!(resolve_key(&policy, "integerx").unwrap(), "integerx");
    assert_eq!(resolve_key(&policy, "FAMILY").unwrap(), "family");
    assert_eq!(resolve_key(&policy, "nope").unwrap(), "nope");
    assert!(matches!(
      resolve_key(&policy, "INTEGERX"),
      Err(ConfigError::AmbiguousKey { .. })
    ));
  }
}
