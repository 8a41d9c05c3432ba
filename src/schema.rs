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

//! Parameter schemas and the policy trait that owns them.
//!
//! A [`ParamsPolicy`] is the strategy object behind every list and
//! dictionary: it declares the expected keys with their [`ParamTraits`],
//! names the family key and layer prefix, and fills in family-dependent
//! defaults.

use crate::dictionary::ParameterDictionary;
use crate::error::Result;
use crate::list::ParameterList;
use crate::value::ValueType;
use std::fmt;
use std::io;
use std::io::Write;

/// Width of the key column in printed tables.
pub const KEY_COLUMN_WIDTH: usize = 24;
const DELIMITER_WIDTH: usize = 72;

/// Schema entry for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTraits {
  pub ty: ValueType,
  pub changeable: bool,
  /// Empty means every family. `!name` entries exclude a family.
  pub matching_families: Vec<String>,
  /// Lower and upper bound as text. An empty upper bound is open.
  pub minmax: Option<(String, String)>,
  pub allowed_values: Vec<String>,
}

impl ParamTraits {
  /// A non-changeable entry applying to all families with no constraints.
  pub fn new(ty: ValueType) -> Self {
    Self {
      ty,
      changeable: false,
      matching_families: Vec::new(),
      minmax: None,
      allowed_values: Vec::new(),
    }
  }

  pub fn changeable(mut self) -> Self {
    self.changeable = true;
    self
  }

  pub fn families<I, S>(mut self, families: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.matching_families = families.into_iter().map(Into::into).collect();
    self
  }

  pub fn minmax(mut self, min: impl Into<String>, max: impl Into<String>) -> Self {
    self.minmax = Some((min.into(), max.into()));
    self
  }

  pub fn allowed<I, S>(mut self, values: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.allowed_values = values.into_iter().map(Into::into).collect();
    self
  }

  /// Whether this key applies to lists of `family`.
  pub fn matches_family(&self, family: &str) -> bool {
    if self.matching_families.is_empty() {
      return true;
    }
    let mut any_positive = false;
    for entry in &self.matching_families {
      match entry.strip_prefix('!') {
        Some(excluded) if excluded == family => return false,
        Some(_) => {}
        None if entry == family => return true,
        None => any_positive = true,
      }
    }
    !any_positive
  }
}

/// Ordered schema of one policy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpectedParams {
  entries: Vec<(String, ParamTraits)>,
}

impl ExpectedParams {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, key: impl Into<String>, traits: ParamTraits) -> Self {
    self.entries.push((key.into(), traits));
    self
  }

  pub fn get(&self, key: &str) -> Option<&ParamTraits> {
    self
      .entries
      .iter()
      .find_map(|(k, traits)| (k == key).then_some(traits))
  }

  pub fn contains(&self, key: &str) -> bool {
    self.get(key).is_some()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamTraits)> {
    self.entries.iter().map(|(k, t)| (k.as_str(), t))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl<K: Into<String>> FromIterator<(K, ParamTraits)> for ExpectedParams {
  fn from_iter<I: IntoIterator<Item = (K, ParamTraits)>>(iter: I) -> Self {
    Self {
      entries: iter.into_iter().map(|(k, t)| (k.into(), t)).collect(),
    }
  }
}

/// Presentation switches handed to table printing and print converters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintOptions {
  /// Lets print converters substitute diagnostic renderings.
  pub debug_tables: bool,
}

/// The policy a dictionary and its lists are validated against.
pub trait ParamsPolicy: fmt::Debug {
  /// Key whose value selects the family of a list.
  fn family_key(&self) -> &str {
    "family"
  }

  /// Prefix in front of the layer number in override specs.
  fn layer_prefix(&self) -> &str {
    "lev"
  }

  fn nlayers(&self) -> usize;

  fn expected_params(&self) -> &ExpectedParams;

  /// Fills family-dependent defaults, normally through
  /// [`ParameterList::set_value_if_missing`].
  fn set_family_defaults(&self, list: &mut ParameterList, family: &str, list_name: &str)
  -> Result<()>;

  /// Registers lists every dictionary of this policy must carry.
  fn set_dictionary_defaults(&self, _dictionary: &mut ParameterDictionary) -> Result<()> {
    Ok(())
  }

  fn table_title(&self) -> &str {
    "Parameters"
  }

  /// Prints every non-override list of `dictionary`.
  fn print_table(
    &self,
    dictionary: &ParameterDictionary,
    out: &mut dyn Write,
    options: &PrintOptions,
  ) -> io::Result<()> {
    print_line_delimiter(out)?;
    print_header(out, self.table_title(), 8)?;
    for name in dictionary.names() {
      if !ParameterDictionary::is_override_name(name) {
        dictionary.print_list_to(out, name, name, options)?;
      }
    }
    Ok(())
  }
}

pub fn print_line_delimiter(out: &mut dyn Write) -> io::Result<()> {
  writeln!(out, "{}", "-".repeat(DELIMITER_WIDTH))
}

pub fn print_header(out: &mut dyn Write, title: &str, offset: usize) -> io::Result<()> {
  writeln!(out, "{:offset$}{}", "", title)?;
  print_line_delimiter(out)
}

pub fn print_line(out: &mut dyn Write, key: &str, value: &str) -> io::Result<()> {
  writeln!(out, "  {key:<KEY_COLUMN_WIDTH$}{value}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_families_match_everything() {
    assert!(ParamTraits::new(ValueType::Int).matches_family("anything"));
  }

  #[test]
  fn positive_families_are_exclusive() {
    let t = ParamTraits::new(ValueType::Int).families(["xxx", "zzz"]);
    assert!(t.matches_family("xxx"));
    assert!(t.matches_family("zzz"));
    assert!(!t.matches_family("yyy"));
  }

  #[test]
  fn negated_families_exclude_only_themselves() {
    let t = ParamTraits::new(ValueType::Int).families(["!yyy"]);
    assert!(t.matches_family("xxx"));
    assert!(!t.matches_family("yyy"));
  }

  #[test]
  fn schema_keeps_declaration_order() {
    let schema = ExpectedParams::new()
      .with("zeta", ParamTraits::new(ValueType::Str))
      .with("alpha", ParamTraits::new(ValueType::Int).changeable());
    let keys: Vec<_> = schema.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, ["zeta", "alpha"]);
    assert!(schema.get("alpha").unwrap().changeable);
    assert!(!schema.contains("beta"));
  }
}
