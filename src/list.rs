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
use crate::error::ParamsError;
use crate::error::Result;
use crate::schema::ParamTraits;
use crate::schema::ParamsPolicy;
use crate::schema::PrintOptions;
use crate::schema::print_header;
use crate::schema::print_line;
use crate::value::FromValue;
use crate::value::Value;
use crate::value::ValueType;
use serde::Serialize;
use serde::Serializer;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::io::Write;
use std::sync::Arc;

/// Custom rendering of a value in printed tables.
pub type PrintConverter = Arc<dyn Fn(&Value, &PrintOptions) -> String>;

/// A set of named values checked against a policy's schema.
#[derive(Clone)]
pub struct ParameterList {
  policy: Arc<dyn ParamsPolicy>,
  values: BTreeMap<String, Value>,
  omit_value_checks: bool,
  print_converters: BTreeMap<String, PrintConverter>,
}

impl fmt::Debug for ParameterList {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ParameterList")
      .field("values", &self.values)
      .field("omit_value_checks", &self.omit_value_checks)
      .field(
        "print_converters",
        &self.print_converters.keys().collect::<Vec<_>>(),
      )
      .finish()
  }
}

impl ParameterList {
  pub fn new(policy: Arc<dyn ParamsPolicy>) -> Self {
    Self {
      policy,
      values: BTreeMap::new(),
      omit_value_checks: false,
      print_converters: BTreeMap::new(),
    }
  }

  /// A list holding a single key/value pair.
  pub fn with_pair(
    policy: Arc<dyn ParamsPolicy>,
    key: &str,
    value: impl Into<Value>,
  ) -> Result<Self> {
    let mut list = Self::new(policy);
    list.add_value(key, value)?;
    Ok(list)
  }

  /// A list that stores raw text without schema lookups or conversions.
  pub fn unchecked(policy: Arc<dyn ParamsPolicy>) -> Self {
    let mut list = Self::new(policy);
    list.omit_value_checks = true;
    list
  }

  pub fn omits_value_checks(&self) -> bool {
    self.omit_value_checks
  }

  pub fn set_omit_value_checks(&mut self, omit: bool) {
    self.omit_value_checks = omit;
  }

  pub fn policy(&self) -> &Arc<dyn ParamsPolicy> {
    &self.policy
  }

  pub fn traits(&self, key: &str) -> Result<&ParamTraits> {
    self
      .policy
      .expected_params()
      .get(key)
      .ok_or_else(|| ParamsError::UnknownKey {
        key: key.to_string(),
      })
  }

  /// Brings `value` to the schema type of `key`, parsing text and widening
  /// numbers where needed.
  fn coerce(&self, key: &str, value: Value) -> Result<Value> {
    if self.omit_value_checks {
      return Ok(value);
    }
    let ty = self.traits(key)?.ty;
    let parse_err = |source| ParamsError::Parse {
      key: key.to_string(),
      source,
    };
    match value {
      Value::Null => Err(ParamsError::NotSet {
        key: key.to_string(),
      }),
      Value::Str(text) if ty != ValueType::Str => Value::parse(ty, &text).map_err(parse_err),
      Value::StrVec(parts) if ty != ValueType::StrVec => {
        Value::parse_list(ty, &parts).map_err(parse_err)
      }
      other => {
        let found = other.value_type().unwrap_or(ty);
        other.widen(ty).ok_or_else(|| ParamsError::TypeMismatch {
          key: key.to_string(),
          expected: ty,
          found,
        })
      }
    }
  }

  /// Stores `value` under `key`, replacing whatever was there.
  pub fn add_value(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
    let value = self.coerce(key, value.into())?;
    self.values.insert(key.to_string(), value);
    Ok(())
  }

  /// Stores `value` only when `key` has no value yet.
  pub fn set_value_if_missing(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
    if self.is_value_set(key) {
      return Ok(());
    }
    self.add_value(key, value)
  }

  /// Parses `text` as the schema type of `key` and stores it.
  ///
  /// Vector-typed keys accept comma-joined text.
  pub fn parse_and_set_value(&mut self, key: &str, text: &str) -> Result<()> {
    let value = if self.omit_value_checks {
      Value::Str(text.to_string())
    } else {
      let ty = self.traits(key)?.ty;
      Value::parse(ty, text).map_err(|source| ParamsError::Parse {
        key: key.to_string(),
        source,
      })?
    };
    self.values.insert(key.to_string(), value);
    Ok(())
  }

  /// Parses pre-split elements as the schema type of `key` and stores them.
  pub fn parse_and_set_values<S: AsRef<str>>(&mut self, key: &str, parts: &[S]) -> Result<()> {
    let value = if self.omit_value_checks {
      Value::StrVec(parts.iter().map(|p| p.as_ref().to_string()).collect())
    } else {
      let ty = self.traits(key)?.ty;
      Value::parse_list(ty, parts).map_err(|source| ParamsError::Parse {
        key: key.to_string(),
        source,
      })?
    };
    self.values.insert(key.to_string(), value);
    Ok(())
  }

  /// Replaces the value of `key`. Unless `forced`, the key must be declared
  /// changeable.
  pub fn change_value(&mut self, key: &str, value: impl Into<Value>, forced: bool) -> Result<()> {
    if !forced && !self.omit_value_checks && !self.traits(key)?.changeable {
      return Err(ParamsError::NotChangeable {
        key: key.to_string(),
      });
    }
    self.add_value(key, value)
  }

  /// Applies one override value. Constraints are not enforced here, only
  /// reported.
  fn override_param(&mut self, key: &str, value: &Value) -> Result<()> {
    if !self.omit_value_checks && !self.is_value_allowed(key, value.clone()) {
      tracing::warn!(key, value = %value, "Override value violates schema constraints");
    }
    self.change_value(key, value.clone(), true)
  }

  /// Patches this list with every value stored in `other`.
  pub fn override_params(&mut self, other: &ParameterList) -> Result<()> {
    for (key, value) in &other.values {
      self.override_param(key, value)?;
    }
    Ok(())
  }

  fn stored(&self, key: &str) -> Result<&Value> {
    self
      .values
      .get(key)
      .filter(|v| !v.is_null())
      .ok_or_else(|| ParamsError::NotSet {
        key: key.to_string(),
      })
  }

  /// Reads the value of `key` as `T`.
  pub fn get_value<T: FromValue>(&self, key: &str) -> Result<T> {
    let value = self.stored(key)?;
    value.get::<T>().ok_or_else(|| ParamsError::TypeMismatch {
      key: key.to_string(),
      expected: T::TYPE,
      found: value.value_type().unwrap_or(T::TYPE),
    })
  }

  pub fn get_int(&self, key: &str) -> Result<u32> {
    self.get_value(key)
  }

  pub fn get_float(&self, key: &str) -> Result<f64> {
    self.get_value(key)
  }

  pub fn get_bool(&self, key: &str) -> Result<bool> {
    self.get_value(key)
  }

  pub fn get_string(&self, key: &str) -> Result<String> {
    self.get_value(key)
  }

  pub fn get_vint(&self, key: &str) -> Result<Vec<u32>> {
    self.get_value(key)
  }

  pub fn get_vfloat(&self, key: &str) -> Result<Vec<f64>> {
    self.get_value(key)
  }

  pub fn get_vbool(&self, key: &str) -> Result<Vec<bool>> {
    self.get_value(key)
  }

  pub fn get_vstring(&self, key: &str) -> Result<Vec<String>> {
    self.get_value(key)
  }

  pub fn get_value_as_string(&self, key: &str) -> Result<String> {
    self.stored(key).map(Value::as_string)
  }

  pub fn is_value_set(&self, key: &str) -> bool {
    self.values.get(key).is_some_and(|v| !v.is_null())
  }

  /// Whether `key` holds `candidate` once it is brought to the schema type.
  pub fn value_equals(&self, key: &str, candidate: impl Into<Value>) -> bool {
    match (self.stored(key), self.coerce(key, candidate.into())) {
      (Ok(stored), Ok(candidate)) => *stored == candidate,
      _ => false,
    }
  }

  pub fn get_raw_list(&self) -> &BTreeMap<String, Value> {
    &self.values
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  fn bound<T: FromValue>(&self, key: &str, ty: ValueType, text: &str) -> Result<T> {
    let parsed = Value::parse(ty, text).map_err(|source| ParamsError::Parse {
      key: key.to_string(),
      source,
    })?;
    parsed.get::<T>().ok_or_else(|| ParamsError::TypeMismatch {
      key: key.to_string(),
      expected: T::TYPE,
      found: ty,
    })
  }

  /// The declared bounds of `key`, or `None` when it has none.
  pub fn get_minmax<T: FromValue>(&self, key: &str) -> Result<Option<(T, T)>> {
    let traits = self.traits(key)?;
    let Some((min, max)) = &traits.minmax else {
      return Ok(None);
    };
    let elem = traits.ty.element();
    let max = if max.is_empty() {
      Value::get_max_possible_value(elem)
    } else {
      max.clone()
    };
    Ok(Some((
      self.bound(key, elem, min)?,
      self.bound(key, elem, &max)?,
    )))
  }

  /// The declared set of allowed values of `key`, or `None` when any value is
  /// allowed.
  pub fn get_allowed_values<T: FromValue>(&self, key: &str) -> Result<Option<Vec<T>>> {
    let traits = self.traits(key)?;
    if traits.allowed_values.is_empty() {
      return Ok(None);
    }
    let elem = traits.ty.element();
    traits
      .allowed_values
      .iter()
      .map(|text| self.bound(key, elem, text))
      .collect::<Result<Vec<T>>>()
      .map(Some)
  }

  /// Checks a candidate value against the min/max and allowed-values
  /// constraints of `key`. Vectors are checked element by element.
  pub fn is_value_allowed(&self, key: &str, value: impl Into<Value>) -> bool {
    let Ok(traits) = self.traits(key) else {
      return false;
    };
    let Ok(candidate) = self.coerce(key, value.into()) else {
      return false;
    };
    let elem = traits.ty.element();
    let parse = |text: &str| Value::parse(elem, text).ok();

    let bounds = traits.minmax.as_ref().filter(|_| elem.is_numeric()).map(|(min, max)| {
      let max = if max.is_empty() {
        Value::get_max_possible_value(elem)
      } else {
        max.clone()
      };
      (parse(min.as_str()), parse(max.as_str()))
    });
    let allowed: Vec<Value> = traits
      .allowed_values
      .iter()
      .filter_map(|text| parse(text.as_str()))
      .collect();

    candidate.scalars().iter().all(|x| {
      let in_range = match &bounds {
        Some((Some(min), Some(max))) => {
          x.numeric_cmp(min).is_some_and(|o| o.is_ge()) && x.numeric_cmp(max).is_some_and(|o| o.is_le())
        }
        Some(_) => false,
        None => true,
      };
      in_range && (traits.allowed_values.is_empty() || allowed.contains(x))
    })
  }

  /// The family this list belongs to, if its family key is set.
  pub fn family(&self) -> Option<String> {
    self
      .get_value_as_string(self.policy.family_key())
      .ok()
  }

  /// Fills family-dependent defaults for this list. Explicit values are kept.
  pub fn set_default(&mut self, list_name: &str) -> Result<()> {
    let family = self.family().ok_or_else(|| ParamsError::MissingFamily {
      list: list_name.to_string(),
      family_key: self.policy.family_key().to_string(),
    })?;
    tracing::debug!(list = %list_name, %family, "Applying family defaults");
    let policy = Arc::clone(&self.policy);
    policy.set_family_defaults(self, &family, list_name)
  }

  /// Checks every stored value against the schema: declared key, declared
  /// type, and applicability to the list's family.
  pub fn validate(&self, list_name: &str) -> Result<()> {
    if self.omit_value_checks {
      return Ok(());
    }
    let family = self.family().unwrap_or_default();
    for (key, value) in &self.values {
      let traits = self.traits(key)?;
      let found = self.stored(key)?.value_type().unwrap_or(traits.ty);
      if found != traits.ty {
        return Err(ParamsError::TypeMismatch {
          key: key.clone(),
          expected: traits.ty,
          found,
        });
      }
      if !traits.matches_family(&family) {
        return Err(ParamsError::NotApplicable {
          list: list_name.to_string(),
          key: key.clone(),
          family,
        });
      }
      if !self.is_value_allowed(key, value.clone()) {
        tracing::warn!(list = %list_name, key = %key, value = %value, "Value violates schema constraints");
      }
    }
    for (key, traits) in self.policy.expected_params().iter() {
      if traits.matches_family(&family) && !self.is_value_set(key) {
        tracing::trace!(list = %list_name, key = %key, "Optional parameter left unset");
      }
    }
    Ok(())
  }

  /// Drops every stored value. Returns whether anything was removed.
  pub fn erase(&mut self) -> bool {
    let had_values = !self.values.is_empty();
    self.values.clear();
    had_values
  }

  /// Registers a custom table rendering for `key`.
  pub fn add_print_converter<F>(&mut self, key: &str, converter: F)
  where
    F: Fn(&Value, &PrintOptions) -> String + 'static,
  {
    self
      .print_converters
      .insert(key.to_string(), Arc::new(converter));
  }

  fn render(&self, key: &str, value: &Value, options: &PrintOptions) -> String {
    match self.print_converters.get(key) {
      Some(converter) => converter(value, options),
      None => value.as_string(),
    }
  }

  /// Writes one table row per stored key, in schema order.
  pub fn print_to(
    &self,
    out: &mut dyn Write,
    header: &str,
    options: &PrintOptions,
  ) -> io::Result<()> {
    if !header.is_empty() {
      print_header(out, header, 4)?;
    }
    let schema = self.policy.expected_params();
    for (key, _) in schema.iter() {
      if let Some(value) = self.values.get(key).filter(|v| !v.is_null()) {
        print_line(out, key, &self.render(key, value, options))?;
      }
    }
    for (key, value) in &self.values {
      if !schema.contains(key) {
        print_line(out, key, &self.render(key, value, options))?;
      }
    }
    Ok(())
  }

  pub fn print(&self, header: &str) -> io::Result<()> {
    self.print_to(&mut io::stdout().lock(), header, &PrintOptions::default())
  }
}

impl Serialize for ParameterList {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(self.values.iter().filter(|(_, v)| !v.is_null()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::ExpectedParams;

  #[derive(Debug)]
  struct TinyPolicy {
    schema: ExpectedParams,
  }

  impl ParamsPolicy for TinyPolicy {
    fn nlayers(&self) -> usize {
      4
    }

    fn expected_params(&self) -> &ExpectedParams {
      &self.schema
    }

    fn set_family_defaults(&self, list: &mut ParameterList, family: &str, _: &str) -> Result<()> {
      if family == "small" {
        list.set_value_if_missing("size", 8u32)?;
      }
      Ok(())
    }
  }

  fn policy() -> Arc<dyn ParamsPolicy> {
    Arc::new(TinyPolicy {
      schema: ExpectedParams::new()
        .with("family", ParamTraits::new(ValueType::Str))
        .with("size", ParamTraits::new(ValueType::Int).changeable().minmax("1", "16"))
        .with("ratio", ParamTraits::new(ValueType::Float).changeable())
        .with("mode", ParamTraits::new(ValueType::Str).allowed(["fast", "slow"]))
        .with("sizes", ParamTraits::new(ValueType::IntVec).minmax("2", "")),
    })
  }

  #[test]
  fn set_if_missing_keeps_existing() {
    let mut list = ParameterList::new(policy());
    list.add_value("size", 3u32).unwrap();
    list.set_value_if_missing("size", 9u32).unwrap();
    assert_eq!(list.get_int("size").unwrap(), 3);
    list.add_value("size", 9u32).unwrap();
    assert_eq!(list.get_int("size").unwrap(), 9);
  }

  #[test]
  fn strings_are_parsed_into_the_schema_type() {
    let list = ParameterList::with_pair(policy(), "sizes", "1,4").unwrap();
    assert_eq!(list.get_vint("sizes").unwrap(), vec![1, 4]);
  }

  #[test]
  fn ints_widen_to_float_keys() {
    let mut list = ParameterList::new(policy());
    list.add_value("ratio", 2u32).unwrap();
    assert_eq!(list.get_float("ratio").unwrap(), 2.0);
    assert!(matches!(
      list.add_value("size", 2.5),
      Err(ParamsError::TypeMismatch { .. })
    ));
  }

  #[test]
  fn unknown_keys_are_rejected() {
    let mut list = ParameterList::new(policy());
    assert!(matches!(
      list.parse_and_set_value("nope", "1"),
      Err(ParamsError::UnknownKey { .. })
    ));
  }

  #[test]
  fn unchecked_lists_keep_raw_text() {
    let mut list = ParameterList::unchecked(policy());
    list.parse_and_set_value("nope", "1@lev2").unwrap();
    assert_eq!(list.get_value_as_string("nope").unwrap(), "1@lev2");
  }

  #[test]
  fn change_value_respects_changeable() {
    let mut list = ParameterList::new(policy());
    assert!(matches!(
      list.change_value("mode", "fast", false),
      Err(ParamsError::NotChangeable { .. })
    ));
    list.change_value("mode", "fast", true).unwrap();
    list.change_value("size", 4u32, false).unwrap();
    assert_eq!(list.get_string("mode").unwrap(), "fast");
  }

  #[test]
  fn typed_get_reports_mismatch() {
    let list = ParameterList::with_pair(policy(), "mode", "fast").unwrap();
    assert!(matches!(
      list.get_value::<u32>("mode"),
      Err(ParamsError::TypeMismatch { .. })
    ));
    assert!(matches!(
      list.get_value::<u32>("size"),
      Err(ParamsError::NotSet { .. })
    ));
  }

  #[test]
  fn constraints_are_checked() {
    let list = ParameterList::new(policy());
    assert!(list.is_value_allowed("size", 16u32));
    assert!(!list.is_value_allowed("size", 17u32));
    assert!(!list.is_value_allowed("size", 0u32));
    assert!(list.is_value_allowed("mode", "slow"));
    assert!(!list.is_value_allowed("mode", "medium"));
    assert!(list.is_value_allowed("sizes", vec![2u32, 400]));
    assert!(!list.is_value_allowed("sizes", vec![2u32, 1]));
    assert!(!list.is_value_allowed("missing", 1u32));
    assert!(list.is_value_allowed("ratio", 1e9));
  }

  #[test]
  fn surfaces_constraint_data() {
    let list = ParameterList::new(policy());
    assert_eq!(list.get_minmax::<u32>("size").unwrap(), Some((1, 16)));
    assert_eq!(list.get_minmax::<u32>("sizes").unwrap(), Some((2, u32::MAX)));
    assert_eq!(list.get_minmax::<u32>("mode").unwrap(), None);
    assert_eq!(
      list.get_allowed_values::<String>("mode").unwrap(),
      Some(vec!["fast".to_string(), "slow".to_string()])
    );
    assert_eq!(list.get_allowed_values::<u32>("size").unwrap(), None);
  }

  #[test]
  fn override_params_is_idempotent() {
    let mut base = ParameterList::with_pair(policy(), "family", "small").unwrap();
    base.add_value("ratio", 0.5).unwrap();
    let mut patch = ParameterList::new(policy());
    patch.add_value("size", 12u32).unwrap();

    base.override_params(&patch).unwrap();
    let once = base.get_raw_list().clone();
    base.override_params(&patch).unwrap();
    assert_eq!(base.get_raw_list(), &once);
    assert_eq!(base.get_float("ratio").unwrap(), 0.5);
    assert_eq!(base.get_int("size").unwrap(), 12);
  }

  #[test]
  fn defaults_need_a_family() {
    let mut list = ParameterList::new(policy());
    assert!(matches!(
      list.set_default("anon"),
      Err(ParamsError::MissingFamily { .. })
    ));
    list.add_value("family", "small").unwrap();
    list.set_default("anon").unwrap();
    assert_eq!(list.get_int("size").unwrap(), 8);
  }

  #[test]
  fn erase_clears_values() {
    let mut list = ParameterList::with_pair(policy(), "size", 2u32).unwrap();
    assert!(list.erase());
    assert!(!list.is_value_set("size"));
    assert!(!list.erase());
  }

  #[test]
  fn print_uses_converters() {
    let mut list = ParameterList::with_pair(policy(), "size", 2u32).unwrap();
    list.add_value("family", "small").unwrap();
    list.add_print_converter("size", |v, opts| {
      if opts.debug_tables {
        "<debug>".to_string()
      } else {
        format!("[{v}]")
      }
    });
    let mut out = Vec::new();
    list.print_to(&mut out, "", &PrintOptions::default()).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("[2]"));
    assert!(text.find("family").unwrap() < text.find("size").unwrap());

    let mut out = Vec::new();
    let opts = PrintOptions { debug_tables: true };
    list.print_to(&mut out, "", &opts).unwrap();
    assert!(String::from_utf8(out).unwrap().contains("<debug>"));
  }
}
