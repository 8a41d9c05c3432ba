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
use crate::list::ParameterList;
use crate::overrides::OverridesHolder;
use crate::overrides::split_specs;
use crate::schema::ParamsPolicy;
use crate::schema::PrintOptions;
use crate::value::Value;
use serde::Serialize;
use serde::Serializer;
use std::collections::BTreeMap;
use std::io;
use std::io::Write;
use std::sync::Arc;

/// Suffix naming the companion override list of a base list.
pub const OVERRIDE_SUFFIX: &str = "_override";

/// Named parameter lists sharing one policy.
///
/// Lists are kept sorted by name, which is the order of every iteration
/// and of [`ParameterDictionary::name_at`].
#[derive(Debug, Clone)]
pub struct ParameterDictionary {
  policy: Arc<dyn ParamsPolicy>,
  lists: BTreeMap<String, ParameterList>,
}

impl ParameterDictionary {
  pub fn new(policy: Arc<dyn ParamsPolicy>) -> Self {
    Self {
      policy,
      lists: BTreeMap::new(),
    }
  }

  pub fn policy(&self) -> &Arc<dyn ParamsPolicy> {
    &self.policy
  }

  /// An empty list bound to this dictionary's policy.
  pub fn new_list(&self) -> ParameterList {
    ParameterList::new(Arc::clone(&self.policy))
  }

  pub fn list_with_pair(&self, key: &str, value: impl Into<Value>) -> Result<ParameterList> {
    ParameterList::with_pair(Arc::clone(&self.policy), key, value)
  }

  pub fn override_name(name: &str) -> String {
    format!("{name}{OVERRIDE_SUFFIX}")
  }

  pub fn is_override_name(name: &str) -> bool {
    name.ends_with(OVERRIDE_SUFFIX)
  }

  /// Registers `list` under `name`. Adding to an existing name merges the
  /// new values into the registered list.
  pub fn add(&mut self, name: &str, list: ParameterList) -> Result<()> {
    match self.lists.get_mut(name) {
      Some(existing) => {
        for (key, value) in list.get_raw_list() {
          existing.add_value(key, value.clone())?;
        }
      }
      None => {
        self.lists.insert(name.to_string(), list);
      }
    }
    tracing::debug!(list = %name, "Registered parameter list");
    Ok(())
  }

  /// Builds a list from raw `key=value` text and registers it.
  pub fn add_map<I, K, V>(&mut self, name: &str, kvmap: I) -> Result<()>
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
  {
    let mut list = self.new_list();
    for (key, value) in kvmap {
      list.parse_and_set_value(key.as_ref(), value.as_ref())?;
    }
    self.add(name, list)
  }

  /// Registers raw layer-tagged specs in the `<name>_override` list.
  ///
  /// Specs are kept as text and only parsed when a layer is resolved.
  /// Repeated calls append to the specs already stored for a key.
  pub fn add_override<I, K, V>(&mut self, name: &str, kvmap: I) -> Result<()>
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
  {
    let list = self.override_list_mut(name);
    for (key, spec) in kvmap {
      push_override_spec(list, key.as_ref(), spec.as_ref())?;
    }
    Ok(())
  }

  fn override_list_mut(&mut self, name: &str) -> &mut ParameterList {
    let policy = Arc::clone(&self.policy);
    self
      .lists
      .entry(Self::override_name(name))
      .or_insert_with(|| ParameterList::unchecked(policy))
  }

  pub fn find(&self, name: &str) -> bool {
    self.lists.contains_key(name)
  }

  fn matches<V: Into<Value> + Clone>(list: &ParameterList, conditions: &[(&str, V)]) -> bool {
    conditions
      .iter()
      .all(|(key, expected)| list.value_equals(key, expected.clone()))
  }

  /// Name of the first list, by name order, holding every `(key, value)`
  /// condition.
  pub fn find_list_name_if<V: Into<Value> + Clone>(&self, conditions: &[(&str, V)]) -> Option<&str> {
    self
      .lists
      .iter()
      .find(|(_, list)| Self::matches(list, conditions))
      .map(|(name, _)| name.as_str())
  }

  pub fn find_if<V: Into<Value> + Clone>(&self, conditions: &[(&str, V)]) -> bool {
    self.find_list_name_if(conditions).is_some()
  }

  pub fn get_if<V: Into<Value> + Clone>(&self, conditions: &[(&str, V)]) -> Option<&ParameterList> {
    self
      .lists
      .values()
      .find(|list| Self::matches(list, conditions))
  }

  pub fn get_if_mut<V: Into<Value> + Clone>(
    &mut self,
    conditions: &[(&str, V)],
  ) -> Option<&mut ParameterList> {
    self
      .lists
      .values_mut()
      .find(|list| Self::matches(list, conditions))
  }

  pub fn get(&self, name: &str) -> Result<&ParameterList> {
    self.lists.get(name).ok_or_else(|| ParamsError::ListNotFound {
      name: name.to_string(),
    })
  }

  pub fn get_mut(&mut self, name: &str) -> Result<&mut ParameterList> {
    self
      .lists
      .get_mut(name)
      .ok_or_else(|| ParamsError::ListNotFound {
        name: name.to_string(),
      })
  }

  /// Parsed overrides of `name`, or `None` when it has no override list.
  pub fn overrides_for(&self, name: &str) -> Result<Option<OverridesHolder>> {
    let Some(raw) = self.lists.get(&Self::override_name(name)) else {
      return Ok(None);
    };
    let mut holder = OverridesHolder::new(self.policy.nlayers());
    holder.fill_in(raw)?;
    Ok(Some(holder))
  }

  /// A copy of list `name` with its overrides for `layer` applied.
  pub fn get_on_layer(&self, name: &str, layer: usize) -> Result<ParameterList> {
    let mut list = self.get(name)?.clone();
    if let Some(holder) = self.overrides_for(name)? {
      if holder.find(layer) {
        list.override_params(holder.get(layer)?)?;
        tracing::trace!(list = %name, layer, "Applied layer overrides");
      }
    }
    Ok(list)
  }

  pub fn change_value(&mut self, list_name: &str, key: &str, value: impl Into<Value>) -> Result<()> {
    self.get_mut(list_name)?.change_value(key, value, false)
  }

  pub fn forced_change_value(
    &mut self,
    list_name: &str,
    key: &str,
    value: impl Into<Value>,
  ) -> Result<()> {
    self.get_mut(list_name)?.change_value(key, value, true)
  }

  /// Records an override of `key` on a single layer of `list_name`. The
  /// override list is created on first use.
  pub fn change_value_onlayer(
    &mut self,
    list_name: &str,
    key: &str,
    value: impl Into<Value>,
    layer: usize,
  ) -> Result<()> {
    self.internal_change_value_onlayer(list_name, key, value.into(), layer, false)
  }

  pub fn forced_change_value_onlayer(
    &mut self,
    list_name: &str,
    key: &str,
    value: impl Into<Value>,
    layer: usize,
  ) -> Result<()> {
    self.internal_change_value_onlayer(list_name, key, value.into(), layer, true)
  }

  fn internal_change_value_onlayer(
    &mut self,
    list_name: &str,
    key: &str,
    value: Value,
    layer: usize,
    forced: bool,
  ) -> Result<()> {
    let base = self.get(list_name)?;
    if !forced && !base.traits(key)?.changeable {
      return Err(ParamsError::NotChangeable {
        key: key.to_string(),
      });
    }
    // Normalize through the schema so the stored text parses back.
    let normalized = self.list_with_pair(key, value)?;
    let text = normalized.get_value_as_string(key)?;
    let spec = format!("{text}@{}{layer}", self.policy.layer_prefix());
    if let Some(expected) = normalized.get_raw_list().get(key) {
      self.verify_layer_spec(key, &spec, expected, layer)?;
    }
    push_override_spec(self.override_list_mut(list_name), key, &spec)
  }

  /// Reads `spec` back the way layer resolution does. It must hold exactly
  /// `expected` on exactly `layer`.
  fn verify_layer_spec(&self, key: &str, spec: &str, expected: &Value, layer: usize) -> Result<()> {
    let bad = |reason: &str| ParamsError::BadOverrideSpec {
      key: key.to_string(),
      spec: spec.to_string(),
      reason: reason.to_string(),
    };
    let specs = split_specs(key, &Value::Str(spec.to_string()))?;
    let [(text, range)] = specs.as_slice() else {
      return Err(bad("value cannot be written as a single override spec"));
    };
    let holder = OverridesHolder::new(self.policy.nlayers());
    if holder.get_start_end_layer(key, range, self.policy.layer_prefix())? != (layer, layer) {
      return Err(bad("layer is out of range"));
    }
    let ty = self
      .policy
      .expected_params()
      .get(key)
      .ok_or_else(|| ParamsError::UnknownKey {
        key: key.to_string(),
      })?
      .ty;
    let parsed = Value::parse(ty, text).map_err(|source| ParamsError::Parse {
      key: key.to_string(),
      source,
    })?;
    if parsed != *expected {
      return Err(bad("value does not read back unchanged"));
    }
    Ok(())
  }

  /// Registers policy lists, fills family defaults and validates every
  /// base list. Override lists are parsed to surface malformed specs.
  pub fn set_defaults(&mut self) -> Result<()> {
    let policy = Arc::clone(&self.policy);
    policy.set_dictionary_defaults(self)?;
    for (name, list) in self.lists.iter_mut() {
      if Self::is_override_name(name) || list.omits_value_checks() {
        continue;
      }
      list.set_default(name)?;
      list.validate(name)?;
    }
    for (name, list) in &self.lists {
      if Self::is_override_name(name) {
        OverridesHolder::new(policy.nlayers()).fill_in(list)?;
      }
    }
    tracing::debug!(lists = self.lists.len(), "Dictionary defaults applied");
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.lists.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lists.is_empty()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.lists.keys().map(String::as_str)
  }

  /// The `index`-th list name in name order.
  pub fn name_at(&self, index: usize) -> Option<&str> {
    self.names().nth(index)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterList)> {
    self.lists.iter().map(|(name, list)| (name.as_str(), list))
  }

  pub fn print_to(&self, out: &mut dyn Write, options: &PrintOptions) -> io::Result<()> {
    self.policy.print_table(self, out, options)
  }

  pub fn print(&self) -> io::Result<()> {
    self.print_to(&mut io::stdout().lock(), &PrintOptions::default())
  }

  pub fn print_list_to(
    &self,
    out: &mut dyn Write,
    list_name: &str,
    header: &str,
    options: &PrintOptions,
  ) -> io::Result<()> {
    let list = self
      .get(list_name)
      .map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
    list.print_to(out, header, options)
  }

  pub fn print_list(&self, list_name: &str, header: &str) -> io::Result<()> {
    self.print_list_to(
      &mut io::stdout().lock(),
      list_name,
      header,
      &PrintOptions::default(),
    )
  }
}

impl Serialize for ParameterDictionary {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(&self.lists)
  }
}

/// Appends one spec to the specs stored for `key` in an override list.
fn push_override_spec(list: &mut ParameterList, key: &str, spec: &str) -> Result<()> {
  let mut specs = match list.get_raw_list().get(key) {
    Some(Value::StrVec(existing)) => existing.clone(),
    Some(other) if !other.is_null() => vec![other.as_string()],
    _ => Vec::new(),
  };
  specs.push(spec.to_string());
  list.parse_and_set_values(key, &specs)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::ExpectedParams;
  use crate::schema::ParamTraits;
  use crate::value::ValueType;

  #[derive(Debug)]
  struct PairPolicy {
    schema: ExpectedParams,
  }

  impl ParamsPolicy for PairPolicy {
    fn nlayers(&self) -> usize {
      8
    }

    fn expected_params(&self) -> &ExpectedParams {
      &self.schema
    }

    fn set_family_defaults(&self, list: &mut ParameterList, family: &str, _: &str) -> Result<()> {
      match family {
        "fast" => list.set_value_if_missing("iters", 10u32),
        _ => list.set_value_if_missing("iters", 1000u32),
      }
    }

    fn set_dictionary_defaults(&self, dictionary: &mut ParameterDictionary) -> Result<()> {
      if !dictionary.find("main") {
        let list = dictionary.list_with_pair("family", "slow")?;
        dictionary.add("main", list)?;
      }
      Ok(())
    }
  }

  fn dictionary() -> ParameterDictionary {
    ParameterDictionary::new(Arc::new(PairPolicy {
      schema: ExpectedParams::new()
        .with("family", ParamTraits::new(ValueType::Str))
        .with("iters", ParamTraits::new(ValueType::Int).changeable())
        .with("label", ParamTraits::new(ValueType::Str).families(["fast"])),
    }))
  }

  #[test]
  fn names_are_ordered_alphabetically() {
    let mut dict = dictionary();
    dict.add_map("zeta", [("family", "fast")]).unwrap();
    dict.add_map("alpha", [("family", "fast")]).unwrap();
    assert_eq!(dict.name_at(0), Some("alpha"));
    assert_eq!(dict.find_list_name_if(&[("family", "fast")]), Some("alpha"));
  }

  #[test]
  fn adding_twice_merges() {
    let mut dict = dictionary();
    dict.add("a", dict.list_with_pair("family", "fast").unwrap()).unwrap();
    dict.add("a", dict.list_with_pair("iters", 3u32).unwrap()).unwrap();
    let list = dict.get("a").unwrap();
    assert_eq!(list.get_string("family").unwrap(), "fast");
    assert_eq!(list.get_int("iters").unwrap(), 3);
  }

  #[test]
  fn set_defaults_registers_policy_lists() {
    let mut dict = dictionary();
    dict.set_defaults().unwrap();
    assert_eq!(dict.get("main").unwrap().get_int("iters").unwrap(), 1000);
  }

  #[test]
  fn set_defaults_rejects_foreign_family_keys() {
    let mut dict = dictionary();
    dict.add_map("a", [("family", "slow"), ("label", "x")]).unwrap();
    assert!(matches!(
      dict.set_defaults(),
      Err(ParamsError::NotApplicable { .. })
    ));
  }

  #[test]
  fn set_defaults_surfaces_bad_override_specs() {
    let mut dict = dictionary();
    dict.add_override("main", [("iters", "5@layer2")]).unwrap();
    assert!(matches!(
      dict.set_defaults(),
      Err(ParamsError::BadOverrideSpec { .. })
    ));
  }

  #[test]
  fn missing_lists_are_lookup_failures() {
    let dict = dictionary();
    assert!(matches!(
      dict.get("nope"),
      Err(ParamsError::ListNotFound { .. })
    ));
    assert!(dict.get_on_layer("nope", 0).is_err());
  }

  #[test]
  fn on_layer_changes_append_specs() {
    let mut dict = dictionary();
    dict.set_defaults().unwrap();
    dict.change_value_onlayer("main", "iters", 7u32, 1).unwrap();
    dict.change_value_onlayer("main", "iters", 9u32, 2).unwrap();
    assert_eq!(
      dict.get("main_override").unwrap().get_vstring("iters").unwrap(),
      vec!["7@lev1".to_string(), "9@lev2".to_string()]
    );
    assert_eq!(dict.get_on_layer("main", 1).unwrap().get_int("iters").unwrap(), 7);
    assert_eq!(dict.get_on_layer("main", 2).unwrap().get_int("iters").unwrap(), 9);
    assert_eq!(dict.get_on_layer("main", 3).unwrap().get_int("iters").unwrap(), 1000);
  }

  #[test]
  fn on_layer_changes_check_changeable() {
    let mut dict = dictionary();
    dict.set_defaults().unwrap();
    assert!(matches!(
      dict.change_value_onlayer("main", "family", "fast", 1),
      Err(ParamsError::NotChangeable { .. })
    ));
    dict.forced_change_value_onlayer("main", "family", "fast", 1).unwrap();
    assert_eq!(
      dict.get_on_layer("main", 1).unwrap().get_string("family").unwrap(),
      "fast"
    );
  }

  #[test]
  fn serializes_as_nested_maps() {
    let mut dict = dictionary();
    dict.set_defaults().unwrap();
    let json = serde_json::to_value(&dict).unwrap();
    assert_eq!(json["main"]["iters"], 1000);
    assert_eq!(json["main"]["family"], "slow");
  }
}
