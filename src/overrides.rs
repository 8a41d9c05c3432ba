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

//! Per-layer override resolution.
//!
//! An override list stores layer-tagged text such as `99@lev2-4`. The
//! [`OverridesHolder`] parses those specs and materializes one
//! [`ParameterList`] per referenced layer.

use crate::error::ParamsError;
use crate::error::Result;
use crate::list::ParameterList;
use crate::value::FromValue;
use crate::value::VECTOR_DELIMITER;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const LAYER_MARKER: char = '@';

/// Override values grouped by the layer they apply to.
#[derive(Debug, Clone)]
pub struct OverridesHolder {
  per_layer_lists: BTreeMap<usize, ParameterList>,
  layer_count: usize,
}

impl OverridesHolder {
  pub fn new(layer_count: usize) -> Self {
    Self {
      per_layer_lists: BTreeMap::new(),
      layer_count,
    }
  }

  pub fn layer_count(&self) -> usize {
    self.layer_count
  }

  /// Parses a `<prefix><start>[-<end>]` range, clamped to the known layers.
  pub fn get_start_end_layer(&self, key: &str, range: &str, prefix: &str) -> Result<(usize, usize)> {
    let bad = |reason: &str| ParamsError::BadOverrideSpec {
      key: key.to_string(),
      spec: range.to_string(),
      reason: reason.to_string(),
    };
    if self.layer_count == 0 {
      return Err(bad("no layers are configured"));
    }
    let bounds = range
      .strip_prefix(prefix)
      .ok_or_else(|| bad(&format!("layer range must start with '{prefix}'")))?;
    let parse = |text: &str| {
      text
        .trim()
        .parse::<usize>()
        .map_err(|_| bad("layer bounds must be unsigned integers"))
    };
    let (start, end) = match bounds.split_once('-') {
      Some((start, end)) => (parse(start)?, parse(end)?),
      None => {
        let layer = parse(bounds)?;
        (layer, layer)
      }
    };
    if start > end {
      return Err(bad("start layer is after end layer"));
    }
    let last = self.layer_count - 1;
    Ok((start.min(last), end.min(last)))
  }

  /// Parses every spec of `source` into the per-layer lists.
  ///
  /// Specs are applied in order; a later spec for the same key and layer
  /// replaces an earlier one.
  pub fn fill_in(&mut self, source: &ParameterList) -> Result<()> {
    let policy = source.policy();
    let prefix = policy.layer_prefix();
    for (key, raw) in source.get_raw_list() {
      let ty = policy
        .expected_params()
        .get(key)
        .ok_or_else(|| ParamsError::UnknownKey { key: key.clone() })?
        .ty;
      for (text, range) in split_specs(key, raw)? {
        let (start, end) = self.get_start_end_layer(key, &range, prefix)?;
        let value = Value::parse(ty, &text).map_err(|source| ParamsError::Parse {
          key: key.clone(),
          source,
        })?;
        for layer in start..=end {
          self
            .per_layer_lists
            .entry(layer)
            .or_insert_with(|| ParameterList::new(Arc::clone(policy)))
            .add_value(key, value.clone())?;
        }
        tracing::trace!(key = %key, start, end, value = %value, "Registered layer override");
      }
    }
    Ok(())
  }

  /// Whether any override targets `layer`.
  pub fn find(&self, layer: usize) -> bool {
    self.per_layer_lists.contains_key(&layer)
  }

  pub fn get(&self, layer: usize) -> Result<&ParameterList> {
    self
      .per_layer_lists
      .get(&layer)
      .ok_or(ParamsError::NoOverrideForLayer { layer })
  }

  /// Layers with at least one override, ascending.
  pub fn layers(&self) -> impl Iterator<Item = usize> + '_ {
    self.per_layer_lists.keys().copied()
  }

  /// Calls `f` with the override of `key` on every layer that has one.
  pub fn apply_for_each_layer<T, F>(&self, key: &str, mut f: F) -> Result<()>
  where
    T: FromValue,
    F: FnMut(T, usize),
  {
    for (layer, list) in &self.per_layer_lists {
      if list.is_value_set(key) {
        f(list.get_value::<T>(key)?, *layer);
      }
    }
    Ok(())
  }
}

/// Splits raw override text into `(value, range)` pairs.
///
/// Text is split on commas; fragments without a layer marker belong to the
/// value of the next spec, so vector values survive being pre-split.
pub(crate) fn split_specs(key: &str, raw: &Value) -> Result<Vec<(String, String)>> {
  let fragments: Vec<String> = match raw {
    Value::StrVec(items) => items.clone(),
    other => vec![other.as_string()],
  };
  let mut specs = Vec::new();
  let mut pending: Vec<&str> = Vec::new();
  for fragment in fragments.iter().flat_map(|f| f.split(VECTOR_DELIMITER)) {
    pending.push(fragment);
    if fragment.contains(LAYER_MARKER) {
      let spec = pending.join(&VECTOR_DELIMITER.to_string());
      if let Some((text, range)) = spec.rsplit_once(LAYER_MARKER) {
        specs.push((text.to_string(), range.to_string()));
      }
      pending.clear();
    }
  }
  if !pending.is_empty() {
    return Err(ParamsError::BadOverrideSpec {
      key: key.to_string(),
      spec: pending.join(&VECTOR_DELIMITER.to_string()),
      reason: format!("missing '{LAYER_MARKER}<layer>' suffix"),
    });
  }
  Ok(specs)
}
