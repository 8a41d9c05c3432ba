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
use crate::dictionary::ParameterDictionary;
use crate::error::Result;
use crate::list::ParameterList;
use crate::schema::ExpectedParams;
use crate::schema::ParamTraits;
use crate::schema::ParamsPolicy;
use crate::value::ValueType;

/// Demonstration policy with three families: `mammalia`, `reptilia` and
/// `aves`.
#[derive(Debug, Clone)]
pub struct ExamplePolicy {
  schema: ExpectedParams,
}

impl Default for ExamplePolicy {
  fn default() -> Self {
    Self::new()
  }
}

impl ExamplePolicy {
  pub const NAME: &'static str = "example";

  pub fn new() -> Self {
    use ValueType::*;
    let schema = ExpectedParams::new()
      .with("family", ParamTraits::new(Str))
      .with("integer", ParamTraits::new(Int).changeable())
      .with(
        "float",
        ParamTraits::new(Float).changeable().families(["mammalia", "aves"]),
      )
      .with(
        "string",
        ParamTraits::new(Str)
          .changeable()
          .families(["mammalia", "reptilia"])
          .allowed(["test1", "test2", "test3"]),
      )
      .with("floatx", ParamTraits::new(Float).families(["reptilia"]))
      .with(
        "integerx",
        ParamTraits::new(Int).changeable().families(["reptilia", "aves"]),
      )
      .with("stringx", ParamTraits::new(Str).families(["reptilia", "mammalia"]))
      .with(
        "integerX",
        ParamTraits::new(Int).families(["!reptilia"]).minmax("1", "3"),
      )
      .with("integerXX", ParamTraits::new(Int).allowed(["1", "2", "5"]))
      .with("ivec", ParamTraits::new(IntVec).changeable())
      .with("fvec", ParamTraits::new(FloatVec).changeable())
      .with("svec", ParamTraits::new(StrVec).changeable())
      .with("bvec", ParamTraits::new(BoolVec).changeable());
    Self { schema }
  }
}

impl ParamsPolicy for ExamplePolicy {
  fn nlayers(&self) -> usize {
    100
  }

  fn expected_params(&self) -> &ExpectedParams {
    &self.schema
  }

  fn set_family_defaults(&self, list: &mut ParameterList, family: &str, _list_name: &str) -> Result<()> {
    match family {
      "mammalia" => {
        list.set_value_if_missing("integer", 56u32)?;
        list.set_value_if_missing("float", 1.234)?;
        list.set_value_if_missing("stringx", "test")?;
        list.set_value_if_missing("string", "test2")?;
        list.set_value_if_missing("integerX", 2u32)?;
        list.set_value_if_missing("integerXX", 5u32)?;
      }
      "reptilia" => {
        list.set_value_if_missing("integerx", 777u32)?;
        list.set_value_if_missing("floatx", 4.567)?;
        list.set_value_if_missing("stringx", "test")?;
        list.set_value_if_missing("string", "test1")?;
        list.set_value_if_missing("integerXX", 5u32)?;
      }
      "aves" => {
        list.set_value_if_missing("integer", 56u32)?;
        list.set_value_if_missing("float", 1.234)?;
        list.set_value_if_missing("integerx", 777u32)?;
        list.set_value_if_missing("integerX", 2u32)?;
        list.set_value_if_missing("integerXX", 5u32)?;
      }
      other => tracing::warn!(family = %other, "No defaults known for family"),
    }
    Ok(())
  }

  fn set_dictionary_defaults(&self, dictionary: &mut ParameterDictionary) -> Result<()> {
    for (name, family) in [
      ("foo", "mammalia"),
      ("bar", "reptilia"),
      ("baz", "aves"),
      ("qux", "aves"),
    ] {
      if dictionary.find(name) {
        dictionary
          .get_mut(name)?
          .set_value_if_missing(self.family_key(), family)?;
      } else {
        let list = dictionary.list_with_pair(self.family_key(), family)?;
        dictionary.add(name, list)?;
      }
    }
    Ok(())
  }

  fn table_title(&self) -> &str {
    "EXAMPLE set of params"
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  #[test]
  fn defaults_are_consistent_with_the_schema() {
    let mut dict = ParameterDictionary::new(Arc::new(ExamplePolicy::new()));
    dict.set_defaults().unwrap();
    assert_eq!(dict.names().collect::<Vec<_>>(), ["bar", "baz", "foo", "qux"]);
    assert_eq!(dict.get("bar").unwrap().get_float("floatx").unwrap(), 4.567);
    assert_eq!(dict.get("foo").unwrap().get_string("string").unwrap(), "test2");
  }

  #[test]
  fn explicit_values_beat_family_defaults() {
    let mut dict = ParameterDictionary::new(Arc::new(ExamplePolicy::new()));
    dict
      .add_map("foo", [("family", "mammalia"), ("integer", "1"), ("svec", "uno,dos,tres")])
      .unwrap();
    dict.set_defaults().unwrap();
    let foo = dict.get("foo").unwrap();
    assert_eq!(foo.get_int("integer").unwrap(), 1);
    assert_eq!(foo.get_vstring("svec").unwrap()[1], "dos");
  }

  #[test]
  fn built_in_lists_without_family_get_their_own() {
    let mut dict = ParameterDictionary::new(Arc::new(ExamplePolicy::new()));
    dict.add_map("foo", [("integer", "7")]).unwrap();
    dict.set_defaults().unwrap();
    let foo = dict.get("foo").unwrap();
    assert_eq!(foo.get_string("family").unwrap(), "mammalia");
    assert_eq!(foo.get_int("integer").unwrap(), 7);
  }
}
