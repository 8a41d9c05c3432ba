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
use crate::error::ParseError;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Separator used by the textual encoding of vector values.
pub const VECTOR_DELIMITER: char = ',';

const TRUE_LITERALS: [&str; 5] = ["on", "yes", "true", "enable", "1"];
const FALSE_LITERALS: [&str; 5] = ["off", "no", "false", "disable", "0"];

/// The declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
  Int,
  Float,
  Bool,
  Str,
  IntVec,
  FloatVec,
  BoolVec,
  StrVec,
}

impl ValueType {
  pub fn is_vector(self) -> bool {
    matches!(
      self,
      ValueType::IntVec | ValueType::FloatVec | ValueType::BoolVec | ValueType::StrVec
    )
  }

  /// The scalar type of a vector's elements; scalars map to themselves.
  pub fn element(self) -> ValueType {
    match self {
      ValueType::IntVec => ValueType::Int,
      ValueType::FloatVec => ValueType::Float,
      ValueType::BoolVec => ValueType::Bool,
      ValueType::StrVec => ValueType::Str,
      scalar => scalar,
    }
  }

  pub fn is_numeric(self) -> bool {
    matches!(self.element(), ValueType::Int | ValueType::Float)
  }

  pub fn name(self) -> &'static str {
    match self {
      ValueType::Int => "int",
      ValueType::Float => "float",
      ValueType::Bool => "bool",
      ValueType::Str => "string",
      ValueType::IntVec => "int vector",
      ValueType::FloatVec => "float vector",
      ValueType::BoolVec => "bool vector",
      ValueType::StrVec => "string vector",
    }
  }
}

impl fmt::Display for ValueType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// A single parameter value.
///
/// `Null` marks an unset slot. Every other variant carries a payload whose
/// shape is fixed by the variant, so the tag can never disagree with it.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
  #[default]
  Null,
  Int(u32),
  Float(f64),
  Bool(bool),
  Str(String),
  IntVec(Vec<u32>),
  FloatVec(Vec<f64>),
  BoolVec(Vec<bool>),
  StrVec(Vec<String>),
}

impl Value {
  /// The value's type, or `None` for `Null`.
  pub fn value_type(&self) -> Option<ValueType> {
    Some(match self {
      Value::Null => return None,
      Value::Int(_) => ValueType::Int,
      Value::Float(_) => ValueType::Float,
      Value::Bool(_) => ValueType::Bool,
      Value::Str(_) => ValueType::Str,
      Value::IntVec(_) => ValueType::IntVec,
      Value::FloatVec(_) => ValueType::FloatVec,
      Value::BoolVec(_) => ValueType::BoolVec,
      Value::StrVec(_) => ValueType::StrVec,
    })
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  pub fn set(&mut self, value: impl Into<Value>) {
    *self = value.into();
  }

  /// Reads the payload as `T`, widening where lossless (int to float).
  pub(crate) fn get<T: FromValue>(&self) -> Option<T> {
    T::from_value(self)
  }

  /// Parses text into a value of type `ty`.
  ///
  /// Vector types split the text on commas and parse every element; an empty
  /// text yields an empty vector.
  pub fn parse(ty: ValueType, text: &str) -> Result<Value, ParseError> {
    if ty.is_vector() {
      if text.trim().is_empty() {
        return Ok(empty_vector(ty));
      }
      let parts: Vec<&str> = text.split(VECTOR_DELIMITER).collect();
      return Self::parse_list(ty, &parts);
    }
    parse_scalar(ty, text)
  }

  /// Parses a pre-split list of elements into a value of type `ty`.
  pub fn parse_list<S: AsRef<str>>(ty: ValueType, parts: &[S]) -> Result<Value, ParseError> {
    if !ty.is_vector() {
      return match parts {
        [single] => parse_scalar(ty, single.as_ref()),
        _ if ty == ValueType::Str => Ok(Value::Str(join(parts))),
        _ => Err(ParseError::NotScalar(ty, parts.len())),
      };
    }
    let elem = ty.element();
    let mut out = empty_vector(ty);
    for part in parts {
      match (&mut out, parse_scalar(elem, part.as_ref())?) {
        (Value::IntVec(v), Value::Int(x)) => v.push(x),
        (Value::FloatVec(v), Value::Float(x)) => v.push(x),
        (Value::BoolVec(v), Value::Bool(x)) => v.push(x),
        (Value::StrVec(v), Value::Str(x)) => v.push(x),
        _ => unreachable!("element type follows the vector type"),
      }
    }
    Ok(out)
  }

  /// Canonical text: decimal numbers, `true`/`false`, comma-joined vectors.
  pub fn as_string(&self) -> String {
    fn joined<T: ToString>(items: &[T]) -> String {
      items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(&VECTOR_DELIMITER.to_string())
    }
    match self {
      Value::Null => String::new(),
      Value::Int(i) => i.to_string(),
      Value::Float(f) => f.to_string(),
      Value::Bool(b) => b.to_string(),
      Value::Str(s) => s.clone(),
      Value::IntVec(v) => joined(v),
      Value::FloatVec(v) => joined(v),
      Value::BoolVec(v) => joined(v),
      Value::StrVec(v) => v.join(&VECTOR_DELIMITER.to_string()),
    }
  }

  /// Text form of the largest value representable by `ty`'s element type,
  /// used as the open upper bound of a min/max constraint.
  pub fn get_max_possible_value(ty: ValueType) -> String {
    match ty.element() {
      ValueType::Int => u32::MAX.to_string(),
      ValueType::Float => format!("{:e}", f64::MAX),
      ValueType::Bool => true.to_string(),
      _ => String::new(),
    }
  }

  /// Converts into `ty` without losing information.
  ///
  /// Identity, int to float, and scalar to single-element vector are
  /// accepted; anything narrowing returns `None`.
  pub fn widen(self, ty: ValueType) -> Option<Value> {
    let current = self.value_type()?;
    if current == ty {
      return Some(self);
    }
    match (self, ty) {
      (Value::Int(i), ValueType::Float) => Some(Value::Float(f64::from(i))),
      (Value::IntVec(v), ValueType::FloatVec) => {
        Some(Value::FloatVec(v.into_iter().map(f64::from).collect()))
      }
      (scalar, target) if target.is_vector() && !current.is_vector() => {
        match scalar.widen(target.element())? {
          Value::Int(i) => Some(Value::IntVec(vec![i])),
          Value::Float(f) => Some(Value::FloatVec(vec![f])),
          Value::Bool(b) => Some(Value::BoolVec(vec![b])),
          Value::Str(s) => Some(Value::StrVec(vec![s])),
          _ => None,
        }
      }
      _ => None,
    }
  }

  /// The scalar elements of this value; a scalar yields itself.
  pub fn scalars(&self) -> Vec<Value> {
    match self {
      Value::Null => Vec::new(),
      Value::IntVec(v) => v.iter().copied().map(Value::Int).collect(),
      Value::FloatVec(v) => v.iter().copied().map(Value::Float).collect(),
      Value::BoolVec(v) => v.iter().copied().map(Value::Bool).collect(),
      Value::StrVec(v) => v.iter().cloned().map(Value::Str).collect(),
      scalar => vec![scalar.clone()],
    }
  }

  /// Orders two numeric scalars; `None` for anything else.
  pub fn numeric_cmp(&self, other: &Value) -> Option<Ordering> {
    let as_f64 = |v: &Value| match v {
      Value::Int(i) => Some(f64::from(*i)),
      Value::Float(f) => Some(*f),
      _ => None,
    };
    match (self, other) {
      (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
      (a, b) => as_f64(a)?.partial_cmp(&as_f64(b)?),
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.as_string())
  }
}

fn empty_vector(ty: ValueType) -> Value {
  match ty {
    ValueType::IntVec => Value::IntVec(Vec::new()),
    ValueType::FloatVec => Value::FloatVec(Vec::new()),
    ValueType::BoolVec => Value::BoolVec(Vec::new()),
    _ => Value::StrVec(Vec::new()),
  }
}

fn join<S: AsRef<str>>(parts: &[S]) -> String {
  parts
    .iter()
    .map(AsRef::as_ref)
    .collect::<Vec<_>>()
    .join(&VECTOR_DELIMITER.to_string())
}

fn parse_scalar(ty: ValueType, text: &str) -> Result<Value, ParseError> {
  let trimmed = text.trim();
  match ty.element() {
    ValueType::Int => trimmed
      .parse::<u32>()
      .map(Value::Int)
      .map_err(|source| ParseError::Int {
        text: text.to_string(),
        source,
      }),
    ValueType::Float => trimmed
      .parse::<f64>()
      .map(Value::Float)
      .map_err(|source| ParseError::Float {
        text: text.to_string(),
        source,
      }),
    ValueType::Bool => {
      let lower = trimmed.to_ascii_lowercase();
      if TRUE_LITERALS.contains(&lower.as_str()) {
        Ok(Value::Bool(true))
      } else if FALSE_LITERALS.contains(&lower.as_str()) {
        Ok(Value::Bool(false))
      } else {
        Err(ParseError::Bool {
          text: text.to_string(),
        })
      }
    }
    _ => Ok(Value::Str(text.to_string())),
  }
}

/// Typed read access to a [`Value`] payload.
pub trait FromValue: Sized {
  /// The parameter type a `Self` is stored as.
  const TYPE: ValueType;

  fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_from_value {
  ($ty:ty, $vt:ident, $($pat:pat => $out:expr),+ $(,)?) => {
    impl FromValue for $ty {
      const TYPE: ValueType = ValueType::$vt;

      fn from_value(value: &Value) -> Option<Self> {
        match value {
          $($pat => Some($out),)+
          _ => None,
        }
      }
    }
  };
}

impl_from_value!(u32, Int, Value::Int(i) => *i);
impl_from_value!(f64, Float, Value::Float(f) => *f, Value::Int(i) => f64::from(*i));
impl_from_value!(bool, Bool, Value::Bool(b) => *b);
impl_from_value!(String, Str, Value::Str(s) => s.clone());
impl_from_value!(Vec<u32>, IntVec, Value::IntVec(v) => v.clone());
impl_from_value!(
  Vec<f64>,
  FloatVec,
  Value::FloatVec(v) => v.clone(),
  Value::IntVec(v) => v.iter().copied().map(f64::from).collect(),
);
impl_from_value!(Vec<bool>, BoolVec, Value::BoolVec(v) => v.clone());
impl_from_value!(Vec<String>, StrVec, Value::StrVec(v) => v.clone());

impl From<u32> for Value {
  fn from(v: u32) -> Self {
    Value::Int(v)
  }
}

impl From<u16> for Value {
  fn from(v: u16) -> Self {
    Value::Int(u32::from(v))
  }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self {
    Value::Float(v)
  }
}

impl From<f32> for Value {
  fn from(v: f32) -> Self {
    Value::Float(f64::from(v))
  }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self {
    Value::Bool(v)
  }
}

impl From<String> for Value {
  fn from(v: String) -> Self {
    Value::Str(v)
  }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self {
    Value::Str(v.to_string())
  }
}

impl From<Vec<u32>> for Value {
  fn from(v: Vec<u32>) -> Self {
    Value::IntVec(v)
  }
}

impl From<Vec<f64>> for Value {
  fn from(v: Vec<f64>) -> Self {
    Value::FloatVec(v)
  }
}

impl From<Vec<bool>> for Value {
  fn from(v: Vec<bool>) -> Self {
    Value::BoolVec(v)
  }
}

impl From<Vec<String>> for Value {
  fn from(v: Vec<String>) -> Self {
    Value::StrVec(v)
  }
}

impl From<Vec<&str>> for Value {
  fn from(v: Vec<&str>) -> Self {
    Value::StrVec(v.into_iter().map(str::to_string).collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_float_forms() {
    let v = Value::parse(ValueType::FloatVec, "-10.5,2e2,+3e-1,.4").unwrap();
    assert_eq!(v, Value::FloatVec(vec![-10.5, 200.0, 0.3, 0.4]));
  }

  #[test]
  fn parses_bool_literals_case_insensitively() {
    for t in ["on", "YES", "True", "enable", "1"] {
      assert_eq!(Value::parse(ValueType::Bool, t).unwrap(), Value::Bool(true));
    }
    for f in ["off", "No", "FALSE", "disable", "0"] {
      assert_eq!(Value::parse(ValueType::Bool, f).unwrap(), Value::Bool(false));
    }
    assert!(matches!(
      Value::parse(ValueType::Bool, "maybe"),
      Err(ParseError::Bool { .. })
    ));
  }

  #[test]
  fn vector_parse_fails_on_any_bad_element() {
    assert!(Value::parse(ValueType::IntVec, "1,2,x,4").is_err());
    assert_eq!(
      Value::parse(ValueType::BoolVec, "true,false,true").unwrap(),
      Value::BoolVec(vec![true, false, true])
    );
  }

  #[test]
  fn rejects_negative_ints() {
    assert!(matches!(
      Value::parse(ValueType::Int, "-3"),
      Err(ParseError::Int { .. })
    ));
  }

  #[test]
  fn canonical_text_round_trips() {
    let samples = [
      Value::Int(42),
      Value::Float(1.234),
      Value::Float(1e-12),
      Value::Bool(false),
      Value::Str("test".into()),
      Value::IntVec(vec![1, 2, 3, 4]),
      Value::FloatVec(vec![-10.5, 200.0]),
      Value::StrVec(vec!["aaa".into(), "bbb".into()]),
    ];
    for v in samples {
      let ty = v.value_type().unwrap();
      assert_eq!(Value::parse(ty, &v.as_string()).unwrap(), v);
    }
  }

  #[test]
  fn widening_never_narrows() {
    assert_eq!(Value::Int(5).widen(ValueType::Float), Some(Value::Float(5.0)));
    assert_eq!(
      Value::Int(5).widen(ValueType::FloatVec),
      Some(Value::FloatVec(vec![5.0]))
    );
    assert_eq!(Value::Float(5.0).widen(ValueType::Int), None);
    assert_eq!(Value::IntVec(vec![1]).widen(ValueType::Int), None);
    assert_eq!(Value::Null.widen(ValueType::Int), None);
  }

  #[test]
  fn typed_reads_follow_widening() {
    assert_eq!(Value::Int(3).get::<f64>(), Some(3.0));
    assert_eq!(Value::Float(3.0).get::<u32>(), None);
    assert_eq!(Value::Null.get::<String>(), None);
  }

  #[test]
  fn max_possible_value_parses_back() {
    let max = Value::get_max_possible_value(ValueType::Float);
    assert_eq!(Value::parse(ValueType::Float, &max).unwrap(), Value::Float(f64::MAX));
    assert_eq!(Value::get_max_possible_value(ValueType::IntVec), "4294967295");
  }
}
