use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

/// The declared shape of an expression's result.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Cardinality {
  Scalar,
  Array,
  Iterator,
  AsyncIterator,
}

/// A type name together with the cardinality the value is expected to have, e.g. `String[]` or `async *Item`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ExprType {
  pub base: String,
  pub cardinality: Cardinality,
}

impl ExprType {
  pub fn scalar(base: impl Into<String>) -> ExprType {
    ExprType {
      base: base.into(),
      cardinality: Cardinality::Scalar,
    }
  }

  pub fn with_cardinality(self, cardinality: Cardinality) -> ExprType {
    ExprType {
      cardinality,
      ..self
    }
  }
}

impl Display for ExprType {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self.cardinality {
      Cardinality::Scalar => write!(f, "{}", self.base),
      Cardinality::Array => write!(f, "{}[]", self.base),
      Cardinality::Iterator => write!(f, "*{}", self.base),
      Cardinality::AsyncIterator => write!(f, "async *{}", self.base),
    }
  }
}

/// Whether a type suffix checks the value (`as`) or converts it (`to`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CastMode {
  Assert,
  Convert,
}

/// A simple literal as written in source.
#[derive(Clone, Debug)]
pub enum LitValue {
  Undefined,
  Null,
  Bool(bool),
  Number(f64),
  String(String),
}

impl LitValue {
  /// The ambient type name a literal of this kind satisfies, if any.
  pub fn type_name(&self) -> Option<&'static str> {
    match self {
      LitValue::Bool(_) => Some("Boolean"),
      LitValue::Number(_) => Some("Number"),
      LitValue::String(_) => Some("String"),
      LitValue::Undefined | LitValue::Null => None,
    }
  }
}

// Value equality: two literals are equal if they denote the same value, regardless of how they were spelled.
impl PartialEq for LitValue {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (LitValue::Undefined, LitValue::Undefined) => true,
      (LitValue::Null, LitValue::Null) => true,
      (LitValue::Bool(a), LitValue::Bool(b)) => a == b,
      (LitValue::Number(a), LitValue::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
      (LitValue::String(a), LitValue::String(b)) => a == b,
      _ => false,
    }
  }
}

impl Display for LitValue {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      LitValue::Undefined => f.write_str("undefined"),
      LitValue::Null => f.write_str("null"),
      LitValue::Bool(b) => write!(f, "{b}"),
      LitValue::Number(n) => write!(f, "{n}"),
      LitValue::String(s) => {
        f.write_str("'")?;
        for c in s.chars() {
          match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{c}")?,
          }
        }
        f.write_str("'")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn expr_type_display() {
    let t = ExprType::scalar("String");
    assert_eq!(t.to_string(), "String");
    assert_eq!(t.clone().with_cardinality(Cardinality::Array).to_string(), "String[]");
    assert_eq!(t.clone().with_cardinality(Cardinality::Iterator).to_string(), "*String");
    assert_eq!(
      t.with_cardinality(Cardinality::AsyncIterator).to_string(),
      "async *String"
    );
  }

  #[test]
  fn literal_equality_is_by_value() {
    assert_eq!(LitValue::Number(4.0), LitValue::Number(4.0));
    assert_ne!(LitValue::Number(4.0), LitValue::Number(5.0));
    assert_ne!(LitValue::Number(0.0), LitValue::String("0".into()));
    assert_eq!(LitValue::String("it's".into()).to_string(), "'it\\'s'");
    assert_eq!(LitValue::Number(-1.5).to_string(), "-1.5");
  }
}
