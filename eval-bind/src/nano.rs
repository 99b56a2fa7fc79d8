use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

/// Why a sentinel was produced.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum NanOKind {
  OutOfRange { index: String, length: usize },
  MissingProperty { property: String, object: String },
  MissingMethod { method: String, object: String },
  MissingGlobal { name: String },
  Unindexable { key: String, object: String },
  FailedCast { from: String, to: String },
}

/// "Not an object": a soft failure that stands in for a value that would have been absent or would have thrown.
///
/// Sentinels flow through member access, subscripts and most operators untouched. `??` replaces a non-exceptional one; boolean contexts treat a non-exceptional one as false; the evaluation boundary decides what happens to whatever is left.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NanO {
  pub kind: NanOKind,
  pub exceptional: bool,
}

impl NanO {
  pub fn new(kind: NanOKind) -> NanO {
    let exceptional = matches!(
      kind,
      NanOKind::MissingMethod { .. } | NanOKind::FailedCast { .. }
    );
    NanO { kind, exceptional }
  }

  pub fn out_of_range(index: impl Display, length: usize) -> NanO {
    NanO::new(NanOKind::OutOfRange {
      index: index.to_string(),
      length,
    })
  }

  pub fn missing_property(property: &str, object: &str) -> NanO {
    NanO::new(NanOKind::MissingProperty {
      property: property.to_string(),
      object: object.to_string(),
    })
  }

  pub fn missing_method(method: &str, object: &str) -> NanO {
    NanO::new(NanOKind::MissingMethod {
      method: method.to_string(),
      object: object.to_string(),
    })
  }

  pub fn missing_global(name: &str) -> NanO {
    NanO::new(NanOKind::MissingGlobal {
      name: name.to_string(),
    })
  }

  pub fn unindexable(key: &str, object: &str) -> NanO {
    NanO::new(NanOKind::Unindexable {
      key: key.to_string(),
      object: object.to_string(),
    })
  }

  pub fn failed_cast(from: &str, to: &str) -> NanO {
    NanO::new(NanOKind::FailedCast {
      from: from.to_string(),
      to: to.to_string(),
    })
  }

  pub fn with_exceptional(self, exceptional: bool) -> NanO {
    NanO { exceptional, ..self }
  }
}

impl Display for NanO {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match &self.kind {
      NanOKind::OutOfRange { index, length } => {
        write!(f, "index {index} is out of range for length {length}")
      }
      NanOKind::MissingProperty { property, object } => {
        write!(f, "property `{property}` does not exist on {object}")
      }
      NanOKind::MissingMethod { method, object } => {
        write!(f, "method `{method}` does not exist on {object}")
      }
      NanOKind::MissingGlobal { name } => write!(f, "`{name}` was not supplied"),
      NanOKind::Unindexable { key, object } => write!(f, "cannot read `{key}` of {object}"),
      NanOKind::FailedCast { from, to } => write!(f, "cannot convert {from} to {to}"),
    }
  }
}
