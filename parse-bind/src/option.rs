use crate::ast::types::LitValue;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::scope::Reference;
use crate::scope::ReferenceMap;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use tracing::debug;

// `@option name` with neither a type nor a default declares a switch.
pub const IMPLICIT_OPTION_TYPE: &str = "Boolean";

const PRIMITIVE_TYPES: [&str; 3] = ["Boolean", "Number", "String"];

/// One user-facing option, merged from every `@option` reference to a global name.
#[derive(Clone, PartialEq, Debug)]
pub struct OptionEntry {
  pub name: String,
  pub has_explicit_type: bool,
  pub ty: String,
  pub default: Option<LitValue>,
}

impl OptionEntry {
  pub fn has_default(&self) -> bool {
    self.default.is_some()
  }
}

impl Display for OptionEntry {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.write_str("@option")?;
    if self.has_explicit_type {
      write!(f, "({})", self.ty)?;
    };
    write!(f, " {}", self.name)?;
    if let Some(default) = &self.default {
      write!(f, " = {default}")?;
    };
    Ok(())
  }
}

fn declared_type(reference: &Reference) -> Option<&str> {
  reference.option.as_ref().and_then(|o| o.ty.as_deref())
}

fn normalize_one(name: &str, refs: &[Reference]) -> SyntaxResult<Option<OptionEntry>> {
  let Some(first) = refs.iter().find(|r| r.option.is_some()) else {
    return Ok(None);
  };
  let explicit = declared_type(first);
  let mut default: Option<&LitValue> = None;
  for r in refs {
    if r.option.is_none() {
      return Err(r.loc.error(SyntaxErrorType::OptionUndeclared(name.to_string()), None));
    };
    if declared_type(r) != explicit {
      return Err(r.loc.error(SyntaxErrorType::OptionTypeMismatch(name.to_string()), None));
    };
    // References without a default defer to those that have one.
    match (default, r.default.as_ref()) {
      (Some(a), Some(b)) if a != b => {
        return Err(r.loc.error(SyntaxErrorType::OptionDefaultMismatch(name.to_string()), None));
      }
      (None, Some(b)) => default = Some(b),
      _ => {}
    };
  }

  let ty = match (explicit, default.and_then(|d| d.type_name())) {
    (Some(ty), Some(lit_ty)) if ty != lit_ty && PRIMITIVE_TYPES.contains(&ty) => {
      return Err(first.loc.error(SyntaxErrorType::OptionDefaultType(name.to_string()), None));
    }
    (Some(ty), _) => ty.to_string(),
    (None, Some(lit_ty)) => lit_ty.to_string(),
    (None, None) => IMPLICIT_OPTION_TYPE.to_string(),
  };
  Ok(Some(OptionEntry {
    name: name.to_string(),
    has_explicit_type: explicit.is_some(),
    ty,
    default: default.cloned(),
  }))
}

/// Checks every name that carries at least one `@option` reference and produces one entry per such name, in first-reference order.
pub fn normalize_options(globals: &ReferenceMap, order: &[String]) -> SyntaxResult<Vec<OptionEntry>> {
  let mut entries = Vec::new();
  for name in order {
    let Some(refs) = globals.get(name) else {
      continue;
    };
    if let Some(entry) = normalize_one(name, refs)? {
      entries.push(entry);
    };
  }
  debug!(count = entries.len(), "normalized options");
  Ok(entries)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ast::expr::LookupId;
  use crate::ast::expr::OptionDecl;
  use crate::loc::Loc;
  use ahash::HashMapExt;

  fn reference(i: usize, ty: Option<&str>, option: bool, default: Option<LitValue>) -> Reference {
    Reference {
      id: LookupId(i),
      loc: Loc(i, i + 1),
      option: option.then(|| OptionDecl {
        ty: ty.map(|t| t.to_string()),
      }),
      default,
    }
  }

  fn run(refs: Vec<Reference>) -> SyntaxResult<Vec<OptionEntry>> {
    let mut globals = ReferenceMap::new();
    globals.insert("x".into(), refs);
    normalize_options(&globals, &["x".to_string()])
  }

  #[test]
  fn infers_type_from_default() {
    let entries = run(vec![
      reference(0, None, true, Some(LitValue::Number(4.0))),
      reference(1, None, true, None),
    ])
    .unwrap();
    assert_eq!(entries, vec![OptionEntry {
      name: "x".into(),
      has_explicit_type: false,
      ty: "Number".into(),
      default: Some(LitValue::Number(4.0)),
    }]);
    assert_eq!(entries[0].to_string(), "@option x = 4");
  }

  #[test]
  fn rejects_inconsistent_references() {
    let err = run(vec![reference(0, None, true, None), reference(1, None, false, None)]).unwrap_err();
    assert_eq!(err.typ, SyntaxErrorType::OptionUndeclared("x".into()));
    let err = run(vec![
      reference(0, Some("Number"), true, None),
      reference(1, None, true, None),
    ])
    .unwrap_err();
    assert_eq!(err.typ, SyntaxErrorType::OptionTypeMismatch("x".into()));
    let err = run(vec![
      reference(0, None, true, Some(LitValue::Number(4.0))),
      reference(1, None, true, Some(LitValue::Number(5.0))),
    ])
    .unwrap_err();
    assert_eq!(err.typ, SyntaxErrorType::OptionDefaultMismatch("x".into()));
  }

  #[test]
  fn explicit_type_must_accept_default() {
    let err = run(vec![reference(
      0,
      Some("Number"),
      true,
      Some(LitValue::String("four".into())),
    )])
    .unwrap_err();
    assert_eq!(err.typ, SyntaxErrorType::OptionDefaultType("x".into()));
    // Host types are not checked at parse time.
    let entries = run(vec![reference(0, Some("Path"), true, Some(LitValue::String("/".into())))]).unwrap();
    assert_eq!(entries[0].to_string(), "@option(Path) x = '/'");
  }

  #[test]
  fn bare_option_is_a_switch() {
    let entries = run(vec![reference(0, None, true, None)]).unwrap();
    assert_eq!(entries[0].ty, IMPLICIT_OPTION_TYPE);
    assert!(!entries[0].has_default());
    assert_eq!(entries[0].to_string(), "@option x");
  }

  #[test]
  fn names_without_options_are_skipped() {
    assert!(run(vec![reference(0, None, false, None)]).unwrap().is_empty());
  }
}
