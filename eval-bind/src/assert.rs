//! Runtime checks for `as T` and `to T` suffixes.
//!
//! A check is compiled once per assertion from the runtime value the type name resolves to. Preference order: the type's own `isT` predicate, then an instance test, then (for lowercase names that resolve to nothing) a comparison against the dynamic type tag.

use crate::env::Env;
use crate::error::EvalError;
use crate::error::EvalResult;
use crate::exec::Soft;
use crate::iter::async_iterate;
use crate::iter::iterate;
use crate::iter::AsyncValueIter;
use crate::iter::ValueIter;
use crate::nano::NanO;
use crate::value::Callable;
use crate::value::Value;
use parse_bind::ast::types::Cardinality;
use parse_bind::ast::types::CastMode;
use parse_bind::ast::types::ExprType;
use std::cell::Cell;
use std::rc::Rc;
use tracing::warn;

enum Check {
  Predicate(Rc<dyn Callable>),
  Instance(Rc<dyn Callable>, String),
  TypeTag(String),
  Unavailable,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Verdict {
  Pass,
  Fail,
  NoVerdict,
}

impl From<bool> for Verdict {
  fn from(value: bool) -> Verdict {
    if value {
      Verdict::Pass
    } else {
      Verdict::Fail
    }
  }
}

impl Check {
  fn compile(env: &Env, base: &str) -> Check {
    let short = base.rsplit('.').next().unwrap_or(base);
    let predicate = format!("is{short}");
    match env.resolve_type(base) {
      Some(Value::Function(ty)) => match ty.static_member(&predicate) {
        Some(Value::Function(p)) => Check::Predicate(p),
        _ => Check::Instance(ty, short.to_string()),
      },
      Some(Value::Object(ns)) => match ns.get(&predicate) {
        Some(Value::Function(p)) => Check::Predicate(p),
        _ => Check::Unavailable,
      },
      Some(_) => Check::Unavailable,
      None if short.starts_with(|c: char| c.is_ascii_lowercase()) => Check::TypeTag(short.to_string()),
      None => Check::Unavailable,
    }
  }

  fn test(&self, value: &Value) -> EvalResult<Verdict> {
    Ok(match self {
      Check::Predicate(p) => {
        let verdict = p.call(vec![value.clone()]).map_err(|cause| EvalError::Invocation {
          name: p.name().to_string(),
          cause: Box::new(cause),
        })?;
        match verdict {
          Value::Bool(b) => b.into(),
          _ => Verdict::NoVerdict,
        }
      }
      Check::Instance(ty, short) => match (ty.has_instance(value), value) {
        (Some(b), _) => b.into(),
        (None, Value::Object(o)) => o.prototype_chain().iter().any(|c| c == short).into(),
        (None, _) => Verdict::NoVerdict,
      },
      Check::TypeTag(tag) => (value.type_tag() == tag).into(),
      Check::Unavailable => Verdict::NoVerdict,
    })
  }
}

enum Step {
  Checked(Value),
  // No verdict was available; later elements are not checked.
  Unchecked(Value),
  Cast(NanO),
}

struct Assertion {
  check: Check,
  ty: ExprType,
  mode: CastMode,
  env: Env,
}

/// Applies the type suffix `ty` to `value`.
pub(crate) fn check(env: &Env, value: Value, ty: &ExprType, mode: CastMode) -> EvalResult<Soft> {
  let assertion = Rc::new(Assertion {
    check: Check::compile(env, &ty.base),
    ty: ty.clone(),
    mode,
    env: env.clone(),
  });
  assertion.apply(value)
}

fn harden(result: EvalResult<Soft>) -> EvalResult<Value> {
  result?.map_err(EvalError::Sentinel)
}

impl Assertion {
  fn apply(self: &Rc<Self>, value: Value) -> EvalResult<Soft> {
    if let Value::Deferred(d) = value {
      let this = self.clone();
      return Ok(Ok(Value::Deferred(d.then(move |v| harden(this.apply(v))))));
    };
    match self.ty.cardinality {
      Cardinality::Scalar => Ok(match self.element(value, None)? {
        Step::Checked(v) | Step::Unchecked(v) => Ok(v),
        Step::Cast(nano) => Err(nano),
      }),
      Cardinality::Array => self.apply_array(value),
      Cardinality::Iterator => match iterate(&value) {
        Some(iter) => Ok(Ok(Value::Iter(self.wrap_iter(iter)))),
        None => self.mismatch(&value),
      },
      Cardinality::AsyncIterator => match async_iterate(&value) {
        Some(iter) => Ok(Ok(Value::AsyncIter(self.wrap_async_iter(iter)))),
        None => self.mismatch(&value),
      },
    }
  }

  /// The value does not have the declared cardinality at all.
  fn mismatch(&self, value: &Value) -> EvalResult<Soft> {
    match self.mode {
      CastMode::Assert => Err(EvalError::TypeAssertion {
        expected: self.ty.to_string(),
        found: value.class_name(),
        index: None,
      }),
      CastMode::Convert => Ok(Err(NanO::failed_cast(&value.class_name(), &self.ty.to_string()))),
    }
  }

  fn apply_array(self: &Rc<Self>, value: Value) -> EvalResult<Soft> {
    let items = match (&value, self.mode) {
      (Value::Array(items), _) => items.to_vec(),
      (v, CastMode::Convert) => match iterate(v) {
        Some(iter) => iter.collect_values()?,
        None => return self.mismatch(v),
      },
      (v, CastMode::Assert) => return self.mismatch(v),
    };
    let mut out = Vec::with_capacity(items.len());
    let mut checking = true;
    for (i, item) in items.into_iter().enumerate() {
      if !checking {
        out.push(item);
        continue;
      };
      match self.element(item, Some(i))? {
        Step::Checked(v) => out.push(v),
        Step::Unchecked(v) => {
          checking = false;
          out.push(v);
        }
        Step::Cast(nano) => return Ok(Err(nano)),
      }
    }
    Ok(Ok(Value::array(out)))
  }

  fn wrap_iter(self: &Rc<Self>, source: ValueIter) -> ValueIter {
    let this = self.clone();
    let mut checking = true;
    ValueIter::new(source.enumerate().map(move |(i, item)| {
      let item = item?;
      if !checking {
        return Ok(item);
      };
      match this.element(item, Some(i))? {
        Step::Checked(v) => Ok(v),
        Step::Unchecked(v) => {
          checking = false;
          Ok(v)
        }
        Step::Cast(nano) => Err(EvalError::Sentinel(nano)),
      }
    }))
  }

  fn wrap_async_iter(self: &Rc<Self>, source: AsyncValueIter) -> AsyncValueIter {
    let this = self.clone();
    let checking = Rc::new(Cell::new(true));
    let mut index = 0;
    AsyncValueIter::new(move || {
      let next = source.next()?;
      let i = index;
      index += 1;
      let this = this.clone();
      let checking = checking.clone();
      Some(next.then(move |item| {
        if !checking.get() {
          return Ok(item);
        };
        match this.element(item, Some(i))? {
          Step::Checked(v) => Ok(v),
          Step::Unchecked(v) => {
            checking.set(false);
            Ok(v)
          }
          Step::Cast(nano) => Err(EvalError::Sentinel(nano)),
        }
      }))
    })
  }

  /// Checks, and in convert mode converts, one value against the base type.
  fn element(&self, value: Value, index: Option<usize>) -> EvalResult<Step> {
    match self.check.test(&value)? {
      Verdict::Pass => Ok(Step::Checked(value)),
      Verdict::NoVerdict => {
        warn!(ty = %self.ty, "no predicate available for type; skipping further checks");
        Ok(Step::Unchecked(value))
      }
      Verdict::Fail => match self.mode {
        CastMode::Assert => Err(EvalError::TypeAssertion {
          expected: self.ty.base.clone(),
          found: value.class_name(),
          index,
        }),
        CastMode::Convert => self.convert(value),
      },
    }
  }

  fn convert(&self, value: Value) -> EvalResult<Step> {
    let failed = NanO::failed_cast(&value.class_name(), &self.ty.base);
    let Some(Value::Function(ty)) = self.env.resolve_type(&self.ty.base) else {
      return Ok(Step::Cast(failed));
    };
    let converted = match ty.call(vec![value]) {
      Ok(Value::Deferred(d)) => match d.force() {
        Ok(v) => v,
        Err(_) => return Ok(Step::Cast(failed)),
      },
      Ok(v) => v,
      Err(_) => return Ok(Step::Cast(failed)),
    };
    Ok(match self.check.test(&converted)? {
      Verdict::Pass | Verdict::NoVerdict => Step::Checked(converted),
      Verdict::Fail => Step::Cast(failed),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::value::PlainObject;

  fn assert_type(value: Value, ty: &ExprType) -> EvalResult<Soft> {
    check(&Env::new(), value, ty, CastMode::Assert)
  }

  #[test]
  fn lowercase_names_fall_back_to_type_tags() {
    let ty = ExprType::scalar("number");
    assert!(assert_type(Value::Number(1.0), &ty).unwrap().is_ok());
    assert!(matches!(
      assert_type(Value::string("1"), &ty),
      Err(EvalError::TypeAssertion { .. })
    ));
  }

  #[test]
  fn unknown_types_are_not_fatal() {
    let ty = ExprType::scalar("Mystery").with_cardinality(Cardinality::Array);
    let result = assert_type(Value::array(vec![1.0.into(), "a".into()]), &ty).unwrap();
    assert!(result.is_ok());
  }

  #[test]
  fn prototype_chains_satisfy_instance_checks() {
    struct Widget;
    impl crate::value::HostObject for Widget {
      fn class_name(&self) -> &str {
        "Widget"
      }
      fn get(&self, _key: &str) -> Option<Value> {
        None
      }
      fn prototype_chain(&self) -> Vec<String> {
        vec!["Widget".into(), "Object".into()]
      }
      fn as_any(&self) -> &dyn std::any::Any {
        self
      }
    }
    let env = Env::new().with_type("Widget", crate::function::NativeFunction::type_only("Widget"));
    let ty = ExprType::scalar("Widget");
    let ok = check(&env, Value::object(Widget), &ty, CastMode::Assert).unwrap();
    assert!(ok.is_ok());
    let err = check(&env, Value::object(PlainObject::new()), &ty, CastMode::Assert);
    assert!(matches!(err, Err(EvalError::TypeAssertion { .. })));
  }
}
