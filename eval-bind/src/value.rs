use crate::deferred::Deferred;
use crate::error::EvalError;
use crate::error::EvalResult;
use crate::iter::AsyncValueIter;
use crate::iter::ValueIter;
use ahash::HashSet;
use parse_bind::ast::types::LitValue;
use std::any::Any;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::rc::Rc;

/// A value produced or consumed by an evaluation.
///
/// Host objects and functions sit behind the [`HostObject`] and [`Callable`] traits; everything the evaluator can do with a value is one of the capabilities those traits expose.
#[derive(Clone)]
pub enum Value {
  Undefined,
  Null,
  Bool(bool),
  Number(f64),
  String(Rc<str>),
  Array(Rc<Vec<Value>>),
  Object(Rc<dyn HostObject>),
  Function(Rc<dyn Callable>),
  Deferred(Deferred),
  Iter(ValueIter),
  AsyncIter(AsyncValueIter),
}

/// A host object. Only `class_name` and `get` are required; every other capability defaults to absent.
pub trait HostObject {
  fn class_name(&self) -> &str;

  fn get(&self, key: &str) -> Option<Value>;

  /// Enumerable keys, in order.
  fn keys(&self) -> Vec<String> {
    Vec::new()
  }

  /// Keys hidden from property reads and spreads.
  fn is_private(&self, _key: &str) -> bool {
    false
  }

  /// A method bound to this object.
  fn method(&self, _name: &str) -> Option<Rc<dyn Callable>> {
    None
  }

  fn iterate(&self) -> Option<ValueIter> {
    None
  }

  fn async_iterate(&self) -> Option<AsyncValueIter> {
    None
  }

  /// The underlying value of a wrapper, used when comparing for equality.
  fn identity(&self) -> Option<Value> {
    None
  }

  /// Class names this object is an instance of, most derived first.
  fn prototype_chain(&self) -> Vec<String> {
    vec![self.class_name().to_string()]
  }

  fn as_any(&self) -> &dyn Any;
}

pub trait Callable {
  fn name(&self) -> &str;

  fn call(&self, args: Vec<Value>) -> EvalResult<Value>;

  fn construct(&self, _args: Vec<Value>) -> EvalResult<Value> {
    Err(EvalError::Type(format!("`{}` is not a constructor", self.name())))
  }

  fn static_member(&self, _name: &str) -> Option<Value> {
    None
  }

  /// Whether `value` is an instance of this type, or None if the type cannot tell.
  fn has_instance(&self, _value: &Value) -> Option<bool> {
    None
  }
}

fn same_rc<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
  Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

impl Value {
  pub fn string(s: impl AsRef<str>) -> Value {
    Value::String(Rc::from(s.as_ref()))
  }

  pub fn array(items: Vec<Value>) -> Value {
    Value::Array(Rc::new(items))
  }

  pub fn object(object: impl HostObject + 'static) -> Value {
    Value::Object(Rc::new(object))
  }

  pub fn function(function: impl Callable + 'static) -> Value {
    Value::Function(Rc::new(function))
  }

  pub fn is_nullish(&self) -> bool {
    matches!(self, Value::Undefined | Value::Null)
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_number(&self) -> Option<f64> {
    match self {
      Value::Number(n) => Some(*n),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  /// The dynamic type tag, as `typeof` reports it.
  pub fn type_tag(&self) -> &'static str {
    match self {
      Value::Undefined => "undefined",
      Value::Bool(_) => "boolean",
      Value::Number(_) => "number",
      Value::String(_) => "string",
      Value::Function(_) => "function",
      Value::Null
      | Value::Array(_)
      | Value::Object(_)
      | Value::Deferred(_)
      | Value::Iter(_)
      | Value::AsyncIter(_) => "object",
    }
  }

  /// The name used for this value's kind in messages and in the override table.
  pub fn class_name(&self) -> String {
    match self {
      Value::Undefined => "undefined".into(),
      Value::Null => "null".into(),
      Value::Bool(_) => "Boolean".into(),
      Value::Number(_) => "Number".into(),
      Value::String(_) => "String".into(),
      Value::Array(_) => "Array".into(),
      Value::Object(o) => o.class_name().into(),
      Value::Function(_) => "Function".into(),
      Value::Deferred(_) => "Deferred".into(),
      Value::Iter(_) => "Iterator".into(),
      Value::AsyncIter(_) => "AsyncIterator".into(),
    }
  }

  /// Unwraps host wrappers to the value they stand for.
  pub fn identity(&self) -> Value {
    match self {
      Value::Object(o) => o.identity().unwrap_or_else(|| self.clone()),
      v => v.clone(),
    }
  }

  /// `===`: primitives compare by value, everything else by reference, after unwrapping wrappers.
  pub fn strict_equals(&self, other: &Value) -> bool {
    match (self.identity(), other.identity()) {
      (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::Number(a), Value::Number(b)) => a == b,
      (Value::String(a), Value::String(b)) => a == b,
      (Value::Array(a), Value::Array(b)) => same_rc(&a, &b),
      (Value::Object(a), Value::Object(b)) => same_rc(&a, &b),
      (Value::Function(a), Value::Function(b)) => same_rc(&a, &b),
      (Value::Deferred(a), Value::Deferred(b)) => a.same(&b),
      (Value::Iter(a), Value::Iter(b)) => a.same(&b),
      (Value::AsyncIter(a), Value::AsyncIter(b)) => a.same(&b),
      _ => false,
    }
  }

  /// Text used when joining values into a string: absent values become empty.
  pub fn join_text(&self) -> String {
    match self {
      Value::Undefined | Value::Null => String::new(),
      v => v.to_string(),
    }
  }
}

impl From<&LitValue> for Value {
  fn from(value: &LitValue) -> Value {
    match value {
      LitValue::Undefined => Value::Undefined,
      LitValue::Null => Value::Null,
      LitValue::Bool(b) => Value::Bool(*b),
      LitValue::Number(n) => Value::Number(*n),
      LitValue::String(s) => Value::string(s),
    }
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Value {
    Value::Bool(value)
  }
}

impl From<f64> for Value {
  fn from(value: f64) -> Value {
    Value::Number(value)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Value {
    Value::string(value)
  }
}

impl From<String> for Value {
  fn from(value: String) -> Value {
    Value::String(Rc::from(value))
  }
}

impl From<Vec<Value>> for Value {
  fn from(value: Vec<Value>) -> Value {
    Value::array(value)
  }
}

impl From<Deferred> for Value {
  fn from(value: Deferred) -> Value {
    Value::Deferred(value)
  }
}

fn fmt_number(f: &mut Formatter<'_>, n: f64) -> fmt::Result {
  if n.is_nan() {
    f.write_str("NaN")
  } else if n.is_infinite() {
    f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
  } else {
    write!(f, "{n}")
  }
}

impl Display for Value {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Value::Undefined => f.write_str("undefined"),
      Value::Null => f.write_str("null"),
      Value::Bool(b) => write!(f, "{b}"),
      Value::Number(n) => fmt_number(f, *n),
      Value::String(s) => f.write_str(s),
      Value::Array(items) => {
        for (i, item) in items.iter().enumerate() {
          if i > 0 {
            f.write_str(",")?;
          };
          f.write_str(&item.join_text())?;
        }
        Ok(())
      }
      Value::Object(o) => match o.identity() {
        Some(v) => write!(f, "{v}"),
        None => write!(f, "[object {}]", o.class_name()),
      },
      Value::Function(func) => write!(f, "[function {}]", func.name()),
      Value::Deferred(_) => f.write_str("[deferred]"),
      Value::Iter(_) => f.write_str("[iterator]"),
      Value::AsyncIter(_) => f.write_str("[async iterator]"),
    }
  }
}

impl Debug for Value {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Value::String(s) => write!(f, "{s:?}"),
      Value::Array(items) => f.debug_list().entries(items.iter()).finish(),
      Value::Object(o) => {
        let mut map = f.debug_map();
        for key in o.keys() {
          if let Some(v) = o.get(&key) {
            map.entry(&key, &v);
          };
        }
        map.finish()
      }
      Value::Deferred(d) => write!(f, "{d:?}"),
      v => write!(f, "{v}"),
    }
  }
}

/// The record type produced by object literals: ordered entries plus an explicit deny-list of keys hidden from reads.
#[derive(Clone, Default)]
pub struct PlainObject {
  entries: Vec<(String, Value)>,
  private: HashSet<String>,
}

impl PlainObject {
  pub fn new() -> PlainObject {
    PlainObject::default()
  }

  pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> PlainObject {
    self.insert(key.into(), value.into());
    self
  }

  pub fn with_private(mut self, key: impl Into<String>) -> PlainObject {
    self.private.insert(key.into());
    self
  }

  /// Sets `key`, keeping its original position if it already exists.
  pub fn insert(&mut self, key: String, value: Value) {
    match self.entries.iter_mut().find(|(k, _)| *k == key) {
      Some(entry) => entry.1 = value,
      None => self.entries.push((key, value)),
    };
  }

  pub fn entries(&self) -> &[(String, Value)] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl HostObject for PlainObject {
  fn class_name(&self) -> &str {
    "Object"
  }

  fn get(&self, key: &str) -> Option<Value> {
    self
      .entries
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.clone())
  }

  fn keys(&self) -> Vec<String> {
    self
      .entries
      .iter()
      .filter(|(k, _)| !self.private.contains(k))
      .map(|(k, _)| k.clone())
      .collect()
  }

  fn is_private(&self, key: &str) -> bool {
    self.private.contains(key)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }
}
