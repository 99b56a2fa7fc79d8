use crate::deferred::Deferred;
use crate::env::Override;
use crate::error::EvalError;
use crate::error::EvalResult;
use crate::function::arg;
use crate::function::NativeFunction;
use crate::iter::iterate;
use crate::value::Value;
use std::rc::Rc;

/// Methods inherited from the function root type. Calling them on a function value would extract or rebind it, so they are refused unless the function exposes the name itself.
pub const FUNCTION_ROOT_CAPABILITIES: [&str; 5] = ["call", "apply", "bind", "toString", "constructor"];

fn predicate<F>(name: &str, test: F) -> Value
where
  F: Fn(&Value) -> bool + 'static,
{
  NativeFunction::new(name, move |args| Ok(Value::Bool(test(&arg(&args, 0))))).into_value()
}

fn conversion_error(value: &Value, to: &str) -> EvalError {
  EvalError::Host(format!("cannot convert {} to {to}", value.class_name()))
}

pub fn to_string(value: &Value) -> EvalResult<Value> {
  match value.identity() {
    v @ Value::String(_) => Ok(v),
    v @ (Value::Bool(_) | Value::Number(_) | Value::Null | Value::Undefined) => {
      Ok(Value::string(v.to_string()))
    }
    v => Err(conversion_error(&v, "String")),
  }
}

pub fn to_number(value: &Value) -> EvalResult<Value> {
  let n = match value.identity() {
    Value::Number(n) => n,
    Value::Bool(b) => f64::from(u8::from(b)),
    Value::String(s) => s
      .trim()
      .parse::<f64>()
      .map_err(|_| conversion_error(value, "Number"))?,
    v => return Err(conversion_error(&v, "Number")),
  };
  Ok(Value::Number(n))
}

pub fn to_boolean(value: &Value) -> EvalResult<Value> {
  match value.identity() {
    v @ Value::Bool(_) => Ok(v),
    Value::Number(n) => Ok(Value::Bool(n != 0.0 && !n.is_nan())),
    Value::String(s) if &*s == "true" => Ok(Value::Bool(true)),
    Value::String(s) if &*s == "false" => Ok(Value::Bool(false)),
    v => Err(conversion_error(&v, "Boolean")),
  }
}

fn is_string(v: &Value) -> bool {
  matches!(v.identity(), Value::String(_))
}

fn is_number(v: &Value) -> bool {
  matches!(v.identity(), Value::Number(_))
}

fn is_boolean(v: &Value) -> bool {
  matches!(v.identity(), Value::Bool(_))
}

/// The types visible to `instanceof` and type assertions without being supplied by the host.
pub fn ambient_types() -> Vec<(&'static str, Value)> {
  let string = NativeFunction::new("String", |args| to_string(&arg(&args, 0)))
    .with_static("isString", predicate("isString", is_string))
    .with_instance_test(is_string);
  let number = NativeFunction::new("Number", |args| to_number(&arg(&args, 0)))
    .with_static("isNumber", predicate("isNumber", is_number))
    .with_static(
      "isInteger",
      predicate("isInteger", |v| matches!(v, Value::Number(n) if n.fract() == 0.0)),
    )
    .with_instance_test(is_number);
  let boolean = NativeFunction::new("Boolean", |args| to_boolean(&arg(&args, 0)))
    .with_static("isBoolean", predicate("isBoolean", is_boolean))
    .with_instance_test(is_boolean);
  let array = NativeFunction::new("Array", |args| {
    if let [single] = args.as_slice() {
      if let Some(iter) = iterate(single) {
        return Ok(Value::array(iter.collect_values()?));
      };
    };
    Ok(Value::array(args))
  })
  .with_static(
    "isArray",
    predicate("isArray", |v| matches!(v, Value::Array(_))),
  )
  .with_instance_test(|v| matches!(v, Value::Array(_)));
  let object = NativeFunction::new("Object", |args| match arg(&args, 0) {
    v @ (Value::Object(_) | Value::Array(_) | Value::Function(_)) => Ok(v),
    v => Err(conversion_error(&v, "Object")),
  })
  .with_instance_test(|v| matches!(v, Value::Object(_) | Value::Array(_) | Value::Function(_)));
  let function = NativeFunction::type_only("Function")
    .with_instance_test(|v| matches!(v, Value::Function(_)));
  vec![
    ("String", string.into_value()),
    ("Number", number.into_value()),
    ("Boolean", boolean.into_value()),
    ("Array", array.into_value()),
    ("Object", object.into_value()),
    ("Function", function.into_value()),
  ]
}

fn call_value(f: &Value, args: Vec<Value>) -> EvalResult<Value> {
  match f {
    Value::Function(f) => f.call(args),
    v => Err(EvalError::Type(format!("{} is not a function", v.class_name()))),
  }
}

fn receiver_items(receiver: &Value) -> EvalResult<&[Value]> {
  match receiver {
    Value::Array(items) => Ok(items.as_slice()),
    v => Err(EvalError::Internal(format!("array method called on {}", v.class_name()))),
  }
}

fn receiver_str(receiver: &Value) -> EvalResult<&str> {
  receiver
    .as_str()
    .ok_or_else(|| EvalError::Internal(format!("string method called on {}", receiver.class_name())))
}

fn string_arg(args: &[Value], i: usize, method: &str) -> EvalResult<Rc<str>> {
  match arg(args, i) {
    Value::String(s) => Ok(s),
    v => Err(EvalError::Type(format!(
      "argument {} of `{method}` must be a string, found {}",
      i + 1,
      v.class_name()
    ))),
  }
}

/// Resolves a relative index the way `slice` and `at` do: negative counts from the end.
fn relative_index(value: &Value, len: usize, default: usize) -> EvalResult<usize> {
  match value {
    Value::Undefined => Ok(default),
    Value::Number(n) if n.fract() == 0.0 => {
      let len = len as f64;
      let i = if *n < 0.0 { (len + n).max(0.0) } else { n.min(len) };
      Ok(i as usize)
    }
    v => Err(EvalError::Type(format!("expected an integer index, found {}", v.class_name()))),
  }
}

fn join(receiver: &Value, args: Vec<Value>) -> EvalResult<Value> {
  let items = receiver_items(receiver)?;
  let sep = match arg(&args, 0) {
    Value::Undefined => Rc::from(","),
    _ => string_arg(&args, 0, "join")?,
  };
  let text = items
    .iter()
    .map(Value::join_text)
    .collect::<Vec<_>>()
    .join(&*sep);
  Ok(Value::string(text))
}

fn map(receiver: &Value, args: Vec<Value>) -> EvalResult<Value> {
  let f = arg(&args, 0);
  let mapped = receiver_items(receiver)?
    .iter()
    .enumerate()
    .map(|(i, v)| call_value(&f, vec![v.clone(), Value::Number(i as f64)]))
    .collect::<EvalResult<Vec<_>>>()?;
  if mapped.iter().any(|v| matches!(v, Value::Deferred(_))) {
    return Ok(Value::Deferred(Deferred::join_all(mapped)));
  };
  Ok(Value::array(mapped))
}

fn keep_selected(items: &[Value], verdicts: &[Value]) -> EvalResult<Value> {
  let mut kept = Vec::new();
  for (item, verdict) in items.iter().zip(verdicts) {
    match verdict {
      Value::Bool(true) => kept.push(item.clone()),
      Value::Bool(false) => {}
      v => {
        return Err(EvalError::Type(format!(
          "filter callback must return a boolean, found {}",
          v.class_name()
        )))
      }
    };
  }
  Ok(Value::array(kept))
}

fn filter(receiver: &Value, args: Vec<Value>) -> EvalResult<Value> {
  let f = arg(&args, 0);
  let items = receiver_items(receiver)?.to_vec();
  let verdicts = items
    .iter()
    .enumerate()
    .map(|(i, v)| call_value(&f, vec![v.clone(), Value::Number(i as f64)]))
    .collect::<EvalResult<Vec<_>>>()?;
  if verdicts.iter().any(|v| matches!(v, Value::Deferred(_))) {
    let joined = Deferred::join_all(verdicts).then(move |verdicts| match verdicts {
      Value::Array(verdicts) => keep_selected(&items, &verdicts),
      _ => Err(EvalError::Internal("join did not produce an array".into())),
    });
    return Ok(Value::Deferred(joined));
  };
  keep_selected(&items, &verdicts)
}

fn array_includes(receiver: &Value, args: Vec<Value>) -> EvalResult<Value> {
  let needle = arg(&args, 0);
  Ok(Value::Bool(
    receiver_items(receiver)?.iter().any(|v| v.strict_equals(&needle)),
  ))
}

fn slice(receiver: &Value, args: Vec<Value>) -> EvalResult<Value> {
  let items = receiver_items(receiver)?;
  let start = relative_index(&arg(&args, 0), items.len(), 0)?;
  let end = relative_index(&arg(&args, 1), items.len(), items.len())?;
  Ok(Value::array(items.get(start..end.max(start)).unwrap_or(&[]).to_vec()))
}

fn at(receiver: &Value, args: Vec<Value>) -> EvalResult<Value> {
  let items = receiver_items(receiver)?;
  let Value::Number(n) = arg(&args, 0) else {
    return Err(EvalError::Type("`at` expects a number".into()));
  };
  let i = if n < 0.0 { items.len() as f64 + n } else { n };
  if i < 0.0 || i.fract() != 0.0 {
    return Ok(Value::Undefined);
  };
  Ok(items.get(i as usize).cloned().unwrap_or(Value::Undefined))
}

fn split(receiver: &Value, args: Vec<Value>) -> EvalResult<Value> {
  let s = receiver_str(receiver)?;
  let parts = match arg(&args, 0) {
    Value::Undefined => vec![Value::string(s)],
    _ => {
      let sep = string_arg(&args, 0, "split")?;
      if sep.is_empty() {
        s.chars().map(|c| Value::string(c.to_string())).collect()
      } else {
        s.split(&*sep).map(Value::string).collect()
      }
    }
  };
  Ok(Value::array(parts))
}

fn string_method(f: fn(&str) -> String) -> impl Fn(&Value, Vec<Value>) -> EvalResult<Value> {
  move |receiver, _| Ok(Value::string(f(receiver_str(receiver)?)))
}

fn string_test(
  method: &'static str,
  f: fn(&str, &str) -> bool,
) -> impl Fn(&Value, Vec<Value>) -> EvalResult<Value> {
  move |receiver, args| {
    let needle = string_arg(&args, 0, method)?;
    Ok(Value::Bool(f(receiver_str(receiver)?, &needle)))
  }
}

fn entry<F>(class: &'static str, method: &'static str, f: F) -> (&'static str, &'static str, Override)
where
  F: Fn(&Value, Vec<Value>) -> EvalResult<Value> + 'static,
{
  let f: Override = Rc::new(f);
  (class, method, f)
}

/// Methods that take precedence over a receiver's own, keyed by class name.
pub fn overrides() -> Vec<(&'static str, &'static str, Override)> {
  vec![
    entry("Array", "join", join),
    entry("Array", "map", map),
    entry("Array", "filter", filter),
    entry("Array", "includes", array_includes),
    entry("Array", "slice", slice),
    entry("Array", "at", at),
    entry("String", "split", split),
    entry("String", "trim", string_method(|s| s.trim().to_string())),
    entry("String", "toUpperCase", string_method(str::to_uppercase)),
    entry("String", "toLowerCase", string_method(str::to_lowercase)),
    entry("String", "includes", string_test("includes", |s, n| s.contains(n))),
    entry("String", "startsWith", string_test("startsWith", |s, n| s.starts_with(n))),
    entry("String", "endsWith", string_test("endsWith", |s, n| s.ends_with(n))),
  ]
}
