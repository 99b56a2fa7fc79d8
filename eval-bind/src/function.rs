use crate::error::EvalError;
use crate::error::EvalResult;
use crate::value::Callable;
use crate::value::Value;
use std::rc::Rc;

type NativeFn = Rc<dyn Fn(Vec<Value>) -> EvalResult<Value>>;
type InstanceTest = Rc<dyn Fn(&Value) -> bool>;

/// A host function built from Rust closures.
#[derive(Clone)]
pub struct NativeFunction {
  name: String,
  call: Option<NativeFn>,
  construct: Option<NativeFn>,
  statics: Vec<(String, Value)>,
  instance_test: Option<InstanceTest>,
}

impl NativeFunction {
  pub fn new<F>(name: impl Into<String>, call: F) -> NativeFunction
  where
    F: Fn(Vec<Value>) -> EvalResult<Value> + 'static,
  {
    NativeFunction {
      name: name.into(),
      call: Some(Rc::new(call)),
      construct: None,
      statics: Vec::new(),
      instance_test: None,
    }
  }

  /// A function that can only be used as a type: it has no call behaviour of its own.
  pub fn type_only(name: impl Into<String>) -> NativeFunction {
    NativeFunction {
      name: name.into(),
      call: None,
      construct: None,
      statics: Vec::new(),
      instance_test: None,
    }
  }

  pub fn with_construct<F>(mut self, construct: F) -> NativeFunction
  where
    F: Fn(Vec<Value>) -> EvalResult<Value> + 'static,
  {
    self.construct = Some(Rc::new(construct));
    self
  }

  pub fn with_static(mut self, name: impl Into<String>, value: impl Into<Value>) -> NativeFunction {
    self.statics.push((name.into(), value.into()));
    self
  }

  pub fn with_instance_test<F>(mut self, test: F) -> NativeFunction
  where
    F: Fn(&Value) -> bool + 'static,
  {
    self.instance_test = Some(Rc::new(test));
    self
  }

  pub fn into_value(self) -> Value {
    Value::Function(Rc::new(self))
  }
}

impl From<NativeFunction> for Value {
  fn from(value: NativeFunction) -> Value {
    value.into_value()
  }
}

impl Callable for NativeFunction {
  fn name(&self) -> &str {
    &self.name
  }

  fn call(&self, args: Vec<Value>) -> EvalResult<Value> {
    match &self.call {
      Some(call) => call(args),
      None => Err(EvalError::Type(format!("`{}` is not callable", self.name))),
    }
  }

  fn construct(&self, args: Vec<Value>) -> EvalResult<Value> {
    match &self.construct {
      Some(construct) => construct(args),
      None => Err(EvalError::Type(format!("`{}` is not a constructor", self.name))),
    }
  }

  fn static_member(&self, name: &str) -> Option<Value> {
    self
      .statics
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, v)| v.clone())
  }

  fn has_instance(&self, value: &Value) -> Option<bool> {
    self.instance_test.as_ref().map(|test| test(value))
  }
}

/// Positional argument `i`, or undefined if it was not supplied.
pub fn arg(args: &[Value], i: usize) -> Value {
  args.get(i).cloned().unwrap_or(Value::Undefined)
}
