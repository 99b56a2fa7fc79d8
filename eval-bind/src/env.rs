use crate::builtins;
use crate::error::EvalResult;
use crate::value::Value;
use ahash::HashMap;
use ahash::HashMapExt;
use std::cell::RefCell;
use std::rc::Rc;

/// A method supplied by the override table: receives the receiver and the arguments.
pub type Override = Rc<dyn Fn(&Value, Vec<Value>) -> EvalResult<Value>>;

/// Receives the values written by `-> name` captures.
pub trait OutputReceiver {
  fn receive(&self, name: &str, declared_type: Option<&str>, value: Value) -> EvalResult<()>;
}

/// Keeps every captured value in memory.
#[derive(Default)]
pub struct CollectingReceiver {
  received: RefCell<Vec<(String, Value)>>,
}

impl CollectingReceiver {
  pub fn new() -> CollectingReceiver {
    CollectingReceiver::default()
  }

  pub fn take(&self) -> Vec<(String, Value)> {
    self.received.take()
  }
}

impl OutputReceiver for CollectingReceiver {
  fn receive(&self, name: &str, _declared_type: Option<&str>, value: Value) -> EvalResult<()> {
    self.received.borrow_mut().push((name.to_string(), value));
    Ok(())
  }
}

#[derive(Clone)]
struct EnvData {
  params: HashMap<String, Value>,
  imports: HashMap<String, Value>,
  types: HashMap<String, Value>,
  overrides: HashMap<String, HashMap<String, Override>>,
  receivers: HashMap<String, Rc<dyn OutputReceiver>>,
}

/// Everything an evaluation reads from outside the binding. Cheap to clone; closures created during evaluation keep a clone.
#[derive(Clone)]
pub struct Env {
  data: Rc<EnvData>,
}

impl Default for Env {
  fn default() -> Env {
    Env::new()
  }
}

impl Env {
  /// An environment with the built-in types and overrides installed.
  pub fn new() -> Env {
    let mut env = Env::bare();
    for (name, ty) in builtins::ambient_types() {
      env = env.with_type(name, ty);
    }
    for (class, method, f) in builtins::overrides() {
      env = env.with_override(class, method, move |receiver, args| f(receiver, args));
    }
    env
  }

  /// An environment without any built-ins.
  pub fn bare() -> Env {
    Env {
      data: Rc::new(EnvData {
        params: HashMap::new(),
        imports: HashMap::new(),
        types: HashMap::new(),
        overrides: HashMap::new(),
        receivers: HashMap::new(),
      }),
    }
  }

  fn data_mut(&mut self) -> &mut EnvData {
    Rc::make_mut(&mut self.data)
  }

  pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Env {
    self.data_mut().params.insert(name.into(), value.into());
    self
  }

  pub fn with_params<I, K>(mut self, params: I) -> Env
  where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
  {
    let data = self.data_mut();
    for (name, value) in params {
      data.params.insert(name.into(), value);
    }
    self
  }

  pub fn with_import(mut self, name: impl Into<String>, value: impl Into<Value>) -> Env {
    self.data_mut().imports.insert(name.into(), value.into());
    self
  }

  pub fn with_type(mut self, name: impl Into<String>, ty: impl Into<Value>) -> Env {
    self.data_mut().types.insert(name.into(), ty.into());
    self
  }

  pub fn with_override<F>(mut self, class: impl Into<String>, method: impl Into<String>, f: F) -> Env
  where
    F: Fn(&Value, Vec<Value>) -> EvalResult<Value> + 'static,
  {
    self
      .data_mut()
      .overrides
      .entry(class.into())
      .or_default()
      .insert(method.into(), Rc::new(f));
    self
  }

  pub fn with_receiver(mut self, name: impl Into<String>, receiver: Rc<dyn OutputReceiver>) -> Env {
    self.data_mut().receivers.insert(name.into(), receiver);
    self
  }

  pub fn param(&self, name: &str) -> Option<&Value> {
    self.data.params.get(name)
  }

  pub fn import(&self, name: &str) -> Option<&Value> {
    self.data.imports.get(name)
  }

  pub fn override_for(&self, class: &str, method: &str) -> Option<&Override> {
    self.data.overrides.get(class).and_then(|m| m.get(method))
  }

  pub fn receiver(&self, name: &str) -> Option<&Rc<dyn OutputReceiver>> {
    self.data.receivers.get(name)
  }

  /// Finds the runtime value of a possibly dotted type name. The first segment is looked up among imports, then registered types, then parameters; later segments are members.
  pub fn resolve_type(&self, name: &str) -> Option<Value> {
    let mut segments = name.split('.');
    let first = segments.next()?;
    let mut ty = self
      .import(first)
      .or_else(|| self.data.types.get(first))
      .or_else(|| self.param(first))
      .cloned()?;
    for segment in segments {
      ty = match &ty {
        Value::Function(f) => f.static_member(segment)?,
        Value::Object(o) if !o.is_private(segment) => o.get(segment)?,
        _ => return None,
      };
    }
    Some(ty)
  }
}
