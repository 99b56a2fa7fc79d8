use crate::assert;
use crate::builtins::FUNCTION_ROOT_CAPABILITIES;
use crate::callback::Closure;
use crate::deferred::Deferred;
use crate::env::Env;
use crate::env::Override;
use crate::error::EvalError;
use crate::error::EvalResult;
use crate::frame::Frame;
use crate::iter::async_iterate;
use crate::iter::iterate;
use crate::nano::NanO;
use crate::value::Callable;
use crate::value::PlainObject;
use crate::value::Value;
use parse_bind::ast::expr::ArrayExpr;
use parse_bind::ast::expr::BinaryExpr;
use parse_bind::ast::expr::BinaryMeta;
use parse_bind::ast::expr::CallExpr;
use parse_bind::ast::expr::CaptureExpr;
use parse_bind::ast::expr::Expr;
use parse_bind::ast::expr::IndexExpr;
use parse_bind::ast::expr::LookupExpr;
use parse_bind::ast::expr::MethodExpr;
use parse_bind::ast::expr::ObjectExpr;
use parse_bind::ast::expr::Subscript;
use parse_bind::ast::expr::TernaryExpr;
use parse_bind::ast::expr::UnaryExpr;
use parse_bind::ast::node::Node;
use parse_bind::ast::types::LitValue;
use parse_bind::binding::Binding;
use parse_bind::operator::OperatorName;
use parse_bind::scope::topic_name;
use parse_bind::scope::Scope;
use std::rc::Rc;
use std::sync::Arc;
use tracing::trace;

/// The result of evaluating one node: a value, or a live sentinel standing in for one.
pub(crate) type Soft = Result<Value, NanO>;

/// What a single evaluation reads from. Shared by every closure the evaluation creates.
pub(crate) struct Context {
  pub binding: Arc<Binding>,
  pub env: Env,
}

enum MethodTarget {
  Override(Override),
  Callable(Rc<dyn Callable>),
}

impl Context {
  pub(crate) fn eval(self: &Rc<Self>, frame: &Frame, expr: &Node<Expr>) -> EvalResult<Soft> {
    match &*expr.stx {
      Expr::Literal(node) => Ok(Ok(Value::from(&node.stx.value))),
      Expr::Lookup(node) => self.eval_lookup(frame, &node.stx),
      Expr::Index(node) => self.eval_index(frame, &node.stx),
      Expr::Call(node) => self.eval_call(frame, &node.stx),
      Expr::Method(node) => self.eval_method(frame, &node.stx),
      Expr::Unary(node) => self.eval_unary(frame, &node.stx),
      Expr::Binary(node) => self.eval_binary(frame, &node.stx),
      Expr::Ternary(node) => self.eval_ternary(frame, &node.stx),
      Expr::Capture(node) => self.eval_capture(frame, &node.stx),
      Expr::Array(node) => self.eval_array(frame, &node.stx),
      Expr::Object(node) => self.eval_object(frame, &node.stx),
      Expr::Callback(node) => Ok(Ok(Closure::new(self.clone(), frame.clone(), &node.stx).into_value())),
    }
  }

  fn eval_lookup(&self, frame: &Frame, lookup: &LookupExpr) -> EvalResult<Soft> {
    match lookup.scope {
      Scope::Local => frame
        .get(&lookup.name)
        .map(Ok)
        .ok_or_else(|| EvalError::Internal(format!("local `{}` is not bound", lookup.name))),
      Scope::Import => self
        .env
        .import(&lookup.name)
        .cloned()
        .map(Ok)
        .ok_or_else(|| EvalError::Internal(format!("import `{}` was not supplied", lookup.name))),
      Scope::Global => {
        if let Some(value) = self.env.param(&lookup.name) {
          return Ok(Ok(value.clone()));
        };
        let default = lookup.default.as_ref().or_else(|| {
          self
            .binding
            .options()
            .iter()
            .find(|o| o.name == lookup.name)
            .and_then(|o| o.default.as_ref())
        });
        Ok(default.map(Value::from).ok_or_else(|| NanO::missing_global(&lookup.name)))
      }
    }
  }

  fn eval_index(self: &Rc<Self>, frame: &Frame, index: &IndexExpr) -> EvalResult<Soft> {
    let object = match self.eval(frame, &index.object)? {
      Ok(object) => object,
      Err(nano) => {
        return Ok(Err(NanO::unindexable(
          &self.subscript_text(&index.subscript),
          &format!("NanO ({nano})"),
        )))
      }
    };
    match &index.subscript {
      Subscript::Key(key) => {
        let key = soft!(self.eval(frame, key)?);
        Ok(read_key(&object, &key))
      }
      Subscript::Range { start, end } => {
        let start = match start {
          Some(e) => Some(soft!(self.eval(frame, e)?)),
          None => None,
        };
        let end = match end {
          Some(e) => Some(soft!(self.eval(frame, e)?)),
          None => None,
        };
        Ok(slice(&object, start.as_ref(), end.as_ref()))
      }
    }
  }

  /// The key as written, for messages about a subscript that was never evaluated.
  fn subscript_text(&self, subscript: &Subscript) -> String {
    match subscript {
      Subscript::Key(key) => match &*key.stx {
        Expr::Literal(lit) => Value::from(&lit.stx.value).to_string(),
        _ => self.binding.text(key.loc).to_string(),
      },
      Subscript::Range { start, end } => {
        let text = |e: &Option<Node<Expr>>| e.as_ref().map(|e| self.binding.text(e.loc)).unwrap_or("");
        format!("{}:{}", text(start), text(end))
      }
    }
  }

  /// Evaluates list members left to right, expanding spreads. Every member is evaluated even after a sentinel; the first sentinel wins.
  fn eval_list(self: &Rc<Self>, frame: &Frame, items: &[Node<Expr>]) -> EvalResult<Result<Vec<Value>, NanO>> {
    let mut values = Vec::with_capacity(items.len());
    let mut sentinel = None;
    for item in items {
      match &*item.stx {
        Expr::Unary(node) if node.stx.operator == OperatorName::Rest => {
          match self.eval(frame, &node.stx.argument)? {
            Ok(v) => values.extend(spread(&v)?),
            Err(nano) => {
              sentinel.get_or_insert(nano);
            }
          }
        }
        _ => match self.eval(frame, item)? {
          Ok(v) => values.push(v),
          Err(nano) => {
            sentinel.get_or_insert(nano);
          }
        },
      }
    }
    Ok(match sentinel {
      Some(nano) => Err(nano),
      None => Ok(values),
    })
  }

  fn eval_call(self: &Rc<Self>, frame: &Frame, call: &CallExpr) -> EvalResult<Soft> {
    let callee = soft!(self.eval_lookup(frame, &call.callee.stx)?);
    let args = soft!(self.eval_list(frame, &call.args)?);
    let name = call.callee.stx.name.clone();
    let Value::Function(function) = callee else {
      return Err(EvalError::Type(format!(
        "`{name}` is a {}, not a function",
        callee.class_name()
      )));
    };
    let construct = call.is_construct;
    materialize(args, move |args| invoke(&name, &*function, args, construct)).map(Ok)
  }

  fn eval_method(self: &Rc<Self>, frame: &Frame, method: &MethodExpr) -> EvalResult<Soft> {
    let receiver = soft!(self.eval(frame, &method.object)?);
    let args = soft!(self.eval_list(frame, &method.args)?);
    let target = soft!(self.resolve_method(&receiver, &method.name)?);
    let name = format!("{}.{}", receiver.class_name(), method.name);
    let construct = method.is_construct;
    materialize(args, move |args| match target {
      MethodTarget::Override(f) => {
        trace!(name = %name, "invoking override");
        f(&receiver, args).map_err(|cause| EvalError::Invocation {
          name,
          cause: Box::new(cause),
        })
      }
      MethodTarget::Callable(f) => invoke(&name, &*f, args, construct),
    })
    .map(Ok)
  }

  fn resolve_method(&self, receiver: &Value, name: &str) -> EvalResult<Result<MethodTarget, NanO>> {
    let class = receiver.class_name();
    if receiver.is_nullish() {
      return Ok(Err(NanO::unindexable(name, &class)));
    };
    if let Some(f) = self.env.override_for(&class, name) {
      return Ok(Ok(MethodTarget::Override(f.clone())));
    };
    Ok(match receiver {
      Value::Object(o) => match o.method(name) {
        Some(f) => Ok(MethodTarget::Callable(f)),
        None => match o.get(name) {
          Some(Value::Function(f)) if !o.is_private(name) => Ok(MethodTarget::Callable(f)),
          _ => Err(NanO::missing_method(name, &class)),
        },
      },
      Value::Function(f) => match f.static_member(name) {
        Some(Value::Function(member)) => Ok(MethodTarget::Callable(member)),
        _ if FUNCTION_ROOT_CAPABILITIES.contains(&name) => {
          return Err(EvalError::ForbiddenMethod(name.to_string()));
        }
        _ => Err(NanO::missing_method(name, f.name())),
      },
      _ => Err(NanO::missing_method(name, &class)),
    })
  }

  fn eval_unary(self: &Rc<Self>, frame: &Frame, unary: &UnaryExpr) -> EvalResult<Soft> {
    if unary.operator == OperatorName::LogicalNot {
      let truth = self.condition(frame, &unary.argument, "`!`")?;
      return Ok(Ok(Value::Bool(!truth)));
    };
    let value = soft!(self.eval(frame, &unary.argument)?);
    match unary.operator {
      OperatorName::Await => match value {
        Value::Deferred(d) => d.force().map(Ok),
        v => Ok(Ok(v)),
      },
      OperatorName::Iterate => match iterate(&value) {
        Some(iter) => Ok(Ok(Value::Iter(iter))),
        None => Err(not_iterable(&value)),
      },
      OperatorName::AsyncIterate => match async_iterate(&value) {
        Some(iter) => Ok(Ok(Value::AsyncIter(iter))),
        None => Err(not_iterable(&value)),
      },
      OperatorName::Typeof => Ok(Ok(Value::string(value.type_tag()))),
      OperatorName::Index => Ok(to_index(&value)),
      OperatorName::Rest => Err(EvalError::Internal("spread outside a list".into())),
      op => Err(EvalError::Internal(format!("{op:?} is not a unary operator"))),
    }
  }

  /// Evaluates a boolean context. A non-exceptional sentinel reads as false.
  fn condition(self: &Rc<Self>, frame: &Frame, expr: &Node<Expr>, what: &str) -> EvalResult<bool> {
    match self.eval(frame, expr)? {
      Ok(Value::Bool(b)) => Ok(b),
      Ok(v) => Err(EvalError::Type(format!(
        "{what} requires a boolean, found {}",
        v.class_name()
      ))),
      Err(nano) if nano.exceptional => Err(EvalError::Sentinel(nano)),
      Err(_) => Ok(false),
    }
  }

  fn eval_binary(self: &Rc<Self>, frame: &Frame, binary: &BinaryExpr) -> EvalResult<Soft> {
    match binary.operator {
      OperatorName::Alternation => match self.eval(frame, &binary.left)? {
        Err(nano) if !nano.exceptional => {
          trace!(%nano, "substituting alternate");
          self.eval(frame, &binary.right)
        }
        left => Ok(left),
      },
      OperatorName::Comma => {
        let _ = self.eval(frame, &binary.left)?;
        self.eval(frame, &binary.right)
      }
      OperatorName::Pipe => {
        let BinaryMeta::Topic(depth) = binary.meta else {
          return Err(EvalError::Internal("pipe without a topic depth".into()));
        };
        let topic = soft!(self.eval(frame, &binary.left)?);
        let frame = frame.push(vec![(topic_name(depth), topic)]);
        self.eval(&frame, &binary.right)
      }
      OperatorName::StrictEquality | OperatorName::StrictInequality => {
        let left = soft!(self.eval(frame, &binary.left)?);
        let right = soft!(self.eval(frame, &binary.right)?);
        let equal = left.strict_equals(&right);
        Ok(Ok(Value::Bool(
          equal == (binary.operator == OperatorName::StrictEquality),
        )))
      }
      OperatorName::PrototypeTest => {
        let value = soft!(self.eval(frame, &binary.left)?);
        let name = type_name_operand(binary)?;
        self.prototype_test(&value, name)
      }
      OperatorName::TypeAssert => {
        let BinaryMeta::Type { ty, mode } = &binary.meta else {
          return Err(EvalError::Internal("type assertion without a type".into()));
        };
        let value = soft!(self.eval(frame, &binary.left)?);
        assert::check(&self.env, value, ty, *mode)
      }
      op => Err(EvalError::Internal(format!("{op:?} is not a binary operator"))),
    }
  }

  fn prototype_test(&self, value: &Value, name: &str) -> EvalResult<Soft> {
    let Some(ty) = self.env.resolve_type(name) else {
      return Ok(Err(NanO::missing_global(name)));
    };
    let Value::Function(ty) = ty else {
      return Err(EvalError::Type(format!("`{name}` is not a type")));
    };
    let is_instance = match ty.has_instance(value) {
      Some(b) => b,
      None => {
        let short = name.rsplit('.').next().unwrap_or(name);
        match value {
          Value::Object(o) => o.prototype_chain().iter().any(|c| c == short),
          _ => false,
        }
      }
    };
    Ok(Ok(Value::Bool(is_instance)))
  }

  fn eval_ternary(self: &Rc<Self>, frame: &Frame, ternary: &TernaryExpr) -> EvalResult<Soft> {
    let branch = if self.condition(frame, &ternary.test, "a conditional")? {
      &ternary.consequent
    } else {
      &ternary.alternate
    };
    self.eval(frame, branch)
  }

  fn eval_capture(self: &Rc<Self>, frame: &Frame, capture: &CaptureExpr) -> EvalResult<Soft> {
    let value = soft!(self.eval(frame, &capture.source)?);
    let name = &capture.dest.stx.name;
    let receiver = self
      .env
      .receiver(name)
      .ok_or_else(|| EvalError::NoReceiver(name.clone()))?;
    trace!(name = %name, "capturing result");
    receiver.receive(name, capture.ty.as_deref(), value)?;
    Ok(Ok(Value::Undefined))
  }

  fn eval_array(self: &Rc<Self>, frame: &Frame, array: &ArrayExpr) -> EvalResult<Soft> {
    let items = soft!(self.eval_list(frame, &array.elements)?);
    materialize(items, |items| Ok(Value::array(items))).map(Ok)
  }

  fn eval_object(self: &Rc<Self>, frame: &Frame, object: &ObjectExpr) -> EvalResult<Soft> {
    let mut keys = Vec::new();
    let mut values = Vec::new();
    let mut sentinel = None;
    for member in &object.members {
      let value = match self.eval(frame, &member.stx.value)? {
        Ok(v) => v,
        Err(nano) => {
          sentinel.get_or_insert(nano);
          continue;
        }
      };
      match &member.stx.key {
        Some(key) => {
          keys.push(key.clone());
          values.push(value);
        }
        None => {
          for (key, value) in spread_entries(&value)? {
            keys.push(key);
            values.push(value);
          }
        }
      }
    }
    if let Some(nano) = sentinel {
      return Ok(Err(nano));
    };
    materialize(values, move |values| {
      let mut object = PlainObject::new();
      for (key, value) in keys.into_iter().zip(values) {
        object.insert(key, value);
      }
      Ok(Value::object(object))
    })
    .map(Ok)
  }
}

/// Runs `then` on the list once every deferred member has settled. Lists without deferred members run immediately.
fn materialize<F>(values: Vec<Value>, then: F) -> EvalResult<Value>
where
  F: FnOnce(Vec<Value>) -> EvalResult<Value> + 'static,
{
  if !values.iter().any(|v| matches!(v, Value::Deferred(_))) {
    return then(values);
  };
  trace!(count = values.len(), "waiting on deferred list members");
  let joined = Deferred::join_all(values).then(move |joined| match joined {
    Value::Array(items) => then(Rc::unwrap_or_clone(items)),
    v => Err(EvalError::Internal(format!(
      "joined list settled to {}",
      v.class_name()
    ))),
  });
  Ok(Value::Deferred(joined))
}

fn invoke(name: &str, function: &dyn Callable, args: Vec<Value>, construct: bool) -> EvalResult<Value> {
  trace!(name, construct, args = args.len(), "invoking");
  let result = if construct {
    function.construct(args)
  } else {
    function.call(args)
  };
  result.map_err(|cause| EvalError::Invocation {
    name: name.to_string(),
    cause: Box::new(cause),
  })
}

fn not_iterable(value: &Value) -> EvalError {
  EvalError::Type(format!("{} is not iterable", value.class_name()))
}

fn spread(value: &Value) -> EvalResult<Vec<Value>> {
  match iterate(value) {
    Some(iter) => iter.collect_values(),
    None => Err(EvalError::Type(format!(
      "cannot spread {}: not iterable",
      value.class_name()
    ))),
  }
}

fn spread_entries(value: &Value) -> EvalResult<Vec<(String, Value)>> {
  match value {
    Value::Undefined | Value::Null => Ok(Vec::new()),
    Value::Object(o) => Ok(
      o.keys()
        .into_iter()
        .filter_map(|k| o.get(&k).map(|v| (k, v)))
        .collect(),
    ),
    Value::Array(items) => Ok(
      items
        .iter()
        .enumerate()
        .map(|(i, v)| (i.to_string(), v.clone()))
        .collect(),
    ),
    v => Err(EvalError::Type(format!(
      "cannot spread {} into an object",
      v.class_name()
    ))),
  }
}

fn type_name_operand(binary: &BinaryExpr) -> EvalResult<&str> {
  match binary.right.stx.as_literal() {
    Some(LitValue::String(name)) => Ok(name),
    _ => Err(EvalError::Internal("type operand is not a name".into())),
  }
}

fn char_count(s: &str) -> usize {
  s.chars().count()
}

/// `object[key]`.
fn read_key(object: &Value, key: &Value) -> Soft {
  match object {
    Value::Undefined | Value::Null => {
      return Err(NanO::unindexable(&key.to_string(), &object.class_name()));
    }
    Value::Deferred(_) => {
      return Err(NanO::missing_property(&key.to_string(), "Deferred"));
    }
    _ => {}
  };
  match key {
    Value::Number(n) => read_position(object, *n),
    key => read_property(object, &key.to_string()),
  }
}

fn read_property(object: &Value, name: &str) -> Soft {
  let found = match object {
    Value::Array(items) if name == "length" => Some(Value::Number(items.len() as f64)),
    Value::String(s) if name == "length" => Some(Value::Number(char_count(s) as f64)),
    Value::Object(o) if !o.is_private(name) => o.get(name),
    Value::Function(f) => f.static_member(name),
    _ => None,
  };
  found.ok_or_else(|| NanO::missing_property(name, &object.class_name()))
}

fn position(n: f64, length: usize) -> Option<usize> {
  (n.fract() == 0.0 && n >= 0.0 && n < length as f64).then_some(n as usize)
}

fn read_position(object: &Value, n: f64) -> Soft {
  let index = Value::Number(n);
  match object {
    Value::Array(items) => position(n, items.len())
      .map(|i| items[i].clone())
      .ok_or_else(|| NanO::out_of_range(&index, items.len())),
    Value::String(s) => {
      let length = char_count(s);
      position(n, length)
        .and_then(|i| s.chars().nth(i))
        .map(|c| Value::string(c.to_string()))
        .ok_or_else(|| NanO::out_of_range(&index, length))
    }
    _ => read_property(object, &index.to_string()),
  }
}

fn bound(value: Option<&Value>, default: usize) -> Option<f64> {
  match value {
    None => Some(default as f64),
    Some(Value::Number(n)) if n.fract() == 0.0 => Some(*n),
    Some(_) => None,
  }
}

/// `object[start:end]`. Both bounds must be whole numbers with `0 <= start <= end <= length`.
fn slice(object: &Value, start: Option<&Value>, end: Option<&Value>) -> Soft {
  let length = match object {
    Value::Array(items) => items.len(),
    Value::String(s) => char_count(s),
    v => {
      return Err(NanO::unindexable("[:]", &v.class_name()));
    }
  };
  let describe = |v: Option<&Value>| v.map(|v| v.to_string()).unwrap_or_default();
  let out_of_range = || {
    NanO::out_of_range(
      format!("{}:{}", describe(start), describe(end)),
      length,
    )
  };
  let (Some(from), Some(to)) = (bound(start, 0), bound(end, length)) else {
    return Err(out_of_range());
  };
  if from < 0.0 || from > to || to > length as f64 {
    return Err(out_of_range());
  };
  let (from, to) = (from as usize, to as usize);
  Ok(match object {
    Value::Array(items) => Value::array(items[from..to].to_vec()),
    Value::String(s) => Value::string(s.chars().skip(from).take(to - from).collect::<String>()),
    _ => Value::Undefined,
  })
}

/// Unary `+`: an integral number, or a string spelling one.
fn to_index(value: &Value) -> Soft {
  let failed = || NanO::failed_cast(&value.class_name(), "index");
  match value.identity() {
    Value::Number(n) if n.fract() == 0.0 => Ok(Value::Number(n)),
    Value::String(s) => s
      .trim()
      .parse::<i64>()
      .map(|n| Value::Number(n as f64))
      .map_err(|_| failed()),
    _ => Err(failed()),
  }
}
