use crate::deferred::Deferred;
use crate::error::EvalError;
use crate::error::EvalResult;
use crate::exec::Context;
use crate::frame::Frame;
use crate::value::Callable;
use crate::value::Value;
use parse_bind::ast::expr::CallbackExpr;
use parse_bind::ast::expr::CallbackId;
use std::rc::Rc;

/// A callback argument closed over the frame it was written in.
pub(crate) struct Closure {
  cx: Rc<Context>,
  frame: Frame,
  id: CallbackId,
  params: Vec<String>,
  is_async: bool,
}

impl Closure {
  pub(crate) fn new(cx: Rc<Context>, frame: Frame, callback: &CallbackExpr) -> Closure {
    Closure {
      cx,
      frame,
      id: callback.id,
      params: callback.params.clone(),
      is_async: callback.is_async,
    }
  }

  pub(crate) fn into_value(self) -> Value {
    Value::Function(Rc::new(self))
  }
}

/// Waits for deferred values the callback returned, including ones inside a returned array.
fn settle_nested(value: Value) -> Value {
  match value {
    Value::Deferred(d) => Value::Deferred(d.then(|v| Ok(settle_nested(v)))),
    Value::Array(items) if items.iter().any(|v| matches!(v, Value::Deferred(_))) => {
      Value::Deferred(Deferred::join_all(Rc::unwrap_or_clone(items)))
    }
    v => v,
  }
}

impl Callable for Closure {
  fn name(&self) -> &str {
    if self.is_async {
      "async callback"
    } else {
      "callback"
    }
  }

  fn call(&self, args: Vec<Value>) -> EvalResult<Value> {
    let mut args = args.into_iter();
    let bindings = self
      .params
      .iter()
      .map(|p| (p.clone(), args.next().unwrap_or(Value::Undefined)))
      .collect();
    let frame = self.frame.push(bindings);
    let body = self
      .cx
      .binding
      .callback_body(self.id)
      .ok_or_else(|| EvalError::Internal(format!("no body for callback {:?}", self.id)))?;
    let value = match self.cx.eval(&frame, body)? {
      Ok(v) => v,
      Err(nano) if nano.exceptional => return Err(EvalError::Sentinel(nano)),
      Err(_) => Value::Undefined,
    };
    match settle_nested(value) {
      v if self.is_async => Ok(Value::Deferred(Deferred::resolved(v))),
      Value::Deferred(d) if d.is_settled() => d.force(),
      v => Ok(v),
    }
  }
}
