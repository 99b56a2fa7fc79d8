//! Tree-walking evaluator for bindings produced by `parse-bind`.
//!
//! Evaluation is synchronous. Values that are not available yet are represented by [`Deferred`] and are only waited on where a call or literal needs all of its members, or where `await` asks for it. Soft failures travel as [`NanO`] sentinels until `??`, a boolean context or the evaluation boundary deals with them.

use exec::Context;
use frame::Frame;
use parse_bind::binding::Binding;
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

// Unwraps a value, returning a live sentinel from the enclosing evaluation function.
macro_rules! soft {
  ($e:expr) => {
    match $e {
      Ok(v) => v,
      Err(nano) => return Ok(Err(nano)),
    }
  };
}

mod assert;
mod builtins;
mod callback;
mod deferred;
mod env;
mod error;
mod exec;
mod frame;
mod function;
mod iter;
mod nano;
mod value;

pub use builtins::to_boolean;
pub use builtins::to_number;
pub use builtins::to_string;
pub use builtins::FUNCTION_ROOT_CAPABILITIES;
pub use deferred::Deferred;
pub use deferred::Settle;
pub use env::CollectingReceiver;
pub use env::Env;
pub use env::OutputReceiver;
pub use env::Override;
pub use error::EvalError;
pub use error::EvalResult;
pub use function::arg;
pub use function::NativeFunction;
pub use iter::async_iterate;
pub use iter::iterate;
pub use iter::AsyncValueIter;
pub use iter::ValueIter;
pub use nano::NanO;
pub use nano::NanOKind;
pub use value::Callable;
pub use value::HostObject;
pub use value::PlainObject;
pub use value::Value;

/// What happens to a sentinel that is still live when evaluation finishes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Boundary {
  /// Every live sentinel is raised as [`EvalError::Sentinel`].
  Throw,
  /// Exceptional sentinels are raised; the others become [`Outcome::Absent`].
  Data,
}

#[derive(Clone, Debug)]
pub enum Outcome {
  /// An immediate value, or a [`Value::Deferred`] still to be waited on.
  Value(Value),
  /// No value: a non-exceptional sentinel reached a [`Boundary::Data`] boundary. Kept for diagnostics.
  Absent(NanO),
}

impl Outcome {
  /// The value, with an absent result read as undefined.
  pub fn into_value(self) -> Value {
    match self {
      Outcome::Value(v) => v,
      Outcome::Absent(_) => Value::Undefined,
    }
  }

  pub fn is_absent(&self) -> bool {
    matches!(self, Outcome::Absent(_))
  }
}

/// Evaluates `binding` against `env`.
///
/// The binding is only read, so the same binding can be evaluated any number of times, against different environments.
pub fn evaluate(binding: &Arc<Binding>, env: &Env, boundary: Boundary) -> EvalResult<Outcome> {
  debug!(source = binding.source(), ?boundary, "evaluating binding");
  let cx = Rc::new(Context {
    binding: binding.clone(),
    env: env.clone(),
  });
  match cx.eval(&Frame::root(), binding.ast())? {
    Ok(value) => Ok(Outcome::Value(value)),
    Err(nano) if nano.exceptional || boundary == Boundary::Throw => Err(EvalError::Sentinel(nano)),
    Err(nano) => {
      debug!(%nano, "binding produced no value");
      Ok(Outcome::Absent(nano))
    }
  }
}
