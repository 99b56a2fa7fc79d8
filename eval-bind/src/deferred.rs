use crate::error::EvalError;
use crate::error::EvalResult;
use crate::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::mem;
use std::rc::Rc;
use std::task::Poll;
use tracing::trace;

type PollFn = Box<dyn FnMut() -> Poll<EvalResult<Value>>>;

enum State {
  // Settled from outside through a `Settle` handle.
  Waiting,
  // Settled by driving the source function.
  Polling(PollFn),
  Settled(EvalResult<Value>),
}

/// A value that may not be available yet.
///
/// Nothing runs in the background: a deferred value settles either when its [`Settle`] handle is used or when polling its source reports completion. A deferred value that settles to another deferred value adopts it.
#[derive(Clone)]
pub struct Deferred(Rc<RefCell<State>>);

/// The producing side of [`Deferred::channel`].
pub struct Settle(Deferred);

impl Deferred {
  fn with_state(state: State) -> Deferred {
    Deferred(Rc::new(RefCell::new(state)))
  }

  pub fn resolved(value: Value) -> Deferred {
    Deferred::with_state(State::Settled(Ok(value)))
  }

  pub fn rejected(error: EvalError) -> Deferred {
    Deferred::with_state(State::Settled(Err(error)))
  }

  pub fn channel() -> (Deferred, Settle) {
    let deferred = Deferred::with_state(State::Waiting);
    (deferred.clone(), Settle(deferred))
  }

  /// A deferred value settled by repeatedly calling `source` until it is ready. `source` is not called again afterwards.
  pub fn from_poll<F>(source: F) -> Deferred
  where
    F: FnMut() -> Poll<EvalResult<Value>> + 'static,
  {
    Deferred::with_state(State::Polling(Box::new(source)))
  }

  pub fn same(&self, other: &Deferred) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }

  fn settle(&self, result: EvalResult<Value>) {
    trace!(ok = result.is_ok(), "deferred settled");
    *self.0.borrow_mut() = State::Settled(result);
  }

  /// Drives the value towards settlement without blocking.
  pub fn poll(&self) -> Poll<EvalResult<Value>> {
    let state = mem::replace(&mut *self.0.borrow_mut(), State::Waiting);
    let result = match state {
      State::Waiting => return Poll::Pending,
      State::Settled(result) => {
        *self.0.borrow_mut() = State::Settled(result.clone());
        result
      }
      State::Polling(mut source) => match source() {
        Poll::Pending => {
          *self.0.borrow_mut() = State::Polling(source);
          return Poll::Pending;
        }
        Poll::Ready(result) => {
          self.settle(result.clone());
          result
        }
      },
    };
    match result {
      Ok(Value::Deferred(inner)) => {
        let adopted = inner.poll();
        if let Poll::Ready(result) = &adopted {
          self.settle(result.clone());
        };
        adopted
      }
      result => Poll::Ready(result),
    }
  }

  pub fn is_settled(&self) -> bool {
    self.poll().is_ready()
  }

  /// The settled result; a value that has not settled yet is an error.
  pub fn force(&self) -> EvalResult<Value> {
    match self.poll() {
      Poll::Ready(result) => result,
      Poll::Pending => Err(EvalError::Unsettled),
    }
  }

  /// A deferred value that applies `f` once this one resolves. Rejections pass through untouched.
  pub fn then<F>(&self, f: F) -> Deferred
  where
    F: FnOnce(Value) -> EvalResult<Value> + 'static,
  {
    let source = self.clone();
    let mut f = Some(f);
    Deferred::from_poll(move || match source.poll() {
      Poll::Pending => Poll::Pending,
      Poll::Ready(Err(err)) => Poll::Ready(Err(err)),
      Poll::Ready(Ok(value)) => match f.take() {
        Some(f) => Poll::Ready(f(value)),
        None => Poll::Ready(Err(EvalError::Internal("continuation ran twice".into()))),
      },
    })
  }

  /// Waits for every deferred value in `values` and resolves to an array of the results in the original order. Other values are passed through. The first rejection, by position, rejects the whole.
  pub fn join_all(values: Vec<Value>) -> Deferred {
    let mut slots: Vec<Result<Value, Deferred>> = values
      .into_iter()
      .map(|v| match v {
        Value::Deferred(d) => Err(d),
        v => Ok(v),
      })
      .collect();
    Deferred::from_poll(move || {
      let mut pending = false;
      for slot in slots.iter_mut() {
        let Err(d) = slot else {
          continue;
        };
        match d.poll() {
          Poll::Pending => pending = true,
          Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
          Poll::Ready(Ok(value)) => *slot = Ok(value),
        };
      }
      if pending {
        return Poll::Pending;
      };
      let values = mem::take(&mut slots)
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|d| Value::Deferred(d)))
        .collect();
      Poll::Ready(Ok(Value::array(values)))
    })
  }
}

impl Settle {
  pub fn resolve(self, value: Value) {
    self.0.settle(Ok(value));
  }

  pub fn reject(self, error: EvalError) {
    self.0.settle(Err(error));
  }
}

impl Debug for Deferred {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match &*self.0.borrow() {
      State::Waiting | State::Polling(_) => f.write_str("Deferred(<pending>)"),
      State::Settled(Ok(v)) => write!(f, "Deferred({v:?})"),
      State::Settled(Err(e)) => write!(f, "Deferred(<rejected: {e}>)"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;

  #[test]
  fn channel_settles_once_resolved() {
    let (d, settle) = Deferred::channel();
    assert!(d.poll().is_pending());
    assert!(matches!(d.force(), Err(EvalError::Unsettled)));
    settle.resolve(Value::Number(1.0));
    assert_eq!(d.force().unwrap().as_number(), Some(1.0));
  }

  #[test]
  fn then_runs_lazily_and_once() {
    let (d, settle) = Deferred::channel();
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let doubled = d.then(move |v| {
      counter.set(counter.get() + 1);
      Ok(Value::Number(v.as_number().unwrap_or(0.0) * 2.0))
    });
    assert!(doubled.poll().is_pending());
    settle.resolve(Value::Number(21.0));
    assert_eq!(doubled.force().unwrap().as_number(), Some(42.0));
    assert_eq!(doubled.force().unwrap().as_number(), Some(42.0));
    assert_eq!(calls.get(), 1);
  }

  #[test]
  fn adopts_nested_deferred_values() {
    let (inner, settle) = Deferred::channel();
    let outer = Deferred::resolved(Value::Deferred(inner));
    assert!(outer.poll().is_pending());
    settle.resolve("done".into());
    assert_eq!(outer.force().unwrap().as_str(), Some("done"));
  }

  #[test]
  fn join_all_preserves_order() {
    let (first, settle_first) = Deferred::channel();
    let (second, settle_second) = Deferred::channel();
    let joined = Deferred::join_all(vec![
      Value::Deferred(first),
      Value::Number(2.0),
      Value::Deferred(second),
    ]);
    settle_second.resolve(Value::Number(3.0));
    assert!(joined.poll().is_pending());
    settle_first.resolve(Value::Number(1.0));
    let Value::Array(items) = joined.force().unwrap() else {
      panic!("expected array");
    };
    let numbers: Vec<_> = items.iter().filter_map(|v| v.as_number()).collect();
    assert_eq!(numbers, vec![1.0, 2.0, 3.0]);
  }

  #[test]
  fn join_all_rejects_with_first_failure() {
    let joined = Deferred::join_all(vec![
      Value::Deferred(Deferred::resolved(Value::Null)),
      Value::Deferred(Deferred::rejected(EvalError::Host("boom".into()))),
    ]);
    assert!(matches!(joined.force(), Err(EvalError::Host(m)) if m == "boom"));
  }
}
