use crate::deferred::Deferred;
use crate::error::EvalResult;
use crate::value::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// A shared, single-pass iterator over values. Clones advance the same underlying iteration.
#[derive(Clone)]
pub struct ValueIter(Rc<RefCell<Box<dyn Iterator<Item = EvalResult<Value>>>>>);

impl ValueIter {
  pub fn new<I>(iter: I) -> ValueIter
  where
    I: Iterator<Item = EvalResult<Value>> + 'static,
  {
    ValueIter(Rc::new(RefCell::new(Box::new(iter))))
  }

  pub fn from_values(values: Vec<Value>) -> ValueIter {
    ValueIter::new(values.into_iter().map(Ok))
  }

  pub fn same(&self, other: &ValueIter) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }

  /// Drains the remaining items.
  pub fn collect_values(&self) -> EvalResult<Vec<Value>> {
    self.clone().collect()
  }
}

impl Iterator for ValueIter {
  type Item = EvalResult<Value>;

  fn next(&mut self) -> Option<Self::Item> {
    self.0.borrow_mut().next()
  }
}

type NextFn = Box<dyn FnMut() -> Option<Deferred>>;

/// An asynchronous iterator: each step yields a deferred item. Whether another item exists is known when asked.
#[derive(Clone)]
pub struct AsyncValueIter(Rc<RefCell<NextFn>>);

impl AsyncValueIter {
  pub fn new<F>(next: F) -> AsyncValueIter
  where
    F: FnMut() -> Option<Deferred> + 'static,
  {
    AsyncValueIter(Rc::new(RefCell::new(Box::new(next))))
  }

  /// Lifts a synchronous iterator; each item is already settled.
  pub fn from_sync(mut iter: ValueIter) -> AsyncValueIter {
    AsyncValueIter::new(move || {
      iter.next().map(|item| match item {
        Ok(v) => Deferred::resolved(v),
        Err(e) => Deferred::rejected(e),
      })
    })
  }

  pub fn next(&self) -> Option<Deferred> {
    (&mut *self.0.borrow_mut())()
  }

  pub fn same(&self, other: &AsyncValueIter) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }

  /// Requests every remaining item and joins them in order.
  pub fn collect_deferred(&self) -> Deferred {
    let mut items = Vec::new();
    while let Some(d) = self.next() {
      items.push(Value::Deferred(d));
    }
    Deferred::join_all(items)
  }
}

/// The synchronous iteration capability of a value, if it has one.
pub fn iterate(value: &Value) -> Option<ValueIter> {
  match value {
    Value::Array(items) => Some(ValueIter::from_values(items.to_vec())),
    Value::String(s) => Some(ValueIter::from_values(
      s.chars().map(|c| Value::string(c.to_string())).collect(),
    )),
    Value::Iter(iter) => Some(iter.clone()),
    Value::Object(o) => o.iterate(),
    _ => None,
  }
}

/// The asynchronous iteration capability of a value. Synchronously iterable values are lifted.
pub fn async_iterate(value: &Value) -> Option<AsyncValueIter> {
  match value {
    Value::AsyncIter(iter) => Some(iter.clone()),
    Value::Object(o) => o.async_iterate().or_else(|| o.iterate().map(AsyncValueIter::from_sync)),
    v => iterate(v).map(AsyncValueIter::from_sync),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clones_share_progress() {
    let mut a = ValueIter::from_values(vec![1.0.into(), 2.0.into(), 3.0.into()]);
    let b = a.clone();
    assert_eq!(a.next().unwrap().unwrap().as_number(), Some(1.0));
    let rest = b.collect_values().unwrap();
    assert_eq!(rest.len(), 2);
    assert!(a.next().is_none());
  }

  #[test]
  fn strings_iterate_by_character() {
    let chars = iterate(&Value::string("hé")).unwrap().collect_values().unwrap();
    assert_eq!(chars.iter().map(|c| c.to_string()).collect::<Vec<_>>(), vec!["h", "é"]);
    assert!(iterate(&Value::Number(1.0)).is_none());
  }

  #[test]
  fn async_iteration_lifts_sync_values() {
    let iter = async_iterate(&Value::array(vec!["a".into(), "b".into()])).unwrap();
    let Value::Array(items) = iter.collect_deferred().force().unwrap() else {
      panic!("expected array");
    };
    assert_eq!(items.len(), 2);
  }
}
