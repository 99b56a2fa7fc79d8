use crate::value::Value;
use std::rc::Rc;

struct FrameNode {
  bindings: Vec<(String, Value)>,
  parent: Frame,
}

/// An immutable chain of local bindings. Pushing shares the parent instead of copying it, so closures can hold on to the chain they were created in.
#[derive(Clone, Default)]
pub struct Frame(Option<Rc<FrameNode>>);

impl Frame {
  pub fn root() -> Frame {
    Frame(None)
  }

  pub fn push(&self, bindings: Vec<(String, Value)>) -> Frame {
    Frame(Some(Rc::new(FrameNode {
      bindings,
      parent: self.clone(),
    })))
  }

  /// The innermost binding of `name`.
  pub fn get(&self, name: &str) -> Option<Value> {
    let mut frame = self;
    while let Some(node) = &frame.0 {
      if let Some((_, v)) = node.bindings.iter().find(|(n, _)| n == name) {
        return Some(v.clone());
      };
      frame = &node.parent;
    }
    None
  }
}
