use crate::ast::expr::LookupExpr;
use crate::ast::expr::LookupId;
use crate::ast::expr::OptionDecl;
use crate::ast::types::LitValue;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use ahash::HashMap;
use ahash::HashMapExt;
use std::rc::Rc;
use tracing::trace;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Scope {
  // Bound by an enclosing callback or pipe.
  Local,
  // Declared in the binding's import list.
  Import,
  // Supplied by the host through the parameter map.
  Global,
}

/// One reference to a global or import name, as recorded by the resolver.
#[derive(Clone, PartialEq, Debug)]
pub struct Reference {
  pub id: LookupId,
  pub loc: Loc,
  pub option: Option<OptionDecl>,
  pub default: Option<LitValue>,
}

/// Name to every reference of that name, in source order.
pub type ReferenceMap = HashMap<String, Vec<Reference>>;

struct LocalFrame {
  names: Vec<String>,
  parent: Option<Rc<LocalFrame>>,
}

impl LocalFrame {
  fn binds(&self, name: &str) -> bool {
    self.names.iter().any(|n| n == name)
      || self.parent.as_ref().is_some_and(|p| p.binds(name))
  }
}

/// Classifies identifiers as they are read and records every global and import reference.
pub struct ScopeResolver {
  frame: Option<Rc<LocalFrame>>,
  imports: Vec<String>,
  import_locs: Vec<Loc>,
  globals: ReferenceMap,
  // Global names in first-reference order.
  global_order: Vec<String>,
  import_refs: ReferenceMap,
  next_id: usize,
}

impl ScopeResolver {
  pub fn new() -> ScopeResolver {
    ScopeResolver {
      frame: None,
      imports: Vec::new(),
      import_locs: Vec::new(),
      globals: ReferenceMap::new(),
      global_order: Vec::new(),
      import_refs: ReferenceMap::new(),
      next_id: 0,
    }
  }

  pub fn imports(&self) -> &[String] {
    &self.imports
  }

  pub fn globals(&self) -> &ReferenceMap {
    &self.globals
  }

  pub fn declare_import(&mut self, name: &str, loc: Loc) -> SyntaxResult<()> {
    if self.imports.iter().any(|i| i == name) {
      return Err(loc.error(SyntaxErrorType::DuplicateImport(name.to_string()), None));
    };
    self.imports.push(name.to_string());
    self.import_locs.push(loc);
    Ok(())
  }

  pub fn push_frame(&mut self, names: Vec<String>) {
    let parent = self.frame.take();
    self.frame = Some(Rc::new(LocalFrame { names, parent }));
  }

  pub fn pop_frame(&mut self) {
    self.frame = self.frame.take().and_then(|f| f.parent.clone());
  }

  pub fn classify(&self, name: &str) -> Scope {
    if self.frame.as_ref().is_some_and(|f| f.binds(name)) {
      Scope::Local
    } else if self.imports.iter().any(|i| i == name) {
      Scope::Import
    } else {
      Scope::Global
    }
  }

  fn next_id(&mut self) -> LookupId {
    let id = LookupId(self.next_id);
    self.next_id += 1;
    id
  }

  /// Classifies `name` and registers the reference under its scope.
  pub fn resolve(
    &mut self,
    name: &str,
    loc: Loc,
    option: Option<OptionDecl>,
  ) -> SyntaxResult<LookupExpr> {
    let scope = self.classify(name);
    let id = self.next_id();
    let reference = Reference {
      id,
      loc,
      option: option.clone(),
      default: None,
    };
    match scope {
      Scope::Local => {}
      Scope::Import => {
        self.import_refs.entry(name.to_string()).or_default().push(reference);
      }
      Scope::Global => {
        if !self.globals.contains_key(name) {
          self.global_order.push(name.to_string());
        };
        self.globals.entry(name.to_string()).or_default().push(reference);
      }
    };
    trace!(name, ?scope, "resolved identifier");
    Ok(LookupExpr {
      id,
      name: name.to_string(),
      scope,
      option,
      default: None,
    })
  }

  /// Resolves the topic placeholder of the pipe at `depth`.
  pub fn topic(&mut self, depth: usize) -> LookupExpr {
    LookupExpr {
      id: self.next_id(),
      name: topic_name(depth),
      scope: Scope::Local,
      option: None,
      default: None,
    }
  }

  /// Records a default for an already resolved lookup.
  pub fn set_default(&mut self, lookup: &mut LookupExpr, default: LitValue) {
    let refs = match lookup.scope {
      Scope::Global => self.globals.get_mut(&lookup.name),
      Scope::Import => self.import_refs.get_mut(&lookup.name),
      Scope::Local => None,
    };
    if let Some(r) = refs.and_then(|refs| refs.iter_mut().find(|r| r.id == lookup.id)) {
      r.default = Some(default.clone());
    };
    lookup.default = Some(default);
  }

  /// Removes a lookup from its reference set, for identifiers that turn out not to be value references.
  pub fn forget(&mut self, lookup: &LookupExpr) {
    let map = match lookup.scope {
      Scope::Global => &mut self.globals,
      Scope::Import => &mut self.import_refs,
      Scope::Local => return,
    };
    let now_empty = match map.get_mut(&lookup.name) {
      Some(refs) => {
        refs.retain(|r| r.id != lookup.id);
        refs.is_empty()
      }
      None => false,
    };
    if now_empty {
      map.remove(&lookup.name);
      if lookup.scope == Scope::Global {
        self.global_order.retain(|n| n != &lookup.name);
      };
    };
  }

  /// Every declared import must be referenced exactly once. Runs after parsing completes, so labels that were forgotten do not count.
  pub fn check_imports(&self) -> SyntaxResult<()> {
    for (name, loc) in self.imports.iter().zip(self.import_locs.iter()) {
      match self.import_refs.get(name).map(|r| r.as_slice()) {
        None | Some([]) => {
          return Err(loc.error(SyntaxErrorType::UnusedImport(name.clone()), None));
        }
        Some([_]) => {}
        Some([_, second, ..]) => {
          return Err(second.loc.error(SyntaxErrorType::ImportReferencedTwice(name.clone()), None));
        }
      };
    }
    Ok(())
  }

  pub fn finish(self) -> ResolvedScopes {
    ResolvedScopes {
      imports: self.imports,
      globals: self.globals,
      global_order: self.global_order,
      import_refs: self.import_refs,
    }
  }
}

pub struct ResolvedScopes {
  pub imports: Vec<String>,
  pub globals: ReferenceMap,
  pub global_order: Vec<String>,
  pub import_refs: ReferenceMap,
}

pub fn topic_name(depth: usize) -> String {
  format!("%{depth}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classification_follows_frames_then_imports() {
    let mut resolver = ScopeResolver::new();
    resolver.declare_import("f", Loc(0, 1)).unwrap();
    assert_eq!(resolver.classify("f"), Scope::Import);
    assert_eq!(resolver.classify("x"), Scope::Global);
    resolver.push_frame(vec!["x".into(), "f".into()]);
    assert_eq!(resolver.classify("x"), Scope::Local);
    // Parameters shadow imports.
    assert_eq!(resolver.classify("f"), Scope::Local);
    resolver.push_frame(vec!["y".into()]);
    assert_eq!(resolver.classify("x"), Scope::Local);
    resolver.pop_frame();
    resolver.pop_frame();
    assert_eq!(resolver.classify("x"), Scope::Global);
  }

  #[test]
  fn duplicate_import_is_rejected() {
    let mut resolver = ScopeResolver::new();
    resolver.declare_import("a", Loc(0, 1)).unwrap();
    let err = resolver.declare_import("a", Loc(2, 3)).unwrap_err();
    assert_eq!(err.typ, SyntaxErrorType::DuplicateImport("a".into()));
  }

  #[test]
  fn import_may_only_be_referenced_once() {
    let mut resolver = ScopeResolver::new();
    resolver.declare_import("a", Loc(0, 1)).unwrap();
    resolver.resolve("a", Loc(2, 3), None).unwrap();
    let label = resolver.resolve("a", Loc(4, 5), None).unwrap();
    resolver.forget(&label);
    resolver.check_imports().unwrap();
    resolver.resolve("a", Loc(6, 7), None).unwrap();
    let err = resolver.check_imports().unwrap_err();
    assert_eq!(err.typ, SyntaxErrorType::ImportReferencedTwice("a".into()));
    assert_eq!(err.loc, Loc(6, 7));
  }

  #[test]
  fn forget_removes_reference_and_empty_entries() {
    let mut resolver = ScopeResolver::new();
    let a = resolver.resolve("a", Loc(0, 1), None).unwrap();
    let b1 = resolver.resolve("b", Loc(2, 3), None).unwrap();
    resolver.resolve("b", Loc(4, 5), None).unwrap();
    resolver.forget(&a);
    resolver.forget(&b1);
    assert!(!resolver.globals().contains_key("a"));
    assert_eq!(resolver.globals()["b"].len(), 1);
    let scopes = resolver.finish();
    assert_eq!(scopes.global_order, vec!["b".to_string()]);
  }

  #[test]
  fn unused_import_is_reported_by_name() {
    let mut resolver = ScopeResolver::new();
    resolver.declare_import("a", Loc(0, 1)).unwrap();
    resolver.declare_import("b", Loc(2, 3)).unwrap();
    resolver.resolve("a", Loc(4, 5), None).unwrap();
    let err = resolver.check_imports().unwrap_err();
    assert_eq!(err.typ, SyntaxErrorType::UnusedImport("b".into()));
  }

  #[test]
  fn set_default_updates_reference() {
    let mut resolver = ScopeResolver::new();
    let mut x = resolver.resolve("x", Loc(0, 1), None).unwrap();
    resolver.set_default(&mut x, LitValue::Number(4.0));
    assert_eq!(x.default, Some(LitValue::Number(4.0)));
    assert_eq!(resolver.globals()["x"][0].default, Some(LitValue::Number(4.0)));
  }
}
