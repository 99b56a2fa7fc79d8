use crate::ast::expr::CallbackId;
use crate::ast::expr::Expr;
use crate::ast::expr::LookupExpr;
use crate::ast::node::Node;
use crate::ast::types::ExprType;
use crate::loc::Loc;
use crate::option::OptionEntry;
use crate::scope::ReferenceMap;
use crate::scope::ResolvedScopes;
use crate::scope::Scope;
use derive_visitor::DriveMut;
use derive_visitor::VisitorMut;
use std::fmt;
use std::fmt::Debug;
use std::fmt::Formatter;
use tracing::debug;

type LookupNode = Node<LookupExpr>;

#[derive(VisitorMut)]
#[visitor(LookupNode(enter))]
struct RenameVisitor {
  from: String,
  to: String,
  renamed: usize,
}

impl RenameVisitor {
  fn enter_lookup_node(&mut self, node: &mut LookupNode) {
    if node.stx.scope == Scope::Global && node.stx.name == self.from {
      node.stx.name = self.to.clone();
      self.renamed += 1;
    };
  }
}

/// The parsed, reusable form of one binding. Immutable apart from [`Binding::rename_global`].
pub struct Binding {
  source: String,
  ast: Node<Expr>,
  callbacks: Vec<Node<Expr>>,
  scopes: ResolvedScopes,
  options: Vec<OptionEntry>,
  is_void: bool,
  result_type: Option<ExprType>,
}

impl Binding {
  pub(crate) fn new(
    source: &str,
    ast: Node<Expr>,
    callbacks: Vec<Node<Expr>>,
    scopes: ResolvedScopes,
    options: Vec<OptionEntry>,
    is_void: bool,
    result_type: Option<ExprType>,
  ) -> Binding {
    debug!(
      imports = scopes.imports.len(),
      globals = scopes.globals.len(),
      options = options.len(),
      is_void,
      "built binding"
    );
    Binding {
      source: source.to_string(),
      ast,
      callbacks,
      scopes,
      options,
      is_void,
      result_type,
    }
  }

  pub fn ast(&self) -> &Node<Expr> {
    &self.ast
  }

  pub fn source(&self) -> &str {
    &self.source
  }

  /// The source text covered by `loc`, or an empty string if it lies outside the source.
  pub fn text(&self, loc: Loc) -> &str {
    self.source.get(loc.0..loc.1).unwrap_or("")
  }

  pub fn callback_body(&self, id: CallbackId) -> Option<&Node<Expr>> {
    self.callbacks.get(id.0)
  }

  pub fn imports(&self) -> &[String] {
    &self.scopes.imports
  }

  pub fn globals(&self) -> &ReferenceMap {
    &self.scopes.globals
  }

  pub fn import_refs(&self) -> &ReferenceMap {
    &self.scopes.import_refs
  }

  /// Global names in order of first reference.
  pub fn parameters(&self) -> &[String] {
    &self.scopes.global_order
  }

  pub fn options(&self) -> &[OptionEntry] {
    &self.options
  }

  /// Whether the binding captures its result instead of producing it.
  pub fn is_void(&self) -> bool {
    self.is_void
  }

  pub fn result_type(&self) -> Option<&ExprType> {
    self.result_type.as_ref()
  }

  /// Repoints every reference to the global `from` onto `to`, merging with any existing references to `to`. Returns false if `from` is not referenced.
  pub fn rename_global(&mut self, from: &str, to: &str) -> bool {
    if from == to {
      return self.scopes.globals.contains_key(from);
    };
    let Some(mut moved) = self.scopes.globals.remove(from) else {
      return false;
    };
    let mut visitor = RenameVisitor {
      from: from.to_string(),
      to: to.to_string(),
      renamed: 0,
    };
    self.ast.drive_mut(&mut visitor);
    for body in self.callbacks.iter_mut() {
      body.drive_mut(&mut visitor);
    }
    debug_assert_eq!(visitor.renamed, moved.len());

    let order = &mut self.scopes.global_order;
    if self.scopes.globals.contains_key(to) {
      order.retain(|n| n != from);
    } else if let Some(slot) = order.iter_mut().find(|n| n.as_str() == from) {
      *slot = to.to_string();
    };
    let refs = self.scopes.globals.entry(to.to_string()).or_default();
    refs.append(&mut moved);
    refs.sort_by_key(|r| r.id);

    let had_target_option = self.options.iter().any(|o| o.name == to);
    if had_target_option {
      self.options.retain(|o| o.name != from);
    } else {
      for option in self.options.iter_mut().filter(|o| o.name == from) {
        option.name = to.to_string();
      }
    };
    debug!(from, to, references = visitor.renamed, "renamed global");
    true
  }
}

impl Debug for Binding {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.debug_struct("Binding")
      .field("source", &self.source)
      .field("imports", &self.scopes.imports)
      .field("parameters", &self.scopes.global_order)
      .field("options", &self.options)
      .field("is_void", &self.is_void)
      .field("result_type", &self.result_type)
      .field("ast", &self.ast)
      .finish()
  }
}
