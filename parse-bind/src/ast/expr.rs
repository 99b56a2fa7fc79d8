use super::node::Node;
use super::types::CastMode;
use super::types::ExprType;
use super::types::LitValue;
use crate::operator::OperatorName;
use crate::scope::Scope;
use derive_more::derive::From;
use derive_more::derive::TryInto;
use derive_visitor::Drive;
use derive_visitor::DriveMut;

/// Identifies one identifier reference; stable for the lifetime of a binding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct LookupId(pub usize);

/// Index of a callback body within its binding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CallbackId(pub usize);

// We must wrap each variant with Node<T> as otherwise we won't be able to visit Node<T> instead of just T.
#[derive(Clone, Debug, Drive, DriveMut, From, TryInto)]
pub enum Expr {
  Array(Node<ArrayExpr>),
  Binary(Node<BinaryExpr>),
  Call(Node<CallExpr>),
  Callback(Node<CallbackExpr>),
  Capture(Node<CaptureExpr>),
  Index(Node<IndexExpr>),
  Literal(Node<LitExpr>),
  Lookup(Node<LookupExpr>),
  Method(Node<MethodExpr>),
  Object(Node<ObjectExpr>),
  Ternary(Node<TernaryExpr>),
  Unary(Node<UnaryExpr>),
}

#[derive(Clone, Debug, Drive, DriveMut)]
pub struct LitExpr {
  #[drive(skip)]
  pub value: LitValue,
}

/// An `@option` annotation on a global reference.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OptionDecl {
  pub ty: Option<String>,
}

#[derive(Clone, Debug, Drive, DriveMut)]
pub struct LookupExpr {
  #[drive(skip)]
  pub id: LookupId,
  #[drive(skip)]
  pub name: String,
  #[drive(skip)]
  pub scope: Scope,
  #[drive(skip)]
  pub option: Option<OptionDecl>,
  #[drive(skip)]
  pub default: Option<LitValue>,
}

#[derive(Clone, Debug, Drive, DriveMut)]
pub enum Subscript {
  Key(Node<Expr>),
  Range {
    start: Option<Node<Expr>>,
    end: Option<Node<Expr>>,
  },
}

/// `object[key]`, `object[start:end]`, or `object.name` (with a literal string key).
#[derive(Clone, Debug, Drive, DriveMut)]
pub struct IndexExpr {
  pub object: Node<Expr>,
  pub subscript: Subscript,
}

#[derive(Clone, Debug, Drive, DriveMut)]
pub struct CallExpr {
  pub callee: Node<LookupExpr>,
  pub args: Vec<Node<Expr>>,
  #[drive(skip)]
  pub is_construct: bool,
  #[drive(skip)]
  pub is_imported_call: bool,
}

#[derive(Clone, Debug, Drive, DriveMut)]
pub struct MethodExpr {
  #[drive(skip)]
  pub name: String,
  pub object: Node<Expr>,
  pub args: Vec<Node<Expr>>,
  #[drive(skip)]
  pub is_construct: bool,
}

#[derive(Clone, Debug, Drive, DriveMut)]
pub struct UnaryExpr {
  #[drive(skip)]
  pub operator: OperatorName,
  pub argument: Node<Expr>,
}

/// Operator-specific data carried by a binary node.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BinaryMeta {
  None,
  // Depth of the pipe; the right side sees the left side's value as topic `%{depth}`.
  Topic(usize),
  Type { ty: ExprType, mode: CastMode },
}

#[derive(Clone, Debug, Drive, DriveMut)]
pub struct BinaryExpr {
  #[drive(skip)]
  pub operator: OperatorName,
  pub left: Node<Expr>,
  pub right: Node<Expr>,
  #[drive(skip)]
  pub meta: BinaryMeta,
}

#[derive(Clone, Debug, Drive, DriveMut)]
pub struct TernaryExpr {
  pub test: Node<Expr>,
  pub consequent: Node<Expr>,
  pub alternate: Node<Expr>,
}

/// `source -> [(Type)] dest`.
#[derive(Clone, Debug, Drive, DriveMut)]
pub struct CaptureExpr {
  pub source: Node<Expr>,
  pub dest: Node<LookupExpr>,
  #[drive(skip)]
  pub ty: Option<String>,
}

#[derive(Clone, Debug, Drive, DriveMut)]
pub struct ArrayExpr {
  pub elements: Vec<Node<Expr>>,
}

#[derive(Clone, Debug, Drive, DriveMut)]
pub struct ObjectMember {
  // None for a spread member (`...expr`).
  #[drive(skip)]
  pub key: Option<String>,
  pub value: Node<Expr>,
}

#[derive(Clone, Debug, Drive, DriveMut)]
pub struct ObjectExpr {
  pub members: Vec<Node<ObjectMember>>,
}

/// A callback argument. The body is stored on the binding under `id` so closures can refer to it without borrowing the tree.
#[derive(Clone, Debug, Drive, DriveMut)]
pub struct CallbackExpr {
  #[drive(skip)]
  pub id: CallbackId,
  #[drive(skip)]
  pub params: Vec<String>,
  #[drive(skip)]
  pub is_async: bool,
}

impl Expr {
  pub fn as_lookup(&self) -> Option<&Node<LookupExpr>> {
    match self {
      Expr::Lookup(n) => Some(n),
      _ => None,
    }
  }

  pub fn as_literal(&self) -> Option<&LitValue> {
    match self {
      Expr::Literal(n) => Some(&n.stx.value),
      _ => None,
    }
  }
}
