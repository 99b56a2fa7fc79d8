use crate::token::TT;
use ahash::HashMap;
use ahash::HashMapExt;
use core::fmt;
use once_cell::sync::Lazy;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Arity {
  Unary,
  Binary,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum OperatorName {
  // Binary.
  Alternation,
  Comma,
  Pipe,
  PrototypeTest,
  StrictEquality,
  StrictInequality,
  TypeAssert,

  // Unary.
  AsyncIterate,
  Await,
  Index,
  Iterate,
  LogicalNot,
  Rest,
  Typeof,
}

pub struct Operator {
  pub name: OperatorName,
  pub arity: Arity,
  pub symbol: &'static str,
}

const fn op(name: OperatorName, arity: Arity, symbol: &'static str) -> Operator {
  Operator {
    name,
    arity,
    symbol,
  }
}

#[rustfmt::skip]
pub static OPERATORS: Lazy<HashMap<OperatorName, Operator>> = Lazy::new(|| {
  use Arity::*;
  use OperatorName::*;
  let mut map = HashMap::<OperatorName, Operator>::new();
  for o in [
    op(Alternation, Binary, "??"),
    op(Comma, Binary, ","),
    op(Pipe, Binary, "|>"),
    op(PrototypeTest, Binary, "instanceof"),
    op(StrictEquality, Binary, "==="),
    op(StrictInequality, Binary, "!=="),
    op(TypeAssert, Binary, "as"),
    op(AsyncIterate, Unary, "async *"),
    op(Await, Unary, "await"),
    op(Index, Unary, "+"),
    op(Iterate, Unary, "*"),
    op(LogicalNot, Unary, "!"),
    op(Rest, Unary, "..."),
    op(Typeof, Unary, "typeof"),
  ] {
    map.insert(o.name, o);
  }
  map
});

impl OperatorName {
  pub fn arity(self) -> Arity {
    OPERATORS.get(&self).map(|o| o.arity).unwrap_or(Arity::Binary)
  }

  pub fn symbol(self) -> &'static str {
    OPERATORS.get(&self).map(|o| o.symbol).unwrap_or("?")
  }
}

impl fmt::Display for OperatorName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.symbol())
  }
}

#[rustfmt::skip]
pub static UNARY_OPERATOR_MAPPING: Lazy<HashMap<TT, OperatorName>> = Lazy::new(|| {
  let mut map = HashMap::<TT, OperatorName>::new();
  // `async *` spans two tokens and `...` is only valid in lists; both are handled manually.
  map.insert(TT::Asterisk, OperatorName::Iterate);
  map.insert(TT::Exclamation, OperatorName::LogicalNot);
  map.insert(TT::KeywordAwait, OperatorName::Await);
  map.insert(TT::KeywordTypeof, OperatorName::Typeof);
  map.insert(TT::Plus, OperatorName::Index);
  map
});

#[rustfmt::skip]
pub static EQUALITY_OPERATOR_MAPPING: Lazy<HashMap<TT, OperatorName>> = Lazy::new(|| {
  let mut map = HashMap::<TT, OperatorName>::new();
  map.insert(TT::EqualsEqualsEquals, OperatorName::StrictEquality);
  map.insert(TT::ExclamationEqualsEquals, OperatorName::StrictInequality);
  map
});

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_operator_has_a_symbol() {
    assert_eq!(OperatorName::Alternation.symbol(), "??");
    assert_eq!(OperatorName::Index.arity(), Arity::Unary);
    assert_eq!(OperatorName::Pipe.to_string(), "|>");
    assert_eq!(OPERATORS.len(), 14);
  }
}
