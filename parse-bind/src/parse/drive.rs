use super::Parser;
use crate::ast::node::Node;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use crate::token::TT;
use derive_visitor::Drive;
use derive_visitor::DriveMut;

impl<'a> Parser<'a> {
  pub fn with_loc<S: Drive + DriveMut, F>(&mut self, f: F) -> SyntaxResult<Node<S>>
  where
    F: FnOnce(&mut Self) -> SyntaxResult<S>,
  {
    let start = self.peek().loc.0;
    let stx = f(self)?;
    Ok(Node::new(Loc(start, self.last_end().max(start)), stx))
  }

  /// Parse a list of items separated by a delimiter until `close`, which will also be consumed.
  /// Allows for a trailing delimiter.
  pub fn list<S, F>(&mut self, delim: TT, close: TT, mut f: F) -> SyntaxResult<Vec<S>>
  where
    F: FnMut(&mut Self) -> SyntaxResult<S>,
  {
    let mut items = Vec::new();
    while !self.consume_if(close).is_match() {
      items.push(f(self)?);
      // We require either the delimiter or the close token.
      // If the delimiter exists, it can still immediately be followed by the close token (trailing delimiter).
      if !self.consume_if(delim).is_match() {
        self.require(close)?;
        break;
      }
    }
    Ok(items)
  }

  /// Drives the parser with the closure and returns what it returns, undoing its changes if it returns None.
  pub fn rewindable<S, F>(&mut self, f: F) -> SyntaxResult<Option<S>>
  where
    F: FnOnce(&mut Self) -> SyntaxResult<Option<S>>,
  {
    let checkpoint = self.checkpoint();
    let stx = f(self)?;
    if stx.is_none() {
      self.restore_checkpoint(checkpoint);
    };
    Ok(stx)
  }
}
