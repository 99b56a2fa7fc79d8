use super::ParseCtx;
use super::Parser;
use crate::ast::expr::CallbackExpr;
use crate::ast::expr::CallbackId;
use crate::ast::expr::Expr;
use crate::ast::node::Node;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use crate::token::TT;

impl<'a> Parser<'a> {
  /// Parses `(args…)`, consuming both parentheses.
  pub fn call_args(&mut self, ctx: ParseCtx) -> SyntaxResult<Vec<Node<Expr>>> {
    let ctx = ctx.nested();
    self.require(TT::ParenthesisOpen)?;
    self.list(TT::Comma, TT::ParenthesisClose, |p| p.call_arg(ctx))
  }

  fn call_arg(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    if let Some(callback) = self.callback(ctx)? {
      return Ok(callback);
    };
    self.spreadable(ctx)
  }

  /// Reads a parameter list followed by `=>`: `x =>`, `(x, y) =>`, optionally preceded by `async`. Rewinds and returns None if the tokens do not form one.
  fn callback_head(&mut self) -> SyntaxResult<Option<(bool, Vec<(Loc, String)>)>> {
    self.rewindable(|p| {
      let is_async = match p.peek_2() {
        (a, next)
          if a.typ == TT::KeywordAsync
            && (next.typ.is_identifier_like() || next.typ == TT::ParenthesisOpen) =>
        {
          p.consume();
          true
        }
        _ => false,
      };
      let t = p.consume();
      let params = if t.typ.is_identifier_like() {
        vec![(t.loc, p.string(t.loc))]
      } else if t.typ == TT::ParenthesisOpen {
        let mut params = Vec::new();
        loop {
          let t = p.consume();
          match t.typ {
            TT::ParenthesisClose => break,
            typ if typ.is_identifier_like() => params.push((t.loc, p.string(t.loc))),
            _ => return Ok(None),
          };
          match p.consume().typ {
            TT::Comma => {}
            TT::ParenthesisClose => break,
            _ => return Ok(None),
          };
        }
        params
      } else {
        return Ok(None);
      };
      if !p.consume_if(TT::EqualsChevronRight).is_match() {
        return Ok(None);
      };
      Ok(Some((is_async, params)))
    })
  }

  /// A callback argument. Its parameters are local to the body; the body is stored out of line and the returned node refers to it.
  pub fn callback(&mut self, ctx: ParseCtx) -> SyntaxResult<Option<Node<Expr>>> {
    let start = self.peek().loc.0;
    let Some((is_async, params)) = self.callback_head()? else {
      return Ok(None);
    };
    let mut names: Vec<String> = Vec::with_capacity(params.len());
    for (loc, name) in params {
      if names.contains(&name) {
        return Err(loc.error(SyntaxErrorType::DuplicateParameter(name), Some(TT::Identifier)));
      };
      names.push(name);
    }
    self.resolver.push_frame(names.clone());
    let body = self.parse_argument(ctx.nested());
    self.resolver.pop_frame();
    let body = body?;
    let id = CallbackId(self.callbacks.len());
    let loc = Loc(start, body.loc.1);
    self.callbacks.push(body);
    Ok(Some(
      Node::new(loc, CallbackExpr {
        id,
        params: names,
        is_async,
      })
      .into_stx(),
    ))
  }
}
