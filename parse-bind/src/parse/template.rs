use super::expr::literal;
use super::lit::decode_escape_sequence;
use super::ParseCtx;
use super::Parser;
use crate::ast::expr::ArrayExpr;
use crate::ast::expr::Expr;
use crate::ast::expr::MethodExpr;
use crate::ast::node::Node;
use crate::ast::types::LitValue;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use crate::token::TT;

/// Joins template pieces. Text-only templates collapse into a single string literal; anything else becomes `[pieces…].join("")`.
fn join_parts(loc: Loc, parts: Vec<Node<Expr>>) -> Node<Expr> {
  if parts
    .iter()
    .all(|p| matches!(p.stx.as_literal(), Some(LitValue::String(_))))
  {
    let text: String = parts
      .iter()
      .filter_map(|p| match p.stx.as_literal() {
        Some(LitValue::String(s)) => Some(s.as_str()),
        _ => None,
      })
      .collect();
    return literal(loc, LitValue::String(text));
  };
  let array = Node::new(loc, ArrayExpr { elements: parts }).into_stx();
  Node::new(loc, MethodExpr {
    name: "join".to_string(),
    object: array,
    args: vec![literal(loc, LitValue::String(String::new()))],
    is_construct: false,
  })
  .into_stx()
}

impl<'a> Parser<'a> {
  /// Walks raw template text from `start` until `terminator` (or the end of input if there is none), switching to expression parsing at each `${`.
  ///
  /// Returns the pieces and the offset of the terminator. The terminator itself is not consumed.
  pub fn template_parts(
    &mut self,
    ctx: ParseCtx,
    start: usize,
    terminator: Option<char>,
  ) -> SyntaxResult<(Vec<Node<Expr>>, usize)> {
    let ctx = ctx.nested();
    let source = self.source();
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut text_start = start;
    let mut i = start;
    loop {
      let rest = &source[i..];
      let Some(c) = rest.chars().next() else {
        if terminator.is_some() {
          return Err(Loc(start, i).error(SyntaxErrorType::UnterminatedTemplate, None));
        };
        break;
      };
      if Some(c) == terminator {
        break;
      };
      if c == '\\' {
        let (consumed, decoded) = decode_escape_sequence(&rest[1..], terminator)
          .ok_or_else(|| Loc(i, i + 1).error(SyntaxErrorType::InvalidCharacterEscape, None))?;
        text.push(decoded);
        i += 1 + consumed;
        continue;
      };
      if rest.starts_with("${") {
        if !text.is_empty() {
          parts.push(literal(Loc(text_start, i), LitValue::String(std::mem::take(&mut text))));
        };
        self.seek(i + 2);
        let expr = self.parse_argument(ctx)?;
        let close = self.require(TT::BraceClose)?;
        parts.push(expr);
        i = close.loc.1;
        text_start = i;
        continue;
      };
      text.push(c);
      i += c.len_utf8();
    }
    if !text.is_empty() {
      parts.push(literal(Loc(text_start, i), LitValue::String(text)));
    };
    Ok((parts, i))
  }

  /// Template contents running to `terminator` or the end of input; leaves the parser positioned at the terminator.
  pub fn template_contents(
    &mut self,
    ctx: ParseCtx,
    start: usize,
    terminator: Option<char>,
  ) -> SyntaxResult<Node<Expr>> {
    let (parts, end) = self.template_parts(ctx, start, terminator)?;
    self.seek(end);
    Ok(join_parts(Loc(start, end), parts))
  }

  /// A backtick-delimited template within an expression.
  pub fn lit_template(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let t = self.consume();
    debug_assert!(matches!(
      t.typ,
      TT::LiteralTemplatePartString | TT::LiteralTemplatePartStringEnd
    ));
    let (parts, end) = self.template_parts(ctx, t.loc.0 + 1, Some('`'))?;
    // Skip the closing backtick.
    self.seek(end + 1);
    Ok(join_parts(Loc(t.loc.0, end + 1), parts))
  }
}
