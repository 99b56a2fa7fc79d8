use super::expr::literal;
use super::ParseCtx;
use super::Parser;
use crate::ast::expr::BinaryExpr;
use crate::ast::expr::BinaryMeta;
use crate::ast::expr::CaptureExpr;
use crate::ast::expr::Expr;
use crate::ast::node::Node;
use crate::ast::types::Cardinality;
use crate::ast::types::CastMode;
use crate::ast::types::ExprType;
use crate::ast::types::LitValue;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use crate::operator::OperatorName;
use crate::scope::Scope;
use crate::token::TT;
use crate::ParseMode;

/// The root expression of a parse together with what the suffixes declared about it.
pub struct TopLevel {
  pub root: Node<Expr>,
  pub end: usize,
  pub result_type: Option<ExprType>,
  pub is_void: bool,
}

impl<'a> Parser<'a> {
  /// `T`, `T[]`, `*T` or `async *T`.
  pub fn type_expr(&mut self) -> SyntaxResult<(Loc, ExprType)> {
    let start = self.peek().loc;
    let prefix = if self.consume_if(TT::KeywordAsync).is_match() {
      self.require(TT::Asterisk)?;
      Some(Cardinality::AsyncIterator)
    } else if self.consume_if(TT::Asterisk).is_match() {
      Some(Cardinality::Iterator)
    } else {
      None
    };
    let (loc, base) = self.type_name()?;
    let cardinality = match prefix {
      Some(c) => c,
      None => {
        let (open, close) = self.peek_2();
        if open.typ == TT::BracketOpen && close.typ == TT::BracketClose {
          self.consume();
          self.consume();
          Cardinality::Array
        } else {
          Cardinality::Scalar
        }
      }
    };
    let loc = start + loc + Loc::at(self.last_end());
    Ok((loc, ExprType { base, cardinality }))
  }

  /// An optional `as T` or `to T` suffix applying to the whole expression.
  fn type_suffix(&mut self, expr: Node<Expr>) -> SyntaxResult<(Node<Expr>, Option<ExprType>)> {
    let mode = match self.peek().typ {
      TT::KeywordAs => CastMode::Assert,
      TT::KeywordTo => CastMode::Convert,
      _ => return Ok((expr, None)),
    };
    self.consume();
    let (loc, ty) = self.type_expr()?;
    let right = literal(loc, LitValue::String(ty.base.clone()));
    let node = Node::new(expr.loc + loc, BinaryExpr {
      operator: OperatorName::TypeAssert,
      left: expr,
      right,
      meta: BinaryMeta::Type {
        ty: ty.clone(),
        mode,
      },
    });
    let declared = (mode == CastMode::Assert).then_some(ty);
    Ok((node.into_stx(), declared))
  }

  /// An optional `-> [(T)] name` suffix. The destination must be a global name.
  fn capture_suffix(&mut self, expr: Node<Expr>) -> SyntaxResult<(Node<Expr>, bool)> {
    if !self.consume_if(TT::HyphenChevronRight).is_match() {
      return Ok((expr, false));
    };
    let ty = if self.consume_if(TT::ParenthesisOpen).is_match() {
      let (_, ty) = self.type_name()?;
      self.require(TT::ParenthesisClose)?;
      Some(ty)
    } else {
      None
    };
    let (loc, name) = self.require_identifier()?;
    if self.resolver.classify(&name) != Scope::Global {
      return Err(loc.error(SyntaxErrorType::CaptureTargetNotGlobal(name), Some(TT::Identifier)));
    };
    let dest = Node::new(loc, self.resolver.resolve(&name, loc, None)?);
    let node = Node::new(expr.loc + loc, CaptureExpr {
      source: expr,
      dest,
      ty,
    });
    Ok((node.into_stx(), true))
  }

  /// `with(a, b, …) expr` or `name(args…)`.
  fn statement_head(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let (t, next) = self.peek_2();
    if t.typ == TT::KeywordWith && next.typ == TT::ParenthesisOpen {
      self.consume();
      self.consume();
      self.list(TT::Comma, TT::ParenthesisClose, |p| {
        let (loc, name) = p.require_identifier()?;
        p.resolver.declare_import(&name, loc)
      })?;
    } else if t.typ.is_identifier_like() && next.typ == TT::ParenthesisOpen {
      // The principal call's callee is the binding's only import.
      let name = self.string(t.loc);
      self.resolver.declare_import(&name, t.loc)?;
    } else {
      let t = self.consume();
      return Err(self.unexpected(&t, SyntaxErrorType::ExpectedSyntax("`name(…)` or `with(…)`")));
    };
    self.parse_argument(ctx)
  }

  fn require_end(&mut self) -> SyntaxResult<usize> {
    let t = self.consume();
    if t.typ != TT::EOF {
      let typ = match t.typ {
        TT::HyphenChevronRight => SyntaxErrorType::IllegalCapture,
        _ => SyntaxErrorType::ExpectedSyntax("end of input"),
      };
      return Err(self.unexpected(&t, typ));
    };
    Ok(t.loc.1)
  }

  pub fn parse_top_level(&mut self, mode: ParseMode) -> SyntaxResult<TopLevel> {
    let ctx = ParseCtx::default();
    let (root, end, result_type, is_void) = match mode {
      ParseMode::Statement => {
        let expr = self.statement_head(ctx)?;
        let (expr, result_type) = self.type_suffix(expr)?;
        let (expr, is_void) = self.capture_suffix(expr)?;
        let end = self.require_end()?;
        (expr, end, result_type, is_void)
      }
      ParseMode::Expression => {
        let expr = self.parse_argument(ctx)?;
        let (expr, result_type) = self.type_suffix(expr)?;
        let end = self.require_end()?;
        (expr, end, result_type, false)
      }
      ParseMode::Embedded => {
        let expr = self.parse_argument(ctx)?;
        let (expr, result_type) = self.type_suffix(expr)?;
        let end = self.peek().loc.0;
        (expr, end, result_type, false)
      }
      ParseMode::Template => {
        let expr = self.template_contents(ctx, 0, None)?;
        (expr, self.source().len(), None, false)
      }
      ParseMode::TemplateTail(terminator) => {
        let expr = self.template_contents(ctx, 0, Some(terminator))?;
        let end = self.last_end();
        (expr, end, None, false)
      }
    };
    Ok(TopLevel {
      root,
      end,
      result_type,
      is_void,
    })
  }
}
