use super::ParseCtx;
use super::Parser;
use crate::ast::expr::BinaryExpr;
use crate::ast::expr::BinaryMeta;
use crate::ast::expr::CallExpr;
use crate::ast::expr::Expr;
use crate::ast::expr::IndexExpr;
use crate::ast::expr::LitExpr;
use crate::ast::expr::LookupExpr;
use crate::ast::expr::MethodExpr;
use crate::ast::expr::OptionDecl;
use crate::ast::expr::Subscript;
use crate::ast::expr::TernaryExpr;
use crate::ast::expr::UnaryExpr;
use crate::ast::node::Node;
use crate::ast::types::LitValue;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use crate::operator::OperatorName;
use crate::operator::EQUALITY_OPERATOR_MAPPING;
use crate::operator::UNARY_OPERATOR_MAPPING;
use crate::scope::topic_name;
use crate::scope::Scope;
use crate::token::TT;

fn binary(
  operator: OperatorName,
  left: Node<Expr>,
  right: Node<Expr>,
  meta: BinaryMeta,
) -> Node<Expr> {
  let loc = left.loc + right.loc;
  Node::new(loc, BinaryExpr {
    operator,
    left,
    right,
    meta,
  })
  .into_stx()
}

pub(crate) fn literal(loc: Loc, value: LitValue) -> Node<Expr> {
  Node::new(loc, LitExpr { value }).into_stx()
}

/// Whether the expression is an identifier optionally followed by `.name` accesses.
fn is_identifier_chain(expr: &Expr) -> bool {
  match expr {
    Expr::Lookup(_) => true,
    Expr::Index(index) => match &index.stx.subscript {
      Subscript::Key(key) => {
        matches!(key.stx.as_literal(), Some(LitValue::String(_)))
          && is_identifier_chain(&index.stx.object.stx)
      }
      Subscript::Range { .. } => false,
    },
    _ => false,
  }
}

impl<'a> Parser<'a> {
  /// argument-expr: the loosest expression form, accepted as a call argument, array element, or object member value.
  pub fn parse_argument(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    self.parse_defaultable(ctx)
  }

  fn parse_defaultable(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let expr = self.parse_pipe(ctx)?;
    let Some(eq_loc) = self.consume_if(TT::Equals).match_loc() else {
      return Ok(expr);
    };
    let default = self.lit_simple()?;
    match *expr.stx {
      Expr::Lookup(mut lookup) if lookup.stx.scope == Scope::Global => {
        self.resolver.set_default(&mut lookup.stx, default.stx.value);
        let loc = lookup.loc + default.loc;
        Ok(Node::new(loc, Expr::Lookup(lookup)))
      }
      stx if is_identifier_chain(&stx) => {
        // `a.b = lit` is shorthand for `a.b ?? lit`.
        let left = Node::new(expr.loc, stx);
        let right = default.into_stx();
        Ok(binary(OperatorName::Alternation, left, right, BinaryMeta::None))
      }
      _ => Err(eq_loc.error(SyntaxErrorType::IllegalDefault, Some(TT::Equals))),
    }
  }

  fn parse_pipe(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    Ok(self.parse_pipe_flagged(ctx)?.0)
  }

  /// Returns the expression and whether it is an unparenthesized conditional.
  fn parse_pipe_flagged(&mut self, ctx: ParseCtx) -> SyntaxResult<(Node<Expr>, bool)> {
    let (left, left_is_ternary) = self.parse_conditional(ctx)?;
    let pipe = self.peek();
    if pipe.typ != TT::BarChevronRight {
      return Ok((left, left_is_ternary));
    };
    if left_is_ternary || ctx.in_ternary {
      return Err(pipe.error(SyntaxErrorType::TernaryPipeMix));
    };
    self.consume();
    let depth = ctx.pipe_depth;
    self.resolver.push_frame(vec![topic_name(depth)]);
    let right = self.parse_pipe_flagged(ctx.with_pipe_depth(depth + 1));
    self.resolver.pop_frame();
    let (right, right_is_ternary) = right?;
    if right_is_ternary {
      return Err(right.error(SyntaxErrorType::TernaryPipeMix));
    };
    Ok((
      binary(OperatorName::Pipe, left, right, BinaryMeta::Topic(depth)),
      false,
    ))
  }

  fn parse_conditional(&mut self, ctx: ParseCtx) -> SyntaxResult<(Node<Expr>, bool)> {
    let left = self.parse_equality(ctx)?;
    // NOTE: The right side is a full argument-expr, so `a ?? b ?? c` parses as `a ?? (b ?? c)`.
    if self.consume_if(TT::QuestionQuestion).is_match() {
      let right = self.parse_argument(ctx)?;
      return Ok((
        binary(OperatorName::Alternation, left, right, BinaryMeta::None),
        false,
      ));
    };
    if !self.consume_if(TT::Question).is_match() {
      return Ok((left, false));
    };
    let branch_ctx = ctx.with_in_ternary(true);
    let consequent = self.parse_argument(branch_ctx)?;
    self.require(TT::Colon)?;
    let alternate = self.parse_argument(branch_ctx)?;
    let loc = left.loc + alternate.loc;
    let node = Node::new(loc, TernaryExpr {
      test: left,
      consequent,
      alternate,
    });
    Ok((node.into_stx(), true))
  }

  fn parse_equality(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let left = self.parse_relational(ctx)?;
    let t = self.peek();
    if matches!(t.typ, TT::EqualsEquals | TT::ExclamationEquals) {
      return Err(t.error(SyntaxErrorType::LooseEquality));
    };
    let Some(&operator) = EQUALITY_OPERATOR_MAPPING.get(&t.typ) else {
      return Ok(left);
    };
    self.consume();
    let right = self.parse_relational(ctx)?;
    let next = self.peek();
    if EQUALITY_OPERATOR_MAPPING.contains_key(&next.typ) {
      return Err(next.error(SyntaxErrorType::ChainedEquality));
    };
    if matches!(next.typ, TT::EqualsEquals | TT::ExclamationEquals) {
      return Err(next.error(SyntaxErrorType::LooseEquality));
    };
    Ok(binary(operator, left, right, BinaryMeta::None))
  }

  /// A dotted type name such as `String` or `ns.Type`.
  pub fn type_name(&mut self) -> SyntaxResult<(Loc, String)> {
    let (mut loc, mut name) = self.require_identifier()?;
    while self.consume_if(TT::Dot).is_match() {
      let t = self.require_predicate(TT::is_property_name, "type name")?;
      name.push('.');
      name.push_str(self.str(t.loc));
      loc += t.loc;
    }
    Ok((loc, name))
  }

  fn parse_relational(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let left = self.parse_unary(ctx)?;
    if !self.consume_if(TT::KeywordInstanceof).is_match() {
      return Ok(left);
    };
    let (loc, name) = self.type_name()?;
    let right = literal(loc, LitValue::String(name));
    Ok(binary(OperatorName::PrototypeTest, left, right, BinaryMeta::None))
  }

  pub fn parse_unary(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let (t, next) = self.peek_2();
    let operator = match t.typ {
      TT::KeywordAsync if next.typ == TT::Asterisk => {
        self.consume();
        OperatorName::AsyncIterate
      }
      typ => match UNARY_OPERATOR_MAPPING.get(&typ) {
        Some(&operator) => operator,
        None => return self.parse_member(ctx),
      },
    };
    self.consume();
    let argument = self.parse_unary(ctx)?;
    let loc = t.loc + argument.loc;
    Ok(Node::new(loc, UnaryExpr { operator, argument }).into_stx())
  }

  fn subscript(&mut self, ctx: ParseCtx) -> SyntaxResult<Subscript> {
    let ctx = ctx.nested();
    self.require(TT::BracketOpen)?;
    let start = if self.peek().typ == TT::Colon {
      None
    } else {
      Some(self.parse_argument(ctx)?)
    };
    if !self.consume_if(TT::Colon).is_match() {
      self.require(TT::BracketClose)?;
      return match start {
        Some(key) => Ok(Subscript::Key(key)),
        None => unreachable!(),
      };
    };
    let end = if self.peek().typ == TT::BracketClose {
      None
    } else {
      Some(self.parse_argument(ctx)?)
    };
    self.require(TT::BracketClose)?;
    Ok(Subscript::Range { start, end })
  }

  fn parse_member(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let new_token = self.consume_if(TT::KeywordNew);
    let mut is_construct = new_token.is_match();
    let start = new_token.match_loc();
    let mut expr = self.parse_primary(ctx)?;
    loop {
      let t = self.peek();
      match t.typ {
        TT::Dot => {
          self.consume();
          let prop = self.require_predicate(TT::is_property_name, "property name")?;
          let name = self.string(prop.loc);
          if self.peek().typ == TT::ParenthesisOpen {
            let args = self.call_args(ctx)?;
            let loc = expr.loc.add_option(start) + Loc(prop.loc.0, self.last_end());
            expr = Node::new(loc, MethodExpr {
              name,
              object: expr,
              args,
              is_construct,
            })
            .into_stx();
            is_construct = false;
          } else {
            let loc = expr.loc + prop.loc;
            let key = literal(prop.loc, LitValue::String(name));
            expr = Node::new(loc, IndexExpr {
              object: expr,
              subscript: Subscript::Key(key),
            })
            .into_stx();
          };
        }
        TT::BracketOpen => {
          let subscript = self.subscript(ctx)?;
          let loc = expr.loc + Loc(t.loc.0, self.last_end());
          expr = Node::new(loc, IndexExpr {
            object: expr,
            subscript,
          })
          .into_stx();
        }
        TT::ParenthesisOpen if matches!(*expr.stx, Expr::Lookup(_)) => {
          let args = self.call_args(ctx)?;
          let loc = expr.loc.add_option(start) + Loc(t.loc.0, self.last_end());
          let callee = match *expr.stx {
            Expr::Lookup(callee) => callee,
            _ => unreachable!(),
          };
          let is_imported_call = callee.stx.scope == Scope::Import;
          expr = Node::new(loc, CallExpr {
            callee,
            args,
            is_construct,
            is_imported_call,
          })
          .into_stx();
          is_construct = false;
        }
        _ => break,
      };
    }
    if is_construct {
      return Err(expr.loc.add_option(start).error(SyntaxErrorType::IllegalConstruct, None));
    };
    Ok(expr)
  }

  /// Consumes an identifier and resolves it as a reference.
  pub fn lookup(&mut self) -> SyntaxResult<Node<LookupExpr>> {
    let (loc, name) = self.require_identifier()?;
    let stx = self.resolver.resolve(&name, loc, None)?;
    Ok(Node::new(loc, stx))
  }

  /// `@option [(Type)] name`.
  fn decorated(&mut self) -> SyntaxResult<Node<LookupExpr>> {
    let at = self.require(TT::At)?;
    let (decorator_loc, decorator) = self.require_identifier()?;
    if decorator != "option" {
      return Err(decorator_loc.error(SyntaxErrorType::IllegalDecorator, Some(TT::Identifier)));
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
      return Err(loc.error(SyntaxErrorType::IllegalDecorator, Some(TT::Identifier)));
    };
    let stx = self.resolver.resolve(&name, loc, Some(OptionDecl { ty }))?;
    Ok(Node::new(at.loc + loc, stx))
  }

  fn parse_primary(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    let (t, next) = self.peek_2();
    match t.typ {
      TT::LiteralString
      | TT::LiteralNumber
      | TT::LiteralTrue
      | TT::LiteralFalse
      | TT::LiteralNull
      | TT::LiteralUndefined => Ok(self.lit_simple()?.into_stx()),
      TT::Hyphen if next.typ == TT::LiteralNumber => Ok(self.lit_simple()?.into_stx()),
      TT::LiteralTemplatePartString | TT::LiteralTemplatePartStringEnd => self.lit_template(ctx),
      TT::BracketOpen => Ok(self.lit_arr(ctx)?.into_stx()),
      TT::BraceOpen => Ok(self.lit_obj(ctx)?.into_stx()),
      TT::At => Ok(self.decorated()?.into_stx()),
      TT::Percent => {
        self.consume();
        if ctx.pipe_depth == 0 {
          return Err(t.error(SyntaxErrorType::TopicOutsidePipe));
        };
        let stx = self.resolver.topic(ctx.pipe_depth - 1);
        Ok(Node::new(t.loc, stx).into_stx())
      }
      TT::ParenthesisOpen => {
        let ctx = ctx.nested();
        self.consume();
        let mut expr = self.parse_argument(ctx)?;
        while self.consume_if(TT::Comma).is_match() {
          let right = self.parse_argument(ctx)?;
          expr = binary(OperatorName::Comma, expr, right, BinaryMeta::None);
        }
        let close = self.require(TT::ParenthesisClose)?;
        expr.loc = t.loc + close.loc;
        Ok(expr)
      }
      typ if typ.is_identifier_like() => Ok(self.lookup()?.into_stx()),
      _ => {
        let t = self.consume();
        Err(self.unexpected(&t, SyntaxErrorType::ExpectedSyntax("expression")))
      }
    }
  }
}
