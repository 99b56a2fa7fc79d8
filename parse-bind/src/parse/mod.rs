use crate::ast::node::Node;
use crate::ast::expr::Expr;
use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::lex::lex_next;
use crate::lex::Lexer;
use crate::loc::Loc;
use crate::scope::ScopeResolver;
use crate::token::Token;
use crate::token::TT;

pub mod call;
pub mod drive;
pub mod expr;
pub mod lit;
pub mod stmt;
pub mod template;

// Almost every parse_* function takes these field values as parameters. Fields are public to allow destructuring, but the value should be immutable; the with_* methods create an altered copy for passing into other functions. This struct should be received as a value, not a reference.
#[derive(Clone, Copy, Default)]
pub struct ParseCtx {
  // Number of enclosing pipes; the topic placeholder refers to the innermost one.
  pub pipe_depth: usize,
  // Set while parsing the branches of an unparenthesized conditional.
  pub in_ternary: bool,
}

impl ParseCtx {
  pub fn with_pipe_depth(&self, pipe_depth: usize) -> ParseCtx {
    ParseCtx {
      pipe_depth,
      ..*self
    }
  }

  pub fn with_in_ternary(&self, in_ternary: bool) -> ParseCtx {
    ParseCtx {
      in_ternary,
      ..*self
    }
  }

  /// Context for a bracketed sub-expression, where a pipe or conditional no longer mixes with the outside.
  pub fn nested(&self) -> ParseCtx {
    self.with_in_ternary(false)
  }
}

#[derive(Debug)]
#[must_use]
pub struct MaybeToken {
  typ: TT,
  loc: Loc,
  matched: bool,
}

impl MaybeToken {
  pub fn is_match(&self) -> bool {
    self.matched
  }

  pub fn match_loc(&self) -> Option<Loc> {
    if self.matched {
      Some(self.loc)
    } else {
      None
    }
  }

  pub fn error(&self, err: SyntaxErrorType) -> SyntaxError {
    debug_assert!(!self.matched);
    self.loc.error(err, Some(self.typ))
  }
}

#[derive(Clone, Copy)]
pub struct ParserCheckpoint {
  next_tok_i: usize,
  last_end: usize,
}

pub struct Parser<'a> {
  lexer: Lexer<'a>,
  buf: Vec<Token>,
  next_tok_i: usize,
  // End offset of the most recently consumed token or raw template text.
  last_end: usize,
  pub(crate) resolver: ScopeResolver,
  pub(crate) callbacks: Vec<Node<Expr>>,
}

// We extend this struct with added methods in the various submodules, instead of simply using free functions and passing `&mut Parser` around.
impl<'a> Parser<'a> {
  pub fn new(lexer: Lexer<'a>) -> Parser<'a> {
    Parser {
      lexer,
      buf: Vec::new(),
      next_tok_i: 0,
      last_end: 0,
      resolver: ScopeResolver::new(),
      callbacks: Vec::new(),
    }
  }

  pub fn source(&self) -> &'a str {
    self.lexer.source()
  }

  pub fn source_range(&self) -> Loc {
    self.lexer.source_range()
  }

  pub fn str(&self, loc: Loc) -> &str {
    &self.lexer[loc]
  }

  pub fn string(&self, loc: Loc) -> String {
    self.str(loc).to_string()
  }

  pub fn last_end(&self) -> usize {
    self.last_end
  }

  pub fn checkpoint(&self) -> ParserCheckpoint {
    ParserCheckpoint {
      next_tok_i: self.next_tok_i,
      last_end: self.last_end,
    }
  }

  pub fn restore_checkpoint(&mut self, checkpoint: ParserCheckpoint) {
    self.next_tok_i = checkpoint.next_tok_i;
    self.last_end = checkpoint.last_end;
  }

  /// Discards lookahead and continues lexing from `offset`. Used when leaving raw template text.
  pub fn seek(&mut self, offset: usize) {
    self.buf.truncate(self.next_tok_i);
    self.lexer.set_next(offset);
    self.last_end = offset;
  }

  fn forward<K: FnOnce(&Token) -> bool>(&mut self, keep: K) -> (bool, Token) {
    if self.buf.len() == self.next_tok_i {
      let token = lex_next(&mut self.lexer);
      self.buf.push(token);
    }
    let t = self.buf[self.next_tok_i].clone();
    let k = keep(&t);
    if k {
      self.next_tok_i += 1;
      self.last_end = t.loc.1;
    };
    (k, t)
  }

  pub fn consume(&mut self) -> Token {
    self.forward(|_| true).1
  }

  pub fn peek(&mut self) -> Token {
    self.forward(|_| false).1
  }

  pub fn peek_2(&mut self) -> (Token, Token) {
    let cp = self.checkpoint();
    let a = self.forward(|_| true);
    let b = self.forward(|_| true);
    self.restore_checkpoint(cp);
    (a.1, b.1)
  }

  pub fn consume_if(&mut self, typ: TT) -> MaybeToken {
    let (matched, t) = self.forward(|t| t.typ == typ);
    MaybeToken {
      typ,
      matched,
      loc: t.loc,
    }
  }

  pub fn consume_if_pred<F: FnOnce(&Token) -> bool>(&mut self, pred: F) -> MaybeToken {
    let (matched, t) = self.forward(pred);
    MaybeToken {
      typ: t.typ,
      matched,
      loc: t.loc,
    }
  }

  pub fn require(&mut self, typ: TT) -> SyntaxResult<Token> {
    let t = self.consume();
    if t.typ != typ {
      Err(self.unexpected(&t, SyntaxErrorType::RequiredTokenNotFound(typ)))
    } else {
      Ok(t)
    }
  }

  pub fn require_predicate<P: FnOnce(TT) -> bool>(
    &mut self,
    pred: P,
    expected: &'static str,
  ) -> SyntaxResult<Token> {
    let t = self.consume();
    if !pred(t.typ) {
      Err(self.unexpected(&t, SyntaxErrorType::ExpectedSyntax(expected)))
    } else {
      Ok(t)
    }
  }

  /// Consumes an identifier (or contextual keyword) and returns its name.
  pub fn require_identifier(&mut self) -> SyntaxResult<(Loc, String)> {
    let t = self.require_predicate(TT::is_identifier_like, "identifier")?;
    Ok((t.loc, self.string(t.loc)))
  }

  /// Picks the most specific error for an unexpected token, falling back to `otherwise`.
  pub fn unexpected(&self, t: &Token, otherwise: SyntaxErrorType) -> SyntaxError {
    match t.typ {
      TT::EOF => t.error(SyntaxErrorType::UnexpectedEnd),
      TT::Invalid => {
        let rest = &self.source()[t.loc.0..];
        let typ = match rest.chars().next() {
          Some('"' | '\'') => SyntaxErrorType::UnterminatedString,
          Some('`') => SyntaxErrorType::UnterminatedTemplate,
          Some(c) if c.is_ascii_digit() || c == '.' => SyntaxErrorType::MalformedLiteralNumber,
          _ => otherwise,
        };
        t.error(typ)
      }
      TT::EqualsEquals | TT::ExclamationEquals => t.error(SyntaxErrorType::LooseEquality),
      _ => t.error(otherwise),
    }
  }
}
