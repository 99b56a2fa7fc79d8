use super::ParseCtx;
use super::Parser;
use crate::ast::expr::ArrayExpr;
use crate::ast::expr::Expr;
use crate::ast::expr::LitExpr;
use crate::ast::expr::ObjectExpr;
use crate::ast::expr::ObjectMember;
use crate::ast::expr::UnaryExpr;
use crate::ast::node::Node;
use crate::ast::types::LitValue;
use crate::error::SyntaxErrorType;
use crate::error::SyntaxResult;
use crate::loc::Loc;
use crate::operator::OperatorName;
use crate::token::TT;

/// Literals that overflow to infinity are malformed, so every literal prints back as one.
pub fn normalise_literal_number(raw: &str) -> Option<f64> {
  let digits: String = raw.chars().filter(|&c| c != '_').collect();
  let radix = match digits.get(..2) {
    Some("0b" | "0B") => 2,
    Some("0o" | "0O") => 8,
    Some("0x" | "0X") => 16,
    _ => return digits.parse::<f64>().ok().filter(|n| n.is_finite()),
  };
  u64::from_str_radix(&digits[2..], radix).ok().map(|v| v as f64)
}

fn decode_hex(raw: &str) -> Option<char> {
  u32::from_str_radix(raw, 16).ok().and_then(char::from_u32)
}

/// Decodes the escape sequence that follows a backslash. `extra` is an additional character that may be escaped as itself, such as a template terminator.
///
/// Returns the number of bytes consumed after the backslash and the decoded character.
pub fn decode_escape_sequence(raw: &str, extra: Option<char>) -> Option<(usize, char)> {
  let first = raw.chars().next()?;
  let simple = match first {
    'b' => Some('\x08'),
    'f' => Some('\x0c'),
    'n' => Some('\n'),
    'r' => Some('\r'),
    't' => Some('\t'),
    'v' => Some('\x0b'),
    '0' => Some('\0'),
    '\\' | '\'' | '"' | '`' | '$' => Some(first),
    c if Some(c) == extra => Some(c),
    _ => None,
  };
  if let Some(c) = simple {
    return Some((first.len_utf8(), c));
  };
  match first {
    'x' => {
      let hex = raw.get(1..3)?;
      Some((3, decode_hex(hex)?))
    }
    'u' if raw[1..].starts_with('{') => {
      let close = raw.find('}')?;
      Some((close + 1, decode_hex(&raw[2..close])?))
    }
    'u' => {
      let hex = raw.get(1..5)?;
      Some((5, decode_hex(hex)?))
    }
    _ => None,
  }
}

/// Decodes the body of a string literal, returning the byte offset of the first invalid escape on failure.
pub fn decode_literal(raw: &str) -> Result<String, usize> {
  let mut out = String::with_capacity(raw.len());
  let mut i = 0;
  while let Some(pos) = raw[i..].find('\\') {
    out.push_str(&raw[i..i + pos]);
    let escape_start = i + pos;
    let (consumed, c) = decode_escape_sequence(&raw[escape_start + 1..], None).ok_or(escape_start)?;
    out.push(c);
    i = escape_start + 1 + consumed;
  }
  out.push_str(&raw[i..]);
  Ok(out)
}

impl<'a> Parser<'a> {
  pub fn lit_num_val(&mut self) -> SyntaxResult<f64> {
    let t = self.require(TT::LiteralNumber)?;
    normalise_literal_number(self.str(t.loc))
      .ok_or_else(|| t.error(SyntaxErrorType::MalformedLiteralNumber))
  }

  pub fn lit_str_val(&mut self) -> SyntaxResult<String> {
    let t = self.require(TT::LiteralString)?;
    let raw = self.str(Loc(t.loc.0 + 1, t.loc.1 - 1));
    decode_literal(raw).map_err(|offset| {
      Loc(t.loc.0 + 1 + offset, t.loc.0 + 2 + offset)
        .error(SyntaxErrorType::InvalidCharacterEscape, None)
    })
  }

  /// Parses a literal that can appear as a default: a string, number (optionally negated), boolean, `null` or `undefined`. Returns None without consuming anything if the next token is not one.
  pub fn lit_simple_val(&mut self) -> SyntaxResult<Option<LitValue>> {
    let (t, next) = self.peek_2();
    let value = match t.typ {
      TT::LiteralString => LitValue::String(self.lit_str_val()?),
      TT::LiteralNumber => LitValue::Number(self.lit_num_val()?),
      TT::Hyphen if next.typ == TT::LiteralNumber => {
        self.consume();
        LitValue::Number(-self.lit_num_val()?)
      }
      TT::LiteralTrue | TT::LiteralFalse => {
        self.consume();
        LitValue::Bool(t.typ == TT::LiteralTrue)
      }
      TT::LiteralNull => {
        self.consume();
        LitValue::Null
      }
      TT::LiteralUndefined => {
        self.consume();
        LitValue::Undefined
      }
      _ => return Ok(None),
    };
    Ok(Some(value))
  }

  pub fn require_lit_simple_val(&mut self) -> SyntaxResult<LitValue> {
    match self.lit_simple_val()? {
      Some(v) => Ok(v),
      None => {
        let t = self.consume();
        Err(self.unexpected(&t, SyntaxErrorType::ExpectedSyntax("literal")))
      }
    }
  }

  pub fn lit_simple(&mut self) -> SyntaxResult<Node<LitExpr>> {
    self.with_loc(|p| {
      let value = p.require_lit_simple_val()?;
      Ok(LitExpr { value })
    })
  }

  /// An array element or call argument, which may be a spread.
  pub fn spreadable(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<Expr>> {
    if self.peek().typ == TT::DotDotDot {
      let node = self.with_loc(|p| {
        p.require(TT::DotDotDot)?;
        let argument = p.parse_argument(ctx)?;
        Ok(UnaryExpr {
          operator: OperatorName::Rest,
          argument,
        })
      })?;
      return Ok(node.into_stx());
    };
    self.parse_argument(ctx)
  }

  pub fn lit_arr(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<ArrayExpr>> {
    let ctx = ctx.nested();
    self.with_loc(|p| {
      p.require(TT::BracketOpen)?;
      let elements = p.list(TT::Comma, TT::BracketClose, |p| p.spreadable(ctx))?;
      Ok(ArrayExpr { elements })
    })
  }

  fn lit_obj_member(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<ObjectMember>> {
    self.with_loc(|p| {
      let (t, next) = p.peek_2();
      match t.typ {
        TT::DotDotDot => {
          p.consume();
          let value = p.parse_argument(ctx)?;
          Ok(ObjectMember { key: None, value })
        }
        TT::LiteralString => {
          let key = p.lit_str_val()?;
          p.require(TT::Colon)?;
          let value = p.parse_argument(ctx)?;
          Ok(ObjectMember {
            key: Some(key),
            value,
          })
        }
        typ if typ.is_identifier_like() => {
          // Read as a reference first; if it turns out to be a label, the reference is dropped again.
          let mut lookup = p.lookup()?;
          if p.consume_if(TT::Colon).is_match() {
            p.resolver.forget(&lookup.stx);
            let value = p.parse_argument(ctx)?;
            return Ok(ObjectMember {
              key: Some(lookup.stx.name),
              value,
            });
          };
          if p.consume_if(TT::Equals).is_match() {
            let default = p.require_lit_simple_val()?;
            p.resolver.set_default(&mut lookup.stx, default);
          };
          let key = lookup.stx.name.clone();
          Ok(ObjectMember {
            key: Some(key),
            value: lookup.into_stx(),
          })
        }
        typ if typ.is_property_name() && next.typ == TT::Colon => {
          let loc = p.consume().loc;
          let key = p.string(loc);
          p.consume();
          let value = p.parse_argument(ctx)?;
          Ok(ObjectMember {
            key: Some(key),
            value,
          })
        }
        _ => {
          let t = p.consume();
          Err(p.unexpected(&t, SyntaxErrorType::ExpectedSyntax("object member")))
        }
      }
    })
  }

  pub fn lit_obj(&mut self, ctx: ParseCtx) -> SyntaxResult<Node<ObjectExpr>> {
    let ctx = ctx.nested();
    self.with_loc(|p| {
      p.require(TT::BraceOpen)?;
      let members = p.list(TT::Comma, TT::BraceClose, |p| p.lit_obj_member(ctx))?;
      Ok(ObjectExpr { members })
    })
  }
}
