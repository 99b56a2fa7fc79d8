use crate::loc::Loc;
use crate::token::TT;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Formatter;
use std::error::Error;
use std::fmt::Display;

/// Prefix shared by every option-consistency message so hosts can match on it.
pub const OPTION_MISMATCH_PREFIX: &str = "@option mismatch:";

/// Whether an error came from the grammar itself or from the scope rules layered on top of it.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ErrorCategory {
  Parse,
  Scope,
}

/// A stable classification of errors produced while parsing a binding.
///
/// Diagnostic codes (prefix `PB`) are assigned per variant and are stable:
/// - `PB0001`: [`SyntaxErrorType::ExpectedNotFound`]
/// - `PB0002`: [`SyntaxErrorType::ExpectedSyntax`]
/// - `PB0003`: [`SyntaxErrorType::RequiredTokenNotFound`]
/// - `PB0004`: [`SyntaxErrorType::InvalidCharacterEscape`]
/// - `PB0005`: [`SyntaxErrorType::UnterminatedString`]
/// - `PB0006`: [`SyntaxErrorType::UnterminatedTemplate`]
/// - `PB0007`: [`SyntaxErrorType::MalformedLiteralNumber`]
/// - `PB0008`: [`SyntaxErrorType::UnexpectedEnd`]
/// - `PB0009`: [`SyntaxErrorType::ChainedEquality`]
/// - `PB0010`: [`SyntaxErrorType::LooseEquality`]
/// - `PB0011`: [`SyntaxErrorType::TernaryPipeMix`]
/// - `PB0012`: [`SyntaxErrorType::TopicOutsidePipe`]
/// - `PB0013`: [`SyntaxErrorType::IllegalConstruct`]
/// - `PB0014`: [`SyntaxErrorType::IllegalDefault`]
/// - `PB0015`: [`SyntaxErrorType::IllegalDecorator`]
/// - `PB0016`: [`SyntaxErrorType::IllegalCapture`]
/// - `PB0017`: [`SyntaxErrorType::OptionDefaultType`]
/// - `PB0018`: [`SyntaxErrorType::DuplicateImport`]
/// - `PB0019`: [`SyntaxErrorType::DuplicateParameter`]
/// - `PB0020`: [`SyntaxErrorType::ImportReferencedTwice`]
/// - `PB0021`: [`SyntaxErrorType::UnusedImport`]
/// - `PB0022`: [`SyntaxErrorType::CaptureTargetNotGlobal`]
/// - `PB0023`: [`SyntaxErrorType::OptionUndeclared`]
/// - `PB0024`: [`SyntaxErrorType::OptionTypeMismatch`]
/// - `PB0025`: [`SyntaxErrorType::OptionDefaultMismatch`]
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum SyntaxErrorType {
  ExpectedNotFound,
  ExpectedSyntax(&'static str),
  RequiredTokenNotFound(TT),
  InvalidCharacterEscape,
  UnterminatedString,
  UnterminatedTemplate,
  MalformedLiteralNumber,
  UnexpectedEnd,
  ChainedEquality,
  LooseEquality,
  TernaryPipeMix,
  TopicOutsidePipe,
  IllegalConstruct,
  IllegalDefault,
  IllegalDecorator,
  IllegalCapture,
  OptionDefaultType(String),
  DuplicateImport(String),
  DuplicateParameter(String),
  ImportReferencedTwice(String),
  UnusedImport(String),
  CaptureTargetNotGlobal(String),
  OptionUndeclared(String),
  OptionTypeMismatch(String),
  OptionDefaultMismatch(String),
}

#[derive(Clone)]
pub struct SyntaxError {
  pub typ: SyntaxErrorType,
  pub loc: Loc,
  pub actual_token: Option<TT>,
}

impl SyntaxError {
  pub fn new(typ: SyntaxErrorType, loc: Loc, actual_token: Option<TT>) -> SyntaxError {
    SyntaxError {
      typ,
      loc,
      actual_token,
    }
  }

  pub fn category(&self) -> ErrorCategory {
    self.typ.category()
  }

  pub fn message(&self) -> String {
    self.typ.message(self.actual_token)
  }

  /// Renders the error with a one-based `line:column` position resolved against `source`.
  pub fn render(&self, source: &str) -> String {
    let (line, col) = self.loc.line_col(source);
    format!("{} at {}:{}: {}", self.typ.code(), line, col, self.message())
  }
}

impl Debug for SyntaxError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{} around loc [{}:{}]", self, self.loc.0, self.loc.1)
  }
}

impl Display for SyntaxError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.message())
  }
}

impl Error for SyntaxError {}

impl PartialEq for SyntaxError {
  fn eq(&self, other: &Self) -> bool {
    self.typ == other.typ
  }
}

impl Eq for SyntaxError {}

pub type SyntaxResult<T> = Result<T, SyntaxError>;

impl SyntaxErrorType {
  /// Stable diagnostic code for this error variant.
  pub fn code(&self) -> &'static str {
    match self {
      SyntaxErrorType::ExpectedNotFound => "PB0001",
      SyntaxErrorType::ExpectedSyntax(_) => "PB0002",
      SyntaxErrorType::RequiredTokenNotFound(_) => "PB0003",
      SyntaxErrorType::InvalidCharacterEscape => "PB0004",
      SyntaxErrorType::UnterminatedString => "PB0005",
      SyntaxErrorType::UnterminatedTemplate => "PB0006",
      SyntaxErrorType::MalformedLiteralNumber => "PB0007",
      SyntaxErrorType::UnexpectedEnd => "PB0008",
      SyntaxErrorType::ChainedEquality => "PB0009",
      SyntaxErrorType::LooseEquality => "PB0010",
      SyntaxErrorType::TernaryPipeMix => "PB0011",
      SyntaxErrorType::TopicOutsidePipe => "PB0012",
      SyntaxErrorType::IllegalConstruct => "PB0013",
      SyntaxErrorType::IllegalDefault => "PB0014",
      SyntaxErrorType::IllegalDecorator => "PB0015",
      SyntaxErrorType::IllegalCapture => "PB0016",
      SyntaxErrorType::OptionDefaultType(_) => "PB0017",
      SyntaxErrorType::DuplicateImport(_) => "PB0018",
      SyntaxErrorType::DuplicateParameter(_) => "PB0019",
      SyntaxErrorType::ImportReferencedTwice(_) => "PB0020",
      SyntaxErrorType::UnusedImport(_) => "PB0021",
      SyntaxErrorType::CaptureTargetNotGlobal(_) => "PB0022",
      SyntaxErrorType::OptionUndeclared(_) => "PB0023",
      SyntaxErrorType::OptionTypeMismatch(_) => "PB0024",
      SyntaxErrorType::OptionDefaultMismatch(_) => "PB0025",
    }
  }

  pub fn category(&self) -> ErrorCategory {
    match self {
      SyntaxErrorType::CaptureTargetNotGlobal(_)
      | SyntaxErrorType::OptionUndeclared(_)
      | SyntaxErrorType::OptionTypeMismatch(_)
      | SyntaxErrorType::OptionDefaultMismatch(_) => ErrorCategory::Scope,
      _ => ErrorCategory::Parse,
    }
  }

  /// Human-readable message describing this error.
  pub fn message(&self, actual_token: Option<TT>) -> String {
    match self {
      SyntaxErrorType::ExpectedNotFound => "expected token not found".into(),
      SyntaxErrorType::ExpectedSyntax(expected) => match actual_token {
        Some(tok) => format!("expected {}, found {:?}", expected, tok),
        None => format!("expected {}", expected),
      },
      SyntaxErrorType::RequiredTokenNotFound(token) => match actual_token {
        Some(tok) => format!("expected token {:?}, found {:?}", token, tok),
        None => format!("expected token {:?}", token),
      },
      SyntaxErrorType::InvalidCharacterEscape => "invalid character escape".into(),
      SyntaxErrorType::UnterminatedString => "unterminated string".into(),
      SyntaxErrorType::UnterminatedTemplate => "unterminated template".into(),
      SyntaxErrorType::MalformedLiteralNumber => "malformed number literal".into(),
      SyntaxErrorType::UnexpectedEnd => actual_token
        .map(|tok| format!("unexpected end before {:?}", tok))
        .unwrap_or_else(|| "unexpected end of input".into()),
      SyntaxErrorType::ChainedEquality => "equality operators cannot be chained".into(),
      SyntaxErrorType::LooseEquality => "loose equality is not supported; use `===` or `!==`".into(),
      SyntaxErrorType::TernaryPipeMix => {
        "a conditional expression cannot be mixed with `|>` without parentheses".into()
      }
      SyntaxErrorType::TopicOutsidePipe => "`%` can only be used on the right of `|>`".into(),
      SyntaxErrorType::IllegalConstruct => "`new` must be followed by a call".into(),
      SyntaxErrorType::IllegalDefault => {
        "a default can only follow an identifier or an object literal property".into()
      }
      SyntaxErrorType::IllegalDecorator => "@option can only decorate a global identifier".into(),
      SyntaxErrorType::IllegalCapture => "`->` can only follow a whole statement".into(),
      SyntaxErrorType::OptionDefaultType(name) => {
        format!("{OPTION_MISMATCH_PREFIX} default of `{name}` does not match its declared type")
      }
      SyntaxErrorType::DuplicateImport(name) => format!("`{name}` is imported more than once"),
      SyntaxErrorType::DuplicateParameter(name) => format!("duplicate parameter `{name}`"),
      SyntaxErrorType::ImportReferencedTwice(name) => {
        format!("`{name}` should not be referenced except in the principal call")
      }
      SyntaxErrorType::UnusedImport(name) => format!("unused import `{name}`"),
      SyntaxErrorType::CaptureTargetNotGlobal(name) => {
        format!("capture target `{name}` must be a global name")
      }
      SyntaxErrorType::OptionUndeclared(name) => format!(
        "{OPTION_MISMATCH_PREFIX} every reference to `{name}` must be declared with @option"
      ),
      SyntaxErrorType::OptionTypeMismatch(name) => {
        format!("{OPTION_MISMATCH_PREFIX} conflicting types declared for `{name}`")
      }
      SyntaxErrorType::OptionDefaultMismatch(name) => {
        format!("{OPTION_MISMATCH_PREFIX} conflicting defaults declared for `{name}`")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn option_messages_share_prefix() {
    for typ in [
      SyntaxErrorType::OptionUndeclared("x".into()),
      SyntaxErrorType::OptionTypeMismatch("x".into()),
      SyntaxErrorType::OptionDefaultMismatch("x".into()),
      SyntaxErrorType::OptionDefaultType("x".into()),
    ] {
      assert!(typ.message(None).starts_with(OPTION_MISMATCH_PREFIX), "{typ:?}");
    }
  }

  #[test]
  fn render_includes_code_and_position() {
    let err = Loc(4, 5).error(SyntaxErrorType::UnusedImport("b".into()), None);
    assert_eq!(err.render("with(a,b) a()"), "PB0021 at 1:5: unused import `b`");
    assert_eq!(err.category(), ErrorCategory::Parse);
  }
}
