use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::loc::Loc;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum TT {
  // Special token used to represent the end of the source code. Easier than using and handling Option everywhere.
  EOF,
  // Special token used to represent invalid source code. Easier than having to propagate SyntaxError from the lexer level, which means even peeking during parsing requires error handling.
  Invalid,
  // These are only used by lexer.
  CommentMultilineEnd,
  LineTerminator,
  LiteralNumberBin,
  LiteralNumberHex,
  LiteralNumberOct,
  Whitespace,
  CommentMultiline,
  CommentSingle,

  At,
  Asterisk,
  BarChevronRight,
  BraceClose,
  BraceOpen,
  BracketClose,
  BracketOpen,
  Colon,
  Comma,
  Dot,
  DotDotDot,
  Equals,
  EqualsChevronRight,
  EqualsEquals,
  EqualsEqualsEquals,
  Exclamation,
  ExclamationEquals,
  ExclamationEqualsEquals,
  Hyphen,
  HyphenChevronRight,
  Identifier,
  KeywordAs,
  KeywordAsync,
  KeywordAwait,
  KeywordInstanceof,
  KeywordNew,
  KeywordTo,
  KeywordTypeof,
  KeywordWith,
  LiteralFalse,
  LiteralNull,
  LiteralNumber,
  LiteralString,
  LiteralTemplatePartString,
  LiteralTemplatePartStringEnd,
  LiteralTrue,
  LiteralUndefined,
  ParenthesisClose,
  ParenthesisOpen,
  Percent,
  Plus,
  Question,
  QuestionQuestion,
  Semicolon,
}

impl TT {
  /// Contextual keywords that can still be used as names.
  pub fn is_unreserved_keyword(self) -> bool {
    matches!(self, TT::KeywordAs | TT::KeywordAsync | TT::KeywordTo)
  }

  /// Whether this token can name an identifier reference, parameter or import.
  pub fn is_identifier_like(self) -> bool {
    self == TT::Identifier || self.is_unreserved_keyword()
  }

  /// Whether this token can be used as a property name after `.` or as an object literal key.
  pub fn is_property_name(self) -> bool {
    matches!(
      self,
      TT::Identifier
        | TT::KeywordAs
        | TT::KeywordAsync
        | TT::KeywordAwait
        | TT::KeywordInstanceof
        | TT::KeywordNew
        | TT::KeywordTo
        | TT::KeywordTypeof
        | TT::KeywordWith
        | TT::LiteralFalse
        | TT::LiteralNull
        | TT::LiteralTrue
        | TT::LiteralUndefined
    )
  }
}

#[derive(Clone, Debug)]
pub struct Token {
  pub loc: Loc,
  // Whether one or more whitespace characters appear immediately before this token.
  pub preceded_by_whitespace: bool,
  pub typ: TT,
}

impl Token {
  pub fn error(&self, typ: SyntaxErrorType) -> SyntaxError {
    self.loc.error(typ, Some(self.typ))
  }
}
