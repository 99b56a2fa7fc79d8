use crate::char::CharFilter;
use crate::char::DIGIT;
use crate::char::DIGIT_BIN;
use crate::char::DIGIT_HEX;
use crate::char::DIGIT_OCT;
use crate::char::ID_CONTINUE;
use crate::char::ID_CONTINUE_CHARSTR;
use crate::char::ID_START_CHARSTR;
use crate::loc::Loc;
use crate::token::Token;
use crate::token::TT;
use ahash::HashMap;
use ahash::HashMapExt;
use aho_corasick::AhoCorasick;
use aho_corasick::AhoCorasickBuilder;
use aho_corasick::AhoCorasickKind;
use aho_corasick::Anchored;
use aho_corasick::Input;
use aho_corasick::MatchKind;
use aho_corasick::StartKind;
use core::ops::Index;
use memchr::memchr;
use memchr::memchr3;
use once_cell::sync::Lazy;


#[derive(Copy, Clone)]
pub struct LexerCheckpoint {
  next: usize,
}

// Contains the match length.
#[derive(Copy, Clone)]
struct Match(usize);

impl Match {
  pub fn len(&self) -> usize {
    self.0
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

struct PatternMatcher {
  patterns: Vec<TT>,
  matcher: AhoCorasick,
  anchored: bool,
}

impl PatternMatcher {
  pub fn new<D: AsRef<str>>(anchored: bool, patterns: Vec<(TT, D)>) -> Self {
    let (tts, syns): (Vec<_>, Vec<_>) = patterns.into_iter().unzip();
    let byte_syns: Vec<Vec<u8>> = syns.iter().map(|s| s.as_ref().as_bytes().to_vec()).collect();
    let matcher = AhoCorasickBuilder::new()
      .start_kind(if anchored {
        StartKind::Anchored
      } else {
        StartKind::Unanchored
      })
      .kind(Some(AhoCorasickKind::DFA))
      .match_kind(MatchKind::LeftmostLongest)
      .build(byte_syns)
      // The pattern tables are static, so a build failure is a programming error.
      .expect("static lexer patterns must compile");
    PatternMatcher {
      patterns: tts,
      matcher,
      anchored,
    }
  }

  pub fn find(&self, lexer: &Lexer) -> LexResult<(TT, Match)> {
    self
      .matcher
      .find(Input::new(&lexer.source[lexer.next..]).anchored(if self.anchored {
        Anchored::Yes
      } else {
        Anchored::No
      }))
      .map(|m| (self.patterns[m.pattern().as_usize()], Match(m.end())))
      .ok_or(LexNotFound)
  }
}

#[derive(Debug)]
struct LexNotFound;

type LexResult<T> = Result<T, LexNotFound>;

/// Position-tracking scanner over the source text.
pub struct Lexer<'a> {
  source: &'a str,
  next: usize,
}

impl<'a> Lexer<'a> {
  pub fn new(code: &'a str) -> Lexer<'a> {
    Lexer {
      source: code,
      next: 0,
    }
  }

  pub fn source(&self) -> &'a str {
    self.source
  }

  pub fn next(&self) -> usize {
    self.next
  }

  fn end(&self) -> usize {
    self.source.len()
  }

  fn remaining(&self) -> usize {
    self.end() - self.next
  }

  pub fn source_range(&self) -> Loc {
    Loc(0, self.end())
  }

  fn eof_range(&self) -> Loc {
    Loc(self.end(), self.end())
  }

  pub fn at_end(&self) -> bool {
    self.next >= self.end()
  }

  fn peek(&self, n: usize) -> LexResult<char> {
    self.peek_or_eof(n).ok_or(LexNotFound)
  }

  fn peek_or_eof(&self, n: usize) -> Option<char> {
    self.source[self.next..].chars().nth(n)
  }

  /// WARNING: Prefer checkpoints instead. Only use this if you know what you're doing.
  pub fn set_next(&mut self, next: usize) {
    self.next = next;
  }

  pub fn checkpoint(&self) -> LexerCheckpoint {
    LexerCheckpoint { next: self.next }
  }

  pub fn since_checkpoint(&self, checkpoint: LexerCheckpoint) -> Loc {
    Loc(checkpoint.next, self.next)
  }

  pub fn apply_checkpoint(&mut self, checkpoint: LexerCheckpoint) {
    self.next = checkpoint.next;
  }

  fn if_char(&self, c: char) -> Match {
    match self.source[self.next..].chars().next() {
      Some(first) if first == c => Match(c.len_utf8()),
      _ => Match(0),
    }
  }

  fn through_char_or_end(&self, c: char) -> Match {
    memchr(c as u8, self.source[self.next..].as_bytes())
      .map(|pos| Match(pos + 1))
      .unwrap_or_else(|| Match(self.remaining()))
  }

  fn while_not_3_chars(&self, a: char, b: char, c: char) -> Match {
    Match(
      memchr3(a as u8, b as u8, c as u8, self.source[self.next..].as_bytes())
        .unwrap_or(self.remaining()),
    )
  }

  fn while_chars(&self, chars: &CharFilter) -> Match {
    let mut len = 0;
    for ch in self.source[self.next..].chars() {
      if chars.has(ch) {
        len += ch.len_utf8();
      } else {
        break;
      }
    }
    Match(len)
  }

  fn consume(&mut self, m: Match) -> Match {
    self.next += m.len();
    m
  }

  fn skip_expect(&mut self, n: usize) {
    debug_assert!(self.next + n <= self.end());
    self.next += n;
  }

  fn drive_fallible(
    &mut self,
    preceded_by_whitespace: bool,
    f: impl FnOnce(&mut Self) -> LexResult<TT>,
  ) -> Token {
    let cp = self.checkpoint();
    let typ = f(self).unwrap_or(TT::Invalid);
    Token {
      loc: self.since_checkpoint(cp),
      typ,
      preceded_by_whitespace,
    }
  }
}

impl<'a> Index<Loc> for Lexer<'a> {
  type Output = str;

  fn index(&self, index: Loc) -> &Self::Output {
    &self.source[index.0..index.1]
  }
}

#[rustfmt::skip]
pub static OPERATORS_MAPPING: Lazy<HashMap<TT, &'static str>> = Lazy::new(|| {
  let mut map = HashMap::<TT, &'static str>::new();
  map.insert(TT::At, "@");
  map.insert(TT::Asterisk, "*");
  map.insert(TT::BarChevronRight, "|>");
  map.insert(TT::BraceClose, "}");
  map.insert(TT::BraceOpen, "{");
  map.insert(TT::BracketClose, "]");
  map.insert(TT::BracketOpen, "[");
  map.insert(TT::Colon, ":");
  map.insert(TT::Comma, ",");
  map.insert(TT::Dot, ".");
  map.insert(TT::DotDotDot, "...");
  map.insert(TT::Equals, "=");
  map.insert(TT::EqualsChevronRight, "=>");
  map.insert(TT::EqualsEquals, "==");
  map.insert(TT::EqualsEqualsEquals, "===");
  map.insert(TT::Exclamation, "!");
  map.insert(TT::ExclamationEquals, "!=");
  map.insert(TT::ExclamationEqualsEquals, "!==");
  map.insert(TT::Hyphen, "-");
  map.insert(TT::HyphenChevronRight, "->");
  map.insert(TT::ParenthesisClose, ")");
  map.insert(TT::ParenthesisOpen, "(");
  map.insert(TT::Percent, "%");
  map.insert(TT::Plus, "+");
  map.insert(TT::Question, "?");
  map.insert(TT::QuestionQuestion, "??");
  map.insert(TT::Semicolon, ";");
  map
});

pub static KEYWORDS_MAPPING: Lazy<HashMap<TT, &'static str>> = Lazy::new(|| {
  let mut map = HashMap::<TT, &'static str>::new();
  map.insert(TT::KeywordAs, "as");
  map.insert(TT::KeywordAsync, "async");
  map.insert(TT::KeywordAwait, "await");
  map.insert(TT::KeywordInstanceof, "instanceof");
  map.insert(TT::KeywordNew, "new");
  map.insert(TT::KeywordTo, "to");
  map.insert(TT::KeywordTypeof, "typeof");
  map.insert(TT::KeywordWith, "with");
  map.insert(TT::LiteralFalse, "false");
  map.insert(TT::LiteralNull, "null");
  map.insert(TT::LiteralTrue, "true");
  map.insert(TT::LiteralUndefined, "undefined");
  map
});

pub static KEYWORD_STRS: Lazy<HashMap<&'static str, TT>> = Lazy::new(|| {
  HashMap::<&'static str, TT>::from_iter(KEYWORDS_MAPPING.iter().map(|(tt, s)| (*s, *tt)))
});

#[rustfmt::skip]
static SIG: Lazy<PatternMatcher> = Lazy::new(|| {
  let mut patterns: Vec<(TT, String)> = Vec::new();
  for (&k, &v) in OPERATORS_MAPPING.iter() {
    patterns.push((k, v.into()));
  }
  for (&k, &v) in KEYWORDS_MAPPING.iter() {
    patterns.push((k, v.into()));
    // Avoid accidentally matching an identifier starting with a keyword as a keyword.
    for c in ID_CONTINUE_CHARSTR.chars() {
      let mut v = v.to_string();
      v.push(c);
      if !KEYWORD_STRS.contains_key(v.as_str()) {
        patterns.push((TT::Identifier, v));
      }
    }
  }
  for c in ID_START_CHARSTR.chars() {
    patterns.push((TT::Identifier, c.to_string()));
  }
  for c in "0123456789".chars() {
    patterns.push((TT::LiteralNumber, c.to_string()));
  }
  patterns.push((TT::LiteralNumberBin, "0b".into()));
  patterns.push((TT::LiteralNumberBin, "0B".into()));
  patterns.push((TT::LiteralNumberHex, "0x".into()));
  patterns.push((TT::LiteralNumberHex, "0X".into()));
  patterns.push((TT::LiteralNumberOct, "0o".into()));
  patterns.push((TT::LiteralNumberOct, "0O".into()));
  // Prevent `.` immediately followed by a digit from being recognised as the `.` operator.
  for digit in '0'..='9' {
    patterns.push((TT::LiteralNumber, format!(".{}", digit)));
  }
  patterns.push((TT::LiteralString, "\"".into()));
  patterns.push((TT::LiteralString, "'".into()));
  patterns.push((TT::LiteralTemplatePartString, "`".into()));

  PatternMatcher::new(true, patterns)
});

static ML_COMMENT: Lazy<PatternMatcher> = Lazy::new(|| {
  PatternMatcher::new::<&str>(false, vec![(TT::CommentMultilineEnd, "*/")])
});

static INSIG: Lazy<PatternMatcher> = Lazy::new(|| {
  PatternMatcher::new::<&str>(
    true,
    vec![
      (TT::LineTerminator, "\r"),
      (TT::LineTerminator, "\n"),
      (TT::LineTerminator, "\u{2028}"),
      (TT::LineTerminator, "\u{2029}"),
      (TT::Whitespace, "\x09"),
      (TT::Whitespace, "\x0b"),
      (TT::Whitespace, "\x0c"),
      (TT::Whitespace, "\x20"),
      (TT::Whitespace, "\u{00A0}"),
      (TT::Whitespace, "\u{1680}"),
      (TT::Whitespace, "\u{2000}"),
      (TT::Whitespace, "\u{2001}"),
      (TT::Whitespace, "\u{2002}"),
      (TT::Whitespace, "\u{2003}"),
      (TT::Whitespace, "\u{2004}"),
      (TT::Whitespace, "\u{2005}"),
      (TT::Whitespace, "\u{2006}"),
      (TT::Whitespace, "\u{2007}"),
      (TT::Whitespace, "\u{2008}"),
      (TT::Whitespace, "\u{2009}"),
      (TT::Whitespace, "\u{200A}"),
      (TT::Whitespace, "\u{202F}"),
      (TT::Whitespace, "\u{205F}"),
      (TT::Whitespace, "\u{3000}"),
      (TT::Whitespace, "\u{FEFF}"),
      (TT::CommentMultiline, "/*"),
      (TT::CommentSingle, "//"),
    ],
  )
});

fn lex_multiline_comment(lexer: &mut Lexer<'_>) {
  // Consume `/*`.
  lexer.skip_expect(2);
  // We can't reject with an error, so we just consume the rest of the source code if no matching `*/` is found.
  let mat = ML_COMMENT
    .find(lexer)
    .map(|(_, mat)| mat)
    .unwrap_or_else(|_| Match(lexer.remaining()));
  lexer.consume(mat);
}

fn lex_single_comment(lexer: &mut Lexer<'_>) {
  // Consume `//`.
  lexer.skip_expect(2);
  lexer.consume(lexer.through_char_or_end('\n'));
}

fn lex_identifier(lexer: &mut Lexer<'_>) -> LexResult<TT> {
  let starter = lexer.peek(0)?;
  lexer.skip_expect(starter.len_utf8());
  loop {
    lexer.consume(lexer.while_chars(&ID_CONTINUE));
    // Non-ASCII characters are assumed to continue the identifier.
    match lexer.peek_or_eof(0) {
      Some(c) if !c.is_ascii() && !crate::char::is_whitespace(c) => {
        lexer.skip_expect(c.len_utf8());
      }
      _ => break,
    }
  }
  Ok(TT::Identifier)
}

fn lex_number(lexer: &mut Lexer<'_>) -> LexResult<TT> {
  lexer.consume(lexer.while_chars(&DIGIT));
  if lexer.peek_or_eof(0) == Some('.') {
    lexer.consume(lexer.if_char('.'));
    lexer.consume(lexer.while_chars(&DIGIT));
  }
  if lexer
    .peek_or_eof(0)
    .filter(|&c| matches!(c, 'e' | 'E'))
    .is_some()
  {
    lexer.skip_expect(1);
    match lexer.peek(0)? {
      '+' | '-' => lexer.skip_expect(1),
      _ => {}
    };
    let exponent = lexer.consume(lexer.while_chars(&DIGIT));
    if exponent.is_empty() {
      return Ok(TT::Invalid);
    }
  }
  Ok(TT::LiteralNumber)
}

fn lex_radix_number(lexer: &mut Lexer<'_>, digits: &CharFilter) -> TT {
  lexer.skip_expect(2);
  let m = lexer.consume(lexer.while_chars(digits));
  if m.is_empty() {
    TT::Invalid
  } else {
    TT::LiteralNumber
  }
}

fn lex_string(lexer: &mut Lexer<'_>) -> LexResult<TT> {
  let quote = lexer.peek(0)?;
  lexer.skip_expect(quote.len_utf8());
  loop {
    lexer.consume(lexer.while_not_3_chars('\\', '\n', quote));
    match lexer.peek(0)? {
      '\\' => {
        lexer.skip_expect(1);
        let escaped = lexer.peek(0)?;
        lexer.skip_expect(escaped.len_utf8());
      }
      '\n' => {
        // Strings cannot span lines.
        return Ok(TT::Invalid);
      }
      c if c == quote => {
        lexer.skip_expect(c.len_utf8());
        break;
      }
      _ => unreachable!(),
    };
  }
  Ok(TT::LiteralString)
}

/// Ends with `${` or backtick.
fn lex_template_string_continue(lexer: &mut Lexer<'_>) -> LexResult<TT> {
  let mut ended = false;
  loop {
    lexer.consume(lexer.while_not_3_chars('\\', '`', '$'));
    match lexer.peek(0)? {
      '\\' => {
        lexer.skip_expect(1);
        let next_char = lexer.peek(0)?;
        lexer.skip_expect(next_char.len_utf8());
      }
      '`' => {
        ended = true;
        lexer.skip_expect(1);
        break;
      }
      '$' => {
        if lexer.peek_or_eof(1) == Some('{') {
          lexer.skip_expect(2);
          break;
        } else {
          lexer.skip_expect(1);
        }
      }
      _ => unreachable!(),
    };
  }
  let typ = if ended {
    TT::LiteralTemplatePartStringEnd
  } else {
    TT::LiteralTemplatePartString
  };
  Ok(typ)
}

fn lex_template(lexer: &mut Lexer<'_>) -> LexResult<TT> {
  // Consume backtick.
  lexer.skip_expect(1);
  lex_template_string_continue(lexer)
}

/// Skips whitespace and comments, returning whether anything was skipped.
pub fn skip_insignificant(lexer: &mut Lexer<'_>) -> bool {
  let start = lexer.next();
  while let Ok((tt, mat)) = INSIG.find(lexer) {
    match tt {
      TT::LineTerminator | TT::Whitespace => {
        lexer.consume(mat);
      }
      TT::CommentMultiline => lex_multiline_comment(lexer),
      TT::CommentSingle => lex_single_comment(lexer),
      _ => unreachable!(),
    };
  }
  lexer.next() != start
}

pub fn lex_next(lexer: &mut Lexer<'_>) -> Token {
  let preceded_by_whitespace = skip_insignificant(lexer);

  // EOF is different from Invalid, so we should emit this specifically instead of letting drive_fallible return an Invalid.
  if lexer.at_end() {
    return Token {
      loc: lexer.eof_range(),
      typ: TT::EOF,
      preceded_by_whitespace,
    };
  };

  lexer.drive_fallible(preceded_by_whitespace, |lexer| {
    if let Some(c) = lexer.peek_or_eof(0) {
      if !c.is_ascii() {
        return lex_identifier(lexer);
      }
    }

    SIG.find(lexer).and_then(|(tt, mat)| match tt {
      TT::Identifier => lex_identifier(lexer),
      TT::LiteralNumber => lex_number(lexer),
      TT::LiteralNumberBin => Ok(lex_radix_number(lexer, &DIGIT_BIN)),
      TT::LiteralNumberHex => Ok(lex_radix_number(lexer, &DIGIT_HEX)),
      TT::LiteralNumberOct => Ok(lex_radix_number(lexer, &DIGIT_OCT)),
      TT::LiteralString => lex_string(lexer),
      TT::LiteralTemplatePartString => lex_template(lexer),
      typ => {
        lexer.consume(mat);
        Ok(typ)
      }
    })
  })
}
