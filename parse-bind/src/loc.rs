use crate::error::SyntaxError;
use crate::error::SyntaxErrorType;
use crate::token::TT;
use std::cmp::{max, min};
use std::ops::{Add, AddAssign};

/// A location within the current source text expressed as UTF-8 byte offsets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Loc(pub usize, pub usize);

impl Loc {
  pub fn at(offset: usize) -> Loc {
    Loc(offset, offset)
  }

  /// Creates a best-effort location for synthetic nodes where only one side of
  /// the range is known.
  ///
  /// If both bounds are missing, an empty location at offset 0 is returned.
  pub fn best_effort(start: Option<Loc>, end: Option<Loc>) -> Loc {
    match (start, end) {
      (Some(mut start), Some(end)) => {
        start.extend(end);
        start
      }
      (Some(start), None) => start,
      (None, Some(end)) => end,
      (None, None) => Loc(0, 0),
    }
  }

  pub fn error(self, typ: SyntaxErrorType, actual_token: Option<TT>) -> SyntaxError {
    SyntaxError::new(typ, self, actual_token)
  }

  pub fn is_empty(&self) -> bool {
    self.0 >= self.1
  }

  pub fn len(&self) -> usize {
    self.1.saturating_sub(self.0)
  }

  pub fn extend(&mut self, other: Loc) {
    self.0 = min(self.0, other.0);
    self.1 = max(self.1, other.1);
  }

  pub fn add_option(self, rhs: Option<Loc>) -> Loc {
    let mut new = self;
    if let Some(rhs) = rhs {
      new.extend(rhs);
    };
    new
  }

  /// One-based line and column of the start offset within `source`.
  ///
  /// Columns count characters, not bytes. Offsets past the end clamp to the end of the source.
  pub fn line_col(&self, source: &str) -> (usize, usize) {
    let mut end = min(self.0, source.len());
    while !source.is_char_boundary(end) {
      end -= 1;
    }
    let before = &source[..end];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let col = before[line_start..].chars().count() + 1;
    (line, col)
  }
}

impl Add for Loc {
  type Output = Loc;

  fn add(self, rhs: Self) -> Self::Output {
    let mut new = self;
    new.extend(rhs);
    new
  }
}

impl AddAssign for Loc {
  fn add_assign(&mut self, rhs: Self) {
    self.extend(rhs);
  }
}
