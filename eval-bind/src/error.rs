use crate::nano::NanO;

/// Errors raised while evaluating a binding.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvalError {
  /// A live sentinel reached a point that does not accept one.
  #[error("{0}")]
  Sentinel(NanO),

  /// The declared result type did not hold.
  #[error("type assertion failed: expected {expected}, found {found}{}", at_index(.index))]
  TypeAssertion {
    expected: String,
    found: String,
    index: Option<usize>,
  },

  /// The bound function itself failed. `name` is the call's display name.
  #[error("invocation of `{name}` failed: {cause}")]
  Invocation { name: String, cause: Box<EvalError> },

  #[error("type error: {0}")]
  Type(String),

  /// A deferred value was forced before it settled.
  #[error("deferred value forced before it settled")]
  Unsettled,

  #[error("no output receiver for `{0}`")]
  NoReceiver(String),

  /// A capability inherited from the function root type was called as a method.
  #[error("`{0}` cannot be called on a function")]
  ForbiddenMethod(String),

  /// The binding and the evaluator disagree; not caused by user input.
  #[error("internal error: {0}")]
  Internal(String),

  /// Raised by host code.
  #[error("{0}")]
  Host(String),
}

fn at_index(index: &Option<usize>) -> String {
  index.map(|i| format!(" at index {i}")).unwrap_or_default()
}

impl EvalError {
  /// The innermost cause, looking through invocation wrappers.
  pub fn root_cause(&self) -> &EvalError {
    match self {
      EvalError::Invocation { cause, .. } => cause.root_cause(),
      e => e,
    }
  }
}

pub type EvalResult<T> = Result<T, EvalError>;
