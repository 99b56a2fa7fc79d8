use parse_bind::ast::types::LitValue;
use parse_bind::error::ErrorCategory;
use parse_bind::error::SyntaxErrorType;
use parse_bind::error::OPTION_MISMATCH_PREFIX;
use parse_bind::option::OptionEntry;
use parse_bind::parse;
use parse_bind::ParseMode;

fn options(source: &str) -> Vec<OptionEntry> {
  parse(source, ParseMode::Statement)
    .unwrap_or_else(|err| panic!("failed to parse {source:?}: {err:?}"))
    .binding
    .options()
    .to_vec()
}

fn error(source: &str) -> SyntaxErrorType {
  parse(source, ParseMode::Statement).unwrap_err().typ
}

#[test]
fn identical_declarations_merge() {
  let entries = options("f(@option x = 4, @option x = 4)");
  assert_eq!(entries, vec![OptionEntry {
    name: "x".into(),
    has_explicit_type: false,
    ty: "Number".into(),
    default: Some(LitValue::Number(4.0)),
  }]);
}

#[test]
fn conflicting_defaults_are_rejected() {
  let err = parse("f(@option x = 4, @option x = 5)", ParseMode::Statement).unwrap_err();
  assert_eq!(err.typ, SyntaxErrorType::OptionDefaultMismatch("x".into()));
  assert_eq!(err.category(), ErrorCategory::Scope);
  assert!(err.message().starts_with(OPTION_MISMATCH_PREFIX));
}

#[test]
fn every_reference_must_be_declared() {
  assert_eq!(error("f(@option x, x)"), SyntaxErrorType::OptionUndeclared("x".into()));
  assert_eq!(error("f(x, @option x)"), SyntaxErrorType::OptionUndeclared("x".into()));
}

#[test]
fn declared_types_must_agree() {
  assert_eq!(
    error("f(@option(String) x, @option(Number) x)"),
    SyntaxErrorType::OptionTypeMismatch("x".into())
  );
  assert_eq!(
    error("f(@option(String) x, @option x)"),
    SyntaxErrorType::OptionTypeMismatch("x".into())
  );
}

#[test]
fn defaults_must_fit_primitive_types() {
  assert_eq!(
    error("f(@option(Number) x = 'four')"),
    SyntaxErrorType::OptionDefaultType("x".into())
  );
  // Host types are not checked against literal defaults.
  assert_eq!(options("f(@option(Path) p = './out')")[0].ty, "Path");
}

#[test]
fn a_reference_without_default_defers_to_one_with() {
  let entries = options("f(@option name, g(@option name = 'anon'))");
  assert_eq!(entries[0].default, Some(LitValue::String("anon".into())));
  assert_eq!(entries[0].ty, "String");
}

#[test]
fn bare_options_are_switches() {
  let entries = options("f(@option verbose)");
  assert_eq!(entries[0].ty, "Boolean");
  assert!(!entries[0].has_default());
  assert!(!entries[0].has_explicit_type);
}

#[test]
fn options_follow_first_reference_order() {
  let names: Vec<_> = options("f(@option b, plain, @option a = true)")
    .into_iter()
    .map(|o| o.name)
    .collect();
  assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
}

#[test]
fn display_round_trips_through_the_parser() {
  for source in [
    "f(@option x = 4)",
    "f(@option(Number) n = -2.5)",
    "f(@option(String) label = 'it\\'s')",
    "f(@option flag)",
    "f(@option(Path) p)",
    "f(@option z = null)",
    "f(@option(Number) big = 1e300)",
  ] {
    let original = options(source);
    let rendered = original
      .iter()
      .map(|o| o.to_string())
      .collect::<Vec<_>>()
      .join(", ");
    let reparsed = options(&format!("f({rendered})"));
    assert_eq!(reparsed, original, "{source} rendered as {rendered}");
  }
}

#[test]
fn defaults_that_overflow_are_malformed() {
  assert_eq!(error("f(@option n = 1e999)"), SyntaxErrorType::MalformedLiteralNumber);
}
