use parse_bind::ast::expr::Expr;
use parse_bind::error::ErrorCategory;
use parse_bind::error::SyntaxErrorType;
use parse_bind::parse;
use parse_bind::scope::Scope;
use parse_bind::ParseMode;

fn statement(source: &str) -> parse_bind::binding::Binding {
  parse(source, ParseMode::Statement)
    .unwrap_or_else(|err| panic!("failed to parse {source:?}: {err:?}"))
    .binding
}

#[test]
fn callback_parameters_are_local() {
  let binding = statement("f(xs, x => g(x, y), (a, b) => a)");
  assert!(!binding.globals().contains_key("x"));
  assert!(!binding.globals().contains_key("a"));
  assert!(!binding.globals().contains_key("b"));
  assert_eq!(binding.parameters(), &["xs".to_string(), "g".to_string(), "y".to_string()]);

  let Expr::Call(call) = &*binding.ast().stx else {
    panic!("expected call");
  };
  let Expr::Callback(callback) = &*call.stx.args[1].stx else {
    panic!("expected callback");
  };
  let Expr::Call(body) = &*binding.callback_body(callback.stx.id).unwrap().stx else {
    panic!("expected call body");
  };
  assert_eq!(body.stx.callee.stx.scope, Scope::Global);
  assert_eq!(body.stx.args[0].stx.as_lookup().unwrap().stx.scope, Scope::Local);
  assert_eq!(body.stx.args[1].stx.as_lookup().unwrap().stx.scope, Scope::Global);
}

#[test]
fn parameters_shadow_imports_inside_callbacks() {
  let binding = statement("with(f, g) f(g, f => f)");
  assert!(binding.globals().is_empty());
  assert_eq!(binding.import_refs()["f"].len(), 1);
}

#[test]
fn nested_callbacks_see_outer_parameters() {
  let binding = statement("f(a => map(a, b => [a, b, c]))");
  assert_eq!(binding.parameters(), &["map".to_string(), "c".to_string()]);
}

#[test]
fn unused_imports_are_rejected() {
  let err = parse("with(a,b) a()", ParseMode::Statement).unwrap_err();
  assert_eq!(err.typ, SyntaxErrorType::UnusedImport("b".into()));
  assert_eq!(err.loc.0, 7);
  assert!(parse("with(a) a()", ParseMode::Statement).is_ok());
}

#[test]
fn object_labels_do_not_count_as_references() {
  let err = parse("with(a, b) a({ b: 1 })", ParseMode::Statement).unwrap_err();
  assert_eq!(err.typ, SyntaxErrorType::UnusedImport("b".into()));
  let binding = statement("with(a, b) a({ b })");
  assert_eq!(binding.import_refs()["b"].len(), 1);
  let binding = statement("f({ key: value })");
  assert_eq!(binding.parameters(), &["value".to_string()]);
}

#[test]
fn imports_are_referenced_once() {
  let err = parse("with(a) a(a)", ParseMode::Statement).unwrap_err();
  assert_eq!(err.typ, SyntaxErrorType::ImportReferencedTwice("a".into()));
  assert!(err.message().contains("principal call"));
}

#[test]
fn capture_targets_must_be_global() {
  let binding = statement("f(x) -> out");
  assert!(binding.is_void());
  assert!(binding.globals().contains_key("out"));
  let err = parse("with(f, out) f(out) -> out", ParseMode::Statement).unwrap_err();
  assert_eq!(err.typ, SyntaxErrorType::CaptureTargetNotGlobal("out".into()));
  assert_eq!(err.category(), ErrorCategory::Scope);
}

#[test]
fn topics_are_local() {
  let binding = statement("f(x |> g(%))");
  assert!(binding.globals().keys().all(|k| !k.starts_with('%')));
  assert_eq!(binding.parameters(), &["x".to_string(), "g".to_string()]);
}

#[test]
fn rename_global_repoints_references() {
  let mut binding = statement("f(input, g(input), out)");
  assert!(binding.rename_global("input", "source"));
  assert!(!binding.globals().contains_key("input"));
  assert_eq!(binding.globals()["source"].len(), 2);
  assert_eq!(binding.parameters(), &[
    "source".to_string(),
    "g".to_string(),
    "out".to_string()
  ]);
  let Expr::Call(call) = &*binding.ast().stx else {
    panic!("expected call");
  };
  assert_eq!(call.stx.args[0].stx.as_lookup().unwrap().stx.name, "source");

  // Renaming onto an existing name merges the two reference sets.
  assert!(binding.rename_global("out", "source"));
  assert_eq!(binding.globals()["source"].len(), 3);
  assert_eq!(binding.parameters(), &["source".to_string(), "g".to_string()]);

  assert!(!binding.rename_global("missing", "other"));
}

#[test]
fn rename_global_reaches_callback_bodies() {
  let mut binding = statement("f(x => g(x, limit))");
  assert!(binding.rename_global("limit", "max"));
  let Expr::Call(call) = &*binding.ast().stx else {
    panic!("expected call");
  };
  let Expr::Callback(callback) = &*call.stx.args[0].stx else {
    panic!("expected callback");
  };
  let Expr::Call(body) = &*binding.callback_body(callback.stx.id).unwrap().stx else {
    panic!("expected call body");
  };
  assert_eq!(body.stx.args[1].stx.as_lookup().unwrap().stx.name, "max");
}
