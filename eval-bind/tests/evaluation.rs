use eval_bind::evaluate;
use eval_bind::Boundary;
use eval_bind::Callable;
use eval_bind::CollectingReceiver;
use eval_bind::Deferred;
use eval_bind::Env;
use eval_bind::EvalError;
use eval_bind::EvalResult;
use eval_bind::NanOKind;
use eval_bind::NativeFunction;
use eval_bind::Outcome;
use eval_bind::PlainObject;
use eval_bind::Value;
use parse_bind::parse;
use parse_bind::ParseMode;
use std::rc::Rc;
use std::sync::Arc;

fn bind(source: &str, mode: ParseMode) -> Arc<parse_bind::binding::Binding> {
  let parsed = parse(source, mode).unwrap_or_else(|err| panic!("failed to parse {source:?}: {err:?}"));
  Arc::new(parsed.binding)
}

fn run(source: &str, env: &Env, boundary: Boundary) -> EvalResult<Outcome> {
  evaluate(&bind(source, ParseMode::Expression), env, boundary)
}

fn value(source: &str, env: &Env) -> Value {
  match run(source, env, Boundary::Throw) {
    Ok(Outcome::Value(v)) => v,
    other => panic!("{source:?} did not produce a value: {other:?}"),
  }
}

fn strings(items: &[&str]) -> Value {
  Value::array(items.iter().map(|s| Value::string(s)).collect())
}

fn texts(value: &Value) -> Vec<String> {
  let Value::Array(items) = value else {
    panic!("expected array, found {value:?}");
  };
  items.iter().map(|v| v.to_string()).collect()
}

#[test]
fn alternation_replaces_missing_property() {
  let env = Env::new().with_param("obj", Value::object(PlainObject::new()));
  let v = value("obj.missing ?? 'fallback'", &env);
  assert_eq!(v.as_str(), Some("fallback"));
}

#[test]
fn missing_property_reaching_the_boundary() {
  let env = Env::new().with_param("obj", Value::object(PlainObject::new()));
  let err = run("obj.missing", &env, Boundary::Throw).unwrap_err();
  let EvalError::Sentinel(nano) = err else {
    panic!("expected sentinel error, found {err:?}");
  };
  assert!(matches!(nano.kind, NanOKind::MissingProperty { .. }));

  let outcome = run("obj.missing", &env, Boundary::Data).unwrap();
  assert!(outcome.is_absent());
  assert!(matches!(outcome.into_value(), Value::Undefined));
}

#[test]
fn indexing_a_sentinel_is_unindexable() {
  let env = Env::new().with_param("obj", Value::object(PlainObject::new()));
  let Outcome::Absent(nano) = run("obj.missing.deeper", &env, Boundary::Data).unwrap() else {
    panic!("expected an absent result");
  };
  let NanOKind::Unindexable { key, .. } = &nano.kind else {
    panic!("expected unindexable, found {nano:?}");
  };
  assert_eq!(key, "deeper");
  assert!(!nano.exceptional);

  let Outcome::Absent(nano) = run("missing[0]", &env, Boundary::Data).unwrap() else {
    panic!("expected an absent result");
  };
  assert!(matches!(nano.kind, NanOKind::Unindexable { .. }));

  let Outcome::Absent(nano) = run("missing[1:2]", &env, Boundary::Data).unwrap() else {
    panic!("expected an absent result");
  };
  assert!(matches!(nano.kind, NanOKind::Unindexable { .. }));

  assert_eq!(value("obj.nope().x ?? 1", &env).as_number(), Some(1.0));
}

#[test]
fn out_of_range_is_a_sentinel() {
  let env = Env::new().with_param("arr", Value::array(vec![1.0.into(), 2.0.into(), 3.0.into()]));
  let Outcome::Absent(nano) = run("arr[500]", &env, Boundary::Data).unwrap() else {
    panic!("expected an absent result");
  };
  assert_eq!(nano.kind, NanOKind::OutOfRange {
    index: "500".into(),
    length: 3
  });
  assert!(!nano.exceptional);
  assert!(run("arr[500]", &env, Boundary::Throw).is_err());
  assert_eq!(value("arr[500] ?? -1", &env).as_number(), Some(-1.0));
  assert_eq!(value("arr[1]", &env).as_number(), Some(2.0));
  assert_eq!(texts(&value("arr[1:]", &env)), vec!["2", "3"]);
  assert_eq!(texts(&value("arr[:1]", &env)), vec!["1"]);
}

#[test]
fn builtin_properties() {
  let env = Env::new().with_param("xs", strings(&["a", "b"]));
  assert_eq!(value("xs.length", &env).as_number(), Some(2.0));
  assert_eq!(value("'héllo'.length", &env).as_number(), Some(5.0));
  assert_eq!(value("'héllo'[1]", &env).as_str(), Some("é"));
  assert_eq!(value("'héllo'[1:3]", &env).as_str(), Some("él"));
}

#[test]
fn private_keys_are_not_readable() {
  let obj = PlainObject::new().with("secret", "x").with_private("secret");
  let env = Env::new().with_param("obj", Value::object(obj));
  assert_eq!(value("obj.secret ?? 'hidden'", &env).as_str(), Some("hidden"));
}

#[test]
fn globals_fall_back_to_defaults() {
  let env = Env::new();
  assert_eq!(value("x = 4", &env).as_number(), Some(4.0));
  assert_eq!(value("x ?? 'none'", &env).as_str(), Some("none"));
  let env = env.with_param("x", 9.0);
  assert_eq!(value("x = 4", &env).as_number(), Some(9.0));

  let Outcome::Absent(nano) = run("y", &Env::new(), Boundary::Data).unwrap() else {
    panic!("expected an absent result");
  };
  assert_eq!(nano.kind, NanOKind::MissingGlobal { name: "y".into() });
}

#[test]
fn pipes_bind_numbered_topics() {
  let env = Env::new().with_param("xs", strings(&["abc", "d"]));
  assert_eq!(value("xs |> %.length", &env).as_number(), Some(2.0));
  assert_eq!(value("xs |> %[0] |> %.length", &env).as_number(), Some(3.0));
}

#[test]
fn callbacks_close_over_their_frame() {
  let env = Env::new()
    .with_param("xs", strings(&["a", "bb"]))
    .with_param("suffix", "!");
  let v = value("xs.map(x => [x, suffix].join(''))", &env);
  assert_eq!(texts(&v), vec!["a!", "bb!"]);
  let v = value("xs.map((x, i) => i)", &env);
  assert_eq!(texts(&v), vec!["0", "1"]);
  let v = value("xs.filter(x => x.length === 2)", &env);
  assert_eq!(texts(&v), vec!["bb"]);
}

#[test]
fn callbacks_pad_missing_arguments_with_undefined() {
  let env = Env::new().with_param("xs", strings(&["a"]));
  let v = value("xs.map((x, i, extra) => [x, i, extra])", &env);
  let Value::Array(rows) = v else {
    panic!("expected array");
  };
  let Value::Array(row) = &rows[0] else {
    panic!("expected a row");
  };
  assert_eq!(row[0].as_str(), Some("a"));
  assert_eq!(row[1].as_number(), Some(0.0));
  assert!(matches!(row[2], Value::Undefined));

  let apply = NativeFunction::new("apply", |args| match args.first() {
    Some(Value::Function(f)) => f.call(vec![]),
    _ => Ok(Value::Null),
  });
  let env = env.with_param("apply", apply);
  assert!(matches!(value("apply((a, b) => b)", &env), Value::Undefined));
}

#[test]
fn callbacks_turn_soft_failures_into_undefined() {
  let env = Env::new().with_param("xs", strings(&["a"]));
  let v = value("xs.map(x => x.nope)", &env);
  let Value::Array(items) = v else {
    panic!("expected array");
  };
  assert!(matches!(items[0], Value::Undefined));
}

#[test]
fn missing_methods_are_exceptional() {
  let env = Env::new().with_param("obj", Value::object(PlainObject::new()));
  let err = run("obj.nope() ?? 1", &env, Boundary::Data).unwrap_err();
  let EvalError::Sentinel(nano) = err else {
    panic!("expected sentinel error, found {err:?}");
  };
  assert!(nano.exceptional);
  assert!(matches!(nano.kind, NanOKind::MissingMethod { .. }));
}

#[test]
fn function_root_capabilities_are_refused() {
  let f = NativeFunction::new("f", |_| Ok(Value::Undefined));
  let env = Env::new().with_param("f", f);
  let err = run("f.bind(1)", &env, Boundary::Data).unwrap_err();
  assert!(matches!(err, EvalError::ForbiddenMethod(name) if name == "bind"));

  let g = NativeFunction::new("g", |_| Ok(Value::Undefined))
    .with_static("bind", NativeFunction::new("bind", |_| Ok(Value::string("own"))));
  let env = Env::new().with_param("g", g);
  assert_eq!(value("g.bind()", &env).as_str(), Some("own"));
}

#[test]
fn invocation_failures_are_wrapped() {
  let f = NativeFunction::new("fail", |_| Err(EvalError::Host("boom".into())));
  let env = Env::new().with_param("f", f);
  let err = run("f(1)", &env, Boundary::Throw).unwrap_err();
  let EvalError::Invocation { name, cause } = &err else {
    panic!("expected invocation error, found {err:?}");
  };
  assert_eq!(name, "f");
  assert!(matches!(**cause, EvalError::Host(_)));
  assert_eq!(err.to_string(), "invocation of `f` failed: boom");
}

#[test]
fn imported_calls_and_construction() {
  let make = NativeFunction::new("make", |args| Ok(Value::array(args)))
    .with_construct(|_| Ok(Value::string("constructed")));
  let binding = bind("make(a, ...rest)", ParseMode::Statement);
  let env = Env::new()
    .with_import("make", make.clone())
    .with_param("a", 1.0)
    .with_param("rest", Value::array(vec![2.0.into(), 3.0.into()]));
  let v = evaluate(&binding, &env, Boundary::Throw).unwrap().into_value();
  assert_eq!(texts(&v), vec!["1", "2", "3"]);

  let env = Env::new().with_param("make", make);
  assert_eq!(value("new make()", &env).as_str(), Some("constructed"));
}

#[test]
fn spreading_requires_an_iterable() {
  let env = Env::new().with_param("n", 1.0);
  assert!(matches!(run("[...n]", &env, Boundary::Throw), Err(EvalError::Type(_))));
}

#[test]
fn first_sentinel_in_a_list_wins() {
  let env = Env::new().with_param("xs", strings(&["a"]));
  let Outcome::Absent(nano) = run("[xs[3], missing]", &env, Boundary::Data).unwrap() else {
    panic!("expected an absent result");
  };
  assert!(matches!(nano.kind, NanOKind::OutOfRange { .. }));
}

#[test]
fn object_literals() {
  let base = PlainObject::new().with("b", 2.0);
  let env = Env::new().with_param("a", 1.0).with_param("base", Value::object(base));
  let v = value("{a, 'c': 3, ...base}", &env);
  let Value::Object(o) = v else {
    panic!("expected object");
  };
  assert_eq!(o.keys(), vec!["a", "c", "b"]);
  assert_eq!(o.get("b").unwrap().as_number(), Some(2.0));
}

#[test]
fn conditions() {
  let env = Env::new().with_param("yes", true).with_param("n", 1.0);
  assert_eq!(value("yes ? 'y' : 'n'", &env).as_str(), Some("y"));
  assert_eq!(value("missing ? 'y' : 'n'", &env).as_str(), Some("n"));
  assert_eq!(value("!missing", &env).as_bool(), Some(true));
  assert!(matches!(
    run("n ? 'y' : 'n'", &env, Boundary::Throw),
    Err(EvalError::Type(_))
  ));
  let env = env.with_param("obj", Value::object(PlainObject::new()));
  assert!(matches!(
    run("obj.nope() ? 1 : 2", &env, Boundary::Data),
    Err(EvalError::Sentinel(_))
  ));
}

#[test]
fn equality_and_type_queries() {
  let env = Env::new().with_param("a", "x").with_param("xs", strings(&[]));
  assert_eq!(value("a === 'x'", &env).as_bool(), Some(true));
  assert_eq!(value("a !== 'x'", &env).as_bool(), Some(false));
  assert_eq!(value("typeof a", &env).as_str(), Some("string"));
  assert_eq!(value("typeof xs", &env).as_str(), Some("object"));
  assert_eq!(value("xs instanceof Array", &env).as_bool(), Some(true));
  assert_eq!(value("a instanceof Array", &env).as_bool(), Some(false));
  let Outcome::Absent(nano) = run("a instanceof Nope", &env, Boundary::Data).unwrap() else {
    panic!("expected an absent result");
  };
  assert_eq!(nano.kind, NanOKind::MissingGlobal { name: "Nope".into() });
}

#[test]
fn index_coercion() {
  let env = Env::new().with_param("xs", strings(&["a", "b"])).with_param("i", "1");
  assert_eq!(value("xs[+i]", &env).as_str(), Some("b"));
  let env = env.with_param("i", "one");
  let err = run("xs[+i]", &env, Boundary::Data).unwrap_err();
  assert!(matches!(err, EvalError::Sentinel(nano) if matches!(nano.kind, NanOKind::FailedCast { .. })));
}

#[test]
fn comma_evaluates_both_sides() {
  let calls = Rc::new(std::cell::Cell::new(0));
  let counter = calls.clone();
  let f = NativeFunction::new("f", move |_| {
    counter.set(counter.get() + 1);
    Ok(Value::Undefined)
  });
  let env = Env::new().with_param("f", f);
  assert_eq!(value("(f(), 'done')", &env).as_str(), Some("done"));
  assert_eq!(calls.get(), 1);
}

#[test]
fn await_forces_settled_values() {
  let env = Env::new().with_param("d", Deferred::resolved(Value::string("ready")));
  assert_eq!(value("await d", &env).as_str(), Some("ready"));
  let (pending, _settle) = Deferred::channel();
  let env = Env::new().with_param("d", pending);
  assert!(matches!(run("await d", &env, Boundary::Throw), Err(EvalError::Unsettled)));
}

#[test]
fn templates_join_their_parts() {
  let binding = bind("hello ${name}, you are ${age}!", ParseMode::Template);
  let env = Env::new().with_param("name", "bob").with_param("age", 7.0);
  let v = evaluate(&binding, &env, Boundary::Throw).unwrap().into_value();
  assert_eq!(v.as_str(), Some("hello bob, you are 7!"));
}

#[test]
fn captures_write_to_receivers() {
  let f = NativeFunction::new("f", |args| Ok(Value::array(args)));
  let binding = bind("f(x) -> out", ParseMode::Statement);
  assert!(binding.is_void());
  let receiver = Rc::new(CollectingReceiver::new());
  let env = Env::new()
    .with_import("f", f.clone())
    .with_param("x", 1.0)
    .with_receiver("out", receiver.clone());
  let v = evaluate(&binding, &env, Boundary::Throw).unwrap().into_value();
  assert!(matches!(v, Value::Undefined));
  let received = receiver.take();
  assert_eq!(received.len(), 1);
  assert_eq!(received[0].0, "out");
  assert_eq!(texts(&received[0].1), vec!["1"]);

  let env = Env::new().with_import("f", f).with_param("x", 1.0);
  let err = evaluate(&binding, &env, Boundary::Throw).unwrap_err();
  assert!(matches!(err, EvalError::NoReceiver(name) if name == "out"));
}

#[test]
fn renamed_globals_read_the_new_name() {
  let mut binding = parse("[n, n = 2]", ParseMode::Expression).unwrap().binding;
  assert!(binding.rename_global("n", "count"));
  let binding = Arc::new(binding);
  let env = Env::new().with_param("count", 5.0);
  let v = evaluate(&binding, &env, Boundary::Throw).unwrap().into_value();
  assert_eq!(texts(&v), vec!["5", "5"]);
}

#[test]
fn bindings_are_reusable_across_environments() {
  let binding = bind("a ?? 'none'", ParseMode::Expression);
  let first = evaluate(&binding, &Env::new().with_param("a", "one"), Boundary::Throw).unwrap();
  let second = evaluate(&binding, &Env::new(), Boundary::Throw).unwrap();
  assert_eq!(first.into_value().as_str(), Some("one"));
  assert_eq!(second.into_value().as_str(), Some("none"));
}
