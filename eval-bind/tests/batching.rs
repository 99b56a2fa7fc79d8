use eval_bind::evaluate;
use eval_bind::Boundary;
use eval_bind::Deferred;
use eval_bind::Env;
use eval_bind::EvalError;
use eval_bind::NativeFunction;
use eval_bind::Value;
use parse_bind::parse;
use parse_bind::ParseMode;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// A function that records the arguments of every call.
fn recorder() -> (NativeFunction, Rc<RefCell<Vec<Vec<String>>>>) {
  let calls = Rc::new(RefCell::new(Vec::new()));
  let log = calls.clone();
  let f = NativeFunction::new("record", move |args| {
    log.borrow_mut().push(args.iter().map(|a| a.to_string()).collect());
    Ok(Value::string("called"))
  });
  (f, calls)
}

fn deferred_result(source: &str, env: &Env) -> Deferred {
  let binding = Arc::new(parse(source, ParseMode::Expression).unwrap().binding);
  match evaluate(&binding, env, Boundary::Throw).unwrap().into_value() {
    Value::Deferred(d) => d,
    v => panic!("expected a deferred result, found {v:?}"),
  }
}

#[test]
fn call_waits_for_every_argument() {
  let (f, calls) = recorder();
  let (later, settle) = Deferred::channel();
  let env = Env::new()
    .with_param("f", f)
    .with_param("now", "a")
    .with_param("later", later);
  let result = deferred_result("f(now, later)", &env);
  assert!(!result.is_settled());
  assert!(calls.borrow().is_empty());

  settle.resolve(Value::string("b"));
  assert_eq!(result.force().unwrap().as_str(), Some("called"));
  assert_eq!(*calls.borrow(), vec![vec!["a".to_string(), "b".to_string()]]);
}

#[test]
fn argument_order_ignores_settlement_order() {
  let (f, calls) = recorder();
  let (first, settle_first) = Deferred::channel();
  let (second, settle_second) = Deferred::channel();
  let env = Env::new()
    .with_param("f", f)
    .with_param("first", first)
    .with_param("second", second);
  let result = deferred_result("f(first, 'mid', second)", &env);

  settle_second.resolve(Value::string("2"));
  assert!(!result.is_settled());
  settle_first.resolve(Value::string("1"));
  result.force().unwrap();
  assert_eq!(*calls.borrow(), vec![vec![
    "1".to_string(),
    "mid".to_string(),
    "2".to_string()
  ]]);
}

#[test]
fn rejected_argument_skips_the_call() {
  let (f, calls) = recorder();
  let (later, settle) = Deferred::channel();
  let env = Env::new().with_param("f", f).with_param("later", later);
  let result = deferred_result("f(later)", &env);
  settle.reject(EvalError::Host("lost".into()));
  assert!(matches!(result.force(), Err(EvalError::Host(msg)) if msg == "lost"));
  assert!(calls.borrow().is_empty());
}

#[test]
fn literals_wait_for_their_members() {
  let (later, settle) = Deferred::channel();
  let env = Env::new().with_param("later", later);
  let array = deferred_result("['x', later]", &env);
  let object = deferred_result("{a: later, b: 'y'}", &env);
  settle.resolve(1.0.into());
  assert_eq!(array.force().unwrap().to_string(), "x,1");
  let Value::Object(o) = object.force().unwrap() else {
    panic!("expected object");
  };
  assert_eq!(o.get("a").unwrap().as_number(), Some(1.0));
}

#[test]
fn method_arguments_are_batched() {
  let (later, settle) = Deferred::channel();
  let env = Env::new()
    .with_param("xs", Value::array(vec!["a".into(), "b".into()]))
    .with_param("later", later);
  let result = deferred_result("xs.includes(later)", &env);
  settle.resolve(Value::string("b"));
  assert_eq!(result.force().unwrap().as_bool(), Some(true));
}

#[test]
fn member_access_does_not_force() {
  let env = Env::new().with_param("later", Deferred::resolved(Value::string("abc")));
  let binding = Arc::new(parse("later.length ?? 'unforced'", ParseMode::Expression).unwrap().binding);
  let v = evaluate(&binding, &env, Boundary::Throw).unwrap().into_value();
  assert_eq!(v.as_str(), Some("unforced"));
}

#[test]
fn async_callbacks_produce_deferred_results() {
  let env = Env::new().with_param("xs", Value::array(vec!["a".into(), "bb".into()]));
  let result = deferred_result("xs.map(async x => x.length)", &env);
  assert_eq!(result.force().unwrap().to_string(), "1,2");
}

#[test]
fn sync_callbacks_settle_returned_deferred_values() {
  let (later, settle) = Deferred::channel();
  settle.resolve(Value::string("done"));
  let env = Env::new()
    .with_param("xs", Value::array(vec!["a".into()]))
    .with_param("later", later);
  let binding = Arc::new(parse("xs.map(x => later)", ParseMode::Expression).unwrap().binding);
  let v = evaluate(&binding, &env, Boundary::Throw).unwrap().into_value();
  assert_eq!(v.to_string(), "done");
}

#[test]
fn sync_callbacks_wait_for_pending_values() {
  let (later, settle) = Deferred::channel();
  let env = Env::new()
    .with_param("xs", Value::array(vec!["a".into(), "b".into()]))
    .with_param("later", later);
  let result = deferred_result("xs.map(x => [x, later])", &env);
  assert!(!result.is_settled());
  settle.resolve(Value::string("z"));
  let Value::Array(pairs) = result.force().unwrap() else {
    panic!("expected an array");
  };
  assert_eq!(pairs.len(), 2);
  assert_eq!(pairs[0].to_string(), "a,z");
  assert_eq!(pairs[1].to_string(), "b,z");
}
