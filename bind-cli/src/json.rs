use eval_bind::EvalResult;
use eval_bind::PlainObject;
use eval_bind::Value;
use parse_bind::ast::types::LitValue;
use parse_bind::binding::Binding;
use serde_json::json;
use serde_json::Map;
use serde_json::Number;
use serde_json::Value as Json;

pub fn to_value(json: Json) -> Value {
  match json {
    Json::Null => Value::Null,
    Json::Bool(b) => Value::Bool(b),
    Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
    Json::String(s) => Value::string(s),
    Json::Array(items) => Value::array(items.into_iter().map(to_value).collect()),
    Json::Object(entries) => {
      let mut object = PlainObject::new();
      for (k, v) in entries {
        object.insert(k, to_value(v));
      }
      Value::object(object)
    }
  }
}

fn number(n: f64) -> Json {
  Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
}

/// Converts an evaluation result to JSON, waiting for deferred values and draining iterators.
pub fn from_value(value: &Value) -> EvalResult<Json> {
  Ok(match value {
    Value::Undefined | Value::Null => Json::Null,
    Value::Bool(b) => Json::Bool(*b),
    Value::Number(n) => number(*n),
    Value::String(s) => Json::String(s.to_string()),
    Value::Array(items) => Json::Array(items.iter().map(from_value).collect::<EvalResult<_>>()?),
    Value::Object(o) => {
      let mut map = Map::new();
      for key in o.keys() {
        if let Some(v) = o.get(&key) {
          map.insert(key, from_value(&v)?);
        };
      }
      Json::Object(map)
    }
    Value::Function(f) => Json::String(format!("[function {}]", f.name())),
    Value::Deferred(d) => from_value(&d.force()?)?,
    Value::Iter(iter) => Json::Array(
      iter
        .collect_values()?
        .iter()
        .map(from_value)
        .collect::<EvalResult<_>>()?,
    ),
    Value::AsyncIter(iter) => from_value(&iter.collect_deferred().force()?)?,
  })
}

fn literal(value: &LitValue) -> Json {
  match value {
    LitValue::Undefined | LitValue::Null => Json::Null,
    LitValue::Bool(b) => Json::Bool(*b),
    LitValue::Number(n) => number(*n),
    LitValue::String(s) => Json::String(s.clone()),
  }
}

/// The parts of a binding a host needs to wire it up.
pub fn describe(binding: &Binding, end: usize) -> Json {
  let options: Vec<Json> = binding
    .options()
    .iter()
    .map(|o| {
      json!({
        "name": o.name,
        "type": o.ty,
        "has_explicit_type": o.has_explicit_type,
        "default": o.default.as_ref().map(literal),
        "declaration": o.to_string(),
      })
    })
    .collect();
  json!({
    "imports": binding.imports(),
    "parameters": binding.parameters(),
    "options": options,
    "void": binding.is_void(),
    "result_type": binding.result_type().map(|t| t.to_string()),
    "end": end,
  })
}
