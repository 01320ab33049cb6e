//! Shared expression-evaluation plumbing for node handlers.
//!
//! Node payloads are JSON Logic documents evaluated with DataLogic. Each
//! worker thread caches one DataLogic instance and rotates it periodically
//! to keep arena growth bounded under a long-lived process.

use datalogic_rs::DataLogic;
use serde_json::Value;
use std::cell::RefCell;
use std::sync::Arc;

/// Maximum number of evaluations before rotating the cached instance.
const DATALOGIC_ROTATION_THRESHOLD: usize = 10000;

thread_local! {
    static DATALOGIC_CACHE: RefCell<Option<(DataLogic, usize)>> = const { RefCell::new(None) };
}

fn create_datalogic() -> DataLogic {
    DataLogic::with_preserve_structure()
}

/// Run a closure against the thread-local DataLogic instance, creating or
/// rotating it as needed.
pub fn with_cached_datalogic<F, R>(f: F) -> R
where
    F: FnOnce(&DataLogic) -> R,
{
    DATALOGIC_CACHE.with(|cache| {
        let mut cache_ref = cache.borrow_mut();

        let should_rotate = cache_ref
            .as_ref()
            .map(|(_, count)| *count >= DATALOGIC_ROTATION_THRESHOLD)
            .unwrap_or(true);

        if should_rotate {
            *cache_ref = Some((create_datalogic(), 0));
        }

        let (datalogic, count) = cache_ref.as_mut().unwrap();
        *count += 1;

        f(datalogic)
    })
}

/// Compile and evaluate a JSON Logic expression against the given data.
pub fn evaluate_json_logic(logic: &Value, data: &Value) -> anyhow::Result<Value> {
    with_cached_datalogic(|datalogic| {
        let compiled = datalogic
            .compile(logic)
            .map_err(|e| anyhow::anyhow!("Compilation failed: {}", e))?;
        datalogic
            .evaluate(&compiled, Arc::new(data.clone()))
            .map_err(|e| anyhow::anyhow!("Evaluation failed: {}", e))
    })
}

/// Process a template object that may contain JSON Logic expressions.
///
/// Single-key objects are first attempted as expressions; on compile failure
/// they fall back to field-wise template processing. Multi-key objects and
/// arrays are processed recursively; literals pass through unchanged.
pub fn evaluate_template(template: &Value, data: &Value) -> anyhow::Result<Value> {
    match template {
        Value::Object(map) if map.len() == 1 => match evaluate_json_logic(template, data) {
            Ok(value) => Ok(value),
            Err(_) => evaluate_template_fields(map, data),
        },
        Value::Object(map) => evaluate_template_fields(map, data),
        Value::Array(items) => items
            .iter()
            .map(|item| evaluate_template(item, data))
            .collect::<anyhow::Result<Vec<_>>>()
            .map(Value::Array),
        literal => Ok(literal.clone()),
    }
}

fn evaluate_template_fields(
    map: &serde_json::Map<String, Value>,
    data: &Value,
) -> anyhow::Result<Value> {
    let mut result = serde_json::Map::with_capacity(map.len());
    for (key, value) in map {
        result.insert(key.clone(), evaluate_template(value, data)?);
    }
    Ok(Value::Object(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_evaluate_json_logic_equality() {
        let logic = json!({"==": [{"val": ["status"]}, "active"]});

        let result = evaluate_json_logic(&logic, &json!({"status": "active"})).unwrap();
        assert_eq!(result, json!(true));

        let result = evaluate_json_logic(&logic, &json!({"status": "idle"})).unwrap();
        assert_eq!(result, json!(false));
    }

    #[test]
    fn test_evaluate_json_logic_numeric_comparison() {
        let logic = json!({">": [{"val": ["temp"]}, 30]});

        assert_eq!(
            evaluate_json_logic(&logic, &json!({"temp": 35})).unwrap(),
            json!(true)
        );
        assert_eq!(
            evaluate_json_logic(&logic, &json!({"temp": 20})).unwrap(),
            json!(false)
        );
    }

    #[test]
    fn test_evaluate_template_mixed_fields() {
        let template = json!({
            "label": "reading",
            "value": {"val": ["temp"]},
            "doubled": {"*": [{"val": ["temp"]}, 2]}
        });
        let data = json!({"temp": 5});

        let result = evaluate_template(&template, &data).unwrap();
        assert_eq!(result["label"], "reading");
        assert_eq!(result["value"], json!(5));
        assert_eq!(result["doubled"], json!(10));
    }

    #[test]
    fn test_evaluate_template_preserves_literals() {
        let template = json!({"a": [1, 2, "x"], "b": true});
        let result = evaluate_template(&template, &json!({})).unwrap();
        assert_eq!(result, template);
    }
}
