use serde_json::Value;

/// The workflow's wrapping convention has changed across integration
/// iterations; each known shape gets its own extractor and the first match
/// wins. Order matters: the array wrapping must be tried before the bare
/// `output` key.
type Extractor = fn(&Value) -> Option<Value>;

const EXTRACTORS: &[Extractor] = &[array_wrapped_output, top_level_output, direct_payload];

/// `[ { "output": {...} }, ... ]`
fn array_wrapped_output(value: &Value) -> Option<Value> {
    value.as_array()?.first()?.get("output").cloned()
}

/// `{ "output": {...} }`
fn top_level_output(value: &Value) -> Option<Value> {
    value.get("output").cloned()
}

/// `{ "status": ..., "food": ..., "total": ... }` with no wrapping.
fn direct_payload(value: &Value) -> Option<Value> {
    let obj = value.as_object()?;
    if obj.contains_key("status") && obj.contains_key("food") && obj.contains_key("total") {
        Some(value.clone())
    } else {
        None
    }
}

/// Unwraps the webhook response down to the nutrition payload, or `None`
/// when the shape matches none of the known conventions.
pub fn normalize(raw: &Value) -> Option<Value> {
    EXTRACTORS.iter().find_map(|extract| extract(raw))
}

#[cfg(test)]
mod normalize_tests {
    use super::*;
    use serde_json::json;

    fn inner() -> Value {
        json!({
            "status": "success",
            "food": [{"name": "Rice", "quantity": "1 cup", "calories": 200, "protein": 4, "carbs": 45, "fat": 0}],
            "total": {"calories": 200, "protein": 4, "carbs": 45, "fat": 0}
        })
    }

    #[test]
    fn test_all_three_shapes_agree() {
        let array_wrapped = json!([{ "output": inner() }]);
        let output_wrapped = json!({ "output": inner() });
        let direct = inner();

        let a = normalize(&array_wrapped).unwrap();
        let b = normalize(&output_wrapped).unwrap();
        let c = normalize(&direct).unwrap();

        assert_eq!(a, inner());
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_empty_array_is_unrecognized() {
        assert!(normalize(&json!([])).is_none());
    }

    #[test]
    fn test_array_without_output_is_unrecognized() {
        assert!(normalize(&json!([{"status": "success"}])).is_none());
    }

    #[test]
    fn test_partial_direct_shape_is_unrecognized() {
        // Needs all of status/food/total to count as a direct payload.
        assert!(normalize(&json!({"status": "success", "food": []})).is_none());
    }

    #[test]
    fn test_unrelated_value_is_unrecognized() {
        assert!(normalize(&json!("Workflow was started")).is_none());
        assert!(normalize(&json!(42)).is_none());
    }

    // The extractor does not validate the extracted value; a garbage `output`
    // still comes through and is left for schema validation to reject.
    #[test]
    fn test_output_contents_are_not_inspected() {
        let wrapped = json!({ "output": {"unexpected": true} });
        assert_eq!(normalize(&wrapped).unwrap(), json!({"unexpected": true}));
    }
}
