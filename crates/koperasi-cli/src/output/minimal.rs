use serde_json::Value;

/// Result fields that answer "how much?" for each command. A simulation also
/// carries installment_amount, so net_disbursement is looked for first.
const ANSWER_KEYS: [&str; 4] = [
    "net_disbursement",
    "installment_amount",
    "total_to_members",
    "rounding_residual",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_answer(value));
}

fn minimal_answer(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let Value::Object(map) = result_obj else {
        return format_minimal(result_obj);
    };

    for key in ANSWER_KEYS {
        if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
            return format_minimal(val);
        }
    }

    match map.iter().next() {
        Some((key, val)) => format!("{}: {}", key, format_minimal(val)),
        None => String::new(),
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schedule_answer_is_installment() {
        let v = json!({"result": {"installment_amount": "1120000", "total_interest": "1440000"}});
        assert_eq!(minimal_answer(&v), "1120000");
    }

    #[test]
    fn test_simulation_answer_is_net_disbursement() {
        let v = json!({"result": {"installment_amount": "983333", "net_disbursement": "9850000"}});
        assert_eq!(minimal_answer(&v), "9850000");
    }

    #[test]
    fn test_fallback_to_first_field() {
        let v = json!({"result": {"basis_total": "45"}});
        assert_eq!(minimal_answer(&v), "basis_total: 45");
    }
}
