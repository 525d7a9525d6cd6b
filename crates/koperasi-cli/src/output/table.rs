use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Result keys holding amounts of money. Only these get thousands separators.
const MONEY_FIELDS: &[&str] = &[
    "principal",
    "principal_portion",
    "interest_portion",
    "total_payment",
    "remaining_principal",
    "installment_amount",
    "total_principal",
    "total_interest",
    "exact_total_interest",
    "interest_rounding_difference",
    "admin_fee",
    "provision_fee",
    "total_fees",
    "net_disbursement",
    "min_principal",
    "max_principal",
    "total_fund",
    "basis_amount",
    "share",
    "basis_total",
    "total_allocated",
    "rounding_residual",
    "total_shu",
    "split_residual",
    "amount",
    "allocated_to_members",
    "savings_balance",
    "transaction_amount",
    "savings_share",
    "transaction_share",
    "total_share",
    "total_to_members",
    "total_retained",
    "total_rounding_residual",
];

/// Format output as tables using the tabled crate.
///
/// Scalar result fields go into one Field/Value table; every array of
/// objects in the result (schedule lines, member shares, components) gets
/// its own table underneath.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    if let Value::Object(res_map) = result {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in res_map {
            if is_row_array(val) {
                continue;
            }
            builder.push_record([key.as_str(), &format_field(key, val)]);
        }
        println!("{}", Table::from(builder));

        for (key, val) in res_map {
            if let Value::Array(rows) = val {
                if is_row_array(val) {
                    println!("\n{}:", key);
                    print_array_table(rows);
                }
            }
        }
    } else {
        print_flat_object(envelope);
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_field(key, val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        map.get(h.as_str())
                            .map(|v| format_field(h, v))
                            .unwrap_or_default()
                    })
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn is_row_array(value: &Value) -> bool {
    matches!(value, Value::Array(arr) if arr.first().is_some_and(Value::is_object))
}

fn format_field(key: &str, value: &Value) -> String {
    match value {
        Value::String(s) if MONEY_FIELDS.contains(&key) => group_thousands(s),
        _ => format_value(value),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Whole amounts get Indonesian thousands separators (`1120000` -> `1.120.000`).
/// Anything with a fractional part or non-digits is left alone so rates and
/// ids print as they are.
fn group_thousands(s: &str) -> String {
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s),
    };
    if digits.len() <= 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len() + digits.len() / 3);
    out.push_str(sign);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1120000"), "1.120.000");
        assert_eq!(group_thousands("-1000"), "-1.000");
        assert_eq!(group_thousands("999"), "999");
        assert_eq!(group_thousands("0.015"), "0.015");
        assert_eq!(group_thousands("AG-0001"), "AG-0001");
        assert_eq!(group_thousands("1234567.89"), "1234567.89");
    }

    #[test]
    fn test_only_money_fields_are_grouped() {
        let digits = serde_json::json!("1234567");
        assert_eq!(format_field("member_id", &digits), "1234567");
        assert_eq!(format_field("product_code", &digits), "1234567");
        assert_eq!(format_field("share", &digits), "1.234.567");
        assert_eq!(format_field("total_payment", &digits), "1.234.567");
        assert_eq!(format_field("period_index", &serde_json::json!(12)), "12");
    }

    #[test]
    fn test_row_array_detection() {
        assert!(is_row_array(&serde_json::json!([{"a": 1}])));
        assert!(!is_row_array(&serde_json::json!(["x", "y"])));
        assert!(!is_row_array(&serde_json::json!([])));
    }
}
