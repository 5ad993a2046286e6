use serde_json::{Map, Value};

use crate::app::{ReupError, Result};
use crate::domain::{AvailabilityRecord, UNKNOWN_PRODUCT};
use crate::fetcher::RawDocument;

const ONLINE_IN_STOCK: &str = "InStock";
const BUTTON_ADD_TO_CART: &str = "AddToCart";

/// Parse an API payload carrying an explicit `availability` object.
///
/// The item is in stock only when all four signals agree: available online,
/// online status `InStock`, a positive online unit count and an `AddToCart`
/// button state.
pub(crate) fn parse_structured(doc: &RawDocument) -> Result<AvailabilityRecord> {
    let payload: Value = serde_json::from_str(&doc.body)
        .map_err(|e| ReupError::ParseFailure(format!("invalid JSON from {}: {}", doc.url, e)))?;

    let availability = payload
        .get("availability")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            ReupError::ParseFailure(format!("no availability object in payload from {}", doc.url))
        })?;

    let available_online = flag(availability, "isAvailableOnline");
    let online_in_stock = text(availability, "onlineAvailability") == Some(ONLINE_IN_STOCK);
    let units = count(availability, "onlineAvailabilityCount");
    let add_to_cart = text(availability, "buttonState") == Some(BUTTON_ADD_TO_CART);

    let signals = [available_online, online_in_stock, units > 0, add_to_cart];
    let in_stock = signals.iter().all(|s| *s);
    if !in_stock && signals.iter().any(|s| *s) {
        tracing::debug!(
            "Inconsistent availability flags for {}: online={} status={} count={} button={}",
            doc.url,
            available_online,
            online_in_stock,
            units,
            add_to_cart
        );
    }

    let name = payload
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(UNKNOWN_PRODUCT);

    let price = ["salePrice", "regularPrice"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(price_value));

    let mut record = AvailabilityRecord::new(name);
    record.in_stock = in_stock;
    record.units_available = units;
    record.purchasable = add_to_cart;
    record.price = price;
    record.observed_at = doc.fetched_at;
    Ok(record)
}

fn text<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str).map(str::trim)
}

fn flag(object: &Map<String, Value>, key: &str) -> bool {
    match object.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn count(object: &Map<String, Value>, key: &str) -> u32 {
    let raw = match object.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(n) if n.is_finite() && n > 0.0 => n.min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

fn price_value(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        _ => None,
    }?;
    (price.is_finite() && price > 0.0).then_some(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(available: Value, status: Value, count: Value, button: Value) -> RawDocument {
        let body = json!({
            "name": "  GeForce RTX 5090  ",
            "salePrice": 2599.99,
            "regularPrice": 2799.99,
            "availability": {
                "isAvailableOnline": available,
                "onlineAvailability": status,
                "onlineAvailabilityCount": count,
                "buttonState": button,
            }
        });
        RawDocument::json("https://api.example/product/18931348", body.to_string())
    }

    fn in_stock_payload() -> RawDocument {
        payload(json!(true), json!("InStock"), json!(5), json!("AddToCart"))
    }

    #[test]
    fn test_all_four_flags_in_stock() {
        let record = parse_structured(&in_stock_payload()).unwrap();
        assert!(record.in_stock);
        assert!(record.purchasable);
        assert_eq!(record.units_available, 5);
        assert_eq!(record.name, "GeForce RTX 5090");
        assert_eq!(record.price, Some(2599.99));
    }

    #[test]
    fn test_zero_count_out_of_stock() {
        let doc = payload(json!(true), json!("InStock"), json!(0), json!("AddToCart"));
        let record = parse_structured(&doc).unwrap();
        assert!(!record.in_stock);
        assert!(record.purchasable);
        assert_eq!(record.units_available, 0);
    }

    #[test]
    fn test_any_single_false_flag_flips_result() {
        let cases = [
            payload(json!(false), json!("InStock"), json!(5), json!("AddToCart")),
            payload(json!(true), json!("SoldOutOnline"), json!(5), json!("AddToCart")),
            payload(json!(true), json!("InStock"), json!(0), json!("AddToCart")),
            payload(json!(true), json!("InStock"), json!(5), json!("SoldOut")),
        ];
        for doc in cases {
            assert!(!parse_structured(&doc).unwrap().in_stock, "{}", doc.body);
        }
    }

    #[test]
    fn test_string_encoded_values_tolerated() {
        let doc = payload(json!("true"), json!("InStock"), json!("3"), json!("AddToCart"));
        let record = parse_structured(&doc).unwrap();
        assert!(record.in_stock);
        assert_eq!(record.units_available, 3);
    }

    #[test]
    fn test_missing_optional_fields() {
        let doc = RawDocument::json("u", r#"{"availability": {}}"#);
        let record = parse_structured(&doc).unwrap();
        assert_eq!(record.name, UNKNOWN_PRODUCT);
        assert!(!record.in_stock);
        assert!(!record.purchasable);
        assert_eq!(record.price, None);
    }

    #[test]
    fn test_regular_price_fallback() {
        let doc = RawDocument::json(
            "u",
            r#"{"salePrice": "n/a", "regularPrice": "$1,299.50", "availability": {}}"#,
        );
        assert_eq!(parse_structured(&doc).unwrap().price, Some(1299.5));
    }

    #[test]
    fn test_missing_availability_object_fails() {
        for body in [r#"{"name": "x"}"#, r#"{"availability": "InStock"}"#, "[1, 2]", "{oops"] {
            let doc = RawDocument::json("u", body);
            assert!(matches!(
                parse_structured(&doc),
                Err(ReupError::ParseFailure(_))
            ));
        }
    }
}
