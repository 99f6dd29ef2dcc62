//! Tolerant deserializers for the floorsheet API, which is loose about
//! whether identifiers and numbers arrive as JSON numbers or strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `"123"`, `123` or `123.0` → `Some("123")`; `null`/missing/empty → `None`.
pub mod opt_string_or_number {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Option::<Value>::deserialize(deserializer)?;
        Ok(match v {
            Some(Value::String(s)) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Some(Value::Number(n)) => Some(match n.as_f64() {
                Some(f) if n.is_f64() && f.fract() == 0.0 => format!("{}", f as i64),
                _ => n.to_string(),
            }),
            _ => None,
        })
    }
}

/// Integer quantity that may arrive as `100`, `100.0` or `"100"`.
pub mod lenient_i64 {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Option::<Value>::deserialize(deserializer)?;
        match v {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| serde::de::Error::custom(format!("non-integral quantity: {n}"))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid quantity: {s:?}"))),
            Some(other) => Err(serde::de::Error::custom(format!("invalid quantity: {other}"))),
        }
    }
}

/// Price or amount as `f64`, accepting numeric strings. Missing → 0.0.
pub mod lenient_f64 {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Option::<Value>::deserialize(deserializer)?;
        match v {
            None | Some(Value::Null) => Ok(0.0),
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| serde::de::Error::custom(format!("invalid number: {n}"))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| serde::de::Error::custom(format!("invalid number: {s:?}"))),
            Some(other) => Err(serde::de::Error::custom(format!("invalid number: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, with = "super::opt_string_or_number")]
        id: Option<String>,
        #[serde(default, with = "super::lenient_i64")]
        qty: i64,
        #[serde(default, with = "super::lenient_f64")]
        rate: f64,
    }

    fn probe(raw: &str) -> Probe {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn identifiers_accept_numbers_and_strings() {
        assert_eq!(probe(r#"{"id": 2024010401000123}"#).id.as_deref(), Some("2024010401000123"));
        assert_eq!(probe(r#"{"id": "58"}"#).id.as_deref(), Some("58"));
        assert_eq!(probe(r#"{"id": 58.0}"#).id.as_deref(), Some("58"));
        assert_eq!(probe(r#"{"id": null}"#).id, None);
        assert_eq!(probe(r#"{"id": "  "}"#).id, None);
        assert_eq!(probe(r#"{}"#).id, None);
    }

    #[test]
    fn quantities_accept_integral_floats_and_strings() {
        assert_eq!(probe(r#"{"qty": 10}"#).qty, 10);
        assert_eq!(probe(r#"{"qty": 10.0}"#).qty, 10);
        assert_eq!(probe(r#"{"qty": "25"}"#).qty, 25);
        assert!(serde_json::from_str::<Probe>(r#"{"qty": 1.5}"#).is_err());
    }

    #[test]
    fn rates_accept_numeric_strings() {
        assert!((probe(r#"{"rate": "512.4"}"#).rate - 512.4).abs() < 1e-9);
        assert!((probe(r#"{"rate": 512}"#).rate - 512.0).abs() < 1e-9);
        assert!(serde_json::from_str::<Probe>(r#"{"rate": "n/a"}"#).is_err());
    }
}
