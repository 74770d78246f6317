//! Typed accessors over a plugin's options bag.

use serde_json::{Map, Value};
use std::time::Duration;

pub fn opt_f64(opts: &Map<String, Value>, key: &str) -> Option<f64> {
    opts.get(key).and_then(Value::as_f64)
}

pub fn opt_u64(opts: &Map<String, Value>, key: &str) -> Option<u64> {
    opts.get(key).and_then(Value::as_u64)
}

pub fn opt_u32(opts: &Map<String, Value>, key: &str) -> Option<u32> {
    opt_u64(opts, key).map(|v| v.min(u32::MAX as u64) as u32)
}

pub fn opt_bool(opts: &Map<String, Value>, key: &str) -> Option<bool> {
    opts.get(key).and_then(Value::as_bool)
}

pub fn opt_str<'a>(opts: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    opts.get(key).and_then(Value::as_str)
}

pub fn opt_duration_ms(opts: &Map<String, Value>, key: &str) -> Option<Duration> {
    opt_u64(opts, key).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_typed_getters() {
        let opts = opts(json!({
            "delay": 250,
            "frequency": 1.5,
            "revisit": true,
            "selectors": ".more # content",
        }));

        assert_eq!(opt_u64(&opts, "delay"), Some(250));
        assert_eq!(opt_duration_ms(&opts, "delay"), Some(Duration::from_millis(250)));
        assert_eq!(opt_f64(&opts, "frequency"), Some(1.5));
        assert_eq!(opt_bool(&opts, "revisit"), Some(true));
        assert_eq!(opt_str(&opts, "selectors"), Some(".more # content"));
        assert_eq!(opt_u64(&opts, "missing"), None);
    }

    #[test]
    fn test_wrong_type_reads_as_none() {
        let opts = opts(json!({ "delay": "soon" }));
        assert_eq!(opt_u64(&opts, "delay"), None);
    }
}
