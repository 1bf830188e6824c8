//! Turning a webhook response body into the assistant's reply text.

use serde_json::Value;

/// Shown when the webhook answered without usable content.
pub const EMPTY_RESPONSE: &str = "Empty response";

/// Keys checked, in order, for the reply in a JSON object response.
const REPLY_KEYS: [&str; 3] = ["output", "message", "text"];

/// Extract the reply from a response body.
#[must_use]
pub fn parse_reply(body: &str) -> String {
    if body.trim().is_empty() {
        return EMPTY_RESPONSE.to_string();
    }

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    match value {
        Value::Object(map) => {
            let reply = REPLY_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(reply_text));
            match reply {
                Some(text) => text,
                None if map.is_empty() => EMPTY_RESPONSE.to_string(),
                None => pretty(&Value::Object(map)),
            }
        }
        Value::String(text) => text,
        Value::Array(items) if !items.is_empty() => pretty(&Value::Array(items)),
        _ => EMPTY_RESPONSE.to_string(),
    }
}

/// Text of a reply field. Empty strings, zero, `false` and `null` do not count.
fn reply_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Array(_) | Value::Object(_) => Some(pretty(value)),
        _ => None,
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_bodies() {
        assert_eq!(parse_reply(""), EMPTY_RESPONSE);
        assert_eq!(parse_reply("  \n"), EMPTY_RESPONSE);
    }

    #[test]
    fn test_object_keys_in_priority_order() {
        assert_eq!(parse_reply(r#"{"output":"Hi there"}"#), "Hi there");
        assert_eq!(parse_reply(r#"{"message":"m","text":"t"}"#), "m");
        assert_eq!(parse_reply(r#"{"output":"","text":"t"}"#), "t");
        assert_eq!(parse_reply("{}"), EMPTY_RESPONSE);
    }

    #[test]
    fn test_non_string_reply_fields() {
        assert_eq!(parse_reply(r#"{"output":42}"#), "42");
        assert_eq!(parse_reply(r#"{"output":0,"message":true}"#), "true");
        assert_eq!(parse_reply(r#"{"output":null,"text":"t"}"#), "t");
        assert_eq!(
            parse_reply(r#"{"output":{"answer":"x"}}"#),
            "{\n  \"answer\": \"x\"\n}"
        );
    }

    #[test]
    fn test_object_without_reply_keys_is_pretty_printed() {
        let reply = parse_reply(r#"{"result":42}"#);
        assert_eq!(reply, "{\n  \"result\": 42\n}");
    }

    #[test]
    fn test_other_json_shapes() {
        assert_eq!(parse_reply(r#""plain string""#), "plain string");
        assert_eq!(parse_reply("[1,2]"), "[\n  1,\n  2\n]");
        assert_eq!(parse_reply("[]"), EMPTY_RESPONSE);
        assert_eq!(parse_reply("null"), EMPTY_RESPONSE);
        assert_eq!(parse_reply("42"), EMPTY_RESPONSE);
        assert_eq!(parse_reply("true"), EMPTY_RESPONSE);
    }

    #[test]
    fn test_non_json_text_is_returned_raw() {
        assert_eq!(parse_reply("Hello, **world**"), "Hello, **world**");
    }
}
