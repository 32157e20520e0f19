use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /api/v1/run/{flow_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct RunRequest<'a> {
    pub input_type: &'static str,
    pub output_type: &'static str,
    pub input_value: &'a str,
    pub tweaks: Map<String, Value>,
    pub session_id: &'a str,
}

impl<'a> RunRequest<'a> {
    pub fn chat(prompt: &'a str, session_id: &'a str) -> Self {
        Self {
            input_type: "chat",
            output_type: "chat",
            input_value: prompt,
            tweaks: Map::new(),
            session_id,
        }
    }
}

/// The response shapes the flow backend is known to return, in probe order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// `"hello"`
    Bare(String),
    /// `{"text": "hello"}`
    Text(String),
    /// `{"message": "hello"}`
    Message(String),
    /// `{"message": {"text": "hello"}}`
    MessageText(String),
    /// `{"outputs": [{"outputs": [{"results": {...}}]}]}`
    Nested(String),
}

impl ResponseShape {
    /// Decodes `value` against each known shape; the first one yielding text wins.
    pub fn decode(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => non_empty(s).map(Self::Bare),
            Value::Object(_) => Self::decode_object(value),
            _ => None,
        }
    }

    fn decode_object(value: &Value) -> Option<Self> {
        if let Some(shape) = probe::<FlatText>(value) {
            if let Some(text) = non_empty(&shape.text) {
                return Some(Self::Text(text));
            }
        }
        if let Some(shape) = probe::<FlatMessage>(value) {
            if let Some(text) = non_empty(&shape.message) {
                return Some(Self::Message(text));
            }
        }
        if let Some(shape) = probe::<FlatMessageObject>(value) {
            if let Some(text) = non_empty(&shape.message.text) {
                return Some(Self::MessageText(text));
            }
        }
        probe::<NestedOutputs>(value)
            .and_then(NestedOutputs::first_text)
            .map(Self::Nested)
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Bare(text)
            | Self::Text(text)
            | Self::Message(text)
            | Self::MessageText(text)
            | Self::Nested(text) => text,
        }
    }
}

/// Extracts the reply text from a run response, or `None` when no shape matches.
pub fn extract_text(value: &Value) -> Option<String> {
    ResponseShape::decode(value).map(ResponseShape::into_text)
}

/* --------------------------- shapes --------------------------- */

#[derive(Debug, Deserialize)]
struct FlatText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct FlatMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct FlatMessageObject {
    message: FlatText,
}

#[derive(Debug, Deserialize)]
struct NestedOutputs {
    #[serde(deserialize_with = "lenient_objects")]
    outputs: Vec<OuterOutput>,
}

#[derive(Debug, Deserialize)]
struct OuterOutput {
    #[serde(default, deserialize_with = "lenient_objects")]
    outputs: Vec<InnerOutput>,
}

#[derive(Debug, Deserialize)]
struct InnerOutput {
    #[serde(default, deserialize_with = "lenient_object")]
    results: Option<RunResults>,
}

#[derive(Debug, Deserialize)]
struct RunResults {
    #[serde(default, deserialize_with = "lenient_string")]
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    message: Option<ResultMessage>,
}

#[derive(Debug, Deserialize)]
struct ResultMessage {
    #[serde(default, deserialize_with = "lenient_string")]
    text: Option<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    data: Option<MessageData>,
}

#[derive(Debug, Deserialize)]
struct MessageData {
    #[serde(default, deserialize_with = "lenient_string")]
    text: Option<String>,
}

impl NestedOutputs {
    fn first_text(self) -> Option<String> {
        self.outputs
            .into_iter()
            .flat_map(|outer| outer.outputs)
            .filter_map(|inner| inner.results)
            .find_map(RunResults::into_text)
    }
}

impl RunResults {
    /// `text`, then `message.text`, then `message.data.text`.
    fn into_text(self) -> Option<String> {
        let (message_text, data_text) = match self.message {
            Some(message) => (message.text, message.data.and_then(|data| data.text)),
            None => (None, None),
        };
        [self.text, message_text, data_text]
            .into_iter()
            .flatten()
            .find(|candidate| !candidate.trim().is_empty())
    }
}

/* --------------------------- helpers --------------------------- */

fn probe<T: DeserializeOwned>(value: &Value) -> Option<T> {
    T::deserialize(value).ok()
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

// The helpers below never fail: a field of the wrong type decodes as "absent".

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(if value.is_object() {
        T::deserialize(value).ok()
    } else {
        None
    })
}

fn lenient_objects<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| T::deserialize(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_string_is_returned_as_is() {
        assert_eq!(extract_text(&json!("  hi there ")), Some("  hi there ".to_string()));
        assert_eq!(
            ResponseShape::decode(&json!("hi")),
            Some(ResponseShape::Bare("hi".to_string()))
        );
    }

    #[test]
    fn top_level_text_wins_over_other_fields() {
        let value = json!({
            "text": "flat",
            "message": "other",
            "outputs": [{"outputs": [{"results": {"text": "nested"}}]}]
        });
        assert_eq!(
            ResponseShape::decode(&value),
            Some(ResponseShape::Text("flat".to_string()))
        );
    }

    #[test]
    fn flat_message_string_and_object() {
        assert_eq!(
            ResponseShape::decode(&json!({"message": "plain"})),
            Some(ResponseShape::Message("plain".to_string()))
        );
        assert_eq!(
            ResponseShape::decode(&json!({"message": {"text": "wrapped", "sender": "AI"}})),
            Some(ResponseShape::MessageText("wrapped".to_string()))
        );
    }

    #[test]
    fn nested_results_text() {
        let value = json!({"outputs": [{"outputs": [{"results": {"text": "hello"}}]}]});
        assert_eq!(extract_text(&value), Some("hello".to_string()));
    }

    #[test]
    fn nested_message_text() {
        let value = json!({"outputs": [{"outputs": [{"results": {"message": {"text": "hey"}}}]}]});
        assert_eq!(extract_text(&value), Some("hey".to_string()));
    }

    #[test]
    fn nested_message_data_text() {
        let value = json!({"outputs": [{"outputs": [{"results": {"message": {"data": {"text": "world"}}}}]}]});
        assert_eq!(
            ResponseShape::decode(&value),
            Some(ResponseShape::Nested("world".to_string()))
        );
    }

    #[test]
    fn empty_object_is_absent() {
        assert_eq!(extract_text(&json!({})), None);
        assert_eq!(extract_text(&json!(null)), None);
        assert_eq!(extract_text(&json!([])), None);
        assert_eq!(extract_text(&json!(42)), None);
    }

    #[test]
    fn empty_flat_text_is_not_success() {
        assert_eq!(extract_text(&json!("")), None);
        assert_eq!(extract_text(&json!({"text": ""})), None);
        // an empty flat field falls through to later shapes
        let value = json!({"text": "", "outputs": [{"outputs": [{"results": {"text": "later"}}]}]});
        assert_eq!(extract_text(&value), Some("later".to_string()));
    }

    #[test]
    fn whitespace_candidates_are_skipped() {
        let only_blank = json!({"outputs": [{"outputs": [{"results": {"text": "   "}}]}]});
        assert_eq!(extract_text(&only_blank), None);

        let blank_then_message = json!({"outputs": [{"outputs": [
            {"results": {"text": "  ", "message": {"text": "\n"}}},
            {"results": {"text": " ", "message": {"data": {"text": "found"}}}}
        ]}]});
        assert_eq!(extract_text(&blank_then_message), Some("found".to_string()));
    }

    #[test]
    fn wrong_types_are_no_candidate() {
        assert_eq!(extract_text(&json!({"text": 5})), None);
        assert_eq!(extract_text(&json!({"message": {"text": true}})), None);

        let value = json!({"outputs": [
            "garbage",
            {"outputs": {"not": "an array"}},
            {"outputs": [
                null,
                {"results": "not an object"},
                {"results": {"text": 12, "message": {"text": ["x"], "data": {"text": "typed"}}}}
            ]}
        ]});
        assert_eq!(extract_text(&value), Some("typed".to_string()));
    }

    #[test]
    fn missing_fields_are_no_candidate() {
        let value = json!({"outputs": [
            {},
            {"outputs": [{}, {"results": {}}, {"results": {"message": {}}}, {"artifacts": {}}]}
        ]});
        assert_eq!(extract_text(&value), None);
        assert_eq!(extract_text(&json!({"outputs": "nope"})), None);
    }

    #[test]
    fn first_outer_entry_with_text_wins() {
        let value = json!({"outputs": [
            {"outputs": [{"results": {"text": "first"}}]},
            {"outputs": [{"results": {"text": "second"}}]}
        ]});
        assert_eq!(extract_text(&value), Some("first".to_string()));
    }

    #[test]
    fn run_request_wire_shape() {
        let body = serde_json::to_value(RunRequest::chat("hi", "sess-1")).unwrap();
        assert_eq!(
            body,
            json!({
                "input_type": "chat",
                "output_type": "chat",
                "input_value": "hi",
                "tweaks": {},
                "session_id": "sess-1"
            })
        );
    }
}
