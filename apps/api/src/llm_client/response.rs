//! DashScope response envelopes.
//!
//! Generated text arrives in one of two shapes depending on the model and
//! `result_format`. Both are decoded as explicit variants and tried in a fixed
//! preference order: direct text first, then the first choice's message.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct DashScopeResponse {
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

impl DashScopeResponse {
    /// First non-blank text found across the output shapes, in preference order.
    pub fn into_text(self) -> Option<String> {
        let output = self.output?;
        GenerationOutput::decode(&output)
            .iter()
            .find_map(GenerationOutput::text)
    }
}

/// `{"text": "..."}` — plain text-generation output.
#[derive(Debug, Deserialize)]
pub struct DirectText {
    pub text: String,
}

/// `{"choices": [{"message": {"content": ...}}]}` — message format and multimodal models.
#[derive(Debug, Deserialize)]
pub struct ChoiceList {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: MessageContent,
}

/// Text models return a string; vision models return a list of parts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Deserialize)]
pub struct ContentPart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug)]
pub enum GenerationOutput {
    Direct(DirectText),
    Choices(ChoiceList),
}

impl GenerationOutput {
    /// Every shape `output` can be read as, most preferred first.
    pub fn decode(output: &Value) -> Vec<GenerationOutput> {
        let mut shapes = Vec::with_capacity(2);
        if let Ok(direct) = DirectText::deserialize(output) {
            shapes.push(GenerationOutput::Direct(direct));
        }
        if let Ok(choices) = ChoiceList::deserialize(output) {
            shapes.push(GenerationOutput::Choices(choices));
        }
        shapes
    }

    pub fn text(&self) -> Option<String> {
        let text = match self {
            GenerationOutput::Direct(direct) => direct.text.clone(),
            GenerationOutput::Choices(list) => match &list.choices.first()?.message.content {
                MessageContent::Text(text) => text.clone(),
                MessageContent::Parts(parts) => parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("\n"),
            },
        };
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Error body of a non-success response.
///
/// Fields are picked one by one from untyped JSON, so a sibling with an
/// unexpected type (numeric `code`, string `error`) does not hide a usable
/// `message`. Only string values are kept.
#[derive(Debug, Default, PartialEq)]
pub struct DashScopeErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl DashScopeErrorBody {
    /// Reads whatever is usable from a raw body; non-JSON yields an empty value.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::from_value(&value),
            Err(_) => Self::default(),
        }
    }

    fn from_value(value: &Value) -> Self {
        let text = |v: Option<&Value>| {
            v.and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let message = text(value.get("message"))
            .or_else(|| text(value.get("error").and_then(|e| e.get("message"))));
        Self {
            code: text(value.get("code")),
            message,
        }
    }
}
