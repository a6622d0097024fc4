use crate::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One brainstormed item: the idea itself and the context it was produced
/// for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Idea {
    pub idea: String,
    pub context: String,
}

impl Idea {
    pub fn new(idea: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            idea: idea.into(),
            context: context.into(),
        }
    }
}

/// An idea as returned by the remote store, with the id it assigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredIdea {
    pub id: String,
    pub idea: String,
    pub context: String,
}

impl From<StoredIdea> for Idea {
    fn from(stored: StoredIdea) -> Self {
        Self {
            idea: stored.idea,
            context: stored.context,
        }
    }
}

/// The `{ "ideas": [...] }` envelope used both by the assistant output and by
/// the local store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdeaEnvelope {
    pub ideas: Vec<Idea>,
}

/// Parse and validate an untrusted `{ "ideas": [...] }` payload.
///
/// Every element is checked and all problems are reported together. Either
/// the whole batch is returned or none of it is.
pub fn parse_ideas(raw: &str) -> Result<Vec<Idea>, ValidationError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ValidationError::single(e.to_string()))?;

    let Value::Object(envelope) = value else {
        return Err(ValidationError::single(format!(
            "Expected object, received {}",
            type_name(&value)
        )));
    };

    let items = match envelope.get("ideas") {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ValidationError::single(format!(
                "ideas: Expected array, received {}",
                type_name(other)
            )))
        }
        None => return Err(ValidationError::single("ideas: Required")),
    };

    let mut messages = Vec::new();
    let mut ideas = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let Value::Object(fields) = item else {
            messages.push(format!(
                "ideas[{index}]: Expected object, received {}",
                type_name(item)
            ));
            continue;
        };

        let idea = string_field(fields, index, "idea", &mut messages);
        let context = string_field(fields, index, "context", &mut messages);
        if let (Some(idea), Some(context)) = (idea, context) {
            ideas.push(Idea { idea, context });
        }
    }

    if messages.is_empty() {
        Ok(ideas)
    } else {
        Err(ValidationError::new(messages))
    }
}

fn string_field(
    fields: &Map<String, Value>,
    index: usize,
    name: &str,
    messages: &mut Vec<String>,
) -> Option<String> {
    match fields.get(name) {
        Some(Value::String(value)) => Some(value.clone()),
        Some(other) => {
            messages.push(format!(
                "ideas[{index}].{name}: Expected string, received {}",
                type_name(other)
            ));
            None
        }
        None => {
            messages.push(format!("ideas[{index}].{name}: Required"));
            None
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
