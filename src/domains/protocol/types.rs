//! Tool metadata returned by providers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata describing one callable tool.
///
/// `name`, `description` and `inputSchema` are typed; any other field the
/// provider sends (title, annotations, output schema, ...) is carried through
/// untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default = "empty_schema")]
    pub input_schema: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn empty_schema() -> Value {
    Value::Object(Map::new())
}

impl ToolDescriptor {
    /// Create a descriptor with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: empty_schema(),
            extra: Map::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
