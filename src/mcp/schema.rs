//! MCP tool descriptors and their messaging-API projection.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::connector::ToolServer;
use crate::error::ChatError;
use crate::provider::{ToolInputSchema, ToolUnion};

/// Input schema of a tool as reported by an MCP server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl InputSchema {
    /// Read `type`, `properties` and `required` out of a raw JSON schema.
    ///
    /// Non-string entries of `required` are dropped.
    pub fn from_json(schema: &serde_json::Value) -> Self {
        let required = schema
            .get("required")
            .and_then(|value| value.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            schema_type: schema.get("type").cloned(),
            properties: schema.get("properties").cloned(),
            required,
        }
    }
}

/// A tool exposed by the connected MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: InputSchema,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            input_schema: InputSchema::from_json(&input_schema),
        }
    }

    /// Project onto the messaging API's tool definition.
    pub fn to_tool_union(&self) -> ToolUnion {
        ToolUnion::from(self)
    }
}

impl From<&ToolDescriptor> for ToolUnion {
    fn from(tool: &ToolDescriptor) -> Self {
        ToolUnion {
            name: tool.name.clone(),
            description: tool.description.clone().unwrap_or_default(),
            input_schema: ToolInputSchema {
                schema_type: tool
                    .input_schema
                    .schema_type
                    .clone()
                    .unwrap_or_else(|| serde_json::Value::String("object".into())),
                properties: tool.input_schema.properties.clone(),
                required: tool.input_schema.required.clone(),
            },
        }
    }
}

/// Convert a server catalog, preserving order.
///
/// Duplicate tool names are rejected; the catalog must be keyed by name.
pub fn to_tool_unions(tools: &[ToolDescriptor]) -> Result<Vec<ToolUnion>, ChatError> {
    let mut seen = HashSet::with_capacity(tools.len());
    tools
        .iter()
        .map(|tool| {
            if !seen.insert(tool.name.as_str()) {
                return Err(ChatError::Transport(format!(
                    "server reported duplicate tool '{}'",
                    tool.name
                )));
            }
            Ok(ToolUnion::from(tool))
        })
        .collect()
}

/// Ask the server for its tools and convert them for the model.
pub async fn load_tools(server: &mut dyn ToolServer) -> Result<Vec<ToolUnion>, ChatError> {
    let tools = server.list_tools().await?;
    let unions = to_tool_unions(&tools)?;
    debug!(tools = unions.len(), "loaded MCP tool catalog");
    Ok(unions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn search_tool() -> ToolDescriptor {
        ToolDescriptor::new(
            "search",
            Some("web search".into()),
            json!({
                "type": "object",
                "properties": { "q": { "type": "string" } },
                "required": ["q"]
            }),
        )
    }

    #[test]
    fn projection_copies_name_description_and_schema() {
        let union = search_tool().to_tool_union();
        assert_eq!(
            union,
            ToolUnion {
                name: "search".into(),
                description: "web search".into(),
                input_schema: ToolInputSchema {
                    schema_type: json!("object"),
                    properties: Some(json!({ "q": { "type": "string" } })),
                    required: vec!["q".into()],
                },
            }
        );
    }

    #[test]
    fn projection_serializes_required_even_when_empty() {
        let tool = ToolDescriptor::new("ping", None, json!({ "type": "object" }));
        let value = serde_json::to_value(tool.to_tool_union()).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "ping",
                "description": "",
                "input_schema": { "type": "object", "required": [] }
            })
        );
    }

    #[test]
    fn missing_type_defaults_to_object() {
        let tool = ToolDescriptor::new("bare", None, json!({}));
        assert_eq!(tool.to_tool_union().input_schema.schema_type, json!("object"));
    }

    #[test]
    fn conversion_preserves_order() {
        let tools = vec![
            ToolDescriptor::new("b", None, json!({})),
            search_tool(),
            ToolDescriptor::new("a", None, json!({})),
        ];
        let names: Vec<_> = to_tool_unions(&tools)
            .unwrap()
            .into_iter()
            .map(|tool| tool.name)
            .collect();
        assert_eq!(names, vec!["b", "search", "a"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = to_tool_unions(&[search_tool(), search_tool()]).unwrap_err();
        assert!(matches!(err, ChatError::Transport(message) if message.contains("search")));
    }

    #[test]
    fn non_string_required_entries_are_dropped() {
        let schema = InputSchema::from_json(&json!({ "required": ["a", 1, "b"] }));
        assert_eq!(schema.required, vec!["a".to_string(), "b".to_string()]);
    }
}
