//! Node configuration as authored in the flow editor.
//!
//! JSON shape (camelCase, every field but `id` optional):
//! {
//!   "id": "n1",
//!   "group": "dashboard-group",
//!   "width": 6, "height": 4,
//!   "chartTitle": "Boiler", "xAxisType": "date", "yAxisType": "linear",
//!   "layoutProperties": [{ "name": "yaxis.range", "value": "$array:range" }],
//!   "traces": [{ "name": "temp", "type": "scatter",
//!                "properties": [{ "name": "marker_color", "value": "red" }] }],
//!   "arrays": [{ "name": "range", "items": [{ "value": 0 }, { "value": 100 }] }],
//!   "sharedState": true, "validateInputMsg": true, "inputField": "payload"
//! }

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_WINDOW_SIZE: usize = 20;
pub const DEFAULT_INPUT_FIELD: &str = "payload";

/// Named lookup table that array placeholders resolve against.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArrayDef {
    pub name: String,
    #[serde(default)]
    pub items: Vec<ArrayItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArrayItem {
    #[serde(default)]
    pub value: Value,
}

/// One leaf assignment: `name` is a path, `value` a scalar or placeholder token.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PropertySpec {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TraceConfig {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default = "default_trace_type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Dashboard group the widget is placed in. Required.
    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub order: u32,

    /// Grid units; 0 lets the dashboard size the widget.
    #[serde(default, deserialize_with = "lenient_u32")]
    pub width: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub height: u32,

    #[serde(default)]
    pub chart_title: String,
    #[serde(default)]
    pub x_axis_title: String,
    #[serde(default = "default_x_axis_type")]
    pub x_axis_type: String,
    #[serde(default)]
    pub y_axis_title: String,
    #[serde(default = "default_y_axis_type")]
    pub y_axis_type: String,

    #[serde(default)]
    pub layout_properties: Vec<PropertySpec>,
    #[serde(default)]
    pub traces: Vec<TraceConfig>,
    #[serde(default)]
    pub arrays: Vec<ArrayDef>,

    #[serde(default = "default_true")]
    pub shared_state: bool,
    #[serde(default = "default_true")]
    pub validate_input_msg: bool,
    #[serde(default = "default_input_field")]
    pub input_field: String,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

impl NodeConfig {
    /// Parse a node configuration from JSON text.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: NodeConfig = serde_json::from_str(text)?;
        Ok(config)
    }

    pub fn has_group(&self) -> bool {
        self.group
            .as_deref()
            .map(str::trim)
            .is_some_and(|g| !g.is_empty())
    }
}

fn default_true() -> bool {
    true
}

fn default_trace_type() -> String {
    "scatter".to_string()
}

fn default_x_axis_type() -> String {
    "date".to_string()
}

fn default_y_axis_type() -> String {
    "linear".to_string()
}

fn default_input_field() -> String {
    DEFAULT_INPUT_FIELD.to_string()
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

/// The editor stores sizes either as numbers or as numeric strings ("6").
fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| D::Error::custom(format!("invalid size: {}", n))),
        Value::String(s) if s.trim().is_empty() => Ok(0),
        Value::String(s) => s
            .trim()
            .parse::<u32>()
            .map_err(|_| D::Error::custom(format!("invalid size: {:?}", s))),
        other => Err(D::Error::custom(format!("invalid size: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: NodeConfig = serde_json::from_value(json!({ "id": "n1" })).unwrap();
        assert_eq!(config.x_axis_type, "date");
        assert_eq!(config.y_axis_type, "linear");
        assert_eq!(config.input_field, "payload");
        assert_eq!(config.window_size, 20);
        assert!(config.shared_state);
        assert!(config.validate_input_msg);
        assert!(!config.has_group());
    }

    #[test]
    fn sizes_accept_numeric_strings() {
        let config: NodeConfig =
            serde_json::from_value(json!({ "id": "n1", "width": "6", "height": 4 })).unwrap();
        assert_eq!((config.width, config.height), (6, 4));

        let bad = serde_json::from_value::<NodeConfig>(json!({ "id": "n1", "width": "wide" }));
        assert!(bad.is_err());
    }

    #[test]
    fn trace_type_is_renamed_field() {
        let config: NodeConfig = serde_json::from_value(json!({
            "id": "n1",
            "group": "g",
            "traces": [{ "name": "a", "type": "bar" }, { "name": "b" }]
        }))
        .unwrap();
        assert_eq!(config.traces[0].kind, "bar");
        assert_eq!(config.traces[1].kind, "scatter");
        assert!(config.has_group());
    }
}
