//! Chart layer: flat node config => nested chart spec.
//!
//! It owns:
//! - path expansion (`marker_color` => `{marker: {color}}`)
//! - placeholder decoding (`$true`, `$array:name`)
//! - axis types and timestamp format
//! - the compiler that assembles `CompiledChartSpec`

pub mod axis;
pub mod compile;
pub mod path;
pub mod placeholder;

pub use axis::{AxisChecker, AxisType, ValueKind};
pub use compile::{Compiled, compile, compile_at};
pub use path::Tree;

use crate::oracle::SchemaIssue;
use path::PathError;
use placeholder::PlaceholderError;
use serde::Serialize;
use serde_json::Value;

/// Fully nested chart definition handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledChartSpec {
    pub id: String,
    pub layout: Tree,
    pub traces: Vec<Tree>,
    pub render_options: Tree,
    pub window_size: usize,
}

impl CompiledChartSpec {
    pub fn trace_count(&self) -> usize {
        self.traces.len()
    }

    /// Declared type of `xaxis` / `yaxis`; missing means auto.
    pub fn axis_type(&self, axis: &str) -> Result<AxisType, String> {
        match self
            .layout
            .get(axis)
            .and_then(Value::as_object)
            .and_then(|a| a.get("type"))
        {
            None | Some(Value::Null) => Ok(AxisType::Auto),
            Some(Value::String(s)) => s.parse(),
            Some(other) => Err(format!("axis type must be a string, got {}", other)),
        }
    }
}

/// Problems found while compiling or validating a node configuration.
///
/// None of these stop the node from starting; they mark it invalid and are
/// reported to the authoring UI.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigIssue {
    #[error("no dashboard group configured")]
    MissingGroup,

    #[error("{scope}: property {property:?}: {source}")]
    DanglingArray {
        scope: String,
        property: String,
        #[source]
        source: PlaceholderError,
    },

    #[error("{scope}: {source}")]
    BadPath {
        scope: String,
        #[source]
        source: PathError,
    },

    #[error("{axis}: {message}")]
    UnknownAxisType { axis: String, message: String },

    #[error("widget size {width}x{height} does not fit the dashboard grid")]
    WidgetSize { width: u32, height: u32 },

    #[error("window size must be at least 1")]
    ZeroWindow,

    #[error("schema: {0}")]
    Schema(SchemaIssue),
}

impl Serialize for ConfigIssue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
