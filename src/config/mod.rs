//! Configuration layer: authored node configs and process settings.
//!
//! Node configs are serde documents produced by the flow editor; process
//! settings come from the command line and environment.

pub mod node;
pub mod settings;

pub use node::{ArrayDef, ArrayItem, NodeConfig, PropertySpec, TraceConfig};
pub use settings::{Settings, WidgetSizes};
