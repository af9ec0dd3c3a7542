//! NodeConfig => CompiledChartSpec.
//!
//! Phases:
//! 1) base layout from the top-level editor fields (titles, axis types, size)
//! 2) `layoutProperties` decoded and expanded over it
//! 3) one trace per TraceConfig, seeded with a single `[now] / [0]` point so
//!    the first render does not fall back to the epoch
//! 4) fixed render options
//!
//! Compilation never fails outright. Dangling array references and bad paths
//! are collected as issues and the offending property is left as authored
//! (or skipped when it cannot be placed).

use super::axis::{AxisType, now_timestamp};
use super::path::{self, Tree};
use super::placeholder;
use super::{CompiledChartSpec, ConfigIssue};
use crate::config::{NodeConfig, PropertySpec, WidgetSizes};

use serde_json::{Value, json};
use tracing::{debug, warn};

const PLOT_PADDING: u32 = 2;
const TITLE_FONT_SIZE: u32 = 22;

/// Result of compiling one node configuration.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub spec: CompiledChartSpec,
    pub issues: Vec<ConfigIssue>,
}

impl Compiled {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Compile with the current local time as the trace seed.
pub fn compile(config: &NodeConfig, sizes: &WidgetSizes) -> Compiled {
    compile_at(config, sizes, &now_timestamp())
}

/// Compile with an explicit seed timestamp shared by every trace.
pub fn compile_at(config: &NodeConfig, sizes: &WidgetSizes, seed: &str) -> Compiled {
    let mut issues = Vec::new();

    if !config.has_group() {
        issues.push(ConfigIssue::MissingGroup);
    }
    if config.window_size == 0 {
        issues.push(ConfigIssue::ZeroWindow);
    }

    let mut layout = base_layout(config, sizes, &mut issues);
    apply_properties(&mut layout, &config.layout_properties, config, "layout", &mut issues);

    let mut traces = Vec::with_capacity(config.traces.len());
    for (index, trace) in config.traces.iter().enumerate() {
        let mut node = Tree::new();
        node.insert("name".to_string(), Value::String(trace.name.clone()));
        node.insert("type".to_string(), Value::String(trace.kind.clone()));
        node.insert("x".to_string(), json!([seed]));
        node.insert("y".to_string(), json!([0]));

        let scope = format!("trace {} ({})", index, trace.name);
        apply_properties(&mut node, &trace.properties, config, &scope, &mut issues);
        traces.push(node);
    }

    let mut render_options = Tree::new();
    render_options.insert("displayModeBar".to_string(), Value::Bool(false));

    let spec = CompiledChartSpec {
        id: config.id.clone(),
        layout,
        traces,
        render_options,
        window_size: config.window_size,
    };

    for axis in ["xaxis", "yaxis"] {
        if let Err(message) = spec.axis_type(axis) {
            issues.push(ConfigIssue::UnknownAxisType {
                axis: axis.to_string(),
                message,
            });
        }
    }

    debug!(
        node = %config.id,
        traces = spec.traces.len(),
        issues = issues.len(),
        "compiled chart config"
    );

    Compiled { spec, issues }
}

fn base_layout(config: &NodeConfig, sizes: &WidgetSizes, issues: &mut Vec<ConfigIssue>) -> Tree {
    let mut layout = Tree::new();

    if !config.chart_title.is_empty() {
        layout.insert("title".to_string(), json!(config.chart_title));
    }

    for (axis, title, kind) in [
        ("xaxis", &config.x_axis_title, &config.x_axis_type),
        ("yaxis", &config.y_axis_title, &config.y_axis_type),
    ] {
        let mut node = Tree::new();
        if !title.is_empty() {
            node.insert("title".to_string(), json!(title));
        }
        let kind = kind.parse::<AxisType>().map(AxisType::as_str).unwrap_or(kind);
        node.insert("type".to_string(), json!(kind));
        layout.insert(axis.to_string(), Value::Object(node));
    }

    layout.insert("titlefont".to_string(), json!({ "size": TITLE_FONT_SIZE }));

    let size = plot_size(config.width, config.height, sizes).unwrap_or_else(|issue| {
        warn!(node = %config.id, "{}", issue);
        issues.push(issue);
        None
    });
    if let Some((width, height)) = size {
        layout.insert("autosize".to_string(), json!(false));
        layout.insert("width".to_string(), json!(width));
        layout.insert("height".to_string(), json!(height));
        layout.insert(
            "margin".to_string(),
            json!({ "l": 60, "r": 50, "b": 60, "t": 50, "pad": PLOT_PADDING }),
        );
    }

    layout
}

/// Pixel size of the plot area for a widget of `width` x `height` grid units.
///
/// `Ok(None)` means the widget sizes itself. A size whose pixel span does not
/// fit in a `u32` is a `WidgetSize` issue.
pub fn plot_size(width: u32, height: u32, sizes: &WidgetSizes) -> Result<Option<(u32, u32)>, ConfigIssue> {
    if width == 0 || height == 0 {
        return Ok(None);
    }
    let span = |units: u32, cell: u32, gap: u32, group_pad: u32| -> Option<u32> {
        let cells = units.checked_mul(cell)?;
        let gaps = (units - 1).checked_mul(gap)?;
        let total = cells.checked_add(gaps)?;
        Some(total.saturating_sub(group_pad.saturating_add(PLOT_PADDING * 2)))
    };
    match (
        span(width, sizes.sx, sizes.cx, sizes.gx),
        span(height, sizes.sy, sizes.cy, sizes.gy),
    ) {
        (Some(w), Some(h)) => Ok(Some((w, h))),
        _ => Err(ConfigIssue::WidgetSize { width, height }),
    }
}

fn apply_properties(
    target: &mut Tree,
    properties: &[PropertySpec],
    config: &NodeConfig,
    scope: &str,
    issues: &mut Vec<ConfigIssue>,
) {
    for property in properties {
        let value = match placeholder::decode(&property.value, &config.arrays) {
            Ok(v) => v,
            Err(source) => {
                warn!(node = %config.id, %scope, property = %property.name, "{}", source);
                issues.push(ConfigIssue::DanglingArray {
                    scope: scope.to_string(),
                    property: property.name.clone(),
                    source,
                });
                property.value.clone()
            }
        };

        if let Err(source) = path::expand(target, &property.name, value) {
            warn!(node = %config.id, %scope, "{}", source);
            issues.push(ConfigIssue::BadPath {
                scope: scope.to_string(),
                source,
            });
        }
    }
}
