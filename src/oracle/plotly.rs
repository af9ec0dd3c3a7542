//! Built-in structural checks standing in for plotly.js `Plotly.validate`.
//!
//! Only the parts of a figure the streaming engine depends on are checked;
//! unknown attributes are left to the browser.

use super::{RenderingOracle, SchemaIssue};
use crate::chart::{AxisType, Tree};
use serde_json::{Value, json};

pub const TRACE_TYPES: &[&str] = &[
    "scatter",
    "scattergl",
    "bar",
    "histogram",
    "box",
    "violin",
    "heatmap",
    "contour",
    "pie",
    "indicator",
    "funnel",
    "waterfall",
    "scatterpolar",
    "barpolar",
];

const AXIS_TYPES: &[AxisType] = &[
    AxisType::Linear,
    AxisType::Log,
    AxisType::Date,
    AxisType::Category,
    AxisType::Multicategory,
    AxisType::Auto,
];

#[derive(Debug, Default, Clone, Copy)]
pub struct PlotlyOracle;

impl RenderingOracle for PlotlyOracle {
    fn validate(&self, traces: &[Tree], layout: &Tree) -> Vec<SchemaIssue> {
        let mut issues = Vec::new();

        for (i, trace) in traces.iter().enumerate() {
            check_trace(i, trace, &mut issues);
        }

        match layout.get("title") {
            None | Some(Value::String(_)) | Some(Value::Object(_)) => {}
            Some(other) => issues.push(SchemaIssue::new(
                "layout.title",
                format!("expected string or object, got {}", other),
            )),
        }

        for (key, value) in layout {
            if !is_axis_key(key) {
                continue;
            }
            let Some(axis) = value.as_object() else {
                issues.push(SchemaIssue::new(format!("layout.{}", key), "expected object"));
                continue;
            };
            if let Some(kind) = axis.get("type") {
                let known = kind
                    .as_str()
                    .and_then(|s| s.parse::<AxisType>().ok())
                    .is_some();
                if !known {
                    issues.push(SchemaIssue::new(
                        format!("layout.{}.type", key),
                        format!("unknown axis type {}", kind),
                    ));
                }
            }
        }

        issues
    }

    fn schema(&self) -> Value {
        json!({
            "traces": TRACE_TYPES,
            "layout": {
                "axisTypes": AXIS_TYPES.iter().map(|a| a.as_str()).collect::<Vec<_>>(),
            },
        })
    }
}

fn check_trace(index: usize, trace: &Tree, issues: &mut Vec<SchemaIssue>) {
    let at = |field: &str| format!("traces[{}].{}", index, field);

    match trace.get("type").and_then(Value::as_str) {
        Some(kind) if TRACE_TYPES.contains(&kind) => {}
        Some(kind) => issues.push(SchemaIssue::new(at("type"), format!("unknown trace type {:?}", kind))),
        None => issues.push(SchemaIssue::new(at("type"), "missing trace type")),
    }

    if let Some(name) = trace.get("name") {
        if !name.is_string() {
            issues.push(SchemaIssue::new(at("name"), "expected string"));
        }
    }

    let x = trace.get("x").map(|v| v.as_array().map(Vec::len));
    let y = trace.get("y").map(|v| v.as_array().map(Vec::len));
    if let Some(None) = x {
        issues.push(SchemaIssue::new(at("x"), "expected array"));
    }
    if let Some(None) = y {
        issues.push(SchemaIssue::new(at("y"), "expected array"));
    }
    if let (Some(Some(xl)), Some(Some(yl))) = (x, y) {
        if xl != yl {
            issues.push(SchemaIssue::new(
                at("x"),
                format!("x has {} points but y has {}", xl, yl),
            ));
        }
    }
}

/// `xaxis`, `yaxis`, `xaxis2`, ...
fn is_axis_key(key: &str) -> bool {
    ["xaxis", "yaxis"].iter().any(|prefix| {
        key.strip_prefix(prefix)
            .is_some_and(|rest| rest.chars().all(|c| c.is_ascii_digit()))
    })
}
