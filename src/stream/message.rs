//! Inbound message validation.
//!
//! Each message walks these stages in order and stops at the first failure:
//!
//!   Extraction -> Shape -> YPresence -> TraceCount -> YType -> XDefault -> XType
//!
//! Only a message that reaches the end becomes an `AcceptedBatch`; a rejected
//! one never touches shared state.

use crate::chart::path::{self, Tree};
use crate::chart::{AxisChecker, AxisType, CompiledChartSpec, ValueKind};

use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::X => "x",
            Axis::Y => "y",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Shape,
    YPresence,
    TraceCount,
    YType,
    XDefault,
    XType,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("message has no field {field:?}")]
    MissingField { field: String },

    #[error("input must be an object holding `data`, `layout` or `style`")]
    WrongShape,

    #[error("style has {actual} entries but the chart has {expected} traces")]
    StyleCount { expected: usize, actual: usize },

    #[error("data.y is missing")]
    MissingY,

    #[error("data.{axis} is not an array")]
    NotArray { axis: Axis },

    #[error("data.{axis} has {actual} values but the chart has {expected} traces")]
    CountMismatch {
        axis: Axis,
        expected: usize,
        actual: usize,
    },

    #[error("data.{axis}[{index}] should be a {expected} on a {axis_type} axis")]
    TypeMismatch {
        axis: Axis,
        index: usize,
        expected: ValueKind,
        axis_type: AxisType,
    },

    #[error("data.x is missing and the x axis is {axis_type}, not date")]
    MissingX { axis_type: AxisType },
}

impl Rejection {
    pub fn stage(&self) -> Stage {
        match self {
            Rejection::MissingField { .. } => Stage::Extraction,
            Rejection::WrongShape | Rejection::StyleCount { .. } => Stage::Shape,
            Rejection::MissingY | Rejection::NotArray { axis: Axis::Y } => Stage::YPresence,
            Rejection::CountMismatch { axis: Axis::Y, .. } => Stage::TraceCount,
            Rejection::TypeMismatch { axis: Axis::Y, .. } => Stage::YType,
            Rejection::MissingX { .. } => Stage::XDefault,
            Rejection::NotArray { axis: Axis::X }
            | Rejection::CountMismatch { axis: Axis::X, .. }
            | Rejection::TypeMismatch { axis: Axis::X, .. } => Stage::XType,
        }
    }

    /// Stable name of the failure kind, used in client payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::MissingField { .. } => "MissingField",
            Rejection::WrongShape => "WrongShape",
            Rejection::StyleCount { .. } => "StyleCount",
            Rejection::MissingY => "MissingY",
            Rejection::NotArray { .. } => "NotArray",
            Rejection::CountMismatch { .. } => "CountMismatch",
            Rejection::TypeMismatch { .. } => "TypeMismatch",
            Rejection::MissingX { .. } => "MissingX",
        }
    }
}

/// A message that passed every stage: one x and one y per trace.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedBatch {
    pub trace_indices: Vec<usize>,
    pub x: Vec<Value>,
    pub y: Vec<Value>,
    pub layout: Option<Tree>,
    /// Style overrides, one per entry of `trace_indices` (empty = untouched).
    pub styles: Option<Vec<Tree>>,
}

#[derive(Debug, Clone)]
pub struct MessageValidator {
    input_field: String,
    trace_count: usize,
    x_axis: AxisType,
    y_axis: AxisType,
    check_types: bool,
    checker: AxisChecker,
}

impl MessageValidator {
    /// Build from a compiled spec. Undeclared or unknown axis types act as auto.
    pub fn new(spec: &CompiledChartSpec, input_field: &str, check_types: bool) -> anyhow::Result<Self> {
        Ok(Self {
            input_field: input_field.to_string(),
            trace_count: spec.trace_count(),
            x_axis: spec.axis_type("xaxis").unwrap_or(AxisType::Auto),
            y_axis: spec.axis_type("yaxis").unwrap_or(AxisType::Auto),
            check_types,
            checker: AxisChecker::new()?,
        })
    }

    /// Validate with `now` as the timestamp for synthesized x values.
    pub fn check_at(&self, msg: &Value, now: &str) -> Result<AcceptedBatch, Rejection> {
        // Extraction
        let input = path::lookup(msg, &self.input_field).ok_or_else(|| Rejection::MissingField {
            field: self.input_field.clone(),
        })?;

        // Shape
        let input = input.as_object().ok_or(Rejection::WrongShape)?;
        let data = input.get("data");
        let layout = input.get("layout");
        if data.is_none() && layout.is_none() && input.get("style").is_none() {
            return Err(Rejection::WrongShape);
        }
        let styles = self.styles(input.get("style"))?;
        let layout = match layout {
            None | Some(Value::Null) => None,
            Some(Value::Object(l)) => Some(l.clone()),
            Some(_) => return Err(Rejection::WrongShape),
        };
        let data = match data {
            None => None,
            Some(Value::Object(d)) => Some(d),
            Some(_) => return Err(Rejection::WrongShape),
        };

        // YPresence
        let y = data
            .and_then(|d| d.get("y"))
            .ok_or(Rejection::MissingY)?
            .as_array()
            .ok_or(Rejection::NotArray { axis: Axis::Y })?;

        // TraceCount
        self.check_count(Axis::Y, y.len())?;

        // YType
        self.check_types_on(Axis::Y, self.y_axis, y)?;

        // XDefault
        let x = match data.and_then(|d| d.get("x")) {
            None | Some(Value::Null) => {
                if self.x_axis != AxisType::Date {
                    return Err(Rejection::MissingX {
                        axis_type: self.x_axis,
                    });
                }
                vec![Value::String(now.to_string()); y.len()]
            }
            // XType
            Some(x) => {
                let x = x.as_array().ok_or(Rejection::NotArray { axis: Axis::X })?;
                self.check_count(Axis::X, x.len())?;
                self.check_types_on(Axis::X, self.x_axis, x)?;
                x.clone()
            }
        };

        Ok(AcceptedBatch {
            trace_indices: (0..self.trace_count).collect(),
            x,
            y: y.clone(),
            layout,
            styles,
        })
    }

    /// `style` is either one mapping applied to every trace or a sequence
    /// with one mapping (or null) per trace.
    fn styles(&self, style: Option<&Value>) -> Result<Option<Vec<Tree>>, Rejection> {
        match style {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(shared)) => Ok(Some(vec![shared.clone(); self.trace_count])),
            Some(Value::Array(each)) => {
                if each.len() != self.trace_count {
                    return Err(Rejection::StyleCount {
                        expected: self.trace_count,
                        actual: each.len(),
                    });
                }
                each.iter()
                    .map(|entry| match entry {
                        Value::Null => Ok(Tree::new()),
                        Value::Object(style) => Ok(style.clone()),
                        _ => Err(Rejection::WrongShape),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Some)
            }
            Some(_) => Err(Rejection::WrongShape),
        }
    }

    fn check_count(&self, axis: Axis, actual: usize) -> Result<(), Rejection> {
        if actual != self.trace_count {
            return Err(Rejection::CountMismatch {
                axis,
                expected: self.trace_count,
                actual,
            });
        }
        Ok(())
    }

    fn check_types_on(&self, axis: Axis, axis_type: AxisType, values: &[Value]) -> Result<(), Rejection> {
        if !self.check_types {
            return Ok(());
        }
        let expected = axis_type.expects();
        match values.iter().position(|v| !self.checker.matches(expected, v)) {
            Some(index) => Err(Rejection::TypeMismatch {
                axis,
                index,
                expected,
                axis_type,
            }),
            None => Ok(()),
        }
    }
}
