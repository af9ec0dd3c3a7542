//! Rendering oracle access: the process-wide render context and the schema
//! validation adapter every call site goes through.
//!
//! The context is created once, on first use, from the configured plotly.js
//! asset. If the asset cannot be found the context is degraded for the life
//! of the process: validation is skipped with a warning and the asset routes
//! answer 404. There is no retry and no teardown.

pub mod plotly;

pub use plotly::PlotlyOracle;

use crate::chart::{CompiledChartSpec, Tree};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

pub const PLOTLY_JS_ENV: &str = "CHARTFLOW_PLOTLY_JS";

/// One structural problem reported by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl SchemaIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The library that draws charts and knows their schema.
pub trait RenderingOracle: Send + Sync {
    fn validate(&self, traces: &[Tree], layout: &Tree) -> Vec<SchemaIssue>;
    fn schema(&self) -> Value;
}

pub struct RenderContext {
    asset: Option<PathBuf>,
    oracle: Option<Box<dyn RenderingOracle>>,
    failure: Option<String>,
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("asset", &self.asset)
            .field("ready", &self.oracle.is_some())
            .field("failure", &self.failure)
            .finish()
    }
}

static GLOBAL: OnceLock<RenderContext> = OnceLock::new();

impl RenderContext {
    /// Resolve the asset and bring up the built-in oracle.
    pub fn load(asset: Option<&Path>) -> Self {
        match asset {
            None => Self::degraded(format!("no plotly.js path configured (set {})", PLOTLY_JS_ENV)),
            Some(path) if !path.is_file() => {
                Self::degraded(format!("plotly.js file {} does not exist", path.display()))
            }
            Some(path) => {
                info!(asset = %path.display(), "render context ready");
                Self::with_oracle(path.to_path_buf(), Box::new(PlotlyOracle))
            }
        }
    }

    pub fn with_oracle(asset: PathBuf, oracle: Box<dyn RenderingOracle>) -> Self {
        Self {
            asset: Some(asset),
            oracle: Some(oracle),
            failure: None,
        }
    }

    pub fn degraded(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(%reason, "render context degraded; schema validation disabled");
        Self {
            asset: None,
            oracle: None,
            failure: Some(reason),
        }
    }

    /// Install the process-wide context. Fails if it was already created.
    pub fn install(context: RenderContext) -> Result<&'static RenderContext, RenderContext> {
        GLOBAL.set(context)?;
        Ok(Self::global())
    }

    /// The process-wide context, created from the environment on first use.
    pub fn global() -> &'static RenderContext {
        GLOBAL.get_or_init(|| {
            let asset = std::env::var_os(PLOTLY_JS_ENV).map(PathBuf::from);
            RenderContext::load(asset.as_deref())
        })
    }

    pub fn asset(&self) -> Option<&Path> {
        self.asset.as_deref()
    }

    pub fn is_degraded(&self) -> bool {
        self.oracle.is_none()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationOutcome {
    Checked { issues: Vec<SchemaIssue> },
    Skipped { reason: String },
}

impl ValidationOutcome {
    pub fn issues(&self) -> &[SchemaIssue] {
        match self {
            ValidationOutcome::Checked { issues } => issues,
            ValidationOutcome::Skipped { .. } => &[],
        }
    }
}

/// Adapter in front of the oracle. Never fails: a degraded context yields
/// `Skipped`.
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator<'a> {
    context: &'a RenderContext,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(context: &'a RenderContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &'a RenderContext {
        self.context
    }

    pub fn validate(&self, spec: &CompiledChartSpec) -> ValidationOutcome {
        match &self.context.oracle {
            Some(oracle) => {
                let issues = oracle.validate(&spec.traces, &spec.layout);
                for issue in &issues {
                    warn!(node = %spec.id, "schema issue: {}", issue);
                }
                ValidationOutcome::Checked { issues }
            }
            None => {
                let reason = self
                    .context
                    .failure()
                    .unwrap_or("render context unavailable")
                    .to_string();
                warn!(node = %spec.id, %reason, "schema validation skipped");
                ValidationOutcome::Skipped { reason }
            }
        }
    }

    pub fn schema(&self) -> Option<Value> {
        self.context.oracle.as_ref().map(|o| o.schema())
    }
}

impl SchemaValidator<'static> {
    pub fn global() -> Self {
        Self::new(RenderContext::global())
    }
}

#[cfg(test)]
pub(crate) fn ready_context() -> RenderContext {
    RenderContext::with_oracle(PathBuf::from("plotly.min.js"), Box::new(PlotlyOracle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::compile_at;
    use crate::config::{NodeConfig, WidgetSizes};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn spec(traces: Value) -> CompiledChartSpec {
        let config: NodeConfig =
            serde_json::from_value(json!({ "id": "n1", "group": "g", "traces": traces })).unwrap();
        compile_at(&config, &WidgetSizes::default(), "2024-01-01 00:00:00").spec
    }

    #[test]
    fn missing_asset_degrades() {
        let context = RenderContext::load(Some(Path::new("/definitely/not/plotly.js")));
        assert!(context.is_degraded());
        assert!(context.asset().is_none());

        let validator = SchemaValidator::new(&context);
        let outcome = validator.validate(&spec(json!([{ "name": "a", "type": "nope" }])));
        assert!(matches!(outcome, ValidationOutcome::Skipped { .. }));
        assert!(outcome.issues().is_empty());
        assert_eq!(validator.schema(), None);
    }

    #[test]
    fn ready_context_reports_issues() {
        let context = ready_context();
        let validator = SchemaValidator::new(&context);

        let ok = validator.validate(&spec(json!([{ "name": "a", "type": "scatter" }])));
        assert_eq!(ok, ValidationOutcome::Checked { issues: vec![] });

        let bad = validator.validate(&spec(json!([{ "name": "a", "type": "nope" }])));
        assert_eq!(bad.issues().len(), 1);
        assert_eq!(bad.issues()[0].path, "traces[0].type");
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let skipped = ValidationOutcome::Skipped {
            reason: "x".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&skipped).unwrap(),
            json!({ "status": "skipped", "reason": "x" })
        );
    }
}
