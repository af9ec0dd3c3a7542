//! HTTP-shaped query surface for dashboards and the editor.
//!
//! Routes, under `/{uiPath}/ui_plotly_chart` (repeated slashes collapsed):
//!
//!   GET  /plotly.js            rendering library, design time
//!   GET  /{node}/plotly.js     rendering library for a live node
//!   GET  /schema               oracle schema
//!   POST /compile              NodeConfig => {spec, issues, validation}
//!   GET  /compile              last design-time compile result
//!   GET  /{node}/snapshot      shared state of a live node
//!   GET  /{node}/status        validity, issues and schema outcome of a live node
//!
//! Transport is the host's business; this module only maps a method, path and
//! optional JSON body to a status and body.

use crate::config::NodeConfig;
use crate::registry::NodeRegistry;

use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use tracing::debug;

pub const ROUTE_ROOT: &str = "ui_plotly_chart";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseBody {
    Json(Value),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl QueryResponse {
    fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Json(body),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ResponseBody::Json(json!({ "error": message.into() })),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuerySurface {
    prefix: String,
    slashes: Regex,
}

impl QuerySurface {
    pub fn new(ui_path: &str) -> anyhow::Result<Self> {
        let slashes = Regex::new(r"/+")?;
        let prefix = slashes
            .replace_all(&format!("/{}/{}", ui_path, ROUTE_ROOT), "/")
            .into_owned();
        Ok(Self { prefix, slashes })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn asset_url(&self, node_id: Option<&str>) -> String {
        match node_id {
            Some(id) => format!("{}/{}/plotly.js", self.prefix, id),
            None => format!("{}/plotly.js", self.prefix),
        }
    }

    pub fn snapshot_url(&self, node_id: &str) -> String {
        format!("{}/{}/snapshot", self.prefix, node_id)
    }

    pub fn handle(
        &self,
        registry: &mut NodeRegistry<'_>,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> QueryResponse {
        let path = path.split('?').next().unwrap_or_default();
        let path = self.slashes.replace_all(path, "/");
        debug!(?method, %path, "query");

        let Some(rest) = path.strip_prefix(self.prefix.as_str()) else {
            return QueryResponse::error(404, "not found");
        };
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

        match (method, segments.as_slice()) {
            (Method::Get, ["plotly.js"]) => asset(registry),
            (Method::Get, ["schema"]) => match registry.schema().schema() {
                Some(schema) => QueryResponse::ok(schema),
                None => QueryResponse::error(503, "rendering library unavailable"),
            },
            (Method::Post, ["compile"]) => compile(registry, body),
            (Method::Get, ["compile"]) => match registry.design() {
                Some(design) => to_response(design),
                None => QueryResponse::error(404, "nothing compiled yet"),
            },
            (Method::Get, [id, "plotly.js"]) => match registry.get(id) {
                Some(_) => asset(registry),
                None => QueryResponse::error(404, format!("no chart node {}", id)),
            },
            (Method::Get, [id, "snapshot"]) => match registry.get(id) {
                None => QueryResponse::error(404, format!("no chart node {}", id)),
                Some(node) => match node.snapshot() {
                    None => QueryResponse::error(404, format!("chart node {} keeps no shared state", id)),
                    Some(snapshot) => to_response(&snapshot),
                },
            },
            (Method::Get, [id, "status"]) => match registry.get(id) {
                None => QueryResponse::error(404, format!("no chart node {}", id)),
                Some(node) => to_response(&node.status()),
            },
            (Method::Post, ["plotly.js" | "schema"] | [_, "plotly.js" | "snapshot" | "status"]) => {
                QueryResponse::error(405, "method not allowed")
            }
            _ => QueryResponse::error(404, "not found"),
        }
    }
}

fn asset(registry: &NodeRegistry<'_>) -> QueryResponse {
    match registry.schema().context().asset() {
        Some(path) => QueryResponse {
            status: 200,
            body: ResponseBody::File(path.to_path_buf()),
        },
        None => QueryResponse::error(404, "Undefined Plotly path"),
    }
}

fn compile(registry: &mut NodeRegistry<'_>, body: Option<&Value>) -> QueryResponse {
    let Some(body) = body else {
        return QueryResponse::error(400, "missing node config body");
    };
    let config: NodeConfig = match serde_json::from_value(body.clone()) {
        Ok(c) => c,
        Err(e) => return QueryResponse::error(400, format!("invalid node config: {}", e)),
    };
    to_response(registry.compile_for_editor(&config))
}

fn to_response<T: Serialize>(value: &T) -> QueryResponse {
    match serde_json::to_value(value) {
        Ok(v) => QueryResponse::ok(v),
        Err(e) => QueryResponse::error(500, e.to_string()),
    }
}
