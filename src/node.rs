//! A live chart node instance.
//!
//! Startup compiles the node config, runs schema validation once and seeds
//! the shared state. After that every inbound message is validated, applied
//! to the shared state when accepted, and turned into exactly one
//! `ClientMessage` for the dashboard. Rejected messages are still delivered,
//! flagged `invalid`, so browsers can ignore them.

use crate::chart::axis::now_timestamp;
use crate::chart::{self, CompiledChartSpec, ConfigIssue, Tree};
use crate::config::{NodeConfig, Settings};
use crate::oracle::{SchemaValidator, ValidationOutcome};
use crate::stream::{AcceptedBatch, MessageValidator, Rejection, SharedStateStore, Snapshot, window};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessage {
    pub node_id: String,
    pub invalid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DeliveryError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<ExtendUpdate>,
    pub msg: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryError {
    pub kind: String,
    pub message: String,
}

/// Arguments for the browser's `extendTraces`: one single-point array per
/// trace, plus layout overrides for `relayout` and per-trace `restyle`
/// overrides aligned with `trace_indices`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendUpdate {
    pub data: ExtendData,
    pub trace_indices: Vec<usize>,
    pub window_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<Tree>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<Vec<Tree>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtendData {
    pub x: Vec<Vec<Value>>,
    pub y: Vec<Vec<Value>>,
}

impl ExtendUpdate {
    fn from_batch(batch: AcceptedBatch, window_size: usize) -> Self {
        let wrap = |values: Vec<Value>| -> Vec<Vec<Value>> { values.into_iter().map(|v| vec![v]).collect() };
        Self {
            data: ExtendData {
                x: wrap(batch.x),
                y: wrap(batch.y),
            },
            trace_indices: batch.trace_indices,
            window_size,
            layout: batch.layout,
            style: batch.styles,
        }
    }
}

/// Health of a live node, as reported to the authoring UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus<'a> {
    pub node_id: &'a str,
    pub valid: bool,
    pub issues: &'a [ConfigIssue],
    pub validation: &'a ValidationOutcome,
}

/// Where the host delivers client messages (dashboard `sendToClients`).
pub trait ClientSink {
    fn send_to_clients(&mut self, message: ClientMessage);
}

impl ClientSink for Vec<ClientMessage> {
    fn send_to_clients(&mut self, message: ClientMessage) {
        self.push(message);
    }
}

#[derive(Debug)]
pub struct ChartNode {
    config: NodeConfig,
    spec: CompiledChartSpec,
    issues: Vec<ConfigIssue>,
    validation: ValidationOutcome,
    validator: MessageValidator,
    store: Option<SharedStateStore>,
}

impl ChartNode {
    pub fn start(config: NodeConfig, settings: &Settings, schema: SchemaValidator<'_>) -> anyhow::Result<Self> {
        let chart::Compiled { spec, mut issues } = chart::compile(&config, &settings.sizes);

        let validation = schema.validate(&spec);
        issues.extend(validation.issues().iter().cloned().map(ConfigIssue::Schema));

        let validator = MessageValidator::new(&spec, &config.input_field, config.validate_input_msg)?;
        let store = config.shared_state.then(|| SharedStateStore::seeded(&spec));

        if issues.is_empty() {
            info!(node = %config.id, traces = spec.trace_count(), "chart node started");
        } else {
            for issue in &issues {
                warn!(node = %config.id, "configuration error: {}", issue);
            }
            warn!(node = %config.id, issues = issues.len(), "chart node started with invalid configuration");
        }

        Ok(Self {
            config,
            spec,
            issues,
            validation,
            validator,
            store,
        })
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn spec(&self) -> &CompiledChartSpec {
        &self.spec
    }

    pub fn issues(&self) -> &[ConfigIssue] {
        &self.issues
    }

    pub fn validation(&self) -> &ValidationOutcome {
        &self.validation
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn status(&self) -> NodeStatus<'_> {
        NodeStatus {
            node_id: self.id(),
            valid: self.is_valid(),
            issues: self.issues(),
            validation: self.validation(),
        }
    }

    /// `None` when the node runs without shared state.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.store.as_ref().map(SharedStateStore::snapshot)
    }

    pub fn receive(&mut self, msg: Value) -> ClientMessage {
        self.receive_at(msg, &now_timestamp())
    }

    /// Like `receive`, with `now` stamped on messages that carry no x.
    pub fn receive_at(&mut self, msg: Value, now: &str) -> ClientMessage {
        let outcome = self.validator.check_at(&msg, now);
        self.deliver(msg, outcome)
    }

    fn deliver(&mut self, msg: Value, outcome: Result<AcceptedBatch, Rejection>) -> ClientMessage {
        let node_id = self.config.id.clone();
        let batch = match outcome {
            Ok(batch) => batch,
            Err(rejection) => {
                warn!(
                    node = %node_id,
                    kind = rejection.kind(),
                    stage = ?rejection.stage(),
                    "rejected message: {}",
                    rejection
                );
                return invalid(node_id, rejection.kind(), rejection.to_string(), msg);
            }
        };

        // window size is checked even when no store is kept
        let applied = match self.store.as_mut() {
            Some(store) => store.apply(&batch),
            None => window::check_window(self.spec.window_size),
        };
        if let Err(err) = applied {
            warn!(node = %node_id, "shared state update failed: {}", err);
            return invalid(node_id, "StreamError", err.to_string(), msg);
        }
        if let Some(store) = &self.store {
            debug!(node = %node_id, revision = store.revision(), "shared state updated");
        }

        ClientMessage {
            node_id,
            invalid: false,
            error: None,
            update: Some(ExtendUpdate::from_batch(batch, self.spec.window_size)),
            msg,
        }
    }
}

fn invalid(node_id: String, kind: &str, message: String, msg: Value) -> ClientMessage {
    ClientMessage {
        node_id,
        invalid: true,
        error: Some(DeliveryError {
            kind: kind.to_string(),
            message,
        }),
        update: None,
        msg,
    }
}
