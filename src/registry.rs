//! Live chart nodes by id, plus the design-time mirror used by the editor.

use crate::chart::{self, CompiledChartSpec, ConfigIssue};
use crate::config::{NodeConfig, Settings};
use crate::node::{ChartNode, ClientSink};
use crate::oracle::{SchemaValidator, ValidationOutcome};

use anyhow::{anyhow, Context};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Compile + validate result for a config that has no live node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignResult {
    pub spec: CompiledChartSpec,
    pub issues: Vec<ConfigIssue>,
    pub validation: ValidationOutcome,
}

pub struct NodeRegistry<'ctx> {
    settings: Settings,
    schema: SchemaValidator<'ctx>,
    nodes: BTreeMap<String, ChartNode>,
    /// Last design-time compile. Replaced wholesale, never streamed into.
    design: Option<DesignResult>,
}

impl<'ctx> NodeRegistry<'ctx> {
    pub fn new(settings: Settings, schema: SchemaValidator<'ctx>) -> Self {
        Self {
            settings,
            schema,
            nodes: BTreeMap::new(),
            design: None,
        }
    }

    pub fn schema(&self) -> SchemaValidator<'ctx> {
        self.schema
    }

    /// Start a node. A node already running under the same id is stopped
    /// first and its state discarded.
    pub fn start(&mut self, config: NodeConfig) -> anyhow::Result<&ChartNode> {
        let id = config.id.clone();
        self.stop(&id);
        let node = ChartNode::start(config, &self.settings, self.schema)
            .with_context(|| format!("start chart node {}", id))?;
        Ok(self.nodes.entry(id).or_insert(node))
    }

    /// Tear a node down. Its shared state goes with it.
    pub fn stop(&mut self, id: &str) -> bool {
        let stopped = self.nodes.remove(id).is_some();
        if stopped {
            info!(node = %id, "chart node stopped");
        }
        stopped
    }

    pub fn get(&self, id: &str) -> Option<&ChartNode> {
        self.nodes.get(id)
    }

    /// Route an inbound message to its node and hand the result to `sink`.
    pub fn deliver(&mut self, id: &str, msg: Value, sink: &mut dyn ClientSink) -> anyhow::Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| anyhow!("no chart node with id {}", id))?;
        sink.send_to_clients(node.receive(msg));
        Ok(())
    }

    /// Compile and validate a config for the editor without starting it.
    pub fn compile_for_editor(&mut self, config: &NodeConfig) -> &DesignResult {
        let compiled = chart::compile(config, &self.settings.sizes);
        debug!(node = %config.id, valid = compiled.is_valid(), "compiled for editor");
        let chart::Compiled { spec, mut issues } = compiled;
        let validation = self.schema.validate(&spec);
        issues.extend(validation.issues().iter().cloned().map(ConfigIssue::Schema));
        self.design.insert(DesignResult {
            spec,
            issues,
            validation,
        })
    }

    pub fn design(&self) -> Option<&DesignResult> {
        self.design.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ClientMessage;
    use crate::oracle::ready_context;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config(id: &str) -> NodeConfig {
        serde_json::from_value(json!({
            "id": id, "group": "g",
            "traces": [{ "name": "a" }]
        }))
        .unwrap()
    }

    #[test]
    fn deliver_routes_by_id() {
        let context = ready_context();
        let mut reg = NodeRegistry::new(Settings::default(), SchemaValidator::new(&context));
        reg.start(config("a")).unwrap();
        reg.start(config("b")).unwrap();

        let mut sink: Vec<ClientMessage> = Vec::new();
        reg.deliver("b", json!({ "payload": { "data": { "y": [7] } } }), &mut sink)
            .unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].node_id, "b");
        assert_eq!(reg.get("a").unwrap().snapshot().unwrap().revision, 0);
        assert_eq!(reg.get("b").unwrap().snapshot().unwrap().revision, 1);

        assert!(reg.deliver("zzz", json!({}), &mut sink).is_err());
    }

    #[test]
    fn restart_resets_state_and_stop_destroys_it() {
        let context = ready_context();
        let mut reg = NodeRegistry::new(Settings::default(), SchemaValidator::new(&context));
        reg.start(config("a")).unwrap();
        let mut sink: Vec<ClientMessage> = Vec::new();
        reg.deliver("a", json!({ "payload": { "data": { "y": [1] } } }), &mut sink)
            .unwrap();

        reg.start(config("a")).unwrap();
        assert_eq!(reg.get("a").unwrap().snapshot().unwrap().revision, 0);

        assert!(reg.stop("a"));
        assert!(!reg.stop("a"));
        assert!(reg.get("a").is_none());
    }

    #[test]
    fn design_mirror_is_replaced_not_merged() {
        let context = ready_context();
        let mut reg = NodeRegistry::new(Settings::default(), SchemaValidator::new(&context));
        assert!(reg.design().is_none());

        reg.compile_for_editor(&config("x"));
        let second = reg.compile_for_editor(&config("y")).clone();
        assert_eq!(second.spec.id, "y");
        assert_eq!(reg.design(), Some(&second));
        assert!(reg.get("y").is_none());
    }
}
