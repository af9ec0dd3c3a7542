//! Authoritative per-node mirror of the live chart data.
//!
//! Late-joining or reloading observers read a snapshot instead of replaying
//! history. Updates are applied as whole batches: a snapshot always shows the
//! state after the most recently accepted message, never half of one.

use super::message::AcceptedBatch;
use super::window::{self, SeriesWindow, StreamError};
use crate::chart::path::{self, Tree};
use crate::chart::CompiledChartSpec;

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub node_id: String,
    /// Number of accepted batches applied since the node started.
    pub revision: u64,
    pub window_size: usize,
    pub traces: Vec<SeriesWindow>,
    pub layout: Tree,
    /// Accumulated style overrides, one mapping per trace.
    pub styles: Vec<Tree>,
}

#[derive(Debug, Clone)]
pub struct SharedStateStore {
    node_id: String,
    windows: Vec<SeriesWindow>,
    window_size: usize,
    layout: Tree,
    styles: Vec<Tree>,
    revision: u64,
}

impl SharedStateStore {
    /// One window per compiled trace, seeded with that trace's initial points.
    pub fn seeded(spec: &CompiledChartSpec) -> Self {
        let points = |trace: &Tree, key: &str| -> Vec<Value> {
            trace
                .get(key)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        };
        let windows = spec
            .traces
            .iter()
            .map(|t| SeriesWindow::seeded(points(t, "x"), points(t, "y"), spec.window_size))
            .collect();

        Self {
            node_id: spec.id.clone(),
            windows,
            window_size: spec.window_size,
            layout: Tree::new(),
            styles: vec![Tree::new(); spec.traces.len()],
            revision: 0,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            node_id: self.node_id.clone(),
            revision: self.revision,
            window_size: self.window_size,
            traces: self.windows.clone(),
            layout: self.layout.clone(),
            styles: self.styles.clone(),
        }
    }

    /// Append one point per listed trace.
    pub fn update(&mut self, trace_indices: &[usize], x: &[Value], y: &[Value]) -> Result<(), StreamError> {
        window::append(&mut self.windows, trace_indices, x, y, self.window_size)?;
        self.revision += 1;
        Ok(())
    }

    /// Apply an accepted message: data first, then its layout and style
    /// overrides.
    pub fn apply(&mut self, batch: &AcceptedBatch) -> Result<(), StreamError> {
        self.update(&batch.trace_indices, &batch.x, &batch.y)?;
        if let Some(layout) = &batch.layout {
            path::merge(&mut self.layout, layout);
        }
        if let Some(styles) = &batch.styles {
            for (&index, style) in batch.trace_indices.iter().zip(styles) {
                if let Some(target) = self.styles.get_mut(index) {
                    path::merge(target, style);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::compile_at;
    use crate::config::{NodeConfig, WidgetSizes};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::VecDeque;

    const SEED: &str = "2024-05-01 12:00:00";

    fn store(window: usize) -> SharedStateStore {
        let config: NodeConfig = serde_json::from_value(json!({
            "id": "n1", "group": "g", "windowSize": window,
            "traces": [{ "name": "a" }, { "name": "b" }]
        }))
        .unwrap();
        SharedStateStore::seeded(&compile_at(&config, &WidgetSizes::default(), SEED).spec)
    }

    #[test]
    fn starts_from_the_seed_point() {
        let snap = store(20).snapshot();
        assert_eq!(snap.revision, 0);
        assert_eq!(snap.traces.len(), 2);
        for trace in &snap.traces {
            assert_eq!(trace.x, VecDeque::from(vec![json!(SEED)]));
            assert_eq!(trace.y, VecDeque::from(vec![json!(0)]));
        }
    }

    #[test]
    fn snapshot_reflects_latest_accepted_batch() {
        let mut s = store(2);
        let batch = AcceptedBatch {
            trace_indices: vec![0, 1],
            x: vec![json!("t1"), json!("t1")],
            y: vec![json!(1), json!(2)],
            layout: json!({ "title": "live" }).as_object().cloned(),
            styles: None,
        };
        s.apply(&batch).unwrap();
        let first = s.snapshot();
        assert_eq!(first.revision, 1);
        assert_eq!(first.layout, *json!({ "title": "live" }).as_object().unwrap());

        s.apply(&AcceptedBatch { layout: None, ..batch.clone() }).unwrap();
        let second = s.snapshot();
        assert_eq!(second.revision, 2);
        assert_eq!(second.traces[1].y, VecDeque::from(vec![json!(2), json!(2)]));
        assert_eq!(second.traces[0].x, VecDeque::from(vec![json!("t1"), json!("t1")]));

        // earlier snapshots are independent copies
        assert_eq!(first.traces[0].x.len(), 2);
        assert_eq!(first.traces[0].x[0], json!(SEED));
    }

    #[test]
    fn failed_update_changes_nothing() {
        let mut s = store(20);
        let before = s.snapshot();
        assert!(s.update(&[0, 5], &[json!(1), json!(1)], &[json!(1), json!(1)]).is_err());
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let v = serde_json::to_value(store(20).snapshot()).unwrap();
        assert_eq!(v["nodeId"], json!("n1"));
        assert_eq!(v["windowSize"], json!(20));
        assert_eq!(v["traces"][0]["y"], json!([0]));
        assert_eq!(v["styles"], json!([{}, {}]));
    }

    #[test]
    fn style_overrides_accumulate_per_trace() {
        let mut s = store(20);
        let style = |v: Value| v.as_object().cloned().unwrap_or_default();
        let batch = AcceptedBatch {
            trace_indices: vec![0, 1],
            x: vec![json!("t1"), json!("t1")],
            y: vec![json!(1), json!(2)],
            layout: None,
            styles: Some(vec![style(json!({ "marker": { "color": "red" } })), Tree::new()]),
        };
        s.apply(&batch).unwrap();
        s.apply(&AcceptedBatch {
            styles: Some(vec![style(json!({ "marker": { "size": 8 } })), style(json!({ "mode": "lines" }))]),
            ..batch.clone()
        })
        .unwrap();

        let snap = s.snapshot();
        assert_eq!(
            snap.styles,
            vec![
                style(json!({ "marker": { "color": "red", "size": 8 } })),
                style(json!({ "mode": "lines" })),
            ]
        );

        // a rejected batch leaves styles alone
        let before = s.snapshot();
        assert!(s.apply(&AcceptedBatch { trace_indices: vec![0, 7], ..batch }).is_err());
        assert_eq!(s.snapshot(), before);
    }
}
