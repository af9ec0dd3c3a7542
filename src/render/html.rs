use crate::chart::CompiledChartSpec;

/// Render the dashboard widget for a compiled chart (spec embedded as JSON).
///
/// The page loads the rendering library from `asset_url`, draws the seeded
/// spec, then pulls `snapshot_url` once so a reloaded dashboard continues from
/// the shared state instead of an empty chart. Live updates arrive through
/// `chartflowApply(clientMessage)`.
///
/// Important: we avoid `format!()` because the page contains many `{}` from
/// JS, which would conflict with Rust formatting.
pub fn render_widget_html(
    spec: &CompiledChartSpec,
    asset_url: &str,
    snapshot_url: &str,
) -> anyhow::Result<String> {
    let json = script_safe(&serde_json::to_string(spec)?);
    let asset = script_safe(&serde_json::to_string(asset_url)?);
    let snapshot = script_safe(&serde_json::to_string(snapshot_url)?);

    const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Chart __ID__</title>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 0; }
  .chart { padding: 2px; }
</style>
</head>
<body>
<div class="chart" id='plotlychart___ID__'></div>

<script>
const SPEC = __SPEC__;
const ASSET_URL = __ASSET__;
const SNAPSHOT_URL = __SNAPSHOT__;
const DIV_ID = "plotlychart_" + SPEC.id;

// {marker: {color: "red"}} => {"marker.color": ["red"]} for one trace.
function restyleArgs(style, prefix, out) {
  for (const [key, value] of Object.entries(style)) {
    const path = prefix ? prefix + "." + key : key;
    if (value && typeof value === "object" && !Array.isArray(value)) {
      restyleArgs(value, path, out);
    } else {
      out[path] = [value];
    }
  }
  return out;
}

function restyle(styles, traceIndices) {
  styles.forEach((style, k) => {
    if (style && Object.keys(style).length) {
      Plotly.restyle(DIV_ID, restyleArgs(style, "", {}), [traceIndices[k]]);
    }
  });
}

function applySnapshot(snap) {
  const traces = SPEC.traces.map((t, i) => {
    const w = snap.traces[i];
    return w ? Object.assign({}, t, { x: w.x, y: w.y }) : t;
  });
  const layout = Object.assign({}, SPEC.layout, snap.layout);
  const styles = snap.styles || [];
  return Plotly.react(DIV_ID, traces, layout, SPEC.renderOptions)
    .then(() => restyle(styles, styles.map((_, i) => i)));
}

// Client messages from the node; invalid ones are ignored.
window.chartflowApply = function (message) {
  if (!message || message.invalid || !message.update) return;
  const u = message.update;
  Plotly.extendTraces(DIV_ID, u.data, u.traceIndices, u.windowSize);
  if (u.layout) Plotly.relayout(DIV_ID, u.layout);
  if (u.style) restyle(u.style, u.traceIndices);
};

// Load the library in the head of the page, not locally in the widget.
const script = document.createElement("script");
script.type = "text/javascript";
script.src = ASSET_URL;
script.async = false;
script.addEventListener("load", () => {
  Plotly.react(DIV_ID, SPEC.traces, SPEC.layout, SPEC.renderOptions)
    .then(() => fetch(SNAPSHOT_URL))
    .then((r) => (r.ok ? r.json() : null))
    .then((snap) => (snap ? applySnapshot(snap) : null))
    .catch((e) => console.warn("chart resync failed", e));
});
document.getElementsByTagName("head")[0].appendChild(script);
</script>
</body>
</html>
"#;

    Ok(TEMPLATE
        .replace("__ID__", &escape_html(&spec.id))
        .replace("__SPEC__", &json)
        .replace("__ASSET__", &asset)
        .replace("__SNAPSHOT__", &snapshot))
}

/// `</script>` inside embedded JSON would end the script block early.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::compile_at;
    use crate::config::{NodeConfig, WidgetSizes};
    use serde_json::json;

    fn spec(title: &str) -> CompiledChartSpec {
        let config: NodeConfig = serde_json::from_value(json!({
            "id": "abc123", "group": "g", "chartTitle": title,
            "traces": [{ "name": "a" }]
        }))
        .unwrap();
        compile_at(&config, &WidgetSizes::default(), "2024-01-01 00:00:00").spec
    }

    #[test]
    fn embeds_spec_and_urls() {
        let html = render_widget_html(
            &spec("Boiler"),
            "/ui/ui_plotly_chart/abc123/plotly.js",
            "/ui/ui_plotly_chart/abc123/snapshot",
        )
        .unwrap();
        assert!(html.contains("id='plotlychart_abc123'"));
        assert!(html.contains(r#""title":"Boiler""#));
        assert!(html.contains(r#"const ASSET_URL = "/ui/ui_plotly_chart/abc123/plotly.js";"#));
        assert!(html.contains(r#""displayModeBar":false"#));
        assert!(html.contains("if (u.style) restyle(u.style, u.traceIndices);"));
        assert!(html.contains("Plotly.restyle(DIV_ID"));
        assert!(!html.contains("__SPEC__"));
    }

    #[test]
    fn script_end_tags_in_data_are_neutralized() {
        let html = render_widget_html(&spec("</script><b>x"), "/a.js", "/s").unwrap();
        assert_eq!(html.matches("</script>").count(), 1);
        assert!(html.contains(r#"<\/script><b>x"#));
    }
}
