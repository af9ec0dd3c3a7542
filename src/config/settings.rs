use clap::Args;
use std::path::PathBuf;

/// Dashboard grid metrics in pixels: cell size (`sx`, `sy`), group padding
/// (`gx`, `gy`) and cell gap (`cx`, `cy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Args)]
pub struct WidgetSizes {
    #[arg(global = true, long = "size-sx", default_value_t = 48)]
    pub sx: u32,
    #[arg(global = true, long = "size-sy", default_value_t = 48)]
    pub sy: u32,
    #[arg(global = true, long = "size-gx", default_value_t = 6)]
    pub gx: u32,
    #[arg(global = true, long = "size-gy", default_value_t = 6)]
    pub gy: u32,
    #[arg(global = true, long = "size-cx", default_value_t = 6)]
    pub cx: u32,
    #[arg(global = true, long = "size-cy", default_value_t = 6)]
    pub cy: u32,
}

impl Default for WidgetSizes {
    fn default() -> Self {
        Self {
            sx: 48,
            sy: 48,
            gx: 6,
            gy: 6,
            cx: 6,
            cy: 6,
        }
    }
}

/// Process-wide settings shared by every chart node.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Dashboard UI path prefix.
    #[arg(long, global = true, env = "CHARTFLOW_UI_PATH", default_value = "ui")]
    pub ui_path: String,

    /// Location of the plotly.js bundle served to dashboards.
    #[arg(long, global = true, env = "CHARTFLOW_PLOTLY_JS")]
    pub plotly_js: Option<PathBuf>,

    #[command(flatten)]
    pub sizes: WidgetSizes,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ui_path: "ui".to_string(),
            plotly_js: None,
            sizes: WidgetSizes::default(),
        }
    }
}
