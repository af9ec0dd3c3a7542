use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::Value;
use std::io::{self, BufRead, BufReader, Write};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod chart;
mod config;
mod node;
mod oracle;
mod query;
mod registry;
mod render;
mod stream;

use anyhow::{Context, bail};
use config::{NodeConfig, Settings};
use node::{ClientMessage, ClientSink};
use oracle::{RenderContext, SchemaValidator};
use query::{Method, QuerySurface};
use registry::NodeRegistry;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "chartflow")]
#[command(about = "Live chart node: config compiler and streaming shared state", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG still wins).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and validate a node config; prints {spec, issues, validation}.
    Compile {
        #[arg(long)]
        config: String,

        #[arg(short = 'o', long)]
        out: Option<String>,
    },

    /// Write the dashboard widget page for a node config.
    Widget {
        #[arg(long)]
        config: String,

        #[arg(short = 'o', long)]
        out: String,
    },

    /// Start a node and feed it JSON-lines events (inbound messages and queries).
    Replay {
        #[arg(long)]
        config: String,

        #[arg(long)]
        events: String,
    },
}

/// One line of a replay script.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Event {
    Msg(Value),
    Get(String),
    Post { path: String, body: Value },
}

/// Client messages as JSON lines on a writer.
struct JsonLines<W: Write> {
    out: W,
}

impl<W: Write> ClientSink for JsonLines<W> {
    fn send_to_clients(&mut self, message: ClientMessage) {
        if let Err(e) = write_json_line(&mut self.out, &message) {
            tracing::error!(node = %message.node_id, "failed to write client message: {}", e);
        }
    }
}

fn write_json_line<W: Write, T: serde::Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn load_config(path: &str) -> Result<NodeConfig> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read node config {}", path))?;
    NodeConfig::from_json(&text).with_context(|| format!("parse node config {}", path))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // 1) Bring up the process-wide render context before anything validates.
    let context = RenderContext::load(cli.settings.plotly_js.as_deref());
    if RenderContext::install(context).is_err() {
        tracing::warn!("render context was already initialized");
    }
    let schema = SchemaValidator::global();
    let surface = QuerySurface::new(&cli.settings.ui_path)?;
    tracing::debug!(
        prefix = surface.prefix(),
        degraded = schema.context().is_degraded(),
        "query surface ready"
    );
    let mut registry = NodeRegistry::new(cli.settings, schema);

    match cli.cmd {
        Commands::Compile { config, out } => {
            let config = load_config(&config)?;
            let result = registry.compile_for_editor(&config);
            let json = serde_json::to_string_pretty(result)?;
            match out {
                Some(out) => {
                    std::fs::write(&out, json).with_context(|| format!("write {}", out))?;
                    println!("Wrote {}", out);
                }
                None => println!("{}", json),
            }
        }

        Commands::Widget { config, out } => {
            let config = load_config(&config)?;
            let id = config.id.clone();
            let result = registry.compile_for_editor(&config);
            let html = render::render_widget_html(
                &result.spec,
                &surface.asset_url(Some(&id)),
                &surface.snapshot_url(&id),
            )?;
            std::fs::write(&out, html).with_context(|| format!("write {}", out))?;
            println!("Wrote {}", out);
        }

        Commands::Replay { config, events } => {
            let config = load_config(&config)?;
            let node = registry.start(config)?;
            let id = node.id().to_string();
            tracing::info!(
                node = %id,
                traces = node.spec().trace_count(),
                valid = node.is_valid(),
                "replaying {}",
                events
            );

            let file = std::fs::File::open(&events).with_context(|| format!("open events {}", events))?;
            let stdout = io::stdout();
            let mut sink = JsonLines { out: stdout.lock() };

            for (lineno, line) in BufReader::new(file).lines().enumerate() {
                let lno = lineno + 1;
                let line = line.with_context(|| format!("read {}:{}", events, lno))?;
                if line.trim().is_empty() {
                    continue;
                }
                let event: Event = match serde_json::from_str(&line) {
                    Ok(e) => e,
                    Err(e) => bail!("event parse error at {}:{}: {}", events, lno, e),
                };

                match event {
                    Event::Msg(msg) => registry.deliver(&id, msg, &mut sink)?,
                    Event::Get(path) => {
                        let response = surface.handle(&mut registry, Method::Get, &path, None);
                        write_json_line(&mut sink.out, &response)?;
                    }
                    Event::Post { path, body } => {
                        let response = surface.handle(&mut registry, Method::Post, &path, Some(&body));
                        write_json_line(&mut sink.out, &response)?;
                    }
                }
            }

            registry.stop(&id);
        }
    }

    Ok(())
}
