use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::{json, Value};

use oneharness::driver::{launch_fields, write_text, Callbacks, RenderOptions};
use oneharness::schema::FieldNode;
use oneharness::{Browser, HarnessConfig};

#[derive(Parser)]
#[command(name = "oneharness", version, about = "Render a field schema and drive it headlessly")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Launch a schema, apply inputs, print the resulting snapshot
    Render {
        /// JSON file holding the field list
        schema: PathBuf,
        /// JSON object used as initial form data
        #[arg(long)]
        data: Option<PathBuf>,
        /// JSON object passed through to callbacks
        #[arg(long)]
        payload: Option<PathBuf>,
        /// Harness config JSON; missing keys keep their defaults
        #[arg(long)]
        config: Option<PathBuf>,
        /// Click the field with this test id (repeatable, applied after fills)
        #[arg(long, value_name = "TEST_ID")]
        click: Vec<String>,
        /// Type into a field, `TEST_ID=TEXT` (repeatable)
        #[arg(long, value_name = "TEST_ID=TEXT")]
        fill: Vec<String>,
    },
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn record(events: &Arc<Mutex<Vec<Value>>>, event: Value) {
    if let Ok(mut events) = events.lock() {
        events.push(event);
    }
}

async fn render(
    schema: PathBuf,
    data: Option<PathBuf>,
    payload: Option<PathBuf>,
    config: Option<PathBuf>,
    clicks: Vec<String>,
    fills: Vec<String>,
) -> anyhow::Result<()> {
    let config = match config {
        Some(path) => HarnessConfig::from_json_file(path)?,
        None => HarnessConfig::default(),
    };
    let fields: Vec<FieldNode> =
        serde_json::from_value(read_json(&schema)?).context("schema must be a list of fields")?;

    let events = Arc::new(Mutex::new(Vec::new()));
    let (change_log, click_log, invalid_log) = (events.clone(), events.clone(), events.clone());
    let callbacks = Callbacks::logging()
        .on_change(move |data, initial| {
            record(&change_log, json!({"type": "change", "data": data, "initial": initial}))
        })
        .on_click(move |name, data, _| record(&click_log, json!({"type": "click", "name": name, "data": data})))
        .on_invalid(move |name, msg, _| {
            record(&invalid_log, json!({"type": "invalid", "name": name, "message": msg}))
        });

    let mut options = RenderOptions::default().callbacks(callbacks);
    if let Some(path) = data {
        options = options.data(read_json(&path)?);
    }
    if let Some(path) = payload {
        options = options.payload(read_json(&path)?);
    }

    let browser = Browser::new(Some(config)).await?;
    let page = browser.new_page().await?;
    let root = launch_fields(&page, &fields, &options).await?;
    info!("form mounted");

    for fill in &fills {
        let Some((test_id, text)) = fill.split_once('=') else {
            bail!("--fill expects TEST_ID=TEXT, got {:?}", fill);
        };
        write_text(&page, test_id, text).await?;
    }
    for test_id in &clicks {
        root.get_by_test_id(test_id).click().await?;
    }

    let snapshot = page.snapshot().await?;
    println!("{}", snapshot.outline.trim_end());
    println!("text: {}", snapshot.text);
    println!("digest: {}", snapshot.digest());
    let events = events.lock().map(|e| e.clone()).unwrap_or_default();
    for event in events {
        println!("{}", event);
    }
    page.close().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Render {
            schema,
            data,
            payload,
            config,
            click,
            fill,
        } => render(schema, data, payload, config, click, fill).await,
    }
}
