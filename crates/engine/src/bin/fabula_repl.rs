//! Line-oriented JSON REPL over a Fabula world.
//!
//! Reads one JSON protocol message per line from stdin and prints the JSON
//! reply. The engine never performs session I/O itself; this host applies
//! the `data.signal` payloads (save, load, quit) the meta verbs return.
//!
//! Usage: `fabula-repl [world.json]` (defaults to the bundled demo world).

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use fabula_domain::{load_world_from_path, save_world_to_path};
use fabula_engine::{behaviors, BehaviorRegistry, ProtocolHandler};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let world_path: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("crates/engine/demos/cavern.json"));

    let mut handler = bind(&world_path)?;
    tracing::info!(world = %world_path.display(), "fabula repl ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let raw = handler.handle_json_str(&line);
        writeln!(stdout, "{raw}").context("writing reply")?;
        stdout.flush().ok();

        match signal_of(&raw) {
            Some(("quit", _)) => break,
            Some(("save", filename)) => {
                let target = filename.unwrap_or_else(|| "save.json".to_string());
                if let Err(e) = save_world_to_path(handler.world(), &target) {
                    tracing::error!(error = %e, "save failed");
                }
            }
            Some(("load", filename)) => {
                let source = filename
                    .map(PathBuf::from)
                    .unwrap_or_else(|| world_path.clone());
                match bind(&source) {
                    Ok(fresh) => handler = fresh,
                    Err(e) => tracing::error!(error = %e, "load failed"),
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn bind(path: &PathBuf) -> Result<ProtocolHandler> {
    let world = load_world_from_path(path)
        .with_context(|| format!("loading world from {}", path.display()))?;
    let registry =
        BehaviorRegistry::load(behaviors::standard_modules()).context("loading behavior modules")?;
    ProtocolHandler::new(world, Arc::new(registry)).context("binding protocol handler")
}

/// Extract `(signal, filename)` from a successful reply, if present.
fn signal_of(raw: &str) -> Option<(&'static str, Option<String>)> {
    let reply: Value = serde_json::from_str(raw).ok()?;
    if reply["success"] != Value::Bool(true) {
        return None;
    }
    let signal = reply["data"]["signal"].as_str()?;
    let filename = reply["data"]["filename"].as_str().map(str::to_string);
    match signal {
        "quit" => Some(("quit", filename)),
        "save" => Some(("save", filename)),
        "load" => Some(("load", filename)),
        _ => None,
    }
}
