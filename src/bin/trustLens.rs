use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use trust_lens_lib::services::history_store::DEFAULT_HISTORY_LIMIT;
use trust_lens_lib::{init_logging, TrustLens};

const USAGE: &str = "Usage:
  trustLens [--config <dir>] score --text <review> [--model <name>]
  trustLens [--config <dir>] batch <reviews.json> [--model <name>] [--concurrency <n>] [--out <json_path>]
  trustLens [--config <dir>] train <dataset.csv> [--text-column <name>] [--label-column <name>]
  trustLens [--config <dir>] features [--model <name>] [--top <n>]
  trustLens [--config <dir>] models
  trustLens [--config <dir>] history [--limit <n>]

Notes:
  - batch input is a JSON array, or an object with a \"reviews\" array.
  - TRUSTLENS_MODEL_DIR overrides the model folder when the config leaves it unset.
  - TRUSTLENS_DISABLE_FILE_LOG=1 keeps logs on stderr only.";

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn parse_usize(args: &[String], key: &str, default: usize) -> Result<usize> {
    match parse_arg_value(args, key) {
        Some(v) => v
            .parse()
            .with_context(|| format!("{} expects a number, got {:?}", key, v)),
        None => Ok(default),
    }
}

/// First argument after the command that is not an option or an option value
fn positional(args: &[String]) -> Option<String> {
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            iter.next();
            continue;
        }
        return Some(arg.clone());
    }
    None
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn batch_items(input: Value) -> Result<Vec<Value>> {
    match input {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("reviews") {
            Some(Value::Array(items)) => Ok(items),
            _ => bail!("batch file must be a JSON array or contain a \"reviews\" array"),
        },
        _ => bail!("batch file must be a JSON array or contain a \"reviews\" array"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || has_flag(&args, "--help") {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    init_logging();

    // Global options come before the command
    let mut rest = args.as_slice();
    let mut config_dir: Option<PathBuf> = None;
    if rest.first().map(String::as_str) == Some("--config") {
        let dir = rest.get(1).ok_or_else(|| anyhow!("--config expects a directory"))?;
        config_dir = Some(PathBuf::from(dir));
        rest = &rest[2..];
    }
    let command = rest.first().cloned().ok_or_else(|| anyhow!("missing command\n\n{}", USAGE))?;

    let app = TrustLens::open(config_dir).map_err(|e| anyhow!(e))?;
    let default_model = app.config.default_model.clone();
    let model = parse_arg_value(rest, "--model").unwrap_or(default_model);

    match command.as_str() {
        "score" => {
            let text = parse_arg_value(rest, "--text").ok_or_else(|| anyhow!("score requires --text"))?;
            let record = app.orchestrator.score_one(&text, &model)?;
            print_json(&record)?;
        }
        "batch" => {
            let path = positional(rest).ok_or_else(|| anyhow!("batch requires an input file"))?;
            let raw = std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path))?;
            let items = batch_items(serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path))?)?;
            let concurrency = parse_usize(rest, "--concurrency", app.config.scoring.batch_concurrency)?;

            let orchestrator = Arc::clone(&app.orchestrator);
            let report = orchestrator.score_many_concurrent(items, &model, concurrency).await?;
            info!(
                "[CLI] Batch finished: {} scored, {} failed",
                report.scored_count(),
                report.failed_count()
            );

            match parse_arg_value(rest, "--out") {
                Some(out) => {
                    let json = serde_json::to_string_pretty(&report)?;
                    std::fs::write(&out, json).with_context(|| format!("failed to write {}", out))?;
                    eprintln!("Wrote {} results to {}", report.results.len(), out);
                }
                None => print_json(&report)?,
            }
        }
        "train" => {
            let path = positional(rest).ok_or_else(|| anyhow!("train requires a CSV dataset"))?;
            let text_column = parse_arg_value(rest, "--text-column")
                .unwrap_or_else(|| app.config.training.text_column.clone());
            let label_column = parse_arg_value(rest, "--label-column")
                .unwrap_or_else(|| app.config.training.label_column.clone());
            let report = app.train(&PathBuf::from(path), &text_column, &label_column)?;
            print_json(&report)?;
        }
        "features" => {
            let top = parse_usize(rest, "--top", 10)?;
            let impacts = app.features(&model, top)?;
            print_json(&impacts)?;
        }
        "models" => print_json(&app.models())?,
        "history" => {
            let limit = parse_usize(rest, "--limit", DEFAULT_HISTORY_LIMIT)?;
            print_json(&app.history(limit)?)?;
        }
        other => bail!("unknown command {:?}\n\n{}", other, USAGE),
    }

    Ok(())
}
