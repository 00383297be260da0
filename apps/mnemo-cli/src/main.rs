//! Thin command-line front end for the retrieval engine.
//!
//! Ingests plain-text corpora (`.txt`/`.md`; richer document formats are an
//! upstream collaborator's job) and serves ad-hoc queries. Configuration
//! comes from `mnemo.toml` / `MNEMO_*` env vars.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use mnemo_core::config::EngineConfig;
use mnemo_retrieve::RetrievalEngine;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {prog} <ingest|query|count|clear> [args...]");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::load().context("loading configuration")?;
    let (cmd, args) = parse_args();
    let engine = RetrievalEngine::open(config).await?;
    if !engine.backend_available() {
        warn!(
            backend = engine.backend_id(),
            "running degraded: ingest and query will fail until a backend is configured"
        );
    }

    match cmd.as_str() {
        "ingest" => {
            let data_dir = args
                .first()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/raw"));
            ingest_directory(&engine, &data_dir).await?;
        }
        "query" => {
            let (query, k, affinity) = parse_query_args(&args)?;
            let results = engine.retrieve(&query, k, affinity.as_deref()).await?;
            if results.is_empty() {
                println!("No results.");
            }
            for (rank, hit) in results.iter().enumerate() {
                println!(
                    "{:>2}. d={:.4} [{} / {}] {} #{}",
                    rank + 1,
                    hit.distance,
                    hit.metadata.topic,
                    hit.metadata.subtopic,
                    hit.metadata.source,
                    hit.metadata.chunk_index,
                );
                println!("    {}", hit.text);
            }
        }
        "count" => {
            println!("{}", engine.count().await?);
        }
        "clear" => {
            engine.clear().await?;
            println!("Collection cleared.");
        }
        other => bail!("unknown command: {other}"),
    }
    Ok(())
}

/// `query "<text>" [k] [--source <S>]`
fn parse_query_args(args: &[String]) -> anyhow::Result<(String, usize, Option<String>)> {
    let mut query = None;
    let mut k = 5usize;
    let mut affinity = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--source" {
            affinity = Some(
                iter.next()
                    .context("--source requires a value")?
                    .to_string(),
            );
        } else if query.is_none() {
            query = Some(arg.to_string());
        } else {
            k = arg.parse().context("k must be a positive integer")?;
        }
    }
    let query = query.context("usage: mnemo query \"<text>\" [k] [--source <S>]")?;
    Ok((query, k, affinity))
}

async fn ingest_directory(engine: &RetrievalEngine, data_dir: &Path) -> anyhow::Result<()> {
    let files = list_text_files(data_dir);
    if files.is_empty() {
        println!("No .txt/.md files found under {}.", data_dir.display());
        return Ok(());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );
    let mut total_chunks = 0usize;
    for file in &files {
        pb.set_message(file.display().to_string());
        let text = read_file_content(file)?;
        let source = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string());
        let file_type = file
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("txt")
            .to_string();
        // Topic classification is an upstream collaborator; from the CLI the
        // chunks fall back to the synthetic "General" topic.
        total_chunks += engine.ingest(&text, &source, &file_type, &[]).await?;
        pb.inc(1);
    }
    pb.finish_with_message("done");
    println!(
        "Ingested {} files into {} chunks ({} entries in collection).",
        files.len(),
        total_chunks,
        engine.count().await?
    );
    Ok(())
}

fn list_text_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|s| s.to_str()),
                Some("txt") | Some("md")
            )
        })
        .collect();
    files.sort();
    files
}

fn read_file_content(path: &Path) -> anyhow::Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        // Fall back to lossy decoding for non-UTF-8 files.
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).to_string()),
    }
}
