//! datadict-cli: command-line client for a running datadict server
//!
//! The server keeps no state, so the CLI holds it: a generated dictionary is
//! written to a file, and chat history lives in a JSON file that is resent and
//! extended on every `chat` call.
//!
//! # Subcommands
//! - `generate [--file <path> | --data <text>]`  build a dictionary from a sample
//! - `chat --dictionary <path> --message <text> [--history <path>]`  ask about it
//! - `export --dictionary <path>`  render Markdown locally
//! - `status`  show server health

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use datadict_core::{ChatTurn, DataDictionary};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8000";
const DEFAULT_MAX_CHARS: usize = 5000;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "datadict-cli",
    version,
    about = "Generate and explore data dictionaries through a datadict server"
)]
struct Cli {
    /// datadict HTTP server URL (overrides DATADICT_HTTP_URL env var)
    #[arg(long, env = "DATADICT_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate a data dictionary from a CSV, JSON or text sample
    Generate {
        /// Read the sample from this file
        #[arg(long, conflicts_with = "data")]
        file: Option<PathBuf>,

        /// Sample given inline
        #[arg(long)]
        data: Option<String>,

        /// Only the first N characters of the sample are sent
        #[arg(long, default_value_t = DEFAULT_MAX_CHARS)]
        max_chars: usize,

        /// Also write the result to this file
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print Markdown instead of JSON
        #[arg(long)]
        markdown: bool,
    },

    /// Ask a question about a previously generated dictionary
    Chat {
        /// Dictionary JSON file produced by `generate`
        #[arg(long)]
        dictionary: PathBuf,

        /// The question
        #[arg(long)]
        message: String,

        /// Conversation file; created if missing, extended after each reply
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Render a dictionary file as Markdown
    Export {
        #[arg(long)]
        dictionary: PathBuf,

        /// Defaults to `<table_name>_dictionary.md`
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show datadict server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

// ============================================================================
// Pure helpers
// ============================================================================

/// First `max_chars` characters of `data`, never splitting a character.
pub fn truncate_sample(data: &str, max_chars: usize) -> &str {
    match data.char_indices().nth(max_chars) {
        Some((idx, _)) => &data[..idx],
        None => data,
    }
}

/// The server's `detail` when present, otherwise the raw body.
pub fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.detail)
        .unwrap_or_else(|_| body.to_string())
}

/// History from `path`; a missing file is an empty conversation.
pub fn load_history(path: &Path) -> anyhow::Result<Vec<ChatTurn>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&raw)?)
}

pub fn extend_history(history: &mut Vec<ChatTurn>, message: &str, reply: &str) {
    history.push(ChatTurn::user(message));
    history.push(ChatTurn::model(reply));
}

fn load_dictionary(path: &Path) -> anyhow::Result<DataDictionary> {
    let raw = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&raw)?)
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client() -> anyhow::Result<reqwest::blocking::Client> {
    // Generation can take a while on large samples
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(180))
        .build()?)
}

fn post<T: serde::de::DeserializeOwned>(
    server: &str,
    endpoint: &str,
    body: &serde_json::Value,
) -> anyhow::Result<T> {
    let url = format!("{}{}", server, endpoint);
    let resp = match client()?.post(&url).json(body).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("datadict-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("datadict-cli: server returned {}: {}", status, error_detail(&body));
        std::process::exit(1);
    }

    Ok(resp.json()?)
}

fn do_generate(
    server: &str,
    sample: String,
    max_chars: usize,
    out: Option<PathBuf>,
    markdown: bool,
) -> anyhow::Result<()> {
    let sample = truncate_sample(&sample, max_chars);
    if sample.trim().is_empty() {
        anyhow::bail!("sample is empty");
    }

    let dictionary: DataDictionary = post(server, "/generate", &serde_json::json!({ "data": sample }))?;

    let rendered = if markdown {
        dictionary.to_markdown()
    } else {
        serde_json::to_string_pretty(&dictionary)?
    };
    println!("{}", rendered);

    if let Some(path) = out {
        fs::write(&path, &rendered)?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

fn do_chat(
    server: &str,
    dictionary: &Path,
    message: &str,
    history_path: Option<&Path>,
) -> anyhow::Result<()> {
    let dictionary = load_dictionary(dictionary)?;
    let mut history = match history_path {
        Some(p) => load_history(p)?,
        None => Vec::new(),
    };

    let body = serde_json::json!({
        "dictionary": dictionary,
        "message": message,
        "history": history,
    });
    let reply: ChatResponse = post(server, "/chat", &body)?;
    println!("{}", reply.response);

    if let Some(path) = history_path {
        extend_history(&mut history, message, &reply.response);
        fs::write(path, serde_json::to_string_pretty(&history)?)?;
    }
    Ok(())
}

fn do_export(dictionary: &Path, out: Option<PathBuf>) -> anyhow::Result<()> {
    let dictionary = load_dictionary(dictionary)?;
    let path = out.unwrap_or_else(|| PathBuf::from(dictionary.export_file_name()));
    fs::write(&path, dictionary.to_markdown())?;
    println!("{}", path.display());
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = client()?.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("datadict server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:         {}", body["version"].as_str().unwrap_or("?"));
            println!("Model:           {}", body["model"].as_str().unwrap_or("?"));
            println!(
                "API key:         {}",
                if body["credential_configured"].as_bool().unwrap_or(false) {
                    "configured"
                } else {
                    "missing"
                }
            );
        }
        Ok(r) => {
            eprintln!("datadict-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("datadict-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Generate { file, data, max_chars, out, markdown } => {
            let sample = match (file, data) {
                (Some(path), _) => fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e)),
                (None, Some(data)) => Ok(data),
                (None, None) => Err(anyhow::anyhow!("one of --file or --data is required")),
            };
            sample.and_then(|s| do_generate(&server, s, max_chars, out, markdown))
        }
        Commands::Chat { dictionary, message, history } => {
            do_chat(&server, &dictionary, &message, history.as_deref())
        }
        Commands::Export { dictionary, out } => do_export(&dictionary, out),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("datadict-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
