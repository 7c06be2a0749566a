//! `kbsearch` - query the knowledge base from the command line.
//!
//! Prints the search response (or an embedding, with `--embed`) as JSON on
//! stdout; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use kbsearch::{build_engine, init_tracing, DocumentKind, EmbeddingMethod, KbConfig, SearchRequest};

#[derive(Debug, Parser)]
#[command(name = "kbsearch", version, about = "Semantic search over the training knowledge base")]
struct Cli {
    /// Configuration file (defaults to ./kbsearch.yaml when present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Remote provider credential.
    #[arg(long, env = "KB_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Ask a text-generation provider for a cited answer.
    #[arg(long)]
    generate: bool,

    /// Use the local server for answer generation when no key is given.
    #[arg(long)]
    local_server: bool,

    #[arg(long)]
    top_k: Option<usize>,

    /// Restrict results to insight, curriculum or metadata documents.
    #[arg(long)]
    kind: Option<DocumentKind>,

    /// Print the query embedding from this provider instead of searching.
    #[arg(long, value_name = "METHOD")]
    embed: Option<EmbeddingMethod>,

    /// Print loaded-collection diagnostics and exit.
    #[arg(long)]
    health: bool,

    #[arg(required_unless_present = "health", num_args = 1..)]
    query: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = KbConfig::load(cli.config.as_deref()).context("loading configuration")?;
    init_tracing(&config.logging).map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;
    let engine = build_engine(&config)?;

    if cli.health {
        println!("{}", serde_json::to_string_pretty(&engine.health())?);
        return Ok(ExitCode::SUCCESS);
    }

    let query = cli.query.join(" ");
    let outcome = match cli.embed {
        Some(method) => engine
            .embed(&query, method, cli.api_key.as_deref())
            .await
            .map(|embedding| serde_json::to_string_pretty(&embedding)),
        None => {
            let mut request = SearchRequest::new(query)
                .with_answer(cli.generate)
                .with_local_server(cli.local_server);
            request.api_key = cli.api_key;
            request.top_k = cli.top_k;
            request.kind = cli.kind;
            engine
                .search(&request)
                .await
                .map(|response| serde_json::to_string_pretty(&response))
        }
    };

    match outcome {
        Ok(json) => {
            println!("{}", json?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => match err.remediation() {
            Some(fix) => {
                eprintln!("error: {err}\nhint: {fix}");
                Ok(ExitCode::from(2))
            }
            None => Err(err.into()),
        },
    }
}
