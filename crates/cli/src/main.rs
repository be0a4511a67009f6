use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use remap_replace::ReplacementTransformer;
use tracing::{error, info};

const CLIENT_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));
const NO_CLUSTER: &str = "could not connect to a kubernetes cluster";
const NO_SERVER_VERSION: &str = "Could not get kubernetes version";

#[derive(Parser, Debug)]
#[command(name = "remapctl", version, about = "Apply replacement rules to Kubernetes manifests")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a ReplacementTransformer config over a manifest stream
    Apply {
        /// Transformer config (YAML)
        #[arg(short = 'c', long = "config")]
        config: PathBuf,
        /// Manifest stream to transform (default: stdin)
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,
        /// Where to write the result (default: stdout)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Show the client and kubernetes server versions
    Version,
}

fn init_tracing() {
    let env = std::env::var("REMAP_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    // stdout carries manifests
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn max_yaml_bytes() -> usize {
    std::env::var("REMAP_MAX_YAML_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(8 * 1024 * 1024)
}

fn read_capped(path: Option<&Path>, cap: usize) -> Result<String> {
    let mut buf = String::new();
    match path {
        Some(p) => {
            let f = std::fs::File::open(p).with_context(|| format!("opening {}", p.display()))?;
            f.take(cap as u64 + 1).read_to_string(&mut buf).with_context(|| format!("reading {}", p.display()))?;
        }
        None => {
            std::io::stdin().take(cap as u64 + 1).read_to_string(&mut buf).context("reading stdin")?;
        }
    }
    if buf.len() > cap {
        bail!("input exceeds {} bytes (set REMAP_MAX_YAML_BYTES to raise the limit)", cap);
    }
    Ok(buf)
}

fn apply(config: &Path, input: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let cap = max_yaml_bytes();
    let cfg_text = read_capped(Some(config), cap)?;
    let transformer = ReplacementTransformer::from_yaml(&cfg_text)
        .with_context(|| format!("loading transformer config {}", config.display()))?;
    info!(transformer = %transformer.name(), rules = transformer.rules().len(), "config loaded");

    let manifests = read_capped(input, cap)?;
    let rendered = transformer.run(&manifests).context("applying replacements")?;
    match output {
        Some(p) => std::fs::write(p, rendered).with_context(|| format!("writing {}", p.display()))?,
        None => std::io::stdout().write_all(rendered.as_bytes()).context("writing stdout")?,
    }
    Ok(())
}

/// Server version, or `Ok(NO_CLUSTER)` when no client can be built at all.
async fn kube_version() -> Result<String> {
    let client = match kube::Client::try_default().await {
        Ok(c) => c,
        Err(e) => {
            info!(error = %e, "no kubernetes client configured");
            return Ok(NO_CLUSTER.to_string());
        }
    };
    let info = client.apiserver_version().await.context("querying apiserver version")?;
    Ok(info.git_version)
}

fn render_version(out: &mut impl Write, client: &str, server: Result<String>) -> std::io::Result<()> {
    let server = match server {
        Ok(v) => v,
        Err(e) => {
            error!(error = ?e, "version lookup failed");
            return write!(out, "{}", NO_SERVER_VERSION);
        }
    };
    let rows = [("client:", client), ("kubernetes server:", server.as_str())];
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0) + 1;
    for (label, value) in rows {
        writeln!(out, "{:<width$}{}", label, value, width = width)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply { config, input, output } => {
            info!(config = %config.display(), "apply invoked");
            if let Err(e) = apply(&config, input.as_deref(), output.as_deref()) {
                error!(error = ?e, "apply failed");
                return Err(e);
            }
        }
        Commands::Version => {
            let server = kube_version().await;
            render_version(&mut std::io::stdout().lock(), CLIENT_VERSION, server)?;
        }
    }
    Ok(())
}
