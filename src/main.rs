mod app;
mod auth;
mod config;
mod consumer;
mod error;
mod http;
mod k8s;
mod models;
mod session;
#[cfg(test)]
mod testing;
mod tui;
mod ui;
pub mod utils;
mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::auth::Credentials;
use crate::config::ClusterConfig;
use crate::http::ResourceClient;
use crate::session::{Controller, Session};

#[derive(Parser)]
#[command(name = "podwatch", about = "Live pod dashboard for a cluster namespace", author, version, long_about = None)]
struct Cli {
    /// API server URL, e.g. https://192.168.64.3:8443.
    /// Defaults to the cluster of the current kubeconfig context.
    #[arg(short, long, env = "PODWATCH_SERVER")]
    server: Option<String>,
    /// Target namespace.
    /// If -n is passed without a value, shows interactive menu.
    /// If -n is missing, uses current context.
    #[arg(short, long, num_args = 0..=1, default_missing_value = None)]
    namespace: Option<Option<String>>,
    /// User for the OAuth challenge
    #[arg(short, long, env = "PODWATCH_USER", default_value = "admin")]
    user: String,
    /// Password for the OAuth challenge
    #[arg(long, env = "PODWATCH_PASSWORD", default_value = "admin", hide_env_values = true)]
    password: String,
    /// Bearer token; skips the OAuth challenge
    #[arg(long, env = "PODWATCH_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[arg(long, default_value = "openshift-challenging-client")]
    client_id: String,
    /// Accept invalid TLS certificates
    #[arg(short = 'k', long, default_value_t = false)]
    insecure: bool,
    /// Print the pod table once and exit
    #[arg(long, default_value_t = false)]
    once: bool,
    /// Write diagnostics here (filtered by RUST_LOG)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // 1. Initialize Crypto
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;
    init_tracing(cli.log_file.as_deref())?;

    // 2. Resolve the cluster and authenticate ONCE
    let config = ClusterConfig::resolve(cli.server.as_deref()).await?;
    let client = ResourceClient::new(cli.insecure)?;
    let token = match cli.token {
        Some(token) => token,
        None => {
            let pb = utils::create_spinner(&format!("Authorizing against {}...", config.endpoint));
            let creds = Credentials {
                client_id: cli.client_id,
                user: cli.user,
                password: cli.password,
            };
            let token = auth::authorize(&client, &config.endpoint, &creds).await;
            pb.finish_and_clear();
            token?
        }
    };

    let (sink, events) = mpsc::unbounded_channel();
    let controller = Controller::new(client, config.endpoint.clone(), sink);
    let namespace =
        utils::select_namespace(&controller, &token, cli.namespace, &config.default_namespace).await?;

    if cli.once {
        let snapshot = controller.fetch_pods(&namespace, &token).await?;
        utils::print_pods(&namespace, &snapshot);
        return Ok(());
    }

    // 3. Controller loop owns the session; the TUI only asks for namespaces
    let (requests, requests_rx) = tokio::sync::watch::channel(namespace.clone());
    let session = Session::new(token.clone(), namespace.clone());
    let watcher = tokio::spawn(controller.clone().run(session, requests_rx));

    let channels = tui::Channels { events, requests };
    let result = tui::run(App::new(namespace), channels, controller, token).await;
    watcher.abort();
    result
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("podwatch=info")))
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
