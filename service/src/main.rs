use std::sync::Arc;

use clap::Parser;
use eyre::WrapErr;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use oracle_attestation::{AttestationDevice, sgx_info};
use oracle_service::config::{Config, Overrides};
use oracle_service::{DomainWhitelist, Oracle, server};
use oracle_session::SchnorrSession;

#[derive(Parser, Clone)]
#[command(version, about, long_about=None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "ADDRESS",
        help = "Address to listen on for notarization requests"
    )]
    listen: Option<String>,
    #[arg(
        long,
        value_name = "PATH",
        help = "Directory holding the Gramine attestation pseudo-files"
    )]
    attestation_root: Option<String>,
    #[arg(
        long = "allow-domain",
        value_name = "HOST",
        help = "Whitelist a host for attestation URLs. May be repeated."
    )]
    allow_domain: Vec<String>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = Config::load_or_init(Overrides {
        listen: cli.listen,
        attestation_root: cli.attestation_root,
        whitelist: cli.allow_domain,
    });

    let device = AttestationDevice::new(&config.attestation_root);
    // Warms the measurement cache. Failing here is survivable: quote
    // generation reports its own errors per request.
    match sgx_info(&device) {
        Ok(sgx) => info!("Enclave measurements loaded; MRENCLAVE {}", sgx.mr_enclave),
        Err(e) => warn!("Could not load enclave measurements: {e}"),
    }

    let whitelist = DomainWhitelist::new(config.whitelist.clone());
    if whitelist.is_empty() {
        warn!("Domain whitelist is empty; only price feed requests will be served");
    }
    let oracle = Arc::new(Oracle::new(
        Arc::new(SchnorrSession::new()),
        device,
        whitelist,
    )?);
    info!("Oracle signer address: {}", oracle.address());

    let listener = TcpListener::bind(&config.listen_url)
        .await
        .wrap_err("Could not bind to the listening address")?;
    info!("Notarization service listening on {}", config.listen_url);
    server::serve(listener, oracle)
        .await
        .wrap_err("Server terminated unexpectedly")
}

fn init_logging() {
    tracing_subscriber::fmt::SubscriberBuilder::default()
        .with_ansi(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
