//! LFX v1 sync worker daemon.
//!
//! Mirrors v1 records from the replicated `v1-objects` bucket into the v2
//! services and index/access subjects. Stateless and horizontally
//! scalable: every instance binds the same durable consumer and the
//! broker load-balances deliveries.
//!
//! Bootstrap order: CLI → tracing → configuration → broker connection →
//! KV buckets → health sidecar → durable consumer → dispatcher. Any
//! bootstrap failure exits nonzero; after that, per-record failures only
//! ever surface in logs.

mod health;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lfx_sync_adapters::{
    BrokerPublisher, CommitteeServiceClient, ProjectServiceClient, V1OrgClient, http_client,
};
use lfx_sync_auth::{
    PrincipalResolver, TokenMinter, TokenSigner, UserLookupClient, fetch_jwks_kid, user_cache,
};
use lfx_sync_broker::{BrokerClient, ChangeConsumer, ConsumerSettings};
use lfx_sync_config::{ConfigLoader, SyncConfig};
use lfx_sync_engine::{Dispatcher, DispatcherSettings, HandlerDeps, HandlerRegistry};
use lfx_sync_mappings::{KvMappingBackend, MappingStore};

/// LFX v1 sync worker - mirrors legacy records into the v2 platform.
#[derive(Parser)]
#[command(name = "lfx-sync-worker")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults to lfx-sync.toml in
    /// the working directory, overlaid with LFX_* environment variables).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(file) = &cli.config {
        loader = loader.with_config_file(file);
    }
    let config = loader.load().context("configuration load failed")?;

    init_tracing(cli.debug || config.debug);
    config.validate().context("configuration invalid")?;

    run(config).await
}

async fn run(config: SyncConfig) -> anyhow::Result<()> {
    let http = http_client(
        &config.auth.service_name,
        Duration::from_secs(config.services.request_timeout_secs),
    )
    .context("http client construction failed")?;

    // Key id: configured wins; otherwise one JWKS fetch at startup.
    let key_id = match (&config.auth.key_id, &config.auth.jwks_url) {
        (Some(kid), _) => Some(kid.clone()),
        (None, Some(url)) => Some(
            fetch_jwks_kid(&http, url)
                .await
                .context("JWKS key id fetch failed")?,
        ),
        (None, None) => None,
    };

    let pem = config.auth.signing_key().context("signing key unavailable")?;
    let signer = Arc::new(
        TokenSigner::from_rsa_pem(&pem, &config.auth.issuer, key_id)
            .context("signing key rejected")?,
    );
    let tokens = Arc::new(TokenMinter::new(signer));

    let users = user_cache(Arc::new(UserLookupClient::new(
        http.clone(),
        &config.services.user_api_url,
        &config.auth.v1_username,
        &config.auth.v1_password,
    )));
    let resolver = Arc::new(PrincipalResolver::new(users, &config.auth.service_name));

    let broker = BrokerClient::connect(&config.broker.url, &config.auth.service_name)
        .await
        .context("broker connection failed")?;
    let objects = broker
        .key_value(&config.broker.objects_bucket)
        .await
        .context("objects bucket unavailable")?;
    let mapping_bucket = broker
        .key_value(&config.broker.mappings_bucket)
        .await
        .context("mappings bucket unavailable")?;
    let mappings = MappingStore::new(Arc::new(KvMappingBackend::new(mapping_bucket)));

    let deps = Arc::new(HandlerDeps {
        mappings,
        objects: Arc::new(objects),
        projects: Arc::new(ProjectServiceClient::new(
            http.clone(),
            &config.services.project_api_url,
        )),
        committees: Arc::new(CommitteeServiceClient::new(
            http.clone(),
            &config.services.committee_api_url,
        )),
        publisher: Arc::new(BrokerPublisher::new(broker.clone())),
        orgs: Arc::new(V1OrgClient::new(
            http.clone(),
            &config.services.user_api_url,
            &config.auth.v1_username,
            &config.auth.v1_password,
        )),
        tokens,
        audiences: config.auth.audiences.clone(),
    });
    let registry = HandlerRegistry::standard(&deps);

    let cancel = CancellationToken::new();
    let ready = Arc::new(AtomicBool::new(false));

    let bind: SocketAddr = format!("{}:{}", config.http.bind, config.http.port)
        .parse()
        .context("invalid health bind address")?;
    let sidecar = health::HealthSidecar::bind(bind, broker.clone(), Arc::clone(&ready))
        .await
        .context("health sidecar bind failed")?;
    tokio::spawn(sidecar.serve(cancel.clone()));

    let settings = ConsumerSettings::from_config(&config.broker);
    let consumer = ChangeConsumer::bind(&broker, &settings)
        .await
        .context("consumer bind failed")?;
    ready.store(true, Ordering::SeqCst);

    tokio::spawn(watch_shutdown_signals(cancel.clone()));

    let dispatcher = Dispatcher::new(
        registry,
        resolver,
        DispatcherSettings::from(&config.broker),
        cancel,
    );
    dispatcher
        .run(&consumer)
        .await
        .context("dispatcher failed")?;

    info!("clean shutdown");
    Ok(())
}

/// Cancels the shutdown token on SIGINT or SIGTERM.
async fn watch_shutdown_signals(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(error) => {
                tracing::warn!(%error, "SIGTERM handler unavailable, relying on ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
                cancel.cancel();
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received, draining");
    cancel.cancel();
}
