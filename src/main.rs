//! Switchboard gateway binary.
//!
//! Loads configuration from the environment, registers bootstrap backends,
//! starts the health monitor, and serves the protocol and administration
//! surfaces until Ctrl-C or SIGTERM.

use mockable::DefaultClock;
use std::sync::Arc;
use switchboard::{
    config::GatewayConfig,
    federation::{
        adapters::{
            http::{ChatCompletionsReasoner, HttpBackendClient},
            memory::InMemoryBackendRegistry,
        },
        ports::ReasoningBackend,
        services::FederationService,
    },
    server::{ApiKey, AppState, build_router},
    telemetry,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    telemetry::init()?;
    let config = GatewayConfig::from_env()?;
    let bootstrap = config.bootstrap_servers()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %config.bind_address(),
        "starting switchboard"
    );

    let http = reqwest::Client::builder().build()?;
    let reasoner = config.reasoning.clone().map(|settings| {
        let reasoner = ChatCompletionsReasoner::new(http.clone(), settings);
        info!(model = reasoner.model(), "reasoning strategy enabled");
        Arc::new(reasoner) as Arc<dyn ReasoningBackend>
    });
    if reasoner.is_none() {
        info!("no reasoning key configured; routing uses keyword matching only");
    }

    let service = Arc::new(FederationService::new(
        Arc::new(InMemoryBackendRegistry::new()),
        Arc::new(HttpBackendClient::new(http)),
        Arc::new(DefaultClock),
        reasoner,
        config.federation,
    ));

    for request in bootstrap {
        let name = request.name.clone();
        match service.register_server(request).await {
            Ok(registered) => info!(
                server = %name,
                health = %registered.server.health,
                "bootstrap backend registered"
            ),
            Err(err) => warn!(server = %name, error = %err, "bootstrap backend rejected"),
        }
    }

    let shutdown = CancellationToken::new();
    let monitor = service.monitor().spawn(shutdown.clone());

    let app = build_router(
        AppState::new(Arc::clone(&service)),
        config.api_key.as_deref().map(ApiKey::new),
        config.allowed_origins.layer(),
    );
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    monitor.await?;
    info!("switchboard stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM and cancels `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received");
    shutdown.cancel();
}
