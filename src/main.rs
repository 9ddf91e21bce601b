use std::sync::Arc;
use tracing::{error, info, warn};
use vigil::config::{Config, TlsSource};
use vigil::flags::FeatureFlagManager;
use vigil::probe::{
    DatabaseCheck, DependencyCheck, KeyEncryptionStatus, ProcessMemorySampler, SystemClock,
    UnconfiguredDependency,
};
use vigil::server::{
    build_router, build_rustls_config, create_metrics, drain_then_stop, generate_self_signed,
    run_health_server, run_health_server_tls, shutdown_channel, wait_for_signal, AppState,
    CertificateBundle, Collaborators, ShutdownCoordinator,
};

/// Hostnames placed on a generated self-signed certificate
const SELF_SIGNED_HOSTNAMES: &[&str] = &["localhost", "127.0.0.1"];

/// Database probe for the configured URL, or a stand-in that reports disconnected
fn database_check(config: &Config) -> anyhow::Result<Arc<dyn DependencyCheck>> {
    match &config.database_url {
        Some(url) => {
            let check =
                DatabaseCheck::connect_lazy(url, config.db_max_connections, config.db_check_timeout)?;
            info!(
                max_connections = config.db_max_connections,
                timeout_ms = config.db_check_timeout.as_millis() as u64,
                "Database probe configured"
            );
            Ok(Arc::new(check))
        }
        None => {
            warn!("DATABASE_URL not set - database will report disconnected");
            Ok(Arc::new(UnconfiguredDependency::new(
                "database",
                "DATABASE_URL not configured",
            )))
        }
    }
}

fn tls_config(source: &TlsSource) -> anyhow::Result<Arc<rustls::ServerConfig>> {
    let bundle = match source {
        TlsSource::Files { cert, key } => {
            info!(cert = %cert.display(), key = %key.display(), "Loading TLS certificate");
            CertificateBundle::from_files(cert, key)?
        }
        TlsSource::SelfSigned => {
            info!("Generating self-signed TLS certificate");
            generate_self_signed(SELF_SIGNED_HOSTNAMES)?
        }
    };
    Ok(build_rustls_config(&bundle)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(environment = %config.environment, "Starting vigil");

    let lifecycle = ShutdownCoordinator::new();
    let (shutdown_controller, shutdown_signal) = shutdown_channel();

    let metrics = create_metrics()?;
    info!("Prometheus metrics registry initialized");

    let flags = Arc::new(FeatureFlagManager::new(config.environment.clone()));

    let collaborators = Collaborators {
        database: database_check(&config)?,
        encryption: Arc::new(KeyEncryptionStatus::from_env(config.environment.clone())),
        sampler: Arc::new(ProcessMemorySampler::new(config.memory_limit_mb)),
        clock: Arc::new(SystemClock),
    };

    let state = AppState::new(
        lifecycle.clone(),
        collaborators,
        flags,
        metrics,
        &config.probe_settings(),
    );
    let router = build_router(state);

    let tls = config.tls.as_ref().map(tls_config).transpose()?;
    let addr = config.bind;
    let mut server_handle = match tls {
        Some(tls) => tokio::spawn(run_health_server_tls(addr, router, tls, shutdown_signal)),
        None => tokio::spawn(run_health_server(addr, router, shutdown_signal)),
    };

    // Run until a signal arrives or the server dies on its own (e.g. bind failure)
    tokio::select! {
        result = &mut server_handle => {
            return match result {
                Ok(Ok(())) => {
                    warn!("Server exited before shutdown was requested");
                    Ok(())
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Server failed");
                    Err(e.into())
                }
                Err(e) => Err(e.into()),
            };
        }
        signal = wait_for_signal() => {
            info!(signal = signal, "Initiating graceful shutdown");
        }
    }

    drain_then_stop(&lifecycle, &shutdown_controller, config.drain).await;

    match tokio::time::timeout(config.force_shutdown, server_handle).await {
        Ok(Ok(Ok(()))) => info!("vigil shut down gracefully"),
        Ok(Ok(Err(e))) => warn!(error = %e, "Server error during shutdown"),
        Ok(Err(e)) => warn!(error = %e, "Server task failed during shutdown"),
        Err(_) => {
            error!(
                deadline_secs = config.force_shutdown.as_secs(),
                "In-flight requests did not finish before the deadline, forcing exit"
            );
            std::process::exit(1);
        }
    }

    Ok(())
}
