use std::sync::Arc;

use offer_flow::api::{HttpPropertyApi, PropertyApi};
use offer_flow::config::FlowConfig;
use offer_flow::flow::WizardOrchestrator;
use offer_flow::script::builtin_flow;
use offer_flow::server::wizard_routes;
use offer_flow::session::Session;
use offer_flow::timeline::Timeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = FlowConfig::from_env();

    // Initialize tracing; optionally tee into a daily-rolling file.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _file_guard = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "offer-flow.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
            None
        }
    };

    eprintln!("🏠 Offer Flow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend API: {}", config.api_base_url);
    eprintln!("   Wizard WS: ws://0.0.0.0:{}/ws", config.port);
    eprintln!("   Wizard API: http://0.0.0.0:{}/api/wizard/status", config.port);
    if let Some(dir) = &config.log_dir {
        eprintln!("   Logs: {dir}/offer-flow.log");
    }
    eprintln!();

    let mut http_api = HttpPropertyApi::new(&config.api_base_url);
    if let Some(token) = &config.api_token {
        http_api = http_api.with_auth_token(secrecy::SecretString::from(token.clone()));
    }
    let api: Arc<dyn PropertyApi> = Arc::new(http_api);
    let session = Arc::new(Session::new());
    let timeline = Timeline::new();
    let orchestrator = WizardOrchestrator::new(builtin_flow(), Arc::clone(&timeline))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to build wizard: {e}"))?;

    let app = wizard_routes(
        Arc::clone(&orchestrator),
        Arc::clone(&timeline),
        session,
        api,
    );

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Wizard server started");
    axum::serve(listener, app).await?;

    Ok(())
}
