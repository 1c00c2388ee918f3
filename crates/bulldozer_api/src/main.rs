//! Bulldozer server
//!
//! Main binary: reads settings from the environment (see [`bulldozer_api::settings`]),
//! connects to GitHub as the configured app and serves the webhook endpoint.

use anyhow::Context;
use bulldozer_api::settings::{LogFormat, ServerSettings};
use bulldozer_api::{ApiConfig, ApiServer, AppState};
use bulldozer_core::{
    ConfigResolver, Configuration, EventRouter, FullScanReconciler, PullRequestProcessor,
};
use github_client::{
    create_app_client, create_token_client, ClientProvider, GitHubAppClientProvider,
    GitHubClient,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = ServerSettings::from_env().context("Invalid server settings")?;
    init_tracing(settings.log_format);

    let api_url = settings.github_api_url.as_deref();
    let app_client = create_app_client(settings.app_id, &settings.private_key, api_url)?;
    let provider: Arc<dyn ClientProvider> = Arc::new(GitHubAppClientProvider::new(app_client));

    let default_config = settings
        .default_config_path
        .as_deref()
        .map(Configuration::from_file)
        .transpose()
        .context("Invalid fallback configuration")?;
    if default_config.is_some() {
        tracing::info!(path = ?settings.default_config_path, "Loaded fallback configuration");
    }

    let resolver = Arc::new(ConfigResolver::new(settings.config_path.clone(), default_config));
    let mut processor = PullRequestProcessor::new(resolver);
    if let Some(token) = &settings.push_restriction_token {
        let token_client = GitHubClient::new(create_token_client(token, api_url)?);
        processor = processor.with_push_restriction_client(Arc::new(token_client));
        tracing::info!("Merges into push-restricted branches use the configured token");
    }
    let processor = Arc::new(processor);

    let startup_scan = settings
        .refresh_on_start
        .then(|| FullScanReconciler::new(provider.clone(), processor.clone()));

    let events = EventRouter::new(provider, processor, settings.max_concurrent_events);
    let state = AppState::new(events, settings.webhook_secret.clone());
    if state.webhook_secret.is_none() {
        tracing::warn!("GITHUB_WEBHOOK_SECRET is not set, webhook signatures are not checked");
    }

    let config = ApiConfig {
        host: settings.host.clone(),
        port: settings.port,
    };

    tracing::info!(
        app_id = settings.app_id,
        config_path = %settings.config_path,
        "Starting bulldozer"
    );

    let mut server = ApiServer::new(config, state);
    if let Some(scanner) = startup_scan {
        server = server.with_startup_scan(scanner);
    }
    server.serve().await
}
