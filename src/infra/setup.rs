use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        billing::{BillingUseCases, SubscriptionRepoTrait},
        generation::{GenerationModels, GenerationUseCases},
        quota::{QuotaFailurePolicy, QuotaGate, QuotaStoreTrait},
    },
    infra::{
        ai_client::ChatCompletionsClient,
        config::AppConfig,
        creem_client::CreemClient,
        db::run_migrations,
        error::InfraError,
        http_client::{try_build_ai_client, try_build_client},
        postgres_persistence,
    },
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);
    if config.run_migrations {
        run_migrations(postgres_arc.pool()).await?;
    }

    let subscription_repo = postgres_arc.clone() as Arc<dyn SubscriptionRepoTrait>;
    let quota_store = postgres_arc.clone() as Arc<dyn QuotaStoreTrait>;

    let payments = Arc::new(CreemClient::new(
        try_build_client().map_err(InfraError::HttpClient)?,
        &config.payment,
        &config.app_origin,
    ));
    let ai = Arc::new(ChatCompletionsClient::new(
        try_build_ai_client().map_err(InfraError::HttpClient)?,
        &config.ai,
    ));

    tracing::info!(
        creem_test_mode = config.payment.is_test_mode(),
        creem_api = %config.payment.api_base_url,
        webhook_tolerance_secs = ?config.payment.webhook_tolerance_secs,
        quota_fail_open = config.quota_fail_open,
        "Configuration loaded"
    );

    let quota_gate = Arc::new(QuotaGate::new(
        quota_store,
        QuotaFailurePolicy::from_fail_open(config.quota_fail_open),
    ));

    let billing_use_cases = BillingUseCases::new(subscription_repo.clone(), payments);
    let generation_use_cases = GenerationUseCases::new(
        ai,
        quota_gate,
        subscription_repo,
        GenerationModels {
            structure_model: config.ai.structure_model.clone(),
            image_model: config.ai.image_model.clone(),
        },
    );

    Ok(AppState {
        config: Arc::new(config),
        billing_use_cases: Arc::new(billing_use_cases),
        generation_use_cases: Arc::new(generation_use_cases),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "comicmind_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false) // don’t show target (module path)
        .with_level(true)
        .pretty();

    // File (structured JSON logs), skipped if the file cannot be created
    let json_layer = File::create("app.log").ok().map(|file| {
        fmt::layer()
            .json()
            .with_writer(Arc::new(file))
            .with_current_span(true)
            .with_span_list(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
