//! Mol-Bhav server entry point.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mol_bhav::adapters::http::{router, AdminKey, AppState};
use mol_bhav::adapters::llm::{OpenAiDialogueConfig, OpenAiDialogueModel, TemplateDialogueModel};
use mol_bhav::adapters::memory::InMemoryCouponCatalog;
use mol_bhav::adapters::postgres::{PgDurableStore, PgProductCatalog};
use mol_bhav::adapters::redis::RedisHotStore;
use mol_bhav::application::{
    CouponService, DialogueGenerator, NegotiationConfig, NegotiationService,
};
use mol_bhav::config::AppConfig;
use mol_bhav::domain::negotiation::SessionParams;
use mol_bhav::domain::quote::QuoteSigner;
use mol_bhav::ports::DialogueModel;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting mol-bhav");

    // Hot tier.
    let redis_conn = mol_bhav::adapters::redis::connect(&config.redis_url, 3).await?;
    let hot = Arc::new(RedisHotStore::new(redis_conn, config.hot_op_timeout()));
    tracing::info!("hot tier connected");

    // Durable tier.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    let durable = Arc::new(PgDurableStore::new(pool.clone(), config.durable_op_timeout()));
    durable.ensure_schema().await?;
    let catalog = Arc::new(PgProductCatalog::new(pool));
    catalog.ensure_schema().await?;
    tracing::info!("durable tier connected");

    // Dialogue model: real LLM when a key is configured, deterministic
    // templates otherwise.
    let model: Arc<dyn DialogueModel> = match &config.llm_api_key {
        Some(key) if !key.is_empty() => {
            let llm_config = OpenAiDialogueConfig::new(key.clone())
                .with_model(config.llm_model.clone())
                .with_base_url(config.llm_base_url.clone())
                .with_timeout(std::time::Duration::from_secs(config.llm_timeout_seconds));
            Arc::new(OpenAiDialogueModel::new(llm_config)?)
        }
        _ => {
            tracing::warn!("no LLM key configured, using template dialogue");
            Arc::new(TemplateDialogueModel::new())
        }
    };

    let dialogue = DialogueGenerator::new(model, config.is_production());
    let coupons = CouponService::new(Arc::new(InMemoryCouponCatalog::new()));
    let quotes = QuoteSigner::new(config.quote_signing_key.clone());

    let negotiation_config = NegotiationConfig {
        params: SessionParams {
            beta: config.default_beta,
            alpha: config.default_alpha,
            max_rounds: config.default_max_rounds,
            ttl: config.session_ttl(),
            quote_ttl_seconds: config.quote_ttl_seconds,
        },
        epsilon_pct: config.zopa_epsilon_pct,
        cooldown: config.cooldown(),
        lock_lease: config.lock_lease(),
        start_rate_limit: config.start_rate_limit_per_min,
        durable_retries: 3,
    };

    let service = Arc::new(NegotiationService::new(
        hot,
        durable,
        catalog.clone(),
        dialogue,
        coupons,
        quotes,
        negotiation_config,
    ));

    let app = router(
        AppState::new(service, catalog),
        AdminKey(config.api_admin_key.clone()),
        config.cors_origins_list(),
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mol_bhav=debug,sqlx=warn"));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
