use dotenvy::dotenv;
use kassa_db::repositories::{PgLedger, SettingsRepository, UserRepository};
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;

mod api_client;
mod bot;
mod config;
mod services;
mod state;

use crate::api_client::ApiClient;
use crate::bot::notify::AdminNotifyListener;
use crate::config::Config;
use crate::services::pay_service::PayService;
use crate::services::payment::{
    cactuspay::CactusPayProvider, qiwi::QiwiProvider, yoomoney::YoomoneyProvider,
};
use crate::services::referral_service::ReferralService;
use crate::services::settings_service::SettingsService;
use crate::services::sync_service::{BackendCreditListener, SyncService};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::load();
    info!("Starting kassa bot...");

    let pool = kassa_db::init_db(&config.database_url).await?;

    let api = ApiClient::new(config.backend_url(), config.backend_secret.clone());
    let referral_service = ReferralService::new(api.clone());
    let sync_service = SyncService::new(api);

    let settings = SettingsService::new(SettingsRepository::new(pool.clone()));
    settings.load().await?;

    let bot = Bot::new(config.bot_token.clone());

    let mut pay_service = PayService::new(
        Arc::new(PgLedger::new(pool.clone())),
        settings.clone(),
        config.refill_limits(),
    )
    .with_listener(Arc::new(BackendCreditListener::new(
        sync_service,
        referral_service.clone(),
        UserRepository::new(pool.clone()),
    )))
    .with_listener(Arc::new(AdminNotifyListener::new(
        bot.clone(),
        config.admin_ids.clone(),
        UserRepository::new(pool.clone()),
    )));

    if let Some(token) = config.cactuspay_token.as_deref() {
        pay_service = pay_service.with_provider(Arc::new(CactusPayProvider::new(
            config.cactuspay_url.clone(),
            token.to_string(),
        )));
    }
    if let Some(secret) = config.qiwi_secret.as_deref() {
        pay_service = pay_service.with_provider(Arc::new(QiwiProvider::new(
            config.qiwi_url.clone(),
            secret.to_string(),
            config.qiwi_bill_lifetime_minutes,
        )));
    }
    if let (Some(token), Some(wallet)) = (
        config.yoomoney_token.as_deref(),
        config.yoomoney_wallet.as_deref(),
    ) {
        pay_service = pay_service.with_provider(Arc::new(YoomoneyProvider::new(
            config.yoomoney_url.clone(),
            token.to_string(),
            wallet.to_string(),
        )));
    }

    let providers: Vec<&str> = pay_service
        .registered_providers()
        .iter()
        .map(|kind| kind.label())
        .collect();
    info!(providers = ?providers, "payment providers registered");

    let state = AppState::new(
        pay_service,
        referral_service,
        settings,
        UserRepository::new(pool),
        config.admin_ids.clone(),
    );

    bot::run_bot(bot, state).await;

    Ok(())
}
