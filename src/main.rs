mod channels;
mod composer;
mod config;
mod db;
mod error;
mod geocode;
mod http;
mod models;
mod otp;
mod processor;

use channels::sms::{Fast2SmsChannel, Fast2SmsConfig};
use channels::voice::{TwilioConfig, TwilioVoiceChannel};
use config::AppConfig;
use db::{PgContactStore, PgEventStore};
use geocode::GoogleGeocoder;
use otp::OtpCache;
use processor::dispatcher::Dispatcher;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const OTP_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting RakshaNet SOS dispatch service...");

    // Init DB
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    info!("Connected to database");

    if config.fast2sms_api_key.is_empty() {
        warn!("FAST2SMS_API_KEY is not set; SMS alerts will be rejected by the provider");
    }
    if config.twilio_account_sid.is_empty() {
        warn!("TWILIO_ACCOUNT_SID is not set; voice alerts will be rejected by the provider");
    }

    let contacts = Arc::new(PgContactStore::new(pool.clone()));
    let events = Arc::new(PgEventStore::new(pool));
    let geocoder = Arc::new(GoogleGeocoder::new(
        &config.google_geocode_url,
        &config.google_maps_api_key,
        config.geocode_timeout(),
    )?);
    let sms = Arc::new(Fast2SmsChannel::new(Fast2SmsConfig {
        api_url: config.fast2sms_api_url.clone(),
        api_key: config.fast2sms_api_key.clone(),
        sender_id: config.fast2sms_sender_id.clone(),
        route: config.fast2sms_route.clone(),
        timeout: config.provider_timeout(),
    })?);
    let voice = Arc::new(TwilioVoiceChannel::new(TwilioConfig {
        api_url: config.twilio_api_url.clone(),
        account_sid: config.twilio_account_sid.clone(),
        auth_token: config.twilio_auth_token.clone(),
        from_number: config.twilio_phone_number.clone(),
        timeout: config.provider_timeout(),
    })?);

    let dispatcher = Arc::new(Dispatcher::new(
        contacts.clone(),
        geocoder,
        sms.clone(),
        voice,
        events.clone(),
    ));

    let otp = Arc::new(OtpCache::new(config.otp_ttl()));
    otp.clone().spawn_sweeper(OTP_SWEEP_INTERVAL);

    let state = http::AppState {
        dispatcher,
        contacts,
        events,
        sms,
        otp,
        jwt_secret: config.jwt_secret.clone(),
        admin_api_key: config.admin_api_key.clone(),
    };

    let listener = tokio::net::TcpListener::bind(&config.http_bind_addr).await?;
    info!("Listening on {}", config.http_bind_addr);

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
