use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub http_bind_addr: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub log_level: String,
    pub jwt_secret: String,
    pub admin_api_key: String,
    pub fast2sms_api_url: String,
    pub fast2sms_api_key: String,
    pub fast2sms_sender_id: String,
    pub fast2sms_route: String,
    pub twilio_api_url: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub google_geocode_url: String,
    pub google_maps_api_key: String,
    pub provider_timeout_secs: u64,
    pub geocode_timeout_secs: u64,
    pub otp_ttl_secs: u64,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let http_bind_addr = var_or("HTTP_BIND_ADDR", "0.0.0.0:5500");

        let db_host = var_or("DB_HOST", "localhost");
        let db_port = var_or("DB_PORT", "5432");
        let db_name = var_or("DB_DATABASE", "rakshanet");
        let db_user = var_or("DB_USER", "rakshanet");
        let db_pwd = var_or("DB_PWD", "rakshanet");

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_pwd, db_host, db_port, db_name
        );
        let db_max_connections = parsed_or("DB_MAX_CONNECTIONS", 20);

        let log_level = var_or("LOG_LEVEL", "info");
        let jwt_secret = var_or("JWT_SECRET", "change-me");
        let admin_api_key = env::var("ADMIN_API_KEY").unwrap_or_default();

        let fast2sms_api_url = var_or("FAST2SMS_API_URL", "https://www.fast2sms.com/dev/bulkV2");
        let fast2sms_api_key = env::var("FAST2SMS_API_KEY").unwrap_or_default();
        let fast2sms_sender_id = var_or("FAST2SMS_SENDER_ID", "TXTIND");
        let fast2sms_route = var_or("FAST2SMS_ROUTE", "q");

        let twilio_api_url = var_or("TWILIO_API_URL", "https://api.twilio.com");
        let twilio_account_sid = env::var("TWILIO_ACCOUNT_SID").unwrap_or_default();
        let twilio_auth_token = env::var("TWILIO_AUTH_TOKEN").unwrap_or_default();
        let twilio_phone_number = env::var("TWILIO_PHONE_NUMBER").unwrap_or_default();

        let google_geocode_url = var_or(
            "GOOGLE_GEOCODE_URL",
            "https://maps.googleapis.com/maps/api/geocode/json",
        );
        let google_maps_api_key = env::var("GOOGLE_MAPS_API_KEY").unwrap_or_default();

        let provider_timeout_secs = parsed_or("PROVIDER_TIMEOUT_SECS", 10);
        let geocode_timeout_secs = parsed_or("GEOCODE_TIMEOUT_SECS", 5);
        let otp_ttl_secs = parsed_or("OTP_TTL_SECS", 300);

        Ok(Self {
            http_bind_addr,
            database_url,
            db_max_connections,
            log_level,
            jwt_secret,
            admin_api_key,
            fast2sms_api_url,
            fast2sms_api_key,
            fast2sms_sender_id,
            fast2sms_route,
            twilio_api_url,
            twilio_account_sid,
            twilio_auth_token,
            twilio_phone_number,
            google_geocode_url,
            google_maps_api_key,
            provider_timeout_secs,
            geocode_timeout_secs,
            otp_ttl_secs,
        })
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocode_timeout_secs)
    }

    pub fn otp_ttl(&self) -> Duration {
        Duration::from_secs(self.otp_ttl_secs)
    }
}
