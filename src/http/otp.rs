use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::auth::AuthUser;
use super::error::ApiError;
use super::AppState;
use crate::models::contact::is_valid_phone;
use crate::models::dispatch::DeliveryOutcome;
use crate::otp::OtpCheck;

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub phone: String,
    pub otp: String,
}

fn otp_message(code: &str, ttl_minutes: u64) -> String {
    format!(
        "Your RakshaNet verification code is {}. It expires in {} minutes.",
        code, ttl_minutes
    )
}

/// `POST /api/otp/send`: texts a one-time code to a contact's phone.
pub async fn send(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SendRequest>,
) -> Result<Json<Value>, ApiError> {
    let phone = request.phone.trim().to_string();
    if !is_valid_phone(&phone) {
        return Err(ApiError::BadRequest("Invalid phone number".to_string()));
    }

    let code = state.otp.issue(&phone);
    let message = otp_message(&code, state.otp.ttl().as_secs().div_ceil(60));
    let outcome = state
        .sms
        .deliver(std::slice::from_ref(&phone), &message)
        .await
        .into_iter()
        .next()
        .unwrap_or(DeliveryOutcome::Skipped);

    match outcome {
        DeliveryOutcome::Delivered { .. } => {
            info!("OTP sent for user {}", user.id);
            Ok(Json(json!({ "success": true, "message": "OTP sent successfully" })))
        }
        DeliveryOutcome::Failed { kind, detail } => {
            state.otp.discard(&phone);
            Err(ApiError::Upstream(format!(
                "Failed to send OTP ({}): {}",
                kind.as_str(),
                detail
            )))
        }
        DeliveryOutcome::Skipped => {
            state.otp.discard(&phone);
            Err(ApiError::Upstream("Failed to send OTP".to_string()))
        }
    }
}

/// `POST /api/otp/verify`: checks the code and marks matching contacts
/// verified.
pub async fn verify(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<Value>, ApiError> {
    let phone = request.phone.trim();
    match state.otp.verify(phone, request.otp.trim()) {
        OtpCheck::Verified => {
            let verified = state.contacts.mark_verified(user.id, phone).await?;
            info!("User {} verified {} contact(s)", user.id, verified);
            Ok(Json(json!({
                "success": true,
                "message": "OTP verified successfully",
                "contactsVerified": verified
            })))
        }
        OtpCheck::Mismatch => Err(ApiError::BadRequest("Invalid OTP".to_string())),
        OtpCheck::Expired => Err(ApiError::BadRequest("OTP expired".to_string())),
        OtpCheck::NotFound => Err(ApiError::BadRequest("OTP not found or expired".to_string())),
        OtpCheck::Exhausted => Err(ApiError::BadRequest(
            "Too many incorrect attempts, request a new OTP".to_string(),
        )),
    }
}
