use crate::dto::{
    GuestCaptureData, GuestCaptureRequest, ResponseData, RESPONSE_BAD_REQUEST,
    RESPONSE_INTERNAL_ERROR, RESPONSE_OK,
};
use crate::paypal;
use crate::pool::VotingConfig;
use rand::Rng;
use rocket::{serde::json::Json, State};
use tracing::{info, warn};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Lightweight confirmation for guests who paid before signing up: checks
/// the capture directly and hands back a claim token. Writes nothing to
/// the ledger; the main vote verification stays authoritative.
#[post("/api/paypal/guest", format = "application/json", data = "<request>")]
pub async fn confirm_guest_capture(
    voting_config: &State<VotingConfig>,
    client: &State<reqwest::Client>,
    request: Json<GuestCaptureRequest>,
) -> Json<ResponseData<GuestCaptureData>> {
    info!("confirm_guest_capture started");
    let capture_id = match request.capture_id.as_deref() {
        Some(capture_id) if !capture_id.trim().is_empty() => capture_id.to_owned(),
        _ => {
            let message = "Missing or invalid required field: captureId".to_owned();
            warn!("{}", message);
            return Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None));
        }
    };

    let access_token = match paypal::get_access_token(
        client,
        voting_config.paypal_base_url(),
        &voting_config.paypal_client_id,
        &voting_config.paypal_client_secret,
    )
    .await
    {
        Ok(token) => token,
        Err(auth_error) => {
            warn!("PayPal auth failed: {}", auth_error.message);
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                auth_error.message,
                None,
            ));
        }
    };

    let verification = paypal::verify_capture(
        client,
        voting_config.paypal_base_url(),
        &access_token,
        &capture_id,
    )
    .await;

    if !verification.verified {
        let message = verification
            .error
            .unwrap_or_else(|| "Payment verification failed".to_owned());
        let code = if verification.retryable {
            RESPONSE_INTERNAL_ERROR
        } else {
            RESPONSE_BAD_REQUEST
        };
        return Json(ResponseData::new(code, message, None));
    }

    Json(ResponseData::new(
        RESPONSE_OK,
        "".to_owned(),
        Some(GuestCaptureData {
            guest_token: generate_guest_token(),
            amount: verification.amount.unwrap_or_default(),
            currency: verification.currency.unwrap_or_default(),
            instruction: "Sign up with the email used at checkout to claim your tokens"
                .to_owned(),
        }),
    ))
}

pub fn generate_guest_token() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("guest_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_token_has_epoch_and_nine_char_suffix() {
        let token = generate_guest_token();
        let parts: Vec<&str> = token.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "guest");
        assert!(parts[1].parse::<i64>().unwrap() > 0);
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2]
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }

    #[test]
    fn guest_tokens_are_unique_across_calls() {
        let first = generate_guest_token();
        let second = generate_guest_token();
        assert_ne!(first, second);
    }
}
