use rocket::serde::{Deserialize, Serialize};
use tracing::warn;

const PAYSTACK_BASE_URL: &str = "https://api.paystack.co";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct InitializeRequest {
    pub email: String,
    /// Minor units of the charge currency.
    pub amount: i64,
    pub currency: String,
    pub reference: String,
    pub callback_url: String,
    pub metadata: InitializeMetadata,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct InitializeMetadata {
    pub candidate_id: String,
    pub event_id: String,
    pub points: i64,
    pub purpose: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct InitializeResponse {
    pub status: bool,
    pub message: Option<String>,
    pub data: Option<InitializeData>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct InitializeData {
    pub authorization_url: String,
    pub access_code: Option<String>,
    pub reference: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct VerifyResponse {
    pub status: bool,
    pub message: Option<String>,
    pub data: Option<VerifyData>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct VerifyData {
    pub status: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub customer: Option<Customer>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct Customer {
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChargeVerification {
    pub verified: bool,
    pub status: Option<String>,
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
    pub customer_email: Option<String>,
    pub error: Option<String>,
    pub retryable: bool,
}

impl ChargeVerification {
    fn failed(status: Option<String>, error: String) -> ChargeVerification {
        ChargeVerification {
            verified: false,
            status,
            amount_minor: None,
            currency: None,
            customer_email: None,
            error: Some(error),
            retryable: false,
        }
    }
}

pub async fn initialize_transaction(
    client: &reqwest::Client,
    secret_key: &str,
    request: &InitializeRequest,
) -> Result<String, String> {
    let url = PAYSTACK_BASE_URL.to_owned() + "/transaction/initialize";
    let result = client
        .post(url)
        .bearer_auth(secret_key)
        .json(request)
        .send()
        .await;

    let response = match result {
        Ok(response) => response,
        Err(error) => {
            warn!("Paystack initialize call failed: {}", error);
            return Err(format!("Paystack initialize call failed: {}", error));
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!("Paystack initialize returned {}: {}", status, body);
        return Err(format!("Paystack initialize returned {}", status));
    }

    match response.json::<InitializeResponse>().await {
        Ok(parsed) => {
            if !parsed.status {
                let message = parsed.message.unwrap_or_else(|| "unknown error".to_owned());
                warn!("Paystack initialize rejected: {}", message);
                return Err(format!("Paystack initialize rejected: {}", message));
            }
            match parsed.data {
                Some(data) => Ok(data.authorization_url),
                None => Err("Paystack initialize response carries no data".to_owned()),
            }
        }
        Err(error) => {
            warn!("Error parsing Paystack initialize response: {}", error);
            Err(format!(
                "Error parsing Paystack initialize response: {}",
                error
            ))
        }
    }
}

pub async fn verify_transaction(
    client: &reqwest::Client,
    secret_key: &str,
    reference: &str,
) -> ChargeVerification {
    let url = format!("{}/transaction/verify/{}", PAYSTACK_BASE_URL, reference);
    let result = client.get(url).bearer_auth(secret_key).send().await;

    let response = match result {
        Ok(response) => response,
        Err(error) => {
            warn!("Paystack verify call failed: {}", error);
            let mut verification = ChargeVerification::failed(
                None,
                format!("Paystack verify call failed: {}", error),
            );
            verification.retryable = error.is_timeout();
            if verification.retryable {
                verification.error =
                    Some("Payment verification could not be confirmed, retry later".to_owned());
            }
            return verification;
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        warn!("Paystack verify returned {}", status);
        return ChargeVerification::failed(None, format!("Paystack verify returned {}", status));
    }

    let parsed = match response.json::<VerifyResponse>().await {
        Ok(parsed) => parsed,
        Err(error) => {
            warn!("Error parsing Paystack verify response: {}", error);
            return ChargeVerification::failed(
                None,
                format!("Error parsing Paystack verify response: {}", error),
            );
        }
    };

    evaluate_verification(parsed)
}

/// Success requires both the envelope flag and a "success" charge status.
pub fn evaluate_verification(response: VerifyResponse) -> ChargeVerification {
    if !response.status {
        let message = response
            .message
            .unwrap_or_else(|| "unknown error".to_owned());
        return ChargeVerification::failed(None, format!("Paystack rejected: {}", message));
    }

    let data = match response.data {
        Some(data) => data,
        None => {
            return ChargeVerification::failed(
                None,
                "Paystack verify response carries no data".to_owned(),
            );
        }
    };

    let charge_status = data.status.to_owned().unwrap_or_default();
    if charge_status.ne("success") {
        return ChargeVerification::failed(
            Some(charge_status.to_owned()),
            format!("Payment status is {}, not success", charge_status),
        );
    }

    ChargeVerification {
        verified: true,
        status: Some(charge_status),
        amount_minor: data.amount,
        currency: data.currency,
        customer_email: data.customer.and_then(|customer| customer.email),
        error: None,
        retryable: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success_response() -> VerifyResponse {
        serde_json::from_str(
            r#"{
                "status": true,
                "message": "Verification successful",
                "data": {
                    "status": "success",
                    "amount": 7500000,
                    "currency": "NGN",
                    "customer": { "email": "fan@example.com" }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn successful_charge_verifies() {
        let verification = evaluate_verification(success_response());
        assert!(verification.verified);
        assert_eq!(verification.amount_minor, Some(7_500_000));
        assert_eq!(verification.currency.as_deref(), Some("NGN"));
        assert_eq!(
            verification.customer_email.as_deref(),
            Some("fan@example.com")
        );
    }

    #[test]
    fn abandoned_charge_is_rejected() {
        let mut response = success_response();
        if let Some(data) = response.data.as_mut() {
            data.status = Some("abandoned".to_owned());
        }
        let verification = evaluate_verification(response);
        assert!(!verification.verified);
        assert!(verification.error.unwrap().contains("abandoned"));
    }

    #[test]
    fn false_envelope_status_is_rejected() {
        let mut response = success_response();
        response.status = false;
        let verification = evaluate_verification(response);
        assert!(!verification.verified);
    }
}
