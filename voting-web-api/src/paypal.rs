use rocket::serde::Deserialize;
use tracing::warn;

pub const STATUS_COMPLETED: &str = "COMPLETED";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct OrderResponse {
    pub id: Option<String>,
    pub status: Option<String>,
    pub payer: Option<Payer>,
    pub purchase_units: Option<Vec<PurchaseUnit>>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct Payer {
    pub email_address: Option<String>,
    pub name: Option<PayerName>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct PayerName {
    pub given_name: Option<String>,
    pub surname: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct PurchaseUnit {
    pub payments: Option<Payments>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct Payments {
    pub captures: Option<Vec<Capture>>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct Capture {
    pub id: Option<String>,
    pub status: Option<String>,
    pub amount: Option<Amount>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct Amount {
    pub value: Option<String>,
    pub currency_code: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProviderAuthError {
    pub message: String,
    pub retryable: bool,
}

/// Outcome of a provider-side check. `verified == false` is an expected
/// result the caller must branch on, not an error to propagate.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderVerification {
    pub verified: bool,
    pub status: Option<String>,
    pub capture_id: Option<String>,
    pub payer_email: Option<String>,
    pub payer_name: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub error: Option<String>,
    pub retryable: bool,
}

impl OrderVerification {
    fn failed(status: Option<String>, error: String) -> OrderVerification {
        OrderVerification {
            verified: false,
            status,
            capture_id: None,
            payer_email: None,
            payer_name: None,
            amount: None,
            currency: None,
            error: Some(error),
            retryable: false,
        }
    }

    fn unknown(error: String) -> OrderVerification {
        let mut verification = OrderVerification::failed(None, error);
        verification.retryable = true;
        verification
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaptureVerification {
    pub verified: bool,
    pub status: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub error: Option<String>,
    pub retryable: bool,
}

pub async fn get_access_token(
    client: &reqwest::Client,
    base_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<String, ProviderAuthError> {
    let url = base_url.to_owned() + "/v1/oauth2/token";
    let result = client
        .post(url)
        .basic_auth(client_id, Some(client_secret))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await;

    let response = match result {
        Ok(response) => response,
        Err(error) => {
            warn!("PayPal token request failed: {}", error);
            return Err(ProviderAuthError {
                message: format!("PayPal token request failed: {}", error),
                retryable: error.is_timeout(),
            });
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!("PayPal rejected credentials: {} {}", status, body);
        return Err(ProviderAuthError {
            message: format!("PayPal rejected credentials: {}", status),
            retryable: false,
        });
    }

    match response.json::<AccessTokenResponse>().await {
        Ok(token) => Ok(token.access_token),
        Err(error) => {
            warn!("Error parsing PayPal token response: {}", error);
            Err(ProviderAuthError {
                message: format!("Error parsing PayPal token response: {}", error),
                retryable: false,
            })
        }
    }
}

/// Captures the order and checks its resulting status. Pure read as far as
/// the ledger is concerned; callers apply effects separately.
pub async fn verify_order(
    client: &reqwest::Client,
    base_url: &str,
    access_token: &str,
    order_id: &str,
    expected_capture_id: Option<&str>,
    strict_capture_match: bool,
) -> OrderVerification {
    let url = format!("{}/v2/checkout/orders/{}/capture", base_url, order_id);
    let result = client
        .post(url)
        .bearer_auth(access_token)
        .json(&serde_json::json!({}))
        .send()
        .await;

    let response = match result {
        Ok(response) => response,
        Err(error) => {
            warn!("PayPal order capture call failed: {}", error);
            if error.is_timeout() {
                return OrderVerification::unknown(
                    "Payment verification could not be confirmed, retry later".to_owned(),
                );
            }
            return OrderVerification::failed(
                None,
                format!("PayPal order capture call failed: {}", error),
            );
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!("PayPal order capture returned {}: {}", status, body);
        return OrderVerification::failed(
            None,
            format!("PayPal order capture returned {}", status),
        );
    }

    let order = match response.json::<OrderResponse>().await {
        Ok(order) => order,
        Err(error) => {
            warn!("Error parsing PayPal order response: {}", error);
            return OrderVerification::failed(
                None,
                format!("Error parsing PayPal order response: {}", error),
            );
        }
    };

    evaluate_order(order, expected_capture_id, strict_capture_match)
}

/// Decides verification from a parsed order. Only COMPLETED passes; a
/// caller-supplied capture id that differs from the actual one is logged
/// and rejected only under strict matching, since the order-level status
/// is authoritative.
pub fn evaluate_order(
    order: OrderResponse,
    expected_capture_id: Option<&str>,
    strict_capture_match: bool,
) -> OrderVerification {
    let status = match &order.status {
        Some(status) => status.to_owned(),
        None => {
            return OrderVerification::failed(
                None,
                "PayPal order response carries no status".to_owned(),
            );
        }
    };

    if status.ne(STATUS_COMPLETED) {
        return OrderVerification::failed(
            Some(status.to_owned()),
            format!("Payment status is {}, not COMPLETED", status),
        );
    }

    let capture_id = order
        .purchase_units
        .as_ref()
        .and_then(|units| units.first())
        .and_then(|unit| unit.payments.as_ref())
        .and_then(|payments| payments.captures.as_ref())
        .and_then(|captures| captures.first())
        .and_then(|capture| capture.id.to_owned());

    if let (Some(expected), Some(actual)) = (expected_capture_id, &capture_id) {
        if expected.ne(actual.as_str()) {
            warn!(
                "Capture id mismatch: caller sent {}, provider returned {}",
                expected, actual
            );
            if strict_capture_match {
                return OrderVerification::failed(
                    Some(status),
                    format!(
                        "Capture id mismatch: expected {}, provider returned {}",
                        expected, actual
                    ),
                );
            }
        }
    }

    let (amount, currency) = order
        .purchase_units
        .as_ref()
        .and_then(|units| units.first())
        .and_then(|unit| unit.payments.as_ref())
        .and_then(|payments| payments.captures.as_ref())
        .and_then(|captures| captures.first())
        .and_then(|capture| capture.amount.as_ref())
        .map(|amount| (amount.value.to_owned(), amount.currency_code.to_owned()))
        .unwrap_or((None, None));

    let payer_email = order
        .payer
        .as_ref()
        .and_then(|payer| payer.email_address.to_owned());
    let payer_name = order.payer.as_ref().and_then(|payer| {
        payer.name.as_ref().map(|name| {
            let given = name.given_name.to_owned().unwrap_or_default();
            let surname = name.surname.to_owned().unwrap_or_default();
            format!("{} {}", given, surname).trim().to_owned()
        })
    });

    OrderVerification {
        verified: true,
        status: Some(status),
        capture_id,
        payer_email,
        payer_name,
        amount,
        currency,
        error: None,
        retryable: false,
    }
}

/// Direct capture lookup used by the non-authoritative guest path.
pub async fn verify_capture(
    client: &reqwest::Client,
    base_url: &str,
    access_token: &str,
    capture_id: &str,
) -> CaptureVerification {
    let url = format!("{}/v2/payments/captures/{}", base_url, capture_id);
    let result = client.get(url).bearer_auth(access_token).send().await;

    let response = match result {
        Ok(response) => response,
        Err(error) => {
            warn!("PayPal capture lookup failed: {}", error);
            return CaptureVerification {
                verified: false,
                status: None,
                amount: None,
                currency: None,
                error: Some(format!("PayPal capture lookup failed: {}", error)),
                retryable: error.is_timeout(),
            };
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        warn!("PayPal capture lookup returned {}", status);
        return CaptureVerification {
            verified: false,
            status: None,
            amount: None,
            currency: None,
            error: Some(format!("PayPal capture lookup returned {}", status)),
            retryable: false,
        };
    }

    let capture = match response.json::<Capture>().await {
        Ok(capture) => capture,
        Err(error) => {
            warn!("Error parsing PayPal capture response: {}", error);
            return CaptureVerification {
                verified: false,
                status: None,
                amount: None,
                currency: None,
                error: Some(format!("Error parsing PayPal capture response: {}", error)),
                retryable: false,
            };
        }
    };

    let status = capture.status.to_owned();
    let (amount, currency) = capture
        .amount
        .map(|amount| (amount.value, amount.currency_code))
        .unwrap_or((None, None));

    match status.as_deref() {
        Some(STATUS_COMPLETED) => CaptureVerification {
            verified: true,
            status,
            amount,
            currency,
            error: None,
            retryable: false,
        },
        Some(other) => CaptureVerification {
            verified: false,
            status: Some(other.to_owned()),
            amount,
            currency,
            error: Some(format!("Payment status is {}, not COMPLETED", other)),
            retryable: false,
        },
        None => CaptureVerification {
            verified: false,
            status: None,
            amount,
            currency,
            error: Some("PayPal capture response carries no status".to_owned()),
            retryable: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed_order() -> OrderResponse {
        serde_json::from_str(
            r#"{
                "id": "ORD-1",
                "status": "COMPLETED",
                "payer": {
                    "email_address": "fan@example.com",
                    "name": { "given_name": "Ada", "surname": "Obi" }
                },
                "purchase_units": [{
                    "payments": {
                        "captures": [{
                            "id": "cap_1",
                            "status": "COMPLETED",
                            "amount": { "value": "50.00", "currency_code": "USD" }
                        }]
                    }
                }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn completed_order_verifies_with_capture_id() {
        let verification = evaluate_order(completed_order(), None, false);
        assert!(verification.verified);
        assert_eq!(verification.capture_id.as_deref(), Some("cap_1"));
        assert_eq!(verification.payer_email.as_deref(), Some("fan@example.com"));
        assert_eq!(verification.payer_name.as_deref(), Some("Ada Obi"));
        assert_eq!(verification.amount.as_deref(), Some("50.00"));
        assert_eq!(verification.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn declined_order_reports_status_in_error() {
        let mut order = completed_order();
        order.status = Some("DECLINED".to_owned());
        let verification = evaluate_order(order, None, false);
        assert!(!verification.verified);
        assert_eq!(
            verification.error.as_deref(),
            Some("Payment status is DECLINED, not COMPLETED")
        );
    }

    #[test]
    fn capture_mismatch_is_lenient_by_default() {
        let verification = evaluate_order(completed_order(), Some("cap_other"), false);
        assert!(verification.verified);
        assert_eq!(verification.capture_id.as_deref(), Some("cap_1"));
    }

    #[test]
    fn capture_mismatch_rejected_under_strict_matching() {
        let verification = evaluate_order(completed_order(), Some("cap_other"), true);
        assert!(!verification.verified);
        assert!(verification.error.unwrap().contains("mismatch"));
    }

    #[test]
    fn missing_status_is_rejected() {
        let mut order = completed_order();
        order.status = None;
        let verification = evaluate_order(order, None, false);
        assert!(!verification.verified);
    }
}
