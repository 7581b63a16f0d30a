use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::{Deserialize, Serialize};
use sea_orm::prelude::Decimal;
use std::fmt;
use strum_macros::Display;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ResponseData<T> {
    pub code: Option<u16>,
    #[serde(rename = "statusCode")]
    pub status_code: Option<u16>,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ResponseData<T> {
    pub fn new(code: u16, message: String, data: Option<T>) -> ResponseData<T> {
        ResponseData {
            code: Some(code),
            status_code: None,
            message,
            data,
        }
    }
}

pub const RESPONSE_OK: u16 = 200;
pub const RESPONSE_BAD_REQUEST: u16 = 400;
pub const RESPONSE_INTERNAL_ERROR: u16 = 500;

pub const TRANSACTION_PENDING: &str = "pending";
pub const TRANSACTION_COMPLETED: &str = "completed";
pub const TRANSACTION_FAILED: &str = "failed";

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize, Display)]
#[serde(crate = "rocket::serde")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    #[serde(rename = "wallet")]
    Wallet,
    #[serde(rename = "paypal")]
    Paypal,
    #[serde(rename = "paystack")]
    Paystack,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize, Display)]
#[serde(crate = "rocket::serde")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionPurpose {
    #[serde(rename = "vote")]
    Vote,
    #[serde(rename = "gift")]
    Gift,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct VerifyPaypalRequest {
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
    #[serde(rename = "captureId")]
    pub capture_id: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "guestEmail")]
    pub guest_email: Option<String>,
    #[serde(rename = "candidateId")]
    pub candidate_id: Option<String>,
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
    pub points: Option<i64>,
    pub amount: Option<Decimal>,
    #[serde(rename = "paypalTransactionId")]
    pub paypal_transaction_id: Option<String>,
}

impl VerifyPaypalRequest {
    /// Field-specific validation before any provider or store call.
    pub fn validate(&self) -> Result<(), String> {
        let required: [(&str, bool); 6] = [
            ("orderId", is_present(&self.order_id)),
            ("candidateId", is_present(&self.candidate_id)),
            ("eventId", is_present(&self.event_id)),
            ("points", self.points.map_or(false, |p| p > 0)),
            ("amount", self.amount.map_or(false, |a| a > Decimal::ZERO)),
            (
                "paypalTransactionId",
                is_present(&self.paypal_transaction_id),
            ),
        ];
        for (field, ok) in required {
            if !ok {
                return Err(format!("Missing or invalid required field: {}", field));
            }
        }
        Ok(())
    }
}

fn is_present(value: &Option<String>) -> bool {
    match value {
        Some(v) => !v.trim().is_empty(),
        None => false,
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct PaymentInitRequest {
    pub email: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "candidateId")]
    pub candidate_id: Option<String>,
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
    pub points: Option<i64>,
    pub country: Option<String>,
    pub purpose: Option<TransactionPurpose>,
    #[serde(rename = "paymentMethod")]
    pub payment_method: Option<PaymentMethod>,
    /// PayPal order id created by the browser SDK; the pending transaction
    /// is keyed by it. Paystack references are generated server-side.
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
}

impl PaymentInitRequest {
    pub fn validate(&self) -> Result<(), String> {
        let required: [(&str, bool); 5] = [
            ("email", is_present(&self.email)),
            ("candidateId", is_present(&self.candidate_id)),
            ("eventId", is_present(&self.event_id)),
            ("points", self.points.map_or(false, |p| p > 0)),
            ("paymentMethod", self.payment_method.is_some()),
        ];
        for (field, ok) in required {
            if !ok {
                return Err(format!("Missing or invalid required field: {}", field));
            }
        }
        if PaymentMethod::Wallet.eq(&self.payment_method.unwrap()) {
            return Err("Wallet payments do not create pending transactions".to_owned());
        }
        if PaymentMethod::Paypal.eq(&self.payment_method.unwrap()) && !is_present(&self.order_id) {
            return Err("Missing or invalid required field: orderId".to_owned());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct WalletVoteRequest {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    #[serde(rename = "candidateId")]
    pub candidate_id: Option<String>,
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
    pub points: Option<i64>,
}

impl WalletVoteRequest {
    pub fn validate(&self) -> Result<(), String> {
        let required: [(&str, bool); 4] = [
            ("userId", is_present(&self.user_id)),
            ("candidateId", is_present(&self.candidate_id)),
            ("eventId", is_present(&self.event_id)),
            ("points", self.points.map_or(false, |p| p > 0)),
        ];
        for (field, ok) in required {
            if !ok {
                return Err(format!("Missing or invalid required field: {}", field));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct GuestCaptureRequest {
    #[serde(rename = "captureId")]
    pub capture_id: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "tokenAmount")]
    pub token_amount: Option<i64>,
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct PayerInfo {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct VoteOutcome {
    #[serde(rename = "candidateVotes")]
    pub candidate_votes: i64,
    #[serde(rename = "candidateGifts")]
    pub candidate_gifts: i64,
    #[serde(rename = "candidatePointsScore")]
    pub candidate_points_score: String,
    #[serde(rename = "publisherBalance")]
    pub publisher_balance: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct VerifyPaypalData {
    pub verified: bool,
    pub success: bool,
    #[serde(rename = "captureId")]
    pub capture_id: Option<String>,
    #[serde(rename = "candidateId")]
    pub candidate_id: String,
    pub points: i64,
    #[serde(rename = "amountPaid")]
    pub amount_paid: String,
    #[serde(rename = "voteResult")]
    pub vote_result: Option<VoteOutcome>,
    #[serde(rename = "payerInfo")]
    pub payer_info: Option<PayerInfo>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct VerifyFailureData {
    pub verified: bool,
    pub error: String,
}

impl VerifyFailureData {
    pub fn new(error: String) -> VerifyFailureData {
        VerifyFailureData {
            verified: false,
            error,
        }
    }
}

/// Success and provider-rejection payloads share the endpoints, so the
/// envelope data is an untagged either-or.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(crate = "rocket::serde", untagged)]
pub enum PaypalVerifyOutcome {
    Success(VerifyPaypalData),
    Failure(VerifyFailureData),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(crate = "rocket::serde", untagged)]
pub enum PaystackVerifyOutcome {
    Success(PaystackVerifyData),
    Failure(VerifyFailureData),
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct PaymentInitData {
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
    #[serde(rename = "authorizationUrl")]
    pub authorization_url: Option<String>,
    pub reference: String,
    pub amount: String,
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct PaystackVerifyData {
    pub verified: bool,
    pub success: bool,
    pub reference: String,
    pub purpose: String,
    pub points: i64,
    #[serde(rename = "voteResult")]
    pub vote_result: Option<VoteOutcome>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct WalletApplyData {
    pub points: i64,
    #[serde(rename = "payerBalance")]
    pub payer_balance: String,
    #[serde(rename = "voteResult")]
    pub vote_result: VoteOutcome,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct GuestCaptureData {
    #[serde(rename = "guestToken")]
    pub guest_token: String,
    pub amount: String,
    pub currency: String,
    pub instruction: String,
}

#[derive(Debug)]
pub struct AuthToken<'r>(&'r str);

#[derive(Debug)]
pub enum ApiKeyError {
    Missing,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken<'r> {
    type Error = ApiKeyError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match req.headers().get_one("Authorization") {
            None => Outcome::Error((Status::BadRequest, ApiKeyError::Missing)),
            Some(key) => Outcome::Success(AuthToken(key)),
        }
    }
}

impl<'r> fmt::Display for AuthToken<'r> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let token = self.0.strip_prefix("Bearer ").unwrap_or(self.0);
        write!(f, "{}", token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_request() -> VerifyPaypalRequest {
        VerifyPaypalRequest {
            order_id: Some("ORD-1".to_owned()),
            capture_id: None,
            user_id: None,
            guest_email: Some("fan@example.com".to_owned()),
            candidate_id: Some("cand_1".to_owned()),
            event_id: Some("evt_1".to_owned()),
            points: Some(50),
            amount: Some(Decimal::from(50)),
            paypal_transaction_id: Some("ptx_1".to_owned()),
        }
    }

    #[test]
    fn validate_accepts_complete_request() {
        assert!(full_request().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_order_id() {
        let mut request = full_request();
        request.order_id = None;
        let error = request.validate().unwrap_err();
        assert!(error.contains("orderId"));
    }

    #[test]
    fn validate_rejects_blank_candidate_id() {
        let mut request = full_request();
        request.candidate_id = Some("  ".to_owned());
        let error = request.validate().unwrap_err();
        assert!(error.contains("candidateId"));
    }

    #[test]
    fn validate_rejects_zero_amount() {
        let mut request = full_request();
        request.amount = Some(Decimal::ZERO);
        let error = request.validate().unwrap_err();
        assert!(error.contains("amount"));
    }

    #[test]
    fn validate_rejects_zero_points() {
        let mut request = full_request();
        request.points = Some(0);
        let error = request.validate().unwrap_err();
        assert!(error.contains("points"));
    }

    #[test]
    fn payment_method_display_is_snake_case() {
        assert_eq!(PaymentMethod::Paypal.to_string(), "paypal");
        assert_eq!(PaymentMethod::Wallet.to_string(), "wallet");
        assert_eq!(TransactionPurpose::Gift.to_string(), "gift");
    }
}
