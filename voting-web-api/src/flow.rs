use crate::dto::{PaymentMethod, TransactionPurpose};
use std::fmt;

/// One vote or gift attempt, driven as an explicit state machine. The
/// server endpoints are the only durable transitions; this owns the
/// ephemeral ones and enforces the payment-method rules before any
/// provider or store call happens.
#[derive(Clone, Debug, PartialEq)]
pub enum FlowState {
    Idle,
    SelectingPoints,
    SelectingGift,
    SelectingMethod,
    Confirming,
    Applying,
    Redirecting,
    Returned,
    Verifying,
    Done,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FlowError {
    InvalidTransition { from: String, action: &'static str },
    InvalidPoints(i64),
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            FlowError::InvalidTransition { from, action } => {
                write!(f, "Cannot {} from state {}", action, from)
            }
            FlowError::InvalidPoints(points) => {
                write!(f, "Points must be positive, got {}", points)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct PaymentAttempt {
    state: FlowState,
    purpose: TransactionPurpose,
    authenticated: bool,
    session_email: Option<String>,
    prompted_email: Option<String>,
    points: Option<i64>,
    method: Option<PaymentMethod>,
    pending_transactions_created: u32,
}

impl PaymentAttempt {
    pub fn new(
        purpose: TransactionPurpose,
        authenticated: bool,
        session_email: Option<String>,
    ) -> PaymentAttempt {
        PaymentAttempt {
            state: FlowState::Idle,
            purpose,
            authenticated,
            session_email,
            prompted_email: None,
            points: None,
            method: None,
            pending_transactions_created: 0,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn pending_transactions_created(&self) -> u32 {
        self.pending_transactions_created
    }

    pub fn selected_points(&self) -> Option<i64> {
        self.points
    }

    pub fn start(&mut self) -> Result<(), FlowError> {
        if self.state.ne(&FlowState::Idle) {
            return Err(self.invalid("start"));
        }
        self.state = match self.purpose {
            TransactionPurpose::Vote => FlowState::SelectingPoints,
            TransactionPurpose::Gift => FlowState::SelectingGift,
        };
        Ok(())
    }

    pub fn select_points(&mut self, points: i64) -> Result<(), FlowError> {
        match self.state {
            FlowState::SelectingPoints | FlowState::SelectingGift => {}
            _ => return Err(self.invalid("select points")),
        }
        if points <= 0 {
            return Err(FlowError::InvalidPoints(points));
        }
        self.points = Some(points);
        self.state = FlowState::SelectingMethod;
        Ok(())
    }

    pub fn select_method(&mut self, method: PaymentMethod) -> Result<(), FlowError> {
        if self.state.ne(&FlowState::SelectingMethod) {
            return Err(self.invalid("select payment method"));
        }
        self.method = Some(method);
        self.state = FlowState::Confirming;
        Ok(())
    }

    /// Email collected from an interactive prompt for guests.
    pub fn provide_email(&mut self, email: String) {
        self.prompted_email = Some(email);
    }

    fn resolvable_email(&self) -> Option<&str> {
        self.session_email
            .as_deref()
            .or(self.prompted_email.as_deref())
    }

    /// Leaves `Confirming`. Wallet payments require an authenticated
    /// session and proceed synchronously; external payments require a
    /// resolvable email and create exactly one pending transaction before
    /// the redirect. Both rules fail the attempt before any store write or
    /// provider contact.
    pub fn confirm(&mut self) -> Result<(), FlowError> {
        if self.state.ne(&FlowState::Confirming) {
            return Err(self.invalid("confirm"));
        }
        let method = match self.method {
            Some(method) => method,
            None => return Err(self.invalid("confirm")),
        };

        match method {
            PaymentMethod::Wallet => {
                if !self.authenticated {
                    self.state =
                        FlowState::Failed("Sign in to pay from your wallet".to_owned());
                } else {
                    self.state = FlowState::Applying;
                }
            }
            PaymentMethod::Paypal | PaymentMethod::Paystack => {
                if self.resolvable_email().is_none() {
                    self.state = FlowState::Failed(
                        "An email address is required for card or PayPal payments".to_owned(),
                    );
                } else {
                    self.pending_transactions_created += 1;
                    self.state = FlowState::Redirecting;
                }
            }
        }
        Ok(())
    }

    pub fn finish_apply(&mut self, result: Result<(), String>) -> Result<(), FlowError> {
        if self.state.ne(&FlowState::Applying) {
            return Err(self.invalid("finish apply"));
        }
        self.state = match result {
            Ok(()) => FlowState::Done,
            Err(message) => FlowState::Failed(message),
        };
        Ok(())
    }

    /// The browser came back from the provider's hosted page.
    pub fn returned(&mut self) -> Result<(), FlowError> {
        if self.state.ne(&FlowState::Redirecting) {
            return Err(self.invalid("return from provider"));
        }
        self.state = FlowState::Returned;
        Ok(())
    }

    pub fn begin_verification(&mut self) -> Result<(), FlowError> {
        if self.state.ne(&FlowState::Returned) {
            return Err(self.invalid("begin verification"));
        }
        self.state = FlowState::Verifying;
        Ok(())
    }

    pub fn finish_verification(&mut self, result: Result<(), String>) -> Result<(), FlowError> {
        if self.state.ne(&FlowState::Verifying) {
            return Err(self.invalid("finish verification"));
        }
        self.state = match result {
            Ok(()) => FlowState::Done,
            Err(message) => FlowState::Failed(message),
        };
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> FlowError {
        FlowError::InvalidTransition {
            from: format!("{:?}", self.state),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt_at_confirming(
        method: PaymentMethod,
        authenticated: bool,
        session_email: Option<&str>,
    ) -> PaymentAttempt {
        let mut attempt = PaymentAttempt::new(
            TransactionPurpose::Vote,
            authenticated,
            session_email.map(|e| e.to_owned()),
        );
        attempt.start().unwrap();
        attempt.select_points(50).unwrap();
        attempt.select_method(method).unwrap();
        attempt
    }

    #[test]
    fn wallet_without_session_fails_before_any_write() {
        let mut attempt = attempt_at_confirming(PaymentMethod::Wallet, false, None);
        attempt.confirm().unwrap();
        assert!(matches!(attempt.state(), FlowState::Failed(_)));
        assert_eq!(attempt.pending_transactions_created(), 0);
    }

    #[test]
    fn wallet_with_session_applies_synchronously() {
        let mut attempt = attempt_at_confirming(PaymentMethod::Wallet, true, None);
        attempt.confirm().unwrap();
        assert_eq!(attempt.state(), &FlowState::Applying);
        assert_eq!(attempt.pending_transactions_created(), 0);
        attempt.finish_apply(Ok(())).unwrap();
        assert_eq!(attempt.state(), &FlowState::Done);
    }

    #[test]
    fn external_without_email_aborts_before_provider_contact() {
        let mut attempt = attempt_at_confirming(PaymentMethod::Paystack, false, None);
        attempt.confirm().unwrap();
        assert!(matches!(attempt.state(), FlowState::Failed(_)));
        assert_eq!(attempt.pending_transactions_created(), 0);
    }

    #[test]
    fn guest_with_prompted_email_can_pay_externally() {
        let mut attempt = attempt_at_confirming(PaymentMethod::Paypal, false, None);
        attempt.provide_email("fan@example.com".to_owned());
        attempt.confirm().unwrap();
        assert_eq!(attempt.state(), &FlowState::Redirecting);
        assert_eq!(attempt.selected_points(), Some(50));
        assert_eq!(attempt.pending_transactions_created(), 1);
    }

    #[test]
    fn external_attempt_creates_exactly_one_pending_transaction() {
        let mut attempt = attempt_at_confirming(PaymentMethod::Paypal, true, Some("a@b.com"));
        attempt.confirm().unwrap();
        attempt.returned().unwrap();
        attempt.begin_verification().unwrap();
        attempt.finish_verification(Ok(())).unwrap();
        assert_eq!(attempt.pending_transactions_created(), 1);
        assert_eq!(attempt.state(), &FlowState::Done);
    }

    #[test]
    fn failed_verification_lands_in_failed() {
        let mut attempt = attempt_at_confirming(PaymentMethod::Paystack, true, Some("a@b.com"));
        attempt.confirm().unwrap();
        attempt.returned().unwrap();
        attempt.begin_verification().unwrap();
        attempt
            .finish_verification(Err("Payment status is DECLINED, not COMPLETED".to_owned()))
            .unwrap();
        assert!(matches!(attempt.state(), FlowState::Failed(_)));
    }

    #[test]
    fn gift_purpose_starts_with_gift_selection() {
        let mut attempt = PaymentAttempt::new(TransactionPurpose::Gift, true, None);
        attempt.start().unwrap();
        assert_eq!(attempt.state(), &FlowState::SelectingGift);
    }

    #[test]
    fn confirm_twice_is_an_invalid_transition() {
        let mut attempt = attempt_at_confirming(PaymentMethod::Paypal, true, Some("a@b.com"));
        attempt.confirm().unwrap();
        assert!(attempt.confirm().is_err());
        assert_eq!(attempt.pending_transactions_created(), 1);
    }

    #[test]
    fn zero_points_are_rejected() {
        let mut attempt = PaymentAttempt::new(TransactionPurpose::Vote, true, None);
        attempt.start().unwrap();
        assert!(attempt.select_points(0).is_err());
    }
}
