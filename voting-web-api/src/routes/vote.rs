use crate::dto::{
    PaymentInitData, PaymentInitRequest, PaymentMethod, PayerInfo, PaypalVerifyOutcome,
    PaystackVerifyData, PaystackVerifyOutcome, ResponseData, TransactionPurpose,
    VerifyFailureData, VerifyPaypalData, VerifyPaypalRequest, VoteOutcome, WalletApplyData,
    WalletVoteRequest, AuthToken, RESPONSE_BAD_REQUEST, RESPONSE_INTERNAL_ERROR, RESPONSE_OK,
    TRANSACTION_COMPLETED, TRANSACTION_FAILED, TRANSACTION_PENDING,
};
use crate::flow::{FlowState, PaymentAttempt};
use crate::ledger::{self, CompleteOutcome, LedgerError};
use crate::pool::{Db, VotingConfig};
use crate::pricing;
use crate::{paypal, paystack};
use chrono::Utc;
use rocket::{serde::json::Json, State};
use sea_orm::{ActiveValue, DatabaseConnection, EntityTrait};
use sea_orm_rocket::Connection;
use tracing::{error, info, warn};
use uuid::Uuid;
use voting_db_entity::db::candidate::Entity as Candidate;
use voting_db_entity::db::event::Entity as Event;
use voting_db_entity::db::pending_transaction::{
    ActiveModel as PendingActiveModel, Entity as PendingTransaction, Model as PendingModel,
};

#[post("/api/vote/payment", format = "application/json", data = "<request>")]
pub async fn initiate_payment(
    conn: Connection<'_, Db>,
    voting_config: &State<VotingConfig>,
    client: &State<reqwest::Client>,
    request: Json<PaymentInitRequest>,
) -> Json<ResponseData<PaymentInitData>> {
    info!("initiate_payment started");
    if let Err(message) = request.validate() {
        warn!("{}", message);
        return Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None));
    }

    let db = conn.into_inner();
    let method = request.payment_method.unwrap();
    let purpose = request.purpose.unwrap_or(TransactionPurpose::Vote);
    let candidate_id = request.candidate_id.to_owned().unwrap();
    let event_id = request.event_id.to_owned().unwrap();
    let email = request.email.to_owned().unwrap();
    let points = request.points.unwrap();

    let event = match Event::find_by_id(event_id.to_owned()).one(db).await {
        Ok(Some(event)) => event,
        Ok(None) => {
            let message = format!("No event found for '{}'", event_id);
            warn!("{}", message);
            return Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None));
        }
        Err(error) => {
            warn!("Error fetching event: {}", error);
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Internal server error".to_owned(),
                None,
            ));
        }
    };

    match Candidate::find_by_id(candidate_id.to_owned()).one(db).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            let message = format!("No candidate found for '{}'", candidate_id);
            warn!("{}", message);
            return Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None));
        }
        Err(error) => {
            warn!("Error fetching candidate: {}", error);
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Internal server error".to_owned(),
                None,
            ));
        }
    }

    // Drive the attempt through the flow machine so the method rules run
    // before anything durable happens.
    let mut attempt = PaymentAttempt::new(
        purpose,
        request.user_id.is_some(),
        Some(email.to_owned()),
    );
    if let Err(flow_error) = confirm_attempt(&mut attempt, points, method) {
        warn!("{}", flow_error);
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            flow_error.to_string(),
            None,
        ));
    }
    match attempt.state() {
        FlowState::Redirecting => {}
        FlowState::Failed(message) => {
            warn!("{}", message);
            return Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                message.to_owned(),
                None,
            ));
        }
        state => {
            warn!("Unexpected flow state {:?} at initiation", state);
            return Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                "Payment attempt cannot be initiated".to_owned(),
                None,
            ));
        }
    }

    let reference = match method {
        PaymentMethod::Paypal => request.order_id.to_owned().unwrap(),
        _ => Uuid::new_v4().to_string(),
    };
    let price = pricing::quote(points, method, request.country.as_deref());

    // One pending row per external payment reference; the unique index on
    // provider_reference backstops a racing duplicate.
    match ledger::reference_in_use(db, &reference).await {
        Ok(false) => {}
        Ok(true) => {
            let message = format!(
                "A payment attempt already exists for reference '{}'",
                reference
            );
            warn!("{}", message);
            return Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None));
        }
        Err(ledger_error) => {
            warn!("Error checking provider reference: {}", ledger_error);
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Internal server error".to_owned(),
                None,
            ));
        }
    }

    // The pending row goes in before any provider contact so an abandoned
    // payment stays auditable as pending -> failed.
    let pending_id = Uuid::new_v4().to_string();
    let pending = PendingActiveModel {
        id: ActiveValue::Set(pending_id.to_owned()),
        payer_user_id: ActiveValue::Set(request.user_id.to_owned()),
        guest_email: ActiveValue::Set(Some(email.to_owned())),
        event_id: ActiveValue::Set(event_id.to_owned()),
        candidate_id: ActiveValue::Set(candidate_id.to_owned()),
        publisher_id: ActiveValue::Set(event.publisher_id),
        amount: ActiveValue::Set(price.amount),
        currency: ActiveValue::Set(price.currency.to_owned()),
        points: ActiveValue::Set(points),
        payment_method: ActiveValue::Set(method.to_string()),
        provider_reference: ActiveValue::Set(reference.to_owned()),
        capture_id: ActiveValue::Set(None),
        purpose: ActiveValue::Set(purpose.to_string()),
        status: ActiveValue::Set(TRANSACTION_PENDING.to_owned()),
        description: ActiveValue::Set(format!(
            "{} of {} points for candidate {}",
            purpose, points, candidate_id
        )),
        error_message: ActiveValue::Set(None),
        created_timestamp: ActiveValue::Set(Utc::now().timestamp()),
        verified_timestamp: ActiveValue::Set(None),
    };
    if let Err(error) = PendingTransaction::insert(pending).exec(db).await {
        warn!("Could not insert pending transaction: {}", error);
        return Json(ResponseData::new(
            RESPONSE_INTERNAL_ERROR,
            "Could not record the payment attempt".to_owned(),
            None,
        ));
    }

    let authorization_url = match method {
        PaymentMethod::Paystack => {
            let init_request = paystack::InitializeRequest {
                email,
                amount: pricing::to_minor_units(price.amount),
                currency: price.currency.to_owned(),
                reference: reference.to_owned(),
                callback_url: voting_config.paystack_callback_url.to_owned(),
                metadata: paystack::InitializeMetadata {
                    candidate_id,
                    event_id,
                    points,
                    purpose: purpose.to_string(),
                },
            };
            match paystack::initialize_transaction(
                client,
                &voting_config.paystack_secret_key,
                &init_request,
            )
            .await
            {
                Ok(url) => Some(url),
                Err(message) => {
                    if let Err(error) = ledger::fail_pending(db, &pending_id, &message).await {
                        warn!("Could not record initialize failure: {}", error);
                    }
                    return Json(ResponseData::new(RESPONSE_INTERNAL_ERROR, message, None));
                }
            }
        }
        _ => None,
    };

    Json(ResponseData::new(
        RESPONSE_OK,
        "".to_owned(),
        Some(PaymentInitData {
            transaction_id: pending_id,
            authorization_url,
            reference,
            amount: price.amount.to_string(),
            currency: price.currency,
        }),
    ))
}

#[post(
    "/api/vote/verify-paypal",
    format = "application/json",
    data = "<request>"
)]
pub async fn verify_paypal(
    conn: Connection<'_, Db>,
    voting_config: &State<VotingConfig>,
    client: &State<reqwest::Client>,
    request: Json<VerifyPaypalRequest>,
) -> Json<ResponseData<PaypalVerifyOutcome>> {
    info!("verify_paypal started");
    if let Err(message) = request.validate() {
        warn!("{}", message);
        return Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None));
    }

    let db = conn.into_inner();
    let order_id = request.order_id.to_owned().unwrap();
    let pending_id = request.paypal_transaction_id.to_owned().unwrap();

    let pending = match PendingTransaction::find_by_id(pending_id.to_owned())
        .one(db)
        .await
    {
        Ok(Some(pending)) => pending,
        Ok(None) => {
            let message = format!("No pending transaction found for '{}'", pending_id);
            warn!("{}", message);
            return Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None));
        }
        Err(error) => {
            warn!("Error fetching pending transaction: {}", error);
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Internal server error".to_owned(),
                None,
            ));
        }
    };

    // Repeat invocation for an already-verified payment returns the
    // recorded outcome without touching the ledger again.
    if pending.status.eq(TRANSACTION_COMPLETED) {
        return Json(ResponseData::new(
            RESPONSE_OK,
            "Transaction already verified".to_owned(),
            Some(PaypalVerifyOutcome::Success(recorded_paypal_data(&pending))),
        ));
    }
    if pending.status.eq(TRANSACTION_FAILED) {
        let message = pending
            .error_message
            .unwrap_or_else(|| "Transaction already failed".to_owned());
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            "Transaction already failed".to_owned(),
            Some(PaypalVerifyOutcome::Failure(VerifyFailureData::new(message))),
        ));
    }

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
            // Operational fault, not a payment outcome: the pending row is
            // left untouched so the client can retry.
            error!("PayPal auth failed: {}", auth_error.message);
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                auth_error.message,
                None,
            ));
        }
    };

    let verification = paypal::verify_order(
        client,
        voting_config.paypal_base_url(),
        &access_token,
        &order_id,
        request.capture_id.as_deref(),
        voting_config.strict_capture_match,
    )
    .await;

    if !verification.verified {
        let message = verification
            .error
            .unwrap_or_else(|| "Payment verification failed".to_owned());
        if verification.retryable {
            return Json(ResponseData::new(RESPONSE_INTERNAL_ERROR, message, None));
        }
        if let Err(ledger_error) = ledger::fail_pending(db, &pending_id, &message).await {
            warn!("Could not record verification failure: {}", ledger_error);
        }
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            message.to_owned(),
            Some(PaypalVerifyOutcome::Failure(VerifyFailureData::new(message))),
        ));
    }

    let gate = match ledger::complete_pending(db, &pending_id, verification.capture_id.as_deref())
        .await
    {
        Ok(gate) => gate,
        Err(ledger_error) => {
            error!("Completion gate failed: {}", ledger_error);
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Internal server error".to_owned(),
                None,
            ));
        }
    };

    let completed = match gate {
        CompleteOutcome::Completed(row) => row,
        CompleteOutcome::AlreadyCompleted(row) => {
            return Json(ResponseData::new(
                RESPONSE_OK,
                "Transaction already verified".to_owned(),
                Some(PaypalVerifyOutcome::Success(recorded_paypal_data(&row))),
            ));
        }
        CompleteOutcome::NotPending(row) => {
            let message = row
                .error_message
                .unwrap_or_else(|| "Transaction already failed".to_owned());
            return Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                "Transaction already failed".to_owned(),
                Some(PaypalVerifyOutcome::Failure(VerifyFailureData::new(message))),
            ));
        }
    };

    let applied = match ledger::apply_external_effects(db, &completed).await {
        Ok(applied) => applied,
        Err(ledger_error) => {
            // The pending row already shows completed; this is a
            // data-repair task, not a rollback.
            error!(
                "Ledger update failed after completing {}: {}",
                pending_id, ledger_error
            );
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Internal server error".to_owned(),
                None,
            ));
        }
    };

    let payer_info = PayerInfo {
        email: verification.payer_email,
        name: verification.payer_name,
    };
    let data = VerifyPaypalData {
        verified: true,
        success: true,
        capture_id: verification.capture_id,
        candidate_id: completed.candidate_id,
        points: completed.points,
        amount_paid: completed.amount.to_string(),
        vote_result: Some(VoteOutcome {
            candidate_votes: applied.candidate_votes,
            candidate_gifts: applied.candidate_gifts,
            candidate_points_score: applied.candidate_points_score.to_string(),
            publisher_balance: applied.publisher_balance.to_string(),
        }),
        payer_info: Some(payer_info),
    };
    Json(ResponseData::new(
        RESPONSE_OK,
        "".to_owned(),
        Some(PaypalVerifyOutcome::Success(data)),
    ))
}

fn confirm_attempt(
    attempt: &mut PaymentAttempt,
    points: i64,
    method: PaymentMethod,
) -> Result<(), crate::flow::FlowError> {
    attempt.start()?;
    attempt.select_points(points)?;
    attempt.select_method(method)?;
    attempt.confirm()
}

fn recorded_paypal_data(pending: &PendingModel) -> VerifyPaypalData {
    VerifyPaypalData {
        verified: true,
        success: true,
        capture_id: pending.capture_id.to_owned(),
        candidate_id: pending.candidate_id.to_owned(),
        points: pending.points,
        amount_paid: pending.amount.to_string(),
        vote_result: None,
        payer_info: None,
    }
}

#[get("/api/vote/verify-paystack?<reference>", format = "application/json")]
pub async fn verify_paystack(
    conn: Connection<'_, Db>,
    voting_config: &State<VotingConfig>,
    client: &State<reqwest::Client>,
    reference: String,
) -> Json<ResponseData<PaystackVerifyOutcome>> {
    info!("verify_paystack started");
    if reference.trim().is_empty() {
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            "Missing or invalid required field: reference".to_owned(),
            None,
        ));
    }

    let db = conn.into_inner();
    let pending =
        match ledger::find_pending_by_reference(db, &reference, PaymentMethod::Paystack).await {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                let message = format!("No pending transaction found for '{}'", reference);
                warn!("{}", message);
                return Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None));
            }
            Err(ledger_error) => {
                warn!("Error fetching pending transaction: {}", ledger_error);
                return Json(ResponseData::new(
                    RESPONSE_INTERNAL_ERROR,
                    "Internal server error".to_owned(),
                    None,
                ));
            }
        };

    if pending.status.eq(TRANSACTION_COMPLETED) {
        return Json(ResponseData::new(
            RESPONSE_OK,
            "Transaction already verified".to_owned(),
            Some(PaystackVerifyOutcome::Success(recorded_paystack_data(
                &pending,
            ))),
        ));
    }
    if pending.status.eq(TRANSACTION_FAILED) {
        let message = pending
            .error_message
            .to_owned()
            .unwrap_or_else(|| "Transaction already failed".to_owned());
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            "Transaction already failed".to_owned(),
            Some(PaystackVerifyOutcome::Failure(VerifyFailureData::new(
                message,
            ))),
        ));
    }

    let verification =
        paystack::verify_transaction(client, &voting_config.paystack_secret_key, &reference).await;

    if !verification.verified {
        let message = verification
            .error
            .unwrap_or_else(|| "Payment verification failed".to_owned());
        if verification.retryable {
            return Json(ResponseData::new(RESPONSE_INTERNAL_ERROR, message, None));
        }
        if let Err(ledger_error) = ledger::fail_pending(db, &pending.id, &message).await {
            warn!("Could not record verification failure: {}", ledger_error);
        }
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            message.to_owned(),
            Some(PaystackVerifyOutcome::Failure(VerifyFailureData::new(
                message,
            ))),
        ));
    }

    let expected_minor = pricing::to_minor_units(pending.amount);
    let paid_minor = verification.amount_minor.unwrap_or(0);
    if paid_minor < expected_minor {
        let message = format!(
            "Amount paid ({}) is less than the expected amount ({})",
            paid_minor, expected_minor
        );
        warn!("{}", message);
        if let Err(ledger_error) = ledger::fail_pending(db, &pending.id, &message).await {
            warn!("Could not record verification failure: {}", ledger_error);
        }
        return Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            message.to_owned(),
            Some(PaystackVerifyOutcome::Failure(VerifyFailureData::new(
                message,
            ))),
        ));
    }
    if let Some(currency) = verification.currency.as_deref() {
        if currency.ne(pending.currency.as_str()) {
            warn!(
                "Currency mismatch for {}: expected {}, provider reported {}",
                reference, pending.currency, currency
            );
        }
    }

    let gate = match ledger::complete_pending(db, &pending.id, None).await {
        Ok(gate) => gate,
        Err(ledger_error) => {
            error!("Completion gate failed: {}", ledger_error);
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Internal server error".to_owned(),
                None,
            ));
        }
    };

    let completed = match gate {
        CompleteOutcome::Completed(row) => row,
        CompleteOutcome::AlreadyCompleted(row) => {
            return Json(ResponseData::new(
                RESPONSE_OK,
                "Transaction already verified".to_owned(),
                Some(PaystackVerifyOutcome::Success(recorded_paystack_data(&row))),
            ));
        }
        CompleteOutcome::NotPending(row) => {
            let message = row
                .error_message
                .unwrap_or_else(|| "Transaction already failed".to_owned());
            return Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                "Transaction already failed".to_owned(),
                Some(PaystackVerifyOutcome::Failure(VerifyFailureData::new(
                    message,
                ))),
            ));
        }
    };

    let applied = match ledger::apply_external_effects(db, &completed).await {
        Ok(applied) => applied,
        Err(ledger_error) => {
            error!(
                "Ledger update failed after completing {}: {}",
                completed.id, ledger_error
            );
            return Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Internal server error".to_owned(),
                None,
            ));
        }
    };

    Json(ResponseData::new(
        RESPONSE_OK,
        "".to_owned(),
        Some(PaystackVerifyOutcome::Success(PaystackVerifyData {
            verified: true,
            success: true,
            reference,
            purpose: completed.purpose,
            points: completed.points,
            vote_result: Some(VoteOutcome {
                candidate_votes: applied.candidate_votes,
                candidate_gifts: applied.candidate_gifts,
                candidate_points_score: applied.candidate_points_score.to_string(),
                publisher_balance: applied.publisher_balance.to_string(),
            }),
        })),
    ))
}

fn recorded_paystack_data(pending: &PendingModel) -> PaystackVerifyData {
    PaystackVerifyData {
        verified: true,
        success: true,
        reference: pending.provider_reference.to_owned(),
        purpose: pending.purpose.to_owned(),
        points: pending.points,
        vote_result: None,
    }
}

#[post("/api/vote/wallet", format = "application/json", data = "<request>")]
pub async fn wallet_vote(
    conn: Connection<'_, Db>,
    auth_token: AuthToken<'_>,
    request: Json<WalletVoteRequest>,
) -> Json<ResponseData<WalletApplyData>> {
    info!("wallet_vote started for session {}", auth_token);
    let db = conn.into_inner();
    apply_wallet(db, &request, TransactionPurpose::Vote).await
}

pub async fn apply_wallet(
    db: &DatabaseConnection,
    request: &WalletVoteRequest,
    purpose: TransactionPurpose,
) -> Json<ResponseData<WalletApplyData>> {
    if let Err(message) = request.validate() {
        warn!("{}", message);
        return Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None));
    }

    let user_id = request.user_id.to_owned().unwrap();
    let candidate_id = request.candidate_id.to_owned().unwrap();
    let event_id = request.event_id.to_owned().unwrap();
    let points = request.points.unwrap();

    match ledger::apply_wallet_payment(db, &user_id, &candidate_id, &event_id, purpose, points)
        .await
    {
        Ok(applied) => Json(ResponseData::new(
            RESPONSE_OK,
            "".to_owned(),
            Some(WalletApplyData {
                points,
                payer_balance: applied.payer_balance.to_string(),
                vote_result: VoteOutcome {
                    candidate_votes: applied.candidate_votes,
                    candidate_gifts: applied.candidate_gifts,
                    candidate_points_score: applied.candidate_points_score.to_string(),
                    publisher_balance: applied.publisher_balance.to_string(),
                },
            }),
        )),
        Err(ledger_error @ LedgerError::InsufficientBalance { .. }) => {
            warn!("{}", ledger_error);
            Json(ResponseData::new(
                RESPONSE_BAD_REQUEST,
                ledger_error.to_string(),
                None,
            ))
        }
        Err(LedgerError::EventNotFound(id)) => Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            format!("No event found for '{}'", id),
            None,
        )),
        Err(LedgerError::CandidateNotFound(id)) => Json(ResponseData::new(
            RESPONSE_BAD_REQUEST,
            format!("No candidate found for '{}'", id),
            None,
        )),
        Err(ledger_error) => {
            error!("Wallet {} failed: {}", purpose, ledger_error);
            Json(ResponseData::new(
                RESPONSE_INTERNAL_ERROR,
                "Internal server error".to_owned(),
                None,
            ))
        }
    }
}
