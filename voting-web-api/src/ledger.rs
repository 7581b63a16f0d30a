use crate::dto::{
    PaymentMethod, TransactionPurpose, TRANSACTION_COMPLETED, TRANSACTION_FAILED,
    TRANSACTION_PENDING,
};
use chrono::Utc;
use sea_orm::prelude::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, Select,
};
use std::fmt;
use tracing::warn;
use voting_db_entity::db::candidate::{
    Column as CandidateColumn, Entity as Candidate, Model as CandidateModel,
};
use voting_db_entity::db::event::Entity as Event;
use voting_db_entity::db::pending_transaction::{
    Column as PendingColumn, Entity as PendingTransaction, Model as PendingModel,
};
use voting_db_entity::db::token_transaction::ActiveModel as TokenTransactionActiveModel;
use voting_db_entity::db::token_transaction::Entity as TokenTransaction;
use voting_db_entity::db::vote::{ActiveModel as VoteActiveModel, Entity as Vote};
use voting_db_entity::db::wallet::{
    ActiveModel as WalletActiveModel, Column as WalletColumn, Entity as Wallet,
};

#[derive(Debug)]
pub enum LedgerError {
    PendingNotFound(String),
    EventNotFound(String),
    CandidateNotFound(String),
    InsufficientBalance {
        balance: Decimal,
        required: Decimal,
    },
    Db(sea_orm::DbErr),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            LedgerError::PendingNotFound(id) => {
                write!(f, "No pending transaction found for '{}'", id)
            }
            LedgerError::EventNotFound(id) => write!(f, "No event found for '{}'", id),
            LedgerError::CandidateNotFound(id) => write!(f, "No candidate found for '{}'", id),
            LedgerError::InsufficientBalance { balance, required } => write!(
                f,
                "Insufficient wallet balance: {} available, {} required",
                balance, required
            ),
            LedgerError::Db(error) => write!(f, "Database error: {}", error),
        }
    }
}

impl From<sea_orm::DbErr> for LedgerError {
    fn from(error: sea_orm::DbErr) -> LedgerError {
        LedgerError::Db(error)
    }
}

/// Outcome of the pending -> completed gate. `AlreadyCompleted` means a
/// concurrent or repeated verification won the race; callers must return
/// the recorded result without re-applying any ledger effect.
#[derive(Clone, Debug, PartialEq)]
pub enum CompleteOutcome {
    Completed(PendingModel),
    AlreadyCompleted(PendingModel),
    NotPending(PendingModel),
}

/// Flips the pending transaction to completed only if it is still pending.
/// The provider reference acts as the idempotency key: the conditional
/// update commits at most once per row even under concurrent callers.
pub async fn complete_pending(
    db: &DatabaseConnection,
    pending_id: &str,
    capture_id: Option<&str>,
) -> Result<CompleteOutcome, LedgerError> {
    let result = PendingTransaction::update_many()
        .col_expr(PendingColumn::Status, Expr::value(TRANSACTION_COMPLETED))
        .col_expr(
            PendingColumn::CaptureId,
            Expr::value(capture_id.map(|c| c.to_owned())),
        )
        .col_expr(
            PendingColumn::VerifiedTimestamp,
            Expr::value(Some(Utc::now().timestamp())),
        )
        .filter(PendingColumn::Id.eq(pending_id))
        .filter(PendingColumn::Status.eq(TRANSACTION_PENDING))
        .exec(db)
        .await?;

    let row = PendingTransaction::find_by_id(pending_id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| LedgerError::PendingNotFound(pending_id.to_owned()))?;

    if result.rows_affected > 0 {
        return Ok(CompleteOutcome::Completed(row));
    }
    if row.status.eq(TRANSACTION_COMPLETED) {
        warn!(
            "Pending transaction {} already completed, skipping reapply",
            pending_id
        );
        return Ok(CompleteOutcome::AlreadyCompleted(row));
    }
    Ok(CompleteOutcome::NotPending(row))
}

/// Records the provider's failure message. Terminal rows are left alone so
/// a late failure signal cannot overwrite a completed verification.
pub async fn fail_pending(
    db: &DatabaseConnection,
    pending_id: &str,
    error_message: &str,
) -> Result<(), LedgerError> {
    let result = PendingTransaction::update_many()
        .col_expr(PendingColumn::Status, Expr::value(TRANSACTION_FAILED))
        .col_expr(
            PendingColumn::ErrorMessage,
            Expr::value(Some(error_message.to_owned())),
        )
        .col_expr(
            PendingColumn::VerifiedTimestamp,
            Expr::value(Some(Utc::now().timestamp())),
        )
        .filter(PendingColumn::Id.eq(pending_id))
        .filter(PendingColumn::Status.eq(TRANSACTION_PENDING))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        warn!(
            "Pending transaction {} was not pending, failure not recorded",
            pending_id
        );
    }
    Ok(())
}

fn pending_by_reference_query(
    reference: &str,
    method: PaymentMethod,
) -> Select<PendingTransaction> {
    PendingTransaction::find()
        .filter(PendingColumn::ProviderReference.eq(reference))
        .filter(PendingColumn::PaymentMethod.eq(method.to_string()))
}

/// References are only unique per provider namespace: a PayPal order id is
/// known to the payer's browser, so a lookup that ignores the payment
/// method would let one provider's verifier fail another provider's row.
pub async fn find_pending_by_reference(
    db: &DatabaseConnection,
    reference: &str,
    method: PaymentMethod,
) -> Result<Option<PendingModel>, LedgerError> {
    let row = pending_by_reference_query(reference, method).one(db).await?;
    Ok(row)
}

pub async fn reference_in_use(
    db: &DatabaseConnection,
    reference: &str,
) -> Result<bool, LedgerError> {
    let row = PendingTransaction::find()
        .filter(PendingColumn::ProviderReference.eq(reference))
        .one(db)
        .await?;
    Ok(row.is_some())
}

pub fn points_score(votes: i64, gifts: i64) -> Decimal {
    Decimal::from(votes + gifts) / Decimal::from(10)
}

/// Counters are bumped in place so two concurrent votes both land instead
/// of the later one overwriting the earlier from a stale read.
async fn bump_candidate(
    db: &DatabaseConnection,
    candidate_id: &str,
    purpose: TransactionPurpose,
    points: i64,
) -> Result<CandidateModel, LedgerError> {
    let (vote_inc, gift_inc) = match purpose {
        TransactionPurpose::Vote => (points, 0),
        TransactionPurpose::Gift => (0, points),
    };

    let result = Candidate::update_many()
        .col_expr(
            CandidateColumn::Votes,
            Expr::col(CandidateColumn::Votes).add(vote_inc),
        )
        .col_expr(
            CandidateColumn::Gifts,
            Expr::col(CandidateColumn::Gifts).add(gift_inc),
        )
        .filter(CandidateColumn::Id.eq(candidate_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(LedgerError::CandidateNotFound(candidate_id.to_owned()));
    }

    let candidate = Candidate::find_by_id(candidate_id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| LedgerError::CandidateNotFound(candidate_id.to_owned()))?;

    // Derived score recomputed from the freshly incremented counters.
    let score = points_score(candidate.votes, candidate.gifts);
    Candidate::update_many()
        .col_expr(CandidateColumn::PointsScore, Expr::value(score))
        .filter(CandidateColumn::Id.eq(candidate_id))
        .exec(db)
        .await?;

    Ok(CandidateModel {
        points_score: score,
        ..candidate
    })
}

/// Credits tokens, creating the wallet lazily with the full credited
/// amount as its opening balance.
pub async fn credit_wallet(
    db: &DatabaseConnection,
    owner_id: &str,
    tokens: i64,
    description: &str,
) -> Result<Decimal, LedgerError> {
    let now = Utc::now().timestamp();
    match Wallet::find_by_id(owner_id.to_owned()).one(db).await? {
        Some(wallet) => {
            let balance = wallet.balance + Decimal::from(tokens);
            let mut active = wallet.into_active_model();
            active.balance = ActiveValue::Set(balance);
            active.last_action = ActiveValue::Set(description.to_owned());
            active.updated_timestamp = ActiveValue::Set(now);
            active.update(db).await?;
            Ok(balance)
        }
        None => {
            let balance = Decimal::from(tokens);
            let wallet = WalletActiveModel {
                owner_id: ActiveValue::Set(owner_id.to_owned()),
                balance: ActiveValue::Set(balance),
                last_action: ActiveValue::Set(description.to_owned()),
                updated_timestamp: ActiveValue::Set(now),
            };
            Wallet::insert(wallet).exec(db).await?;
            Ok(balance)
        }
    }
}

/// Debits tokens through a conditional update: the balance guard sits in
/// the UPDATE itself, so two concurrent debits cannot both pass a stale
/// pre-check and each charge once for two votes.
pub async fn debit_wallet(
    db: &DatabaseConnection,
    owner_id: &str,
    tokens: i64,
    description: &str,
) -> Result<Decimal, LedgerError> {
    let required = Decimal::from(tokens);
    let result = Wallet::update_many()
        .col_expr(
            WalletColumn::Balance,
            Expr::col(WalletColumn::Balance).sub(required),
        )
        .col_expr(WalletColumn::LastAction, Expr::value(description.to_owned()))
        .col_expr(
            WalletColumn::UpdatedTimestamp,
            Expr::value(Utc::now().timestamp()),
        )
        .filter(WalletColumn::OwnerId.eq(owner_id))
        .filter(WalletColumn::Balance.gte(required))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let balance = match Wallet::find_by_id(owner_id.to_owned()).one(db).await? {
            Some(wallet) => wallet.balance,
            None => Decimal::ZERO,
        };
        return Err(LedgerError::InsufficientBalance { balance, required });
    }

    let wallet = Wallet::find_by_id(owner_id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| LedgerError::Db(sea_orm::DbErr::RecordNotFound(owner_id.to_owned())))?;
    Ok(wallet.balance)
}

#[allow(clippy::too_many_arguments)]
async fn insert_vote_record(
    db: &DatabaseConnection,
    voter_user_id: Option<&str>,
    guest_email: Option<&str>,
    candidate_id: &str,
    event_id: &str,
    points: i64,
    amount_paid: Decimal,
    currency: &str,
    payment_method: &str,
    provider_reference: Option<&str>,
) -> Result<(), LedgerError> {
    let vote = VoteActiveModel {
        id: ActiveValue::NotSet,
        voter_user_id: ActiveValue::Set(voter_user_id.map(|v| v.to_owned())),
        guest_email: ActiveValue::Set(guest_email.map(|v| v.to_owned())),
        candidate_id: ActiveValue::Set(candidate_id.to_owned()),
        event_id: ActiveValue::Set(event_id.to_owned()),
        points: ActiveValue::Set(points),
        amount_paid: ActiveValue::Set(amount_paid),
        currency: ActiveValue::Set(currency.to_owned()),
        payment_method: ActiveValue::Set(payment_method.to_owned()),
        provider_reference: ActiveValue::Set(provider_reference.map(|v| v.to_owned())),
        status: ActiveValue::Set(TRANSACTION_COMPLETED.to_owned()),
        created_timestamp: ActiveValue::Set(Utc::now().timestamp()),
    };
    Vote::insert(vote).exec(db).await?;
    Ok(())
}

async fn insert_audit_row(
    db: &DatabaseConnection,
    user_id: &str,
    tokens_in: i64,
    tokens_out: i64,
    description: &str,
    external_reference: Option<&str>,
    payment_method: &str,
) -> Result<(), LedgerError> {
    let audit = TokenTransactionActiveModel {
        id: ActiveValue::NotSet,
        user_id: ActiveValue::Set(user_id.to_owned()),
        tokens_in: ActiveValue::Set(tokens_in),
        tokens_out: ActiveValue::Set(tokens_out),
        description: ActiveValue::Set(description.to_owned()),
        external_reference: ActiveValue::Set(external_reference.map(|v| v.to_owned())),
        payment_method: ActiveValue::Set(payment_method.to_owned()),
        created_timestamp: ActiveValue::Set(Utc::now().timestamp()),
    };
    TokenTransaction::insert(audit).exec(db).await?;
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct VoteApplied {
    pub candidate_votes: i64,
    pub candidate_gifts: i64,
    pub candidate_points_score: Decimal,
    pub publisher_balance: Decimal,
}

/// Applies steps 2-6 of the external-provider flow for a pending
/// transaction that has already passed the completion gate. Every write is
/// additive, so a support-staff re-run after a partial failure starts from
/// the gate and cannot double-credit.
pub async fn apply_external_effects(
    db: &DatabaseConnection,
    pending: &PendingModel,
) -> Result<VoteApplied, LedgerError> {
    let event = Event::find_by_id(pending.event_id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| LedgerError::EventNotFound(pending.event_id.to_owned()))?;

    let purpose = if pending.purpose.eq("gift") {
        TransactionPurpose::Gift
    } else {
        TransactionPurpose::Vote
    };

    let candidate = bump_candidate(db, &pending.candidate_id, purpose, pending.points).await?;

    let credit_description = format!(
        "{} of {} tokens for candidate {} via {}",
        purpose, pending.points, pending.candidate_id, pending.payment_method
    );
    let publisher_balance =
        credit_wallet(db, &event.publisher_id, pending.points, &credit_description).await?;

    insert_vote_record(
        db,
        pending.payer_user_id.as_deref(),
        pending.guest_email.as_deref(),
        &pending.candidate_id,
        &pending.event_id,
        pending.points,
        pending.amount,
        &pending.currency,
        &pending.payment_method,
        Some(&pending.provider_reference),
    )
    .await?;

    insert_audit_row(
        db,
        &event.publisher_id,
        pending.points,
        0,
        &credit_description,
        Some(&pending.provider_reference),
        &pending.payment_method,
    )
    .await?;

    // External payments never touch the payer's wallet; the zero-token row
    // keeps the payment visible in the payer's token history.
    if let Some(payer) = pending.payer_user_id.as_deref() {
        let payer_description = format!(
            "External {} payment of {} {} for candidate {}",
            pending.payment_method, pending.amount, pending.currency, pending.candidate_id
        );
        insert_audit_row(
            db,
            payer,
            0,
            0,
            &payer_description,
            Some(&pending.provider_reference),
            &pending.payment_method,
        )
        .await?;
    }

    Ok(VoteApplied {
        candidate_votes: candidate.votes,
        candidate_gifts: candidate.gifts,
        candidate_points_score: candidate.points_score,
        publisher_balance,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct WalletApplied {
    pub payer_balance: Decimal,
    pub candidate_votes: i64,
    pub candidate_gifts: i64,
    pub candidate_points_score: Decimal,
    pub publisher_balance: Decimal,
}

/// Synchronous wallet-funded path: balance pre-check, payer debit,
/// publisher credit, candidate bump, vote row, audit rows. No pending
/// transaction is involved.
pub async fn apply_wallet_payment(
    db: &DatabaseConnection,
    user_id: &str,
    candidate_id: &str,
    event_id: &str,
    purpose: TransactionPurpose,
    points: i64,
) -> Result<WalletApplied, LedgerError> {
    let event = Event::find_by_id(event_id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| LedgerError::EventNotFound(event_id.to_owned()))?;

    // A bad candidate id must be rejected before the debit, not after the
    // payer's tokens are gone.
    Candidate::find_by_id(candidate_id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| LedgerError::CandidateNotFound(candidate_id.to_owned()))?;

    let debit_description = format!(
        "Wallet {} of {} tokens for candidate {}",
        purpose, points, candidate_id
    );
    let payer_balance = debit_wallet(db, user_id, points, &debit_description).await?;

    let credit_description = format!(
        "{} of {} tokens for candidate {} via wallet",
        purpose, points, candidate_id
    );
    let publisher_balance =
        credit_wallet(db, &event.publisher_id, points, &credit_description).await?;

    let candidate = bump_candidate(db, candidate_id, purpose, points).await?;

    let method = PaymentMethod::Wallet.to_string();
    insert_vote_record(
        db,
        Some(user_id),
        None,
        candidate_id,
        event_id,
        points,
        Decimal::from(points),
        crate::pricing::CURRENCY_USD,
        &method,
        None,
    )
    .await?;

    insert_audit_row(db, user_id, 0, points, &debit_description, None, &method).await?;
    insert_audit_row(
        db,
        &event.publisher_id,
        points,
        0,
        &credit_description,
        None,
        &method,
    )
    .await?;

    Ok(WalletApplied {
        payer_balance,
        candidate_votes: candidate.votes,
        candidate_gifts: candidate.gifts,
        candidate_points_score: candidate.points_score,
        publisher_balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DbBackend, MockDatabase, MockExecResult, QueryTrait};
    use voting_db_entity::db::event::Model as EventModel;
    use voting_db_entity::db::wallet::Model as WalletModel;

    fn pending_row(status: &str) -> PendingModel {
        PendingModel {
            id: "ptx_1".to_owned(),
            payer_user_id: Some("user_1".to_owned()),
            guest_email: None,
            event_id: "evt_1".to_owned(),
            candidate_id: "cand_1".to_owned(),
            publisher_id: "pub_1".to_owned(),
            amount: Decimal::from(50),
            currency: "USD".to_owned(),
            points: 50,
            payment_method: "paypal".to_owned(),
            provider_reference: "ORD-1".to_owned(),
            capture_id: None,
            purpose: "vote".to_owned(),
            status: status.to_owned(),
            description: "vote of 50 points for candidate cand_1".to_owned(),
            error_message: None,
            created_timestamp: 1,
            verified_timestamp: None,
        }
    }

    fn wallet_row(balance: i64) -> WalletModel {
        WalletModel {
            owner_id: "user_1".to_owned(),
            balance: Decimal::from(balance),
            last_action: "credit".to_owned(),
            updated_timestamp: 1,
        }
    }

    fn event_row() -> EventModel {
        EventModel {
            id: "evt_1".to_owned(),
            publisher_id: "pub_1".to_owned(),
            name: "Finals".to_owned(),
            is_active: true,
            created_timestamp: 1,
        }
    }

    #[test]
    fn points_score_is_tenth_of_votes_plus_gifts() {
        assert_eq!(points_score(50, 0), Decimal::from(5));
        assert_eq!(points_score(40, 15), Decimal::from_str_radix("5.5", 10).unwrap());
        assert_eq!(points_score(0, 0), Decimal::ZERO);
    }

    #[test]
    fn ledger_error_messages_are_user_readable() {
        let error = LedgerError::InsufficientBalance {
            balance: Decimal::from(10),
            required: Decimal::from(50),
        };
        assert_eq!(
            error.to_string(),
            "Insufficient wallet balance: 10 available, 50 required"
        );
    }

    #[test]
    fn reference_lookup_is_scoped_to_the_payment_method() {
        let sql = pending_by_reference_query("PAYPAL-ORDER-1", PaymentMethod::Paystack)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""provider_reference" = 'PAYPAL-ORDER-1'"#));
        assert!(sql.contains(r#""payment_method" = 'paystack'"#));
    }

    #[rocket::async_test]
    async fn completion_gate_flips_a_pending_row_once() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results(vec![vec![pending_row(TRANSACTION_COMPLETED)]])
            .into_connection();
        let outcome = complete_pending(&db, "ptx_1", Some("cap_1")).await.unwrap();
        assert!(matches!(outcome, CompleteOutcome::Completed(_)));
    }

    #[rocket::async_test]
    async fn repeated_completion_reports_already_completed() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results(vec![vec![pending_row(TRANSACTION_COMPLETED)]])
            .into_connection();
        let outcome = complete_pending(&db, "ptx_1", Some("cap_1")).await.unwrap();
        assert!(matches!(outcome, CompleteOutcome::AlreadyCompleted(_)));
    }

    #[rocket::async_test]
    async fn completion_of_a_failed_row_reports_not_pending() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results(vec![vec![pending_row(TRANSACTION_FAILED)]])
            .into_connection();
        let outcome = complete_pending(&db, "ptx_1", None).await.unwrap();
        assert!(matches!(outcome, CompleteOutcome::NotPending(_)));
    }

    #[rocket::async_test]
    async fn lost_debit_race_is_rejected_with_the_current_balance() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results(vec![vec![wallet_row(10)]])
            .into_connection();
        let error = debit_wallet(&db, "user_1", 50, "debit").await.unwrap_err();
        match error {
            LedgerError::InsufficientBalance { balance, required } => {
                assert_eq!(balance, Decimal::from(10));
                assert_eq!(required, Decimal::from(50));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[rocket::async_test]
    async fn successful_debit_returns_the_post_debit_balance() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results(vec![vec![wallet_row(40)]])
            .into_connection();
        let balance = debit_wallet(&db, "user_1", 50, "debit").await.unwrap();
        assert_eq!(balance, Decimal::from(40));
    }

    #[rocket::async_test]
    async fn wallet_payment_with_unknown_candidate_writes_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![event_row()]])
            .append_query_results(vec![Vec::<CandidateModel>::new()])
            .into_connection();
        let error = apply_wallet_payment(
            &db,
            "user_1",
            "cand_missing",
            "evt_1",
            TransactionPurpose::Vote,
            10,
        )
        .await
        .unwrap_err();
        assert!(matches!(error, LedgerError::CandidateNotFound(_)));
        // Event and candidate reads only; no debit or credit reached the log.
        assert_eq!(db.into_transaction_log().len(), 2);
    }

    #[rocket::async_test]
    async fn existing_reference_is_reported_as_in_use() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![pending_row(TRANSACTION_PENDING)]])
            .into_connection();
        assert!(reference_in_use(&db, "ORD-1").await.unwrap());
    }
}
