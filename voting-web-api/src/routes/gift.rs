use crate::dto::{AuthToken, ResponseData, TransactionPurpose, WalletApplyData, WalletVoteRequest};
use crate::pool::Db;
use crate::routes::vote::apply_wallet;
use rocket::serde::json::Json;
use sea_orm_rocket::Connection;
use tracing::info;

/// Wallet-funded gifts share the vote contract; only the candidate counter
/// they land on differs.
#[post("/api/gift/wallet", format = "application/json", data = "<request>")]
pub async fn wallet_gift(
    conn: Connection<'_, Db>,
    auth_token: AuthToken<'_>,
    request: Json<WalletVoteRequest>,
) -> Json<ResponseData<WalletApplyData>> {
    info!("wallet_gift started for session {}", auth_token);
    let db = conn.into_inner();
    apply_wallet(db, &request, TransactionPurpose::Gift).await
}
