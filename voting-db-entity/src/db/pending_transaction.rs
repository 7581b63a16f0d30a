use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "pending_transaction", schema_name = "public")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub payer_user_id: Option<String>,
    pub guest_email: Option<String>,
    pub event_id: String,
    pub candidate_id: String,
    pub publisher_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub points: i64,
    pub payment_method: String,
    pub provider_reference: String,
    pub capture_id: Option<String>,
    pub purpose: String,
    pub status: String,
    pub description: String,
    pub error_message: Option<String>,
    pub created_timestamp: i64,
    pub verified_timestamp: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
