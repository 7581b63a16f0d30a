use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "vote", schema_name = "public")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub voter_user_id: Option<String>,
    pub guest_email: Option<String>,
    pub candidate_id: String,
    pub event_id: String,
    pub points: i64,
    pub amount_paid: Decimal,
    pub currency: String,
    pub payment_method: String,
    pub provider_reference: Option<String>,
    pub status: String,
    pub created_timestamp: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
