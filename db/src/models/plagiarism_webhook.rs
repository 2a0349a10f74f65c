//! The webhook registration currently known to the remote service.
//!
//! At most one row is meaningful; [`Entity::replace`] swaps it atomically.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, DatabaseConnection, DbErr, QueryOrder, TransactionTrait};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "plagiarism_webhooks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Identifier assigned by the remote service.
    pub external_id: String,
    /// Callback URL the registration delivers to.
    pub url: String,
    /// Shared secret used to sign deliveries.
    pub secret: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    /// Most recently stored registration.
    pub async fn current(db: &DatabaseConnection) -> Result<Option<Model>, DbErr> {
        Entity::find().order_by_desc(Column::Id).one(db).await
    }

    /// Drops every stored registration and records the given one.
    pub async fn replace(
        db: &DatabaseConnection,
        external_id: &str,
        url: &str,
        secret: &str,
    ) -> Result<Model, DbErr> {
        let txn = db.begin().await?;
        Entity::delete_many().exec(&txn).await?;
        let model = ActiveModel {
            external_id: Set(external_id.to_string()),
            url: Set(url.to_string()),
            secret: Set(secret.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(model)
    }

    pub async fn clear(db: &DatabaseConnection) -> Result<u64, DbErr> {
        Ok(Entity::delete_many().exec(db).await?.rows_affected)
    }
}
