//! Submissions tracked through the external similarity service.
//!
//! One row per piece of content that has been (or is waiting to be) sent to the
//! remote service. Lifecycle columns are only ever written through
//! [`Entity::compare_and_swap`], so a writer that raced another one (webhook vs.
//! polling) finds out instead of silently overwriting a newer state.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "plagiarism_submissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Identifier assigned by the remote service once created. Never changes afterwards.
    pub external_id: Option<String>,

    pub owner_module_ref: i64,
    pub user_ref: i64,
    pub group_ref: Option<i64>,
    /// Differs from `user_ref` when someone submits on behalf of the user.
    pub submitter_ref: i64,

    /// Content hash or file path hash, used for idempotent lookup.
    pub content_identifier: String,
    pub content_item_ref: Option<i64>,
    pub content_type: ContentType,
    /// Registry key of the content source, resolved at creation time.
    pub content_category: String,
    /// Disambiguates one answer among several for multi-answer content.
    pub quiz_answer_key: Option<String>,
    pub filename: Option<String>,

    pub status: SubmissionStatus,
    /// Report generation is still pending.
    pub to_generate: bool,
    /// Earliest epoch second at which generation may be (re)requested.
    pub generation_time: i64,
    pub submitted_at: Option<i64>,
    pub requested_at: Option<i64>,

    pub overall_score: Option<f64>,
    pub error_message: Option<String>,

    /// Attempts in the creation/upload phase.
    pub send_attempts: i32,
    /// Attempts in the generation/score phase.
    pub report_attempts: i32,
    pub next_retry_not_before: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where a submission is in its journey through the remote service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SubmissionStatus {
    /// Waiting to be created remotely.
    #[sea_orm(string_value = "queued")]
    Queued,
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "uploaded")]
    Uploaded,
    /// Report generation accepted by the remote service.
    #[sea_orm(string_value = "requested")]
    Requested,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "complete")]
    Complete,
    /// The submitter has not accepted the current end-user licence.
    #[sea_orm(string_value = "eula_not_accepted")]
    EulaNotAccepted,
    /// The underlying content vanished before it could be uploaded.
    #[sea_orm(string_value = "empty_deleted")]
    EmptyDeleted,
    #[sea_orm(string_value = "error")]
    Error,
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        Self::Queued
    }
}

impl SubmissionStatus {
    /// No automatic processing leaves these states.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::EmptyDeleted)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ContentType {
    #[sea_orm(string_value = "file")]
    File,
    #[sea_orm(string_value = "text")]
    Text,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Columns supplied when a submission is first tracked.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub owner_module_ref: i64,
    pub user_ref: i64,
    pub group_ref: Option<i64>,
    pub submitter_ref: i64,
    pub content_identifier: String,
    pub content_item_ref: Option<i64>,
    pub content_type: ContentType,
    pub content_category: String,
    pub quiz_answer_key: Option<String>,
    pub filename: Option<String>,
}

impl Entity {
    /// Inserts a fresh `queued` row.
    pub async fn create_queued(
        db: &DatabaseConnection,
        new: NewSubmission,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        let active = ActiveModel {
            external_id: Set(None),
            owner_module_ref: Set(new.owner_module_ref),
            user_ref: Set(new.user_ref),
            group_ref: Set(new.group_ref),
            submitter_ref: Set(new.submitter_ref),
            content_identifier: Set(new.content_identifier),
            content_item_ref: Set(new.content_item_ref),
            content_type: Set(new.content_type),
            content_category: Set(new.content_category),
            quiz_answer_key: Set(new.quiz_answer_key),
            filename: Set(new.filename),
            status: Set(SubmissionStatus::Queued),
            to_generate: Set(false),
            generation_time: Set(0),
            submitted_at: Set(None),
            requested_at: Set(None),
            overall_score: Set(None),
            error_message: Set(None),
            send_attempts: Set(0),
            report_attempts: Set(0),
            next_retry_not_before: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        active.insert(db).await
    }

    /// The row already tracking this owner/user/content combination, if any.
    pub async fn find_tracked(
        db: &DatabaseConnection,
        owner_module_ref: i64,
        user_ref: i64,
        content_identifier: &str,
        quiz_answer_key: Option<&str>,
    ) -> Result<Option<Model>, DbErr> {
        let answer = match quiz_answer_key {
            Some(key) => Condition::all().add(Column::QuizAnswerKey.eq(key)),
            None => Condition::all().add(Column::QuizAnswerKey.is_null()),
        };

        Entity::find()
            .filter(Column::OwnerModuleRef.eq(owner_module_ref))
            .filter(Column::UserRef.eq(user_ref))
            .filter(Column::ContentIdentifier.eq(content_identifier))
            .filter(answer)
            .order_by_asc(Column::Id)
            .one(db)
            .await
    }

    pub async fn find_by_external_id(
        db: &DatabaseConnection,
        external_id: &str,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::ExternalId.eq(external_id))
            .one(db)
            .await
    }

    /// Send-phase candidates: `queued`/`created` rows with budget left whose
    /// retry time has elapsed, oldest first.
    pub async fn pending_send(
        db: &DatabaseConnection,
        max_attempts: i32,
        now: i64,
        limit: u64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::Status.is_in([SubmissionStatus::Queued, SubmissionStatus::Created]))
            .filter(Column::SendAttempts.lt(max_attempts))
            .filter(Column::NextRetryNotBefore.lte(now))
            .order_by_asc(Column::Id)
            .limit(limit)
            .all(db)
            .await
    }

    /// Report-phase candidates: rows due for generation or sitting in
    /// `requested`, whose retry time has elapsed, oldest first.
    pub async fn pending_report(
        db: &DatabaseConnection,
        now: i64,
        limit: u64,
    ) -> Result<Vec<Model>, DbErr> {
        let due = Condition::all()
            .add(Column::ToGenerate.eq(true))
            .add(Column::GenerationTime.lte(now));
        let eligible = Condition::any()
            .add(due)
            .add(Column::Status.eq(SubmissionStatus::Requested));

        Entity::find()
            .filter(eligible)
            .filter(Column::Status.is_not_in([
                SubmissionStatus::Error,
                SubmissionStatus::EmptyDeleted,
            ]))
            .filter(Column::NextRetryNotBefore.lte(now))
            .order_by_asc(Column::Id)
            .limit(limit)
            .all(db)
            .await
    }

    pub async fn list_by_user_and_status(
        db: &DatabaseConnection,
        user_ref: i64,
        status: SubmissionStatus,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::UserRef.eq(user_ref))
            .filter(Column::Status.eq(status))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Writes every mutable column of `next`, but only if the stored status is
    /// still `expected`. Returns whether the row was updated.
    pub async fn compare_and_swap(
        db: &DatabaseConnection,
        expected: SubmissionStatus,
        next: &Model,
    ) -> Result<bool, DbErr> {
        let result = Entity::update_many()
            .set(changes(next))
            .filter(Column::Id.eq(next.id))
            .filter(Column::Status.eq(expected))
            .exec(db)
            .await?;

        Ok(result.rows_affected == 1)
    }
}

fn changes(model: &Model) -> ActiveModel {
    ActiveModel {
        id: NotSet,
        external_id: Set(model.external_id.clone()),
        owner_module_ref: Set(model.owner_module_ref),
        user_ref: Set(model.user_ref),
        group_ref: Set(model.group_ref),
        submitter_ref: Set(model.submitter_ref),
        content_identifier: Set(model.content_identifier.clone()),
        content_item_ref: Set(model.content_item_ref),
        content_type: Set(model.content_type),
        content_category: Set(model.content_category.clone()),
        quiz_answer_key: Set(model.quiz_answer_key.clone()),
        filename: Set(model.filename.clone()),
        status: Set(model.status),
        to_generate: Set(model.to_generate),
        generation_time: Set(model.generation_time),
        submitted_at: Set(model.submitted_at),
        requested_at: Set(model.requested_at),
        overall_score: Set(model.overall_score),
        error_message: Set(model.error_message.clone()),
        send_attempts: Set(model.send_attempts),
        report_attempts: Set(model.report_attempts),
        next_retry_not_before: Set(model.next_retry_not_before),
        created_at: NotSet,
        updated_at: Set(Utc::now()),
    }
}
