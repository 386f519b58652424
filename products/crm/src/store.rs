use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use entity::{company, contact, deal, user};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{DealError, DealResult};
use crate::stats::{self, PipelineStats};
use crate::status::{closed_at_for, parse_status, status_or_default};

const MAX_TITLE_CHARS: usize = 256;

/// Payload shared by create and full-replace update.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DealInput {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub amount: Option<f64>,
    pub probability: Option<i32>,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub expected_close_date: Option<NaiveDate>,
}

impl DealInput {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DealFilter {
    pub status: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub q: Option<String>,
}

/// A deal plus display fields looked up from its relations.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DealDetail {
    #[serde(flatten)]
    pub deal: deal::Model,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub company_name: Option<String>,
    pub assigned_to_name: Option<String>,
}

struct ValidDeal {
    title: String,
    description: Option<String>,
    status: deal::Status,
    amount: f64,
    probability: i32,
    contact_id: Option<Uuid>,
    company_id: Option<Uuid>,
    assigned_to: Option<Uuid>,
    expected_close_date: Option<NaiveDate>,
}

impl ValidDeal {
    fn weighted_amount(&self) -> f64 {
        weighted_amount(self.amount, self.probability)
    }

    /// Active model carrying every writable column; `id` and `created_at` stay unset.
    fn into_active_model(self, now: DateTimeWithTimeZone) -> deal::ActiveModel {
        let weighted = self.weighted_amount();
        deal::ActiveModel {
            title: Set(self.title),
            description: Set(self.description),
            status: Set(self.status),
            amount: Set(self.amount),
            probability: Set(self.probability),
            weighted_amount: Set(weighted),
            contact_id: Set(self.contact_id),
            company_id: Set(self.company_id),
            assigned_to: Set(self.assigned_to),
            expected_close_date: Set(self.expected_close_date),
            closed_at: Set(closed_at_for(self.status, now)),
            updated_at: Set(now),
            ..Default::default()
        }
    }
}

fn validate(input: DealInput) -> DealResult<ValidDeal> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(DealError::validation("title is required"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(DealError::validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    let status = status_or_default(input.status.as_deref())?;
    let amount = input.amount.unwrap_or(0.0);
    if !amount.is_finite() {
        return Err(DealError::validation("amount must be a finite number"));
    }
    let probability = input
        .probability
        .unwrap_or_else(|| status.default_probability());
    if !(0..=100).contains(&probability) {
        return Err(DealError::validation("probability must be between 0 and 100"));
    }
    Ok(ValidDeal {
        title: title.to_string(),
        description: input.description,
        status,
        amount,
        probability,
        contact_id: input.contact_id,
        company_id: input.company_id,
        assigned_to: input.assigned_to,
        expected_close_date: input.expected_close_date,
    })
}

pub fn weighted_amount(amount: f64, probability: i32) -> f64 {
    amount * f64::from(probability) / 100.0
}

#[derive(Debug, FromQueryResult)]
struct DealDetailRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    status: deal::Status,
    amount: f64,
    probability: i32,
    weighted_amount: f64,
    contact_id: Option<Uuid>,
    company_id: Option<Uuid>,
    assigned_to: Option<Uuid>,
    expected_close_date: Option<NaiveDate>,
    closed_at: Option<DateTimeWithTimeZone>,
    created_at: DateTimeWithTimeZone,
    updated_at: DateTimeWithTimeZone,
    contact_first_name: Option<String>,
    contact_last_name: Option<String>,
    contact_email: Option<String>,
    company_name: Option<String>,
    assigned_to_name: Option<String>,
}

impl From<DealDetailRow> for DealDetail {
    fn from(row: DealDetailRow) -> Self {
        let contact_name = join_name(
            row.contact_first_name.as_deref(),
            row.contact_last_name.as_deref(),
        );
        DealDetail {
            deal: deal::Model {
                id: row.id,
                title: row.title,
                description: row.description,
                status: row.status,
                amount: row.amount,
                probability: row.probability,
                weighted_amount: row.weighted_amount,
                contact_id: row.contact_id,
                company_id: row.company_id,
                assigned_to: row.assigned_to,
                expected_close_date: row.expected_close_date,
                closed_at: row.closed_at,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            contact_name,
            contact_email: row.contact_email,
            company_name: row.company_name,
            assigned_to_name: row.assigned_to_name,
        }
    }
}

fn join_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let parts: Vec<&str> = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn detail_query() -> Select<deal::Entity> {
    deal::Entity::find()
        .column_as(contact::Column::FirstName, "contact_first_name")
        .column_as(contact::Column::LastName, "contact_last_name")
        .column_as(contact::Column::Email, "contact_email")
        .column_as(company::Column::Name, "company_name")
        .column_as(user::Column::DisplayName, "assigned_to_name")
        .join(JoinType::LeftJoin, deal::Relation::Contact.def())
        .join(JoinType::LeftJoin, deal::Relation::Company.def())
        .join(JoinType::LeftJoin, deal::Relation::Assignee.def())
}

const LIKE_ESCAPE: char = '\\';

/// Substring pattern with `%`, `_` and the escape character taken literally.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn sanitize_optional_filter(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

/// Persistence for deals. Every operation is a single statement against the
/// pool plus, for writes, a read-back of the stored row.
#[derive(Clone)]
pub struct DealStore {
    db: Arc<DatabaseConnection>,
}

impl DealStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    #[instrument(name = "crm.deals.create", skip_all)]
    pub async fn create(&self, input: DealInput) -> DealResult<deal::Model> {
        let valid = validate(input)?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let mut active = valid.into_active_model(now);
        active.id = Set(Uuid::new_v4());
        active.created_at = Set(now);
        let created = active.insert(self.connection()).await?;
        info!(deal_id = %created.id, status = %created.status, "deal created");
        Ok(created)
    }

    /// Full replace: optional fields missing from `input` are cleared.
    #[instrument(name = "crm.deals.update", skip_all, fields(deal_id = %id))]
    pub async fn update(&self, id: Uuid, input: DealInput) -> DealResult<deal::Model> {
        let valid = validate(input)?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let updated = self.write(id, valid.into_active_model(now)).await?;
        info!(deal_id = %id, status = %updated.status, "deal updated");
        Ok(updated)
    }

    /// Narrow write of `status` and `closed_at`; every other column is untouched.
    #[instrument(
        name = "crm.deals.transition",
        skip_all,
        fields(deal_id = %id, status = raw_status)
    )]
    pub async fn transition_status(&self, id: Uuid, raw_status: &str) -> DealResult<deal::Model> {
        let status = parse_status(raw_status)?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let patch = deal::ActiveModel {
            status: Set(status),
            closed_at: Set(closed_at_for(status, now)),
            updated_at: Set(now),
            ..Default::default()
        };
        let updated = self.write(id, patch).await?;
        info!(deal_id = %id, status = %status, "deal status changed");
        Ok(updated)
    }

    #[instrument(name = "crm.deals.delete", skip_all, fields(deal_id = %id))]
    pub async fn delete(&self, id: Uuid) -> DealResult<()> {
        let result = deal::Entity::delete_by_id(id)
            .exec(self.connection())
            .await?;
        if result.rows_affected == 0 {
            return Err(DealError::NotFound(id));
        }
        info!(deal_id = %id, "deal deleted");
        Ok(())
    }

    #[instrument(name = "crm.deals.get", skip_all, fields(deal_id = %id))]
    pub async fn get(&self, id: Uuid) -> DealResult<DealDetail> {
        detail_query()
            .filter(deal::Column::Id.eq(id))
            .into_model::<DealDetailRow>()
            .one(self.connection())
            .await?
            .map(DealDetail::from)
            .ok_or(DealError::NotFound(id))
    }

    /// Unknown `status` values are ignored rather than rejected.
    ///
    /// `q` is a literal substring match on the title. The title is folded by the
    /// database `lower()`, which only folds ASCII letters on SQLite, so there
    /// non-ASCII letters must match case exactly.
    #[instrument(
        name = "crm.deals.list",
        skip_all,
        fields(
            status = filter.status.as_deref().unwrap_or(""),
            has_assignee = filter.assigned_to.is_some(),
            has_q = filter.q.is_some()
        )
    )]
    pub async fn list(&self, filter: DealFilter) -> DealResult<Vec<DealDetail>> {
        let mut query = detail_query();
        if let Some(status) = filter.status.as_deref().and_then(deal::Status::parse) {
            query = query.filter(deal::Column::Status.eq(status));
        }
        if let Some(assignee) = filter.assigned_to {
            query = query.filter(deal::Column::AssignedTo.eq(assignee));
        }
        if let Some(q) = sanitize_optional_filter(filter.q) {
            let pattern = LikeExpr::new(contains_pattern(&q.to_lowercase())).escape(LIKE_ESCAPE);
            let title = Expr::expr(Func::lower(Expr::col((deal::Entity, deal::Column::Title))));
            query = query.filter(title.like(pattern));
        }
        let rows = query
            .order_by_desc(deal::Column::CreatedAt)
            .into_model::<DealDetailRow>()
            .all(self.connection())
            .await?;
        Ok(rows.into_iter().map(DealDetail::from).collect())
    }

    pub async fn stats(&self) -> DealResult<PipelineStats> {
        stats::pipeline_stats(self.connection()).await
    }

    async fn write(&self, id: Uuid, patch: deal::ActiveModel) -> DealResult<deal::Model> {
        let result = deal::Entity::update_many()
            .set(patch)
            .filter(deal::Column::Id.eq(id))
            .exec(self.connection())
            .await?;
        if result.rows_affected == 0 {
            return Err(DealError::NotFound(id));
        }
        deal::Entity::find_by_id(id)
            .one(self.connection())
            .await?
            .ok_or(DealError::NotFound(id))
    }
}
