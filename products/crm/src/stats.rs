//! Pipeline statistics over the full deal set.

use entity::deal::Status;
use sea_orm::{ConnectionTrait, DatabaseConnection, FromQueryResult, Statement};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::error::DealResult;

#[derive(Clone, Debug, Default, PartialEq, Serialize, FromQueryResult)]
pub struct PipelineSummary {
    pub total_deals: i64,
    pub total_value: f64,
    pub weighted_value: f64,
    pub won_value: f64,
    pub active_deals: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StageBreakdown {
    pub status: Status,
    pub count: i64,
    pub total_amount: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    pub summary: PipelineSummary,
    /// Stages present in the data, in funnel order.
    pub by_status: Vec<StageBreakdown>,
}

#[derive(Debug, FromQueryResult)]
struct StageAggregateRow {
    status: String,
    deal_count: i64,
    total_amount: f64,
}

fn summary_sql() -> String {
    let won = Status::Gagne.as_str();
    let lost = Status::Perdu.as_str();
    format!(
        "SELECT COUNT(*) AS total_deals, \
         COALESCE(SUM(amount), 0.0) AS total_value, \
         COALESCE(SUM(weighted_amount), 0.0) AS weighted_value, \
         COALESCE(SUM(CASE WHEN status = '{won}' THEN amount ELSE 0.0 END), 0.0) AS won_value, \
         COUNT(CASE WHEN status NOT IN ('{won}', '{lost}') THEN 1 END) AS active_deals \
         FROM deal"
    )
}

const STAGE_TOTALS_SQL: &str = "SELECT status, COUNT(*) AS deal_count, \
     COALESCE(SUM(amount), 0.0) AS total_amount \
     FROM deal GROUP BY status";

#[instrument(name = "crm.deals.stats", skip_all)]
pub async fn pipeline_stats(db: &DatabaseConnection) -> DealResult<PipelineStats> {
    let backend = db.get_database_backend();
    let summary = PipelineSummary::find_by_statement(Statement::from_string(
        backend,
        summary_sql(),
    ))
    .one(db)
    .await?
    .unwrap_or_default();

    let rows = StageAggregateRow::find_by_statement(Statement::from_string(
        backend,
        STAGE_TOTALS_SQL.to_string(),
    ))
    .all(db)
    .await?;

    Ok(PipelineStats {
        summary,
        by_status: order_by_funnel(rows),
    })
}

fn order_by_funnel(rows: Vec<StageAggregateRow>) -> Vec<StageBreakdown> {
    let mut stages: Vec<StageBreakdown> = rows
        .into_iter()
        .filter_map(|row| match Status::parse(&row.status) {
            Some(status) => Some(StageBreakdown {
                status,
                count: row.deal_count,
                total_amount: row.total_amount,
            }),
            None => {
                warn!(status = %row.status, "skipping deals with unknown status");
                None
            }
        })
        .collect();
    stages.sort_by_key(|stage| stage.status.funnel_position());
    stages
}
