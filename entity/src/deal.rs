use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "deal")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[sea_orm(indexed)]
    pub status: Status,
    pub amount: f64,
    pub probability: i32,
    pub weighted_amount: f64,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    #[sea_orm(indexed)]
    pub assigned_to: Option<Uuid>,
    pub expected_close_date: Option<Date>,
    pub closed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contact::Entity",
        from = "Column::ContactId",
        to = "super::contact::Column::Id"
    )]
    Contact,
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id"
    )]
    Company,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AssignedTo",
        to = "super::user::Column::Id"
    )]
    Assignee,
}

impl Related<super::contact::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contact.def()
    }
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Pipeline stage of a deal, stored as its lowercase name.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    EnumIter,
    DeriveActiveEnum,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    #[sea_orm(string_value = "prospect")]
    Prospect,
    #[sea_orm(string_value = "qualification")]
    Qualification,
    #[sea_orm(string_value = "proposition")]
    Proposition,
    #[sea_orm(string_value = "negociation")]
    Negociation,
    #[sea_orm(string_value = "gagne")]
    Gagne,
    #[sea_orm(string_value = "perdu")]
    Perdu,
}

impl Status {
    /// Canonical funnel order used for every per-stage view.
    pub const FUNNEL: [Status; 6] = [
        Status::Prospect,
        Status::Qualification,
        Status::Proposition,
        Status::Negociation,
        Status::Gagne,
        Status::Perdu,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Prospect => "prospect",
            Status::Qualification => "qualification",
            Status::Proposition => "proposition",
            Status::Negociation => "negociation",
            Status::Gagne => "gagne",
            Status::Perdu => "perdu",
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn parse(value: &str) -> Option<Self> {
        Self::FUNNEL.into_iter().find(|status| status.as_str() == value)
    }

    pub fn funnel_position(self) -> usize {
        match self {
            Status::Prospect => 0,
            Status::Qualification => 1,
            Status::Proposition => 2,
            Status::Negociation => 3,
            Status::Gagne => 4,
            Status::Perdu => 5,
        }
    }

    /// Won or lost.
    pub fn is_closed(self) -> bool {
        matches!(self, Status::Gagne | Status::Perdu)
    }

    /// Win probability assumed when a write does not supply one.
    pub fn default_probability(self) -> i32 {
        match self {
            Status::Prospect => 10,
            Status::Qualification => 25,
            Status::Proposition => 50,
            Status::Negociation => 75,
            Status::Gagne => 100,
            Status::Perdu => 0,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
