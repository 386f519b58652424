#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use entity::{company, contact, user};
use migration::{Migrator, MigratorTrait};
use products_crm::{DealInput, DealStore};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

/// Fresh in-memory database with the full schema applied.
pub async fn sqlite_store() -> DealStore {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let conn = Database::connect(options)
        .await
        .expect("connect sqlite memory");
    Migrator::up(&conn, None).await.expect("apply migrations");
    DealStore::new(Arc::new(conn))
}

fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

pub async fn insert_company(db: &DatabaseConnection, name: &str) -> company::Model {
    company::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        website: Set(None),
        phone: Set(None),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(db)
    .await
    .expect("insert company")
}

pub async fn insert_contact(
    db: &DatabaseConnection,
    first_name: Option<&str>,
    last_name: Option<&str>,
    email: Option<&str>,
    company_id: Option<Uuid>,
) -> contact::Model {
    contact::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set(first_name.map(str::to_string)),
        last_name: Set(last_name.map(str::to_string)),
        email: Set(email.map(str::to_string)),
        phone: Set(None),
        company_id: Set(company_id),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(db)
    .await
    .expect("insert contact")
}

pub async fn insert_user(db: &DatabaseConnection, email: &str, display_name: &str) -> user::Model {
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        display_name: Set(display_name.to_string()),
        is_active: Set(true),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(db)
    .await
    .expect("insert user")
}

pub fn deal(title: &str, status: &str, amount: f64) -> DealInput {
    DealInput {
        status: Some(status.to_string()),
        amount: Some(amount),
        ..DealInput::titled(title)
    }
}
