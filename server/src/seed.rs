use anyhow::{Context, Result};
use chrono::Utc;
use entity::{company, contact, user};
use products_crm::{DealInput, DealStore};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::info;
use uuid::Uuid;

const SEED_USER_EMAIL: &str = "sales@crm.test";

pub async fn run(store: &DealStore) -> Result<()> {
    let db = store.connection();
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(SEED_USER_EMAIL))
        .one(db)
        .await?;
    if existing.is_some() {
        info!("demo data already present; skipping seed");
        return Ok(());
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let sales = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(SEED_USER_EMAIL.into()),
        display_name: Set("Sales Sam".into()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .context("seed user")?;

    let acme = company::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("ACME, Inc.".into()),
        website: Set(Some("https://acme.test".into())),
        phone: Set(Some("+1-555-0100".into())),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .context("seed company")?;

    let ada = contact::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set(Some("Ada".into())),
        last_name: Set(Some("Lovelace".into())),
        email: Set(Some("ada@acme.test".into())),
        phone: Set(None),
        company_id: Set(Some(acme.id)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .context("seed contact")?;

    let deals = [
        ("ACME Pilot", "proposition", 12_000.0),
        ("ACME Support Renewal", "negociation", 4_500.0),
        ("ACME Analytics Add-on", "qualification", 2_000.0),
        ("ACME Training", "prospect", 800.0),
    ];
    let mut created = Vec::with_capacity(deals.len());
    for (title, status, amount) in deals {
        let deal = store
            .create(DealInput {
                status: Some(status.into()),
                amount: Some(amount),
                contact_id: Some(ada.id),
                company_id: Some(acme.id),
                assigned_to: Some(sales.id),
                ..DealInput::titled(title)
            })
            .await
            .with_context(|| format!("seed deal {title}"))?;
        created.push(deal);
    }
    // One closed on each side so the summary has won and lost value.
    store.transition_status(created[1].id, "gagne").await?;
    store.transition_status(created[3].id, "perdu").await?;

    let stats = store.stats().await?;
    info!(
        total_deals = stats.summary.total_deals,
        total_value = stats.summary.total_value,
        weighted_value = stats.summary.weighted_value,
        won_value = stats.summary.won_value,
        active_deals = stats.summary.active_deals,
        "demo pipeline seeded"
    );
    Ok(())
}
