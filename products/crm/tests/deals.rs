mod common;

use std::time::Duration;

use common::{deal, insert_company, insert_contact, insert_user, sqlite_store};
use products_crm::{DealError, DealFilter, DealInput, DealStatus, DealStore};
use uuid::Uuid;

#[tokio::test]
async fn create_applies_defaults() {
    let store = sqlite_store().await;
    let created = store.create(DealInput::titled("Website redesign")).await.unwrap();

    assert_eq!(created.status, DealStatus::Prospect);
    assert_eq!(created.amount, 0.0);
    assert_eq!(created.probability, 10);
    assert_eq!(created.weighted_amount, 0.0);
    assert!(created.closed_at.is_none());
    assert_eq!(created.created_at, created.updated_at);
}

#[tokio::test]
async fn create_rejects_blank_title_and_bad_status() {
    let store = sqlite_store().await;

    let err = store.create(DealInput::titled("   ")).await.unwrap_err();
    assert!(matches!(err, DealError::Validation(_)));

    let err = store.create(deal("Audit", "won", 10.0)).await.unwrap_err();
    assert!(matches!(err, DealError::InvalidStatus(ref s) if s == "won"));

    let all = store.list(DealFilter::default()).await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn closed_at_tracks_terminal_stages() {
    let store = sqlite_store().await;
    for status in DealStatus::FUNNEL {
        let created = store
            .create(deal("Stage check", status.as_str(), 100.0))
            .await
            .unwrap();
        assert_eq!(created.status, status);
        assert_eq!(created.closed_at.is_some(), status.is_closed(), "{status}");
    }

    let open = store.create(DealInput::titled("Reopen me")).await.unwrap();
    let won = store.transition_status(open.id, "gagne").await.unwrap();
    assert!(won.closed_at.is_some());
    let reopened = store.transition_status(open.id, "negociation").await.unwrap();
    assert!(reopened.closed_at.is_none());
}

#[tokio::test]
async fn proposition_deal_moves_to_won() {
    let store = sqlite_store().await;
    let created = store.create(deal("Pilot", "proposition", 1000.0)).await.unwrap();
    assert_eq!(created.probability, 50);
    assert_eq!(created.weighted_amount, 500.0);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.summary.total_deals, 1);
    assert_eq!(stats.summary.total_value, 1000.0);
    assert_eq!(stats.summary.weighted_value, 500.0);
    assert_eq!(stats.summary.won_value, 0.0);
    assert_eq!(stats.summary.active_deals, 1);

    let won = store.transition_status(created.id, "gagne").await.unwrap();
    assert_eq!(won.status, DealStatus::Gagne);
    assert!(won.closed_at.is_some());
    assert_eq!(won.probability, 50);
    assert_eq!(won.weighted_amount, 500.0);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.summary.won_value, 1000.0);
    assert_eq!(stats.summary.active_deals, 0);
}

#[tokio::test]
async fn unknown_transition_leaves_deal_unchanged() {
    let store = sqlite_store().await;
    let created = store.create(deal("Renewal", "qualification", 250.0)).await.unwrap();

    let err = store.transition_status(created.id, "unknown").await.unwrap_err();
    assert!(matches!(err, DealError::InvalidStatus(_)));

    let stored = store.get(created.id).await.unwrap();
    assert_eq!(stored.deal, created);
}

#[tokio::test]
async fn missing_deals_report_not_found() {
    let store = sqlite_store().await;
    let id = Uuid::new_v4();

    assert!(matches!(store.get(id).await, Err(DealError::NotFound(got)) if got == id));
    assert!(matches!(store.delete(id).await, Err(DealError::NotFound(_))));
    assert!(matches!(
        store.update(id, DealInput::titled("Ghost")).await,
        Err(DealError::NotFound(_))
    ));
    assert!(matches!(
        store.transition_status(id, "gagne").await,
        Err(DealError::NotFound(_))
    ));
    // Status is checked before the lookup.
    assert!(matches!(
        store.transition_status(id, "bogus").await,
        Err(DealError::InvalidStatus(_))
    ));
}

#[tokio::test]
async fn update_replaces_every_writable_field() {
    let store = sqlite_store().await;
    let company = insert_company(store.connection(), "Acme").await;
    let created = store
        .create(DealInput {
            description: Some("first pass".into()),
            company_id: Some(company.id),
            probability: Some(80),
            ..deal("Expansion", "negociation", 4000.0)
        })
        .await
        .unwrap();
    assert_eq!(created.weighted_amount, 3200.0);

    let updated = store
        .update(created.id, deal("Expansion v2", "perdu", 3000.0))
        .await
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.title, "Expansion v2");
    assert_eq!(updated.description, None);
    assert_eq!(updated.company_id, None);
    assert_eq!(updated.status, DealStatus::Perdu);
    assert_eq!(updated.probability, 0);
    assert_eq!(updated.weighted_amount, 0.0);
    assert!(updated.closed_at.is_some());
    assert_eq!(updated.created_at, created.created_at);

    let err = store
        .update(created.id, DealInput::titled(""))
        .await
        .unwrap_err();
    assert!(matches!(err, DealError::Validation(_)));
}

#[tokio::test]
async fn delete_removes_the_deal() {
    let store = sqlite_store().await;
    let created = store.create(DealInput::titled("Short lived")).await.unwrap();
    store.delete(created.id).await.unwrap();
    assert!(matches!(store.get(created.id).await, Err(DealError::NotFound(_))));
    assert!(matches!(store.delete(created.id).await, Err(DealError::NotFound(_))));
}

#[tokio::test]
async fn get_enriches_with_related_names() {
    let store = sqlite_store().await;
    let db = store.connection();
    let company = insert_company(db, "Globex").await;
    let contact = insert_contact(
        db,
        Some("Hank"),
        Some("Scorpio"),
        Some("hank@globex.test"),
        Some(company.id),
    )
    .await;
    let owner = insert_user(db, "rep@crm.test", "Sales Rep").await;

    let created = store
        .create(DealInput {
            contact_id: Some(contact.id),
            company_id: Some(company.id),
            assigned_to: Some(owner.id),
            ..deal("Doomsday device", "qualification", 9000.0)
        })
        .await
        .unwrap();

    let detail = store.get(created.id).await.unwrap();
    assert_eq!(detail.deal, created);
    assert_eq!(detail.contact_name.as_deref(), Some("Hank Scorpio"));
    assert_eq!(detail.contact_email.as_deref(), Some("hank@globex.test"));
    assert_eq!(detail.company_name.as_deref(), Some("Globex"));
    assert_eq!(detail.assigned_to_name.as_deref(), Some("Sales Rep"));

    let bare = store.create(DealInput::titled("No relations")).await.unwrap();
    let detail = store.get(bare.id).await.unwrap();
    assert_eq!(detail.contact_name, None);
    assert_eq!(detail.contact_email, None);
    assert_eq!(detail.company_name, None);
    assert_eq!(detail.assigned_to_name, None);
}

#[tokio::test]
async fn list_is_newest_first() {
    let store = sqlite_store().await;
    let mut ids = Vec::new();
    for title in ["first", "second", "third"] {
        ids.push(store.create(DealInput::titled(title)).await.unwrap().id);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let listed: Vec<Uuid> = store
        .list(DealFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.deal.id)
        .collect();
    ids.reverse();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn unknown_status_filter_is_ignored() {
    let store = sqlite_store().await;
    store.create(deal("A", "prospect", 1.0)).await.unwrap();
    store.create(deal("B", "gagne", 2.0)).await.unwrap();

    let unfiltered = store.list(DealFilter::default()).await.unwrap();
    let bogus = store
        .list(DealFilter {
            status: Some("bogus".into()),
            ..DealFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(bogus, unfiltered);
    assert_eq!(bogus.len(), 2);

    let won = store
        .list(DealFilter {
            status: Some("gagne".into()),
            ..DealFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(won.len(), 1);
    assert_eq!(won[0].deal.title, "B");
}

#[tokio::test]
async fn list_filters_by_assignee_and_title_search() {
    let store = sqlite_store().await;
    let alice = insert_user(store.connection(), "alice@crm.test", "Alice").await;
    store
        .create(DealInput {
            assigned_to: Some(alice.id),
            ..DealInput::titled("Cloud Migration")
        })
        .await
        .unwrap();
    store.create(DealInput::titled("cloud backup")).await.unwrap();
    store.create(DealInput::titled("On-prem support")).await.unwrap();

    let mine = store
        .list(DealFilter {
            assigned_to: Some(alice.id),
            ..DealFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].assigned_to_name.as_deref(), Some("Alice"));

    let cloud = store
        .list(DealFilter {
            q: Some("CLOUD".into()),
            ..DealFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(cloud.len(), 2);

    let blank = store
        .list(DealFilter {
            q: Some("  ".into()),
            ..DealFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(blank.len(), 3);

    let combined = store
        .list(DealFilter {
            assigned_to: Some(alice.id),
            q: Some("backup".into()),
            ..DealFilter::default()
        })
        .await
        .unwrap();
    assert!(combined.is_empty());
}

#[tokio::test]
async fn empty_pipeline_reports_zeroes() {
    let store = sqlite_store().await;
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.summary.total_deals, 0);
    assert_eq!(stats.summary.total_value, 0.0);
    assert_eq!(stats.summary.weighted_value, 0.0);
    assert_eq!(stats.summary.won_value, 0.0);
    assert_eq!(stats.summary.active_deals, 0);
    assert!(stats.by_status.is_empty());
}

#[tokio::test]
async fn breakdown_follows_funnel_order() {
    let store = sqlite_store().await;
    // Inserted out of funnel order on purpose.
    store.create(deal("lost", "perdu", 50.0)).await.unwrap();
    store.create(deal("won", "gagne", 300.0)).await.unwrap();
    store.create(deal("new", "prospect", 100.0)).await.unwrap();
    store.create(deal("new too", "prospect", 20.0)).await.unwrap();

    let stats = store.stats().await.unwrap();
    let order: Vec<DealStatus> = stats.by_status.iter().map(|s| s.status).collect();
    assert_eq!(
        order,
        vec![DealStatus::Prospect, DealStatus::Gagne, DealStatus::Perdu]
    );
    assert_eq!(stats.by_status[0].count, 2);
    assert_eq!(stats.by_status[0].total_amount, 120.0);

    assert_eq!(stats.summary.total_deals, 4);
    assert_eq!(stats.summary.total_value, 470.0);
    assert_eq!(stats.summary.won_value, 300.0);
    assert_eq!(stats.summary.active_deals, 2);
    // prospect 10% of 120 + gagne 100% of 300 + perdu 0%
    assert_eq!(stats.summary.weighted_value, 312.0);
}

#[tokio::test]
async fn weighted_amount_matches_amount_and_probability() {
    let store = sqlite_store().await;
    let created = store
        .create(DealInput {
            probability: Some(33),
            ..deal("Odd split", "qualification", 150.0)
        })
        .await
        .unwrap();
    assert_eq!(created.weighted_amount, 150.0 * 33.0 / 100.0);

    let moved = store.transition_status(created.id, "perdu").await.unwrap();
    assert_eq!(moved.probability, 33);
    assert_eq!(moved.weighted_amount, created.weighted_amount);
}

#[tokio::test]
async fn update_reopening_a_closed_deal_clears_closed_at() {
    let store = sqlite_store().await;
    for closed in ["gagne", "perdu"] {
        let created = store.create(deal("Reopened", closed, 700.0)).await.unwrap();
        assert!(created.closed_at.is_some());

        let reopened = store
            .update(created.id, deal("Reopened", "negociation", 700.0))
            .await
            .unwrap();
        assert_eq!(reopened.status, DealStatus::Negociation);
        assert!(reopened.closed_at.is_none(), "{closed} -> negociation");

        let stored = store.get(created.id).await.unwrap();
        assert!(stored.deal.closed_at.is_none());
    }
}

#[tokio::test]
async fn update_keeping_a_closed_status_keeps_closed_at() {
    let store = sqlite_store().await;
    let created = store.create(deal("Signed", "gagne", 900.0)).await.unwrap();

    let updated = store
        .update(created.id, deal("Signed, amended", "gagne", 950.0))
        .await
        .unwrap();
    assert_eq!(updated.status, DealStatus::Gagne);
    assert!(updated.closed_at.is_some());

    let lost = store
        .update(created.id, deal("Signed, amended", "perdu", 950.0))
        .await
        .unwrap();
    assert!(lost.closed_at.is_some());
}

async fn search_titles(store: &DealStore, q: &str) -> Vec<String> {
    let mut titles: Vec<String> = store
        .list(DealFilter {
            q: Some(q.into()),
            ..DealFilter::default()
        })
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.deal.title)
        .collect();
    titles.sort();
    titles
}

#[tokio::test]
async fn title_search_treats_wildcards_literally() {
    let store = sqlite_store().await;
    for title in ["100% renewal", "1000 seats", "abc", "a_b test", r"c:\temp"] {
        store.create(DealInput::titled(title)).await.unwrap();
    }

    assert_eq!(search_titles(&store, "100%").await, vec!["100% renewal"]);
    assert_eq!(search_titles(&store, "_").await, vec!["a_b test"]);
    assert_eq!(search_titles(&store, "%").await, vec!["100% renewal"]);
    assert_eq!(search_titles(&store, r"\").await, vec![r"c:\temp"]);
    assert_eq!(search_titles(&store, "100").await, vec!["100% renewal", "1000 seats"]);
}

#[tokio::test]
async fn title_search_folds_ascii_case_and_matches_exact_accents() {
    let store = sqlite_store().await;
    store.create(DealInput::titled("Étude de marché")).await.unwrap();

    assert_eq!(search_titles(&store, "DE MARCH").await, vec!["Étude de marché"]);
    assert_eq!(search_titles(&store, "marché").await, vec!["Étude de marché"]);
    assert_eq!(search_titles(&store, "tude").await, vec!["Étude de marché"]);
}
