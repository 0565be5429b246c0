use anyhow::{Context, Result};
use mahalla_contacts::db::*;
use sqlx::PgPool;
use std::env;

/// Helper macro to skip tests when database is not available
macro_rules! skip_if_no_db {
    ($test_fn:expr) => {
        match setup_test_db().await {
            Ok(pool) => $test_fn(PgContactStore::new(pool)).await,
            Err(_) => {
                eprintln!("Skipping test: Database not available");
                Ok(())
            }
        }
    };
}

async fn setup_test_db() -> Result<PgPool> {
    // Skip tests if no DATABASE_URL is provided
    let database_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping database tests: DATABASE_URL not set");
            return Err(anyhow::anyhow!("Test database not configured"));
        }
    };

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to test database")?;

    init_database_schema(&pool).await?;

    Ok(pool)
}

/// Each test works in its own group so tests can share one database
async fn clear_group(store: &PgContactStore, group_id: GroupId) -> Result<()> {
    sqlx::query("DELETE FROM contacts WHERE group_id = $1")
        .bind(group_id)
        .execute(store.pool())
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_upsert_round_trip() -> Result<()> {
    skip_if_no_db!(test_upsert_round_trip_impl)
}

async fn test_upsert_round_trip_impl(store: PgContactStore) -> Result<()> {
    let group = -9_000_001;
    clear_group(&store, group).await?;

    assert!(store.upsert_contact("Electrician", "901234567", group).await?);
    let contacts = store.list_contacts(group).await?;
    assert!(contacts.contains(&("Electrician".to_string(), "901234567".to_string())));

    // Second upsert replaces the phone in place
    assert!(store.upsert_contact("Electrician", "998901234567", group).await?);
    let contacts = store.list_contacts(group).await?;
    assert_eq!(
        contacts,
        vec![("Electrician".to_string(), "998901234567".to_string())]
    );
    assert_eq!(store.count_contacts(group).await?, 1);

    let contact = store
        .get_contact("Electrician", group)
        .await?
        .expect("contact should exist");
    assert_eq!(contact.phone, "998901234567");
    assert_eq!(contact.click_count, 0);
    assert!(contact.updated_at >= contact.created_at);

    clear_group(&store, group).await
}

#[tokio::test]
async fn test_list_is_case_insensitive_and_group_scoped() -> Result<()> {
    skip_if_no_db!(test_list_is_case_insensitive_and_group_scoped_impl)
}

async fn test_list_is_case_insensitive_and_group_scoped_impl(store: PgContactStore) -> Result<()> {
    let group = -9_000_002;
    let other = -9_000_003;
    clear_group(&store, group).await?;
    clear_group(&store, other).await?;

    store.upsert_contact("gaz", "104", group).await?;
    store.upsert_contact("Avariya", "101", group).await?;
    store.upsert_contact("Suv", "1055", group).await?;
    store.upsert_contact("Boshqa", "103", other).await?;

    let services: Vec<String> = store
        .list_contacts(group)
        .await?
        .into_iter()
        .map(|(service, _)| service)
        .collect();
    assert_eq!(services, vec!["Avariya", "gaz", "Suv"]);

    let with_clicks = store.list_contacts_with_clicks(group).await?;
    assert_eq!(with_clicks.len(), 3);
    assert!(with_clicks.iter().all(|(_, _, clicks)| *clicks == 0));

    assert_eq!(store.count_contacts(other).await?, 1);

    clear_group(&store, group).await?;
    clear_group(&store, other).await
}

#[tokio::test]
async fn test_click_counts_and_top() -> Result<()> {
    skip_if_no_db!(test_click_counts_and_top_impl)
}

async fn test_click_counts_and_top_impl(store: PgContactStore) -> Result<()> {
    let group = -9_000_004;
    clear_group(&store, group).await?;

    store.upsert_contact("Usta", "901234567", group).await?;
    store.upsert_contact("Gaz", "104", group).await?;

    assert!(store.top_contacts(8, group).await?.is_empty());

    for _ in 0..3 {
        assert!(store.increment_click_count("Usta", group).await?);
    }
    assert!(!store.increment_click_count("Missing", group).await?);

    let top = store.top_contacts(1, group).await?;
    assert_eq!(
        top,
        vec![("Usta".to_string(), "901234567".to_string(), 3)]
    );

    // Gaz has no clicks and is left out
    assert_eq!(store.top_contacts(8, group).await?.len(), 1);

    clear_group(&store, group).await
}

#[tokio::test]
async fn test_concurrent_increments_are_not_lost() -> Result<()> {
    skip_if_no_db!(test_concurrent_increments_are_not_lost_impl)
}

async fn test_concurrent_increments_are_not_lost_impl(store: PgContactStore) -> Result<()> {
    let group = -9_000_005;
    clear_group(&store, group).await?;
    store.upsert_contact("Gaz", "104", group).await?;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.increment_click_count("Gaz", group).await
        }));
    }
    for handle in handles {
        assert!(handle.await??);
    }

    let contact = store.get_contact("Gaz", group).await?.expect("contact");
    assert_eq!(contact.click_count, 20);

    clear_group(&store, group).await
}

#[tokio::test]
async fn test_delete_contact() -> Result<()> {
    skip_if_no_db!(test_delete_contact_impl)
}

async fn test_delete_contact_impl(store: PgContactStore) -> Result<()> {
    let group = -9_000_006;
    clear_group(&store, group).await?;

    store.upsert_contact("Usta", "901234567", group).await?;
    assert!(store.delete_contact("Usta", group).await?);
    assert!(!store.delete_contact("Usta", group).await?);
    assert_eq!(store.get_contact("Usta", group).await?, None);

    Ok(())
}
