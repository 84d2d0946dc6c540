mod common;

use anyhow::Result;
use serde_json::json;

use bloom_tenancy::filter::FilterData;
use bloom_tenancy::TenancyError;

// Isolation invariant: a read issued under one tenant's context never
// returns another tenant's row, regardless of the filter supplied.

#[tokio::test]
async fn reads_are_confined_to_the_context_tenant() -> Result<()> {
    let (tenancy, _store) = common::tenancy();
    let acme = tenancy.establish(common::assertion("acme"));
    let globex = tenancy.establish(common::assertion("globex"));

    acme.create_one("contacts", json!({"email": "a@x.com", "name": "Ada"}))
        .await?;
    globex
        .create_one("contacts", json!({"email": "a@x.com", "name": "Grace"}))
        .await?;

    // Same caller filter, different contexts: each sees only its own row
    let filter = FilterData::where_clause(json!({"email": "a@x.com"}));
    let acme_rows = acme.find_many("contacts", filter.clone()).await?;
    assert_eq!(acme_rows.len(), 1);
    assert_eq!(acme_rows[0]["tenant_id"], json!("acme"));
    assert_eq!(acme_rows[0]["name"], json!("Ada"));

    let globex_rows = globex.find_many("contacts", filter).await?;
    assert_eq!(globex_rows.len(), 1);
    assert_eq!(globex_rows[0]["tenant_id"], json!("globex"));

    Ok(())
}

#[tokio::test]
async fn unfiltered_reads_still_see_only_own_tenant() -> Result<()> {
    let (tenancy, _store) = common::tenancy();
    let acme = tenancy.establish(common::assertion("acme"));
    let globex = tenancy.establish(common::assertion("globex"));

    for i in 0..5 {
        acme.create_one("journal_entries", json!({"n": i})).await?;
    }
    for i in 0..3 {
        globex.create_one("journal_entries", json!({"n": i})).await?;
    }

    let rows = acme.find_many("journal_entries", FilterData::default()).await?;
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r["tenant_id"] == json!("acme")));

    assert_eq!(acme.count("journal_entries", FilterData::default()).await?, 5);
    assert_eq!(globex.count("journal_entries", FilterData::default()).await?, 3);

    Ok(())
}

#[tokio::test]
async fn disjunctive_filters_cannot_escape_the_tenant_scope() -> Result<()> {
    let (tenancy, _store) = common::tenancy();
    let acme = tenancy.establish(common::assertion("acme"));
    let globex = tenancy.establish(common::assertion("globex"));

    acme.create_one("contacts", json!({"name": "Ada"})).await?;
    globex.create_one("contacts", json!({"name": "Grace"})).await?;

    // $or of two names: the tenant predicate is AND-wrapped around it
    let filter = FilterData::where_clause(json!({"$or": [{"name": "Ada"}, {"name": "Grace"}]}));
    let rows = acme.find_many("contacts", filter).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("Ada"));

    Ok(())
}

#[tokio::test]
async fn foreign_tenant_filter_is_rejected_not_honored() -> Result<()> {
    let (tenancy, _store) = common::tenancy();
    let acme = tenancy.establish(common::assertion("acme"));

    let err = acme
        .find_many(
            "contacts",
            FilterData::where_clause(json!({"tenant_id": "globex"})),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::TenantMismatch { .. }));

    // Probes nested inside logical operators are caught too
    let err = acme
        .find_many(
            "contacts",
            FilterData::where_clause(json!({"$or": [{"name": "X"}, {"tenant_id": "globex"}]})),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::TenantMismatch { .. }));

    Ok(())
}

#[tokio::test]
async fn mutations_are_confined_to_the_context_tenant() -> Result<()> {
    let (tenancy, store) = common::tenancy();
    let acme = tenancy.establish(common::assertion("acme"));
    let globex = tenancy.establish(common::assertion("globex"));

    acme.create_many("goals", vec![json!({"done": false}), json!({"done": false})])
        .await?;
    globex.create_one("goals", json!({"done": false})).await?;

    // Blanket update and delete under acme touch only acme rows
    let updated = acme
        .update_many("goals", FilterData::default(), json!({"done": true}))
        .await?;
    assert_eq!(updated.len(), 2);

    let removed = acme.delete_many("goals", FilterData::default()).await?;
    assert_eq!(removed, 2);

    let remaining = store.dump("goals").await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["tenant_id"], json!("globex"));
    assert_eq!(remaining[0]["done"], json!(false));

    Ok(())
}

#[tokio::test]
async fn aggregates_are_tenant_scoped() -> Result<()> {
    let (tenancy, _store) = common::tenancy();
    let acme = tenancy.establish(common::assertion("acme"));
    let globex = tenancy.establish(common::assertion("globex"));

    acme.create_many(
        "journal_entries",
        vec![
            json!({"mood": "good"}),
            json!({"mood": "good"}),
            json!({"mood": "bad"}),
        ],
    )
    .await?;
    globex
        .create_one("journal_entries", json!({"mood": "good"}))
        .await?;

    let groups = acme
        .group_count("journal_entries", FilterData::default(), "mood")
        .await?;
    let good = groups.iter().find(|(k, _)| k == &json!("good")).unwrap();
    assert_eq!(good.1, 2);

    Ok(())
}

#[tokio::test]
async fn global_entities_are_shared_across_contexts() -> Result<()> {
    let (tenancy, _store) = common::tenancy();
    let detached = tenancy.detached();
    let acme = tenancy.establish(common::assertion("acme"));

    detached
        .create_one("tenants", json!({"name": "acme", "plan": "pro"}))
        .await?;
    detached
        .create_one("tenants", json!({"name": "globex", "plan": "free"}))
        .await?;

    // A scoped context reads the directory unfiltered - it is global
    let rows = acme.find_many("tenants", FilterData::default()).await?;
    assert_eq!(rows.len(), 2);

    Ok(())
}
