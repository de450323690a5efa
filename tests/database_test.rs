//! Database functionality tests
//!
//! Tests for migrations, entity operations and the lead administration queries

mod common;

use anyhow::Result;
use chrono::Utc;
use ::leads::database::entities::{files, form_fields, forms, lead_data, lead_exports, leads, members};
use ::leads::services::{format_lead_value, LeadService};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::json;

use common::{create_form, setup_test_db};

#[tokio::test]
async fn test_database_migrations() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    assert_eq!(forms::Entity::find().all(&db).await?.len(), 0);
    assert_eq!(form_fields::Entity::find().all(&db).await?.len(), 0);
    assert_eq!(leads::Entity::find().all(&db).await?.len(), 0);
    assert_eq!(lead_data::Entity::find().all(&db).await?.len(), 0);
    assert_eq!(lead_exports::Entity::find().all(&db).await?.len(), 0);
    assert_eq!(files::Entity::find().all(&db).await?.len(), 0);
    assert_eq!(members::Entity::find().all(&db).await?.len(), 0);

    Ok(())
}

async fn insert_lead(
    db: &sea_orm::DatabaseConnection,
    form_id: i32,
    master_id: i32,
    created: i64,
) -> Result<leads::Model> {
    let lead = leads::ActiveModel {
        tstamp: Set(created),
        created: Set(created),
        language: Set("en".to_string()),
        form_id: Set(form_id),
        master_id: Set(master_id),
        member_id: Set(0),
        post_data: Set(json!({})),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(lead)
}

#[tokio::test]
async fn test_navigation_lists_master_forms_and_orphans() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    let contact = create_form(&db, "Contact", true, None).await?;
    let newsletter = create_form(&db, "Newsletter", true, None).await?;
    create_form(&db, "Satellite", true, Some(contact.id)).await?;
    create_form(&db, "Disabled", false, None).await?;

    // Menu label overrides the title
    let mut active: forms::ActiveModel = newsletter.into();
    active.lead_menu_label = Set(Some("A newsletter".to_string()));
    active.update(&db).await?;

    insert_lead(&db, 99, 99, Utc::now().timestamp()).await?;

    let service = LeadService::new(db.clone());

    let entries = service.navigation(false).await?;
    let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
    assert_eq!(labels, vec!["A newsletter", "Contact"]);

    let entries = service.navigation(true).await?;
    let orphan = entries.iter().find(|e| e.orphan).expect("orphan entry");
    assert_eq!(orphan.master_id, 99);
    assert_eq!(orphan.label, "ID 99");

    Ok(())
}

#[tokio::test]
async fn test_list_show_and_delete_leads() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let form = create_form(&db, "Contact", true, None).await?;

    let older = insert_lead(&db, form.id, form.id, 1_700_000_000).await?;
    let newer = insert_lead(&db, form.id, form.id, 1_700_000_100).await?;

    lead_data::ActiveModel {
        lead_id: Set(older.id),
        sorting: Set(1),
        tstamp: Set(older.created),
        master_id: Set(1),
        field_id: Set(1),
        name: Set("interests".to_string()),
        value: Set(json!(["a", "b"])),
        label: Set(json!(["Apples", "Bananas"])),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    let service = LeadService::new(db.clone());

    let listed = service.list_leads(form.id).await?;
    assert_eq!(
        listed.iter().map(|lead| lead.id).collect::<Vec<_>>(),
        vec![newer.id, older.id]
    );

    let details = service.get_lead(older.id).await?;
    assert_eq!(details.data.len(), 1);
    assert_eq!(
        format_lead_value(&details.data[0].value, &details.data[0].label),
        "Apples, Bananas [a, b]"
    );

    assert_eq!(service.delete_leads(&[older.id]).await?, 1);
    assert!(service.get_lead(older.id).await.unwrap_err().is_not_found());
    let remaining = lead_data::Entity::find()
        .filter(lead_data::Column::LeadId.eq(older.id))
        .all(&db)
        .await?;
    assert!(remaining.is_empty());

    Ok(())
}
