//! Export pipeline tests

mod common;

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use ::leads::config::DateFormats;
use ::leads::database::entities::{form_fields, forms, lead_data, lead_exports, leads, members};
use ::leads::export::{ExportArtifact, ExporterRegistry, HandlebarsRenderer};
use ::leads::normalize::ValueNormalizer;
use ::leads::services::{
    DatabaseFileResolver, ExportService, FormService, Submission, SubmissionService,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::{json, Value};

use common::{create_export, create_form, setup_test_db, FieldFixture};

struct Fixture {
    db: DatabaseConnection,
    form: forms::Model,
    name: form_fields::Model,
    signup_date: form_fields::Model,
    interests: form_fields::Model,
    lead_id: i32,
    _temp_file: tempfile::NamedTempFile,
}

/// A master form with one recorded lead: Alice, signed up 2024-01-15,
/// interested in apples and bananas
async fn fixture() -> Result<Fixture> {
    let (db, temp_file) = setup_test_db().await?;
    let form = create_form(&db, "Contact", true, None).await?;

    let name = FieldFixture::new("name", 1).insert(&db, form.id).await?;
    let signup_date = FieldFixture::new("signup_date", 2)
        .rgxp("date")
        .insert(&db, form.id)
        .await?;
    let interests = FieldFixture::new("interests", 3)
        .kind("checkbox")
        .choices(json!([
            {"value": "a", "label": "Apples"},
            {"value": "b", "label": "Bananas"},
            {"value": "c", "label": "Cherries"}
        ]))
        .insert(&db, form.id)
        .await?;

    let lead_id = record_lead(
        &db,
        form.id,
        json!({
            "name": "Alice",
            "signup_date": "2024-01-15",
            "interests": ["a", "b"]
        }),
        None,
    )
    .await?;

    Ok(Fixture {
        db,
        form,
        name,
        signup_date,
        interests,
        lead_id,
        _temp_file: temp_file,
    })
}

async fn record_lead(
    db: &DatabaseConnection,
    form_id: i32,
    post: Value,
    member_id: Option<i32>,
) -> Result<i32> {
    let recorder = SubmissionService::new(
        db.clone(),
        ValueNormalizer::default(),
        Arc::new(DatabaseFileResolver::new(db.clone())),
        "en",
    );
    let definition = FormService::new(db.clone()).get_form(form_id).await?;
    let submission = Submission {
        post: match post {
            Value::Object(map) => map,
            _ => unreachable!(),
        },
        member_id,
        ..Default::default()
    };
    let lead_id = recorder
        .record_submission(&submission, &definition)
        .await?
        .expect("lead recorded");
    Ok(lead_id)
}

/// Store a lead with only a name, bypassing the recorder to control `created`
async fn insert_named_lead(fx: &Fixture, name: &str, created: i64) -> Result<i32> {
    let lead = leads::ActiveModel {
        tstamp: Set(created),
        created: Set(created),
        language: Set("en".to_string()),
        form_id: Set(fx.form.id),
        master_id: Set(fx.form.id),
        member_id: Set(0),
        post_data: Set(json!({ "name": name })),
        ..Default::default()
    }
    .insert(&fx.db)
    .await?;
    lead_data::ActiveModel {
        lead_id: Set(lead.id),
        sorting: Set(1),
        tstamp: Set(created),
        master_id: Set(fx.name.id),
        field_id: Set(fx.name.id),
        name: Set("name".to_string()),
        value: Set(json!(name)),
        label: Set(json!(name)),
        ..Default::default()
    }
    .insert(&fx.db)
    .await?;
    Ok(lead.id)
}

fn export_service(db: &DatabaseConnection) -> ExportService {
    ExportService::new(
        db.clone(),
        Arc::new(ExporterRegistry::with_defaults()),
        Arc::new(HandlebarsRenderer::new()),
        DateFormats::default(),
    )
}

fn records(artifact: &ExportArtifact, delimiter: u8) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .from_reader(artifact.bytes.as_slice())
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn test_unregistered_type_produces_nothing() -> Result<()> {
    let fx = fixture().await?;
    let config = create_export(&fx.db, fx.form.id, "pdf", "all", None).await?;

    let service = export_service(&fx.db);
    assert!(service.export(config.id, None).await?.is_none());
    assert!(service.export(config.id + 100, None).await?.is_none());

    let stored = lead_exports::Entity::find_by_id(config.id)
        .one(&fx.db)
        .await?
        .expect("config row");
    assert_eq!(stored.last_run, None);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_columns_direct_and_legacy() -> Result<()> {
    let fx = fixture().await?;
    let columns = format!(
        r#"[{{"field": {id}, "format": "date"}}, {{"field": "{id}", "format": "raw", "value": "value"}}]"#,
        id = fx.signup_date.id
    );

    let direct = create_export(&fx.db, fx.form.id, "csv", "fields", Some(&columns)).await?;
    let legacy = create_export(&fx.db, fx.form.id, "csv_legacy", "fields", Some(&columns)).await?;
    let service = export_service(&fx.db);

    let artifact = service.export(direct.id, None).await?.expect("csv output");
    assert_eq!(artifact.filename, "leads.csv");
    assert_eq!(artifact.content_type, "text/csv");
    assert_eq!(
        records(&artifact, b','),
        vec![
            vec!["signup_date", "signup_date"],
            vec!["2024-01-15", "1705276800"],
        ]
    );

    let artifact = service.export(legacy.id, None).await?.expect("legacy output");
    assert_eq!(
        records(&artifact, b';'),
        vec![vec!["signup_date"], vec!["1705276800"]]
    );

    // A name and an id pointing at the same field collapse as well
    let columns = format!(
        r#"[{{"field": "signup_date", "format": "date"}}, {{"field": "name"}}, {{"field": {}}}]"#,
        fx.signup_date.id
    );
    let mixed = create_export(&fx.db, fx.form.id, "csv_legacy", "fields", Some(&columns)).await?;
    let artifact = service.export(mixed.id, None).await?.expect("legacy output");
    assert_eq!(
        records(&artifact, b';'),
        vec![vec!["signup_date", "name"], vec!["1705276800", "Alice"]]
    );

    Ok(())
}

#[tokio::test]
async fn test_date_column_renders_calendar_date() -> Result<()> {
    let fx = fixture().await?;
    let columns = format!(
        r#"[{{"field": "name"}}, {{"field": {}, "format": "datim", "name": "Signed up"}}, {{"field": "_skip"}}]"#,
        fx.signup_date.id
    );
    let config = create_export(&fx.db, fx.form.id, "csv", "fields", Some(&columns)).await?;

    let artifact = export_service(&fx.db)
        .export(config.id, Some(&[fx.lead_id][..]))
        .await?
        .expect("csv output");

    assert_eq!(
        records(&artifact, b','),
        vec![
            vec!["name", "Signed up", ""],
            vec!["Alice", "2024-01-15 00:00", ""],
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_expanded_choices() -> Result<()> {
    let fx = fixture().await?;
    let columns = format!(
        r#"[{{"field": {}, "expand_choices": true, "name": "Likes"}}]"#,
        fx.interests.id
    );
    let config = create_export(&fx.db, fx.form.id, "csv", "fields", Some(&columns)).await?;

    let artifact = export_service(&fx.db)
        .export(config.id, None)
        .await?
        .expect("csv output");

    assert_eq!(
        records(&artifact, b','),
        vec![
            vec!["Likes: Apples", "Likes: Bananas", "Likes: Cherries"],
            vec!["1", "1", ""],
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_token_export_sets_choice_flags() -> Result<()> {
    let fx = fixture().await?;
    let config = create_export(&fx.db, fx.form.id, "text", "tokens", None).await?;

    let mut active: lead_exports::ActiveModel = config.clone().into();
    active.header_fields = Set(false);
    active.token_template = Set(Some("{{name}}: {{interests_a}} {{interests_b}}".to_string()));
    active.token_fields = Set(Some(format!(r#"["name", {}]"#, fx.interests.id)));
    active.update(&fx.db).await?;

    let artifact = export_service(&fx.db)
        .export(config.id, None)
        .await?
        .expect("text output");

    assert_eq!(artifact.filename, "leads.txt");
    assert_eq!(String::from_utf8(artifact.bytes)?, "Alice: 1 1\n");

    Ok(())
}

#[tokio::test]
async fn test_token_export_formats_dates() -> Result<()> {
    let fx = fixture().await?;
    let config = create_export(&fx.db, fx.form.id, "text", "tokens", None).await?;

    let mut active: lead_exports::ActiveModel = config.clone().into();
    active.header_fields = Set(false);
    active.token_template = Set(Some("{{name}} since {{signup_date}}".to_string()));
    active.token_fields = Set(Some(
        r#"["name", {"field": "signup_date", "format": "date"}]"#.to_string(),
    ));
    active.update(&fx.db).await?;

    let service = export_service(&fx.db);
    let artifact = service.export(config.id, None).await?.expect("text output");
    assert_eq!(String::from_utf8(artifact.bytes)?, "Alice since 2024-01-15\n");

    // Without token fields, every field is exposed with the format of its column
    let columns = r#"[{"field": "signup_date", "format": "datim"}]"#;
    let config = create_export(&fx.db, fx.form.id, "text", "tokens", Some(columns)).await?;
    let mut active: lead_exports::ActiveModel = config.clone().into();
    active.header_fields = Set(false);
    active.token_template = Set(Some("{{signup_date}}".to_string()));
    active.update(&fx.db).await?;

    let artifact = service.export(config.id, None).await?.expect("text output");
    assert_eq!(String::from_utf8(artifact.bytes)?, "2024-01-15 00:00\n");

    Ok(())
}

#[tokio::test]
async fn test_member_column_shows_member_name() -> Result<()> {
    let fx = fixture().await?;
    let member = members::ActiveModel {
        firstname: Set("Jane".to_string()),
        lastname: Set("Doe".to_string()),
        ..Default::default()
    }
    .insert(&fx.db)
    .await?;
    let lead_id = record_lead(&fx.db, fx.form.id, json!({"name": "Jane"}), Some(member.id)).await?;

    let columns = r#"[{"field": "_member"}, {"field": "name"}]"#;
    let config = create_export(&fx.db, fx.form.id, "csv", "fields", Some(columns)).await?;

    let artifact = export_service(&fx.db)
        .export(config.id, Some(&[lead_id, fx.lead_id][..]))
        .await?
        .expect("csv output");
    let rows = records(&artifact, b',');

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], vec!["Member", "name"]);
    assert_eq!(rows[1], vec![format!("Jane Doe [{}]", member.id), "Jane".to_string()]);
    assert_eq!(rows[2], vec!["0", "Alice"]);

    Ok(())
}

#[tokio::test]
async fn test_all_mode_uses_system_columns_and_fields() -> Result<()> {
    let fx = fixture().await?;
    let config = create_export(&fx.db, fx.form.id, "csv", "all", None).await?;

    let artifact = export_service(&fx.db)
        .export(config.id, None)
        .await?
        .expect("csv output");
    let rows = records(&artifact, b',');

    assert_eq!(
        rows[0],
        vec!["Form", "Created", "Member", "name", "signup_date", "interests"]
    );
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][0], format!("Contact [{}]", fx.form.id));
    assert_eq!(rows[1][2], "0");
    assert_eq!(rows[1][3], "Alice");
    assert_eq!(rows[1][4], "1705276800");
    assert_eq!(rows[1][5], "Apples, Bananas [a, b]");

    Ok(())
}

#[tokio::test]
async fn test_skip_last_run_exports_only_new_leads() -> Result<()> {
    let fx = fixture().await?;

    // Alice signed up an hour before the first run
    let mut alice: leads::ActiveModel = leads::Entity::find_by_id(fx.lead_id)
        .one(&fx.db)
        .await?
        .expect("lead row")
        .into();
    alice.created = Set(Utc::now().timestamp() - 3600);
    alice.update(&fx.db).await?;

    let config = create_export(&fx.db, fx.form.id, "csv", "fields", Some(r#"[{"field": "name"}]"#))
        .await?;
    let service = export_service(&fx.db);

    let before = Utc::now().timestamp();
    let artifact = service.export(config.id, None).await?.expect("first run");
    let after = Utc::now().timestamp();
    assert_eq!(records(&artifact, b','), vec![vec!["name"], vec!["Alice"]]);

    let stored = lead_exports::Entity::find_by_id(config.id)
        .one(&fx.db)
        .await?
        .expect("config row");
    let last_run = stored.last_run.expect("last run recorded");
    assert!(before <= last_run && last_run <= after);

    let mut active: lead_exports::ActiveModel = stored.into();
    active.skip_last_run = Set(true);
    active.update(&fx.db).await?;

    // Committed in the second the first run started, after it loaded
    insert_named_lead(&fx, "Bob", last_run).await?;
    insert_named_lead(&fx, "Carol", last_run - 1).await?;

    let artifact = service.export(config.id, None).await?.expect("second run");
    assert_eq!(records(&artifact, b','), vec![vec!["name"], vec!["Bob"]]);

    Ok(())
}

#[tokio::test]
async fn test_malformed_columns_are_rejected() -> Result<()> {
    let fx = fixture().await?;
    let config = create_export(&fx.db, fx.form.id, "csv", "fields", Some("[{\"field\":")).await?;

    let err = export_service(&fx.db).export(config.id, None).await.unwrap_err();
    assert_eq!(err.error_code(), "INVALID_CONFIGURATION");

    Ok(())
}

#[tokio::test]
async fn test_export_to_dir_writes_artifact() -> Result<()> {
    let fx = fixture().await?;
    let config = create_export(&fx.db, fx.form.id, "xlsx", "all", None).await?;
    let dir = tempfile::tempdir()?;

    let path = export_service(&fx.db)
        .export_to_dir(config.id, None, dir.path())
        .await?
        .expect("written");

    assert_eq!(path, dir.path().join("leads.xlsx"));
    let bytes = std::fs::read(&path)?;
    // xlsx files are zip archives
    assert_eq!(&bytes[..2], b"PK");

    Ok(())
}
