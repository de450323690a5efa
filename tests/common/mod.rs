#![allow(dead_code)]

use anyhow::Result;
use leads::database::entities::{form_fields, forms, lead_exports};
use leads::database::{establish_connection, setup_database};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use tempfile::NamedTempFile;

/// Create a test database connection with migrations
pub async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = establish_connection(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

pub async fn create_form(
    db: &DatabaseConnection,
    title: &str,
    lead_enabled: bool,
    master: Option<i32>,
) -> Result<forms::Model> {
    let form = forms::ActiveModel {
        title: Set(title.to_string()),
        lead_enabled: Set(lead_enabled),
        lead_master: Set(master),
        lead_menu_label: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(form)
}

/// Field builder; stored and visible unless changed
pub struct FieldFixture {
    pub name: String,
    pub field_type: String,
    pub rgxp: Option<String>,
    pub store: bool,
    pub master_field: Option<i32>,
    pub sorting: i32,
    pub invisible: bool,
    pub options: Option<Value>,
}

impl FieldFixture {
    pub fn new(name: &str, sorting: i32) -> Self {
        Self {
            name: name.to_string(),
            field_type: "text".to_string(),
            rgxp: None,
            store: true,
            master_field: None,
            sorting,
            invisible: false,
            options: None,
        }
    }

    pub fn kind(mut self, field_type: &str) -> Self {
        self.field_type = field_type.to_string();
        self
    }

    pub fn rgxp(mut self, rgxp: &str) -> Self {
        self.rgxp = Some(rgxp.to_string());
        self
    }

    pub fn choices(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.invisible = true;
        self
    }

    pub fn feeds(mut self, master_field: i32) -> Self {
        self.master_field = Some(master_field);
        self.store = false;
        self
    }

    pub async fn insert(self, db: &DatabaseConnection, form_id: i32) -> Result<form_fields::Model> {
        let field = form_fields::ActiveModel {
            form_id: Set(form_id),
            name: Set(self.name),
            label: Set(None),
            field_type: Set(self.field_type),
            rgxp: Set(self.rgxp),
            lead_store: Set(self.store),
            lead_master_field: Set(self.master_field),
            sorting: Set(self.sorting),
            invisible: Set(self.invisible),
            options: Set(self.options),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(field)
    }
}

pub async fn create_export(
    db: &DatabaseConnection,
    form_id: i32,
    exporter_type: &str,
    export_mode: &str,
    fields: Option<&str>,
) -> Result<lead_exports::Model> {
    let export = lead_exports::ActiveModel {
        form_id: Set(form_id),
        name: Set("Leads".to_string()),
        exporter_type: Set(exporter_type.to_string()),
        export_mode: Set(export_mode.to_string()),
        header_fields: Set(true),
        fields: Set(fields.map(str::to_string)),
        token_fields: Set(None),
        token_template: Set(None),
        filename: Set(Some("leads".to_string())),
        skip_last_run: Set(false),
        last_run: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(export)
}
