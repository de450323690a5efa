use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Collaborator tables owned by the host CMS
        manager
            .create_table(
                Table::create()
                    .table(Forms::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Forms::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Forms::Title).string().not_null())
                    .col(
                        ColumnDef::new(Forms::LeadEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Forms::LeadMaster).integer())
                    .col(ColumnDef::new(Forms::LeadMenuLabel).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FormFields::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FormFields::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FormFields::FormId).integer().not_null())
                    .col(ColumnDef::new(FormFields::Name).string().not_null())
                    .col(ColumnDef::new(FormFields::Label).string())
                    .col(
                        ColumnDef::new(FormFields::FieldType)
                            .string()
                            .not_null()
                            .default("text"),
                    )
                    .col(ColumnDef::new(FormFields::Rgxp).string())
                    .col(
                        ColumnDef::new(FormFields::LeadStore)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(FormFields::LeadMasterField).integer())
                    .col(
                        ColumnDef::new(FormFields::Sorting)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(FormFields::Invisible)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(FormFields::Options).json())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_form_fields_form_id")
                            .from(FormFields::Table, FormFields::FormId)
                            .to(Forms::Table, Forms::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Files::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Files::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Files::Uuid).uuid().not_null().unique_key())
                    .col(ColumnDef::new(Files::Path).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Members::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Members::Firstname).string().not_null())
                    .col(ColumnDef::new(Members::Lastname).string().not_null())
                    .to_owned(),
            )
            .await?;

        // Lead tables. Leads deliberately carry no foreign key to forms:
        // orphaned leads outlive their form.
        manager
            .create_table(
                Table::create()
                    .table(Leads::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Leads::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Leads::Tstamp).big_integer().not_null())
                    .col(ColumnDef::new(Leads::Created).big_integer().not_null())
                    .col(ColumnDef::new(Leads::Language).string().not_null())
                    .col(ColumnDef::new(Leads::FormId).integer().not_null())
                    .col(ColumnDef::new(Leads::MasterId).integer().not_null())
                    .col(
                        ColumnDef::new(Leads::MemberId)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Leads::PostData).json().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LeadData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LeadData::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LeadData::LeadId).integer().not_null())
                    .col(
                        ColumnDef::new(LeadData::Sorting)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(LeadData::Tstamp).big_integer().not_null())
                    .col(ColumnDef::new(LeadData::MasterId).integer().not_null())
                    .col(ColumnDef::new(LeadData::FieldId).integer().not_null())
                    .col(ColumnDef::new(LeadData::Name).string().not_null())
                    .col(ColumnDef::new(LeadData::Value).json().not_null())
                    .col(ColumnDef::new(LeadData::Label).json().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lead_data_lead_id")
                            .from(LeadData::Table, LeadData::LeadId)
                            .to(Leads::Table, Leads::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LeadExports::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LeadExports::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LeadExports::FormId).integer().not_null())
                    .col(ColumnDef::new(LeadExports::Name).string().not_null())
                    .col(ColumnDef::new(LeadExports::ExporterType).string().not_null())
                    .col(
                        ColumnDef::new(LeadExports::ExportMode)
                            .string()
                            .not_null()
                            .default("all"),
                    )
                    .col(
                        ColumnDef::new(LeadExports::HeaderFields)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(LeadExports::Fields).text())
                    .col(ColumnDef::new(LeadExports::TokenFields).text())
                    .col(ColumnDef::new(LeadExports::TokenTemplate).text())
                    .col(ColumnDef::new(LeadExports::Filename).string())
                    .col(
                        ColumnDef::new(LeadExports::SkipLastRun)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(LeadExports::LastRun).big_integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lead_exports_form_id")
                            .from(LeadExports::Table, LeadExports::FormId)
                            .to(Forms::Table, Forms::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_leads_master_id")
                    .table(Leads::Table)
                    .col(Leads::MasterId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_lead_data_lead_id")
                    .table(LeadData::Table)
                    .col(LeadData::LeadId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LeadExports::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(LeadData::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Leads::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Files::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(FormFields::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Forms::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Forms {
    Table,
    Id,
    Title,
    LeadEnabled,
    LeadMaster,
    LeadMenuLabel,
}

#[derive(Iden)]
enum FormFields {
    Table,
    Id,
    FormId,
    Name,
    Label,
    FieldType,
    Rgxp,
    LeadStore,
    LeadMasterField,
    Sorting,
    Invisible,
    Options,
}

#[derive(Iden)]
enum Files {
    Table,
    Id,
    Uuid,
    Path,
}

#[derive(Iden)]
enum Members {
    Table,
    Id,
    Firstname,
    Lastname,
}

#[derive(Iden)]
enum Leads {
    Table,
    Id,
    Tstamp,
    Created,
    Language,
    FormId,
    MasterId,
    MemberId,
    PostData,
}

#[derive(Iden)]
enum LeadData {
    Table,
    Id,
    LeadId,
    Sorting,
    Tstamp,
    MasterId,
    FieldId,
    Name,
    Value,
    Label,
}

#[derive(Iden)]
enum LeadExports {
    Table,
    Id,
    FormId,
    Name,
    ExporterType,
    ExportMode,
    HeaderFields,
    Fields,
    TokenFields,
    TokenTemplate,
    Filename,
    SkipLastRun,
    LastRun,
}
