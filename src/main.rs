use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use leads::config::AppConfig;
use leads::database::{establish_connection, get_database_url, setup_database};
use leads::export::{ExporterRegistry, HandlebarsRenderer};
use leads::normalize::ValueNormalizer;
use leads::services::{
    format_lead_value, DatabaseFileResolver, ExportService, FormService, LeadService,
    Submission, SubmissionService, UploadedFile,
};

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// Application settings file
    #[clap(short, long, global = true, default_value = "leads.yaml")]
    settings: String,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    /// Record a submission
    Submit {
        #[clap(short, long)]
        form: i32,
        /// Posted values as a JSON object, inline or as a file path
        #[clap(short, long)]
        data: String,
        /// Uploaded files as a JSON object keyed by field name
        #[clap(long)]
        files: Option<String>,
        #[clap(long)]
        language: Option<String>,
        #[clap(short, long)]
        member: Option<i32>,
    },
    /// Run an export configuration
    Export {
        #[clap(short, long)]
        config: i32,
        /// Restrict the export to these lead ids
        #[clap(long, value_delimiter = ',')]
        leads: Option<Vec<i32>>,
        /// Output directory, defaults to `export_dir` from the settings
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// List master forms collecting leads
    Forms {
        #[clap(long)]
        orphans: bool,
    },
    Show {
        #[clap(long)]
        lead: i32,
    },
    Delete {
        #[clap(long, value_delimiter = ',', required = true)]
        lead: Vec<i32>,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let config = AppConfig::load(&args.settings)?;
    let db = establish_connection(&get_database_url(Some(&config.database))).await?;

    match args.command {
        Commands::Db { command } => match command {
            DbCommands::Init => {
                info!("Initializing database: {}", config.database);
                setup_database(&db).await?;
            }
        },
        Commands::Submit {
            form,
            data,
            files,
            language,
            member,
        } => {
            let submission = Submission {
                post: read_json(&data)?,
                files: match files {
                    Some(files) => read_json::<HashMap<String, UploadedFile>>(&files)?,
                    None => HashMap::new(),
                },
                language,
                member_id: member,
            };

            let form = FormService::new(db.clone()).get_form(form).await?;
            let service = SubmissionService::new(
                db.clone(),
                ValueNormalizer::new(config.date_formats.clone()),
                Arc::new(DatabaseFileResolver::new(db.clone())),
                config.language.clone(),
            );

            match service.record_submission(&submission, &form).await? {
                Some(lead_id) => println!("{}", lead_id),
                None => info!("Form {} does not collect leads", form.id),
            }
        }
        Commands::Export {
            config: config_id,
            leads,
            output,
        } => {
            let service = ExportService::new(
                db.clone(),
                Arc::new(ExporterRegistry::with_defaults()),
                Arc::new(HandlebarsRenderer::new()),
                config.date_formats.clone(),
            );
            let dir = output.unwrap_or_else(|| PathBuf::from(&config.export_dir));

            match service
                .export_to_dir(config_id, leads.as_deref(), &dir)
                .await?
            {
                Some(path) => println!("{}", path.display()),
                None => info!("Export {} produced no output", config_id),
            }
        }
        Commands::Forms { orphans } => {
            for entry in LeadService::new(db.clone()).navigation(orphans).await? {
                println!("{}\t{}", entry.master_id, entry.label);
            }
        }
        Commands::Show { lead } => {
            let details = LeadService::new(db.clone()).get_lead(lead).await?;
            println!(
                "Lead {} (form {}, master {}, language {})",
                details.lead.id, details.lead.form_id, details.lead.master_id, details.lead.language
            );
            for row in &details.data {
                println!("{}: {}", row.name, format_lead_value(&row.value, &row.label));
            }
        }
        Commands::Delete { lead } => {
            let removed = LeadService::new(db.clone()).delete_leads(&lead).await?;
            println!("{}", removed);
        }
    }

    Ok(())
}

/// Parse JSON given inline or as a path to a file
fn read_json<T: DeserializeOwned>(input: &str) -> Result<T> {
    let trimmed = input.trim_start();
    let content = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        input.to_string()
    } else {
        fs::read_to_string(input).with_context(|| format!("Failed to read {}", input))?
    };
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", input))
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(log_level))
        .without_time()
        .init();
}

/// `RUST_LOG` wins when set, the command line level is the fallback
fn log_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("handlebars=off,sqlx=warn,{}", level)))
}
