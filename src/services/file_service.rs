use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::*;
use tracing::debug;
use uuid::Uuid;

use crate::database::entities::files;
use crate::errors::Result;

/// Resolves stable file references (uuids) to their current path
#[async_trait]
pub trait FileResolver: Send + Sync {
    /// Unknown references are absent from the returned map
    async fn resolve(&self, references: &[String]) -> Result<HashMap<String, String>>;
}

/// Resolver backed by the `files` table
#[derive(Clone)]
pub struct DatabaseFileResolver {
    db: DatabaseConnection,
}

impl DatabaseFileResolver {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FileResolver for DatabaseFileResolver {
    async fn resolve(&self, references: &[String]) -> Result<HashMap<String, String>> {
        // Keyed by parsed uuid so lookups ignore the reference's casing
        let wanted: HashMap<Uuid, &String> = references
            .iter()
            .filter_map(|reference| match Uuid::parse_str(reference) {
                Ok(uuid) => Some((uuid, reference)),
                Err(_) => {
                    debug!("Ignoring malformed file reference '{}'", reference);
                    None
                }
            })
            .collect();

        if wanted.is_empty() {
            return Ok(HashMap::new());
        }

        let found = files::Entity::find()
            .filter(files::Column::Uuid.is_in(wanted.keys().copied().collect::<Vec<_>>()))
            .all(&self.db)
            .await?;

        Ok(found
            .into_iter()
            .filter_map(|file| {
                wanted
                    .get(&file.uuid)
                    .map(|reference| ((*reference).clone(), file.path))
            })
            .collect())
    }
}
