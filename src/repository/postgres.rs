use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, Row};

use super::{DocumentStore, embedded::migrations};
use crate::{
    error::StoreError,
    models::{Note, NoteFields, NoteId},
};

/// Notes kept as JSONB documents in a Postgres table.
pub struct PgDocumentStore {
    client: Client,
}

impl PgDocumentStore {
    pub async fn new(database_dsn: &str) -> Result<Self, tokio_postgres::Error> {
        let (client, con) = tokio_postgres::connect(database_dsn, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = con.await {
                tracing::error!("connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    pub async fn migrate(&mut self) -> Result<(), refinery::Error> {
        let migrations_report = migrations::runner().run_async(&mut self.client).await?;

        for migration in migrations_report.applied_migrations() {
            tracing::info!(
                "Migration Applied -  Name: {}, Version: {}",
                migration.name(),
                migration.version()
            );
        }

        tracing::info!("DB migrations finished!");

        Ok(())
    }
}

fn to_document(fields: &NoteFields) -> serde_json::Value {
    serde_json::json!({
        "headline": fields.headline,
        "body": fields.body,
        "hasImage": fields.has_image,
    })
}

fn row_to_note(row: &Row) -> Result<Note, StoreError> {
    let id: String = row.get("id");
    let document: serde_json::Value = row.get("document");

    let fields: NoteFields =
        serde_json::from_value(document).map_err(|e| StoreError::MalformedDocument {
            id: id.clone(),
            reason: e.to_string(),
        })?;

    Ok(Note::from_document(NoteId::from(id), fields))
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, fields: &NoteFields) -> Result<NoteId, StoreError> {
        let row = self
            .client
            .query_one(
                "INSERT INTO notes (document) VALUES ($1) RETURNING id",
                &[&to_document(fields)],
            )
            .await?;

        Ok(NoteId::from(row.get::<_, String>("id")))
    }

    async fn read_all(&self) -> Result<Vec<Note>, StoreError> {
        let rows = self
            .client
            .query("SELECT id, document FROM notes", &[])
            .await?;

        let mut vec: Vec<Note> = Vec::with_capacity(rows.len());

        for row in rows {
            vec.push(row_to_note(&row)?);
        }

        Ok(vec)
    }

    async fn read(&self, id: &NoteId) -> Result<Option<Note>, StoreError> {
        let row = self
            .client
            .query_opt(
                "SELECT id, document FROM notes WHERE id = $1",
                &[&id.as_str()],
            )
            .await?;

        row.as_ref().map(row_to_note).transpose()
    }

    async fn update(&self, id: &NoteId, fields: &NoteFields) -> Result<(), StoreError> {
        let rows = self
            .client
            .execute(
                "UPDATE notes SET document = $1 WHERE id = $2",
                &[&to_document(fields), &id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(StoreError::NotFound(format!("note {id}")));
        }

        Ok(())
    }

    async fn delete(&self, id: &NoteId) -> Result<(), StoreError> {
        let rows = self
            .client
            .execute("DELETE FROM notes WHERE id = $1", &[&id.as_str()])
            .await?;

        if rows == 0 {
            tracing::debug!(id = %id, "delete of missing note ignored");
        }

        Ok(())
    }
}
