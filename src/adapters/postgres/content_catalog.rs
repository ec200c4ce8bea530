//! PostgreSQL catalog reads and download accounting.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{ContentItem, DownloadEvent, FileKind};
use crate::domain::foundation::{ContentId, DomainError, ErrorCode, UserId};
use crate::ports::{ContentCatalog, DownloadLog};

/// Reads `content_items` and appends to `downloads`.
#[derive(Clone)]
pub struct PostgresContentCatalog {
    pool: PgPool,
}

impl PostgresContentCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ContentItemRow {
    id: String,
    title: String,
    owner_id: String,
    is_free: bool,
    price_cents: i64,
    storage_ref: String,
    file_kind: String,
    download_count: i64,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

impl TryFrom<ContentItemRow> for ContentItem {
    type Error = DomainError;

    fn try_from(row: ContentItemRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::domain::foundation::ValidationError| {
            DomainError::new(ErrorCode::DatabaseError, format!("Corrupt content row: {}", e))
        };

        Ok(ContentItem {
            id: ContentId::new(row.id).map_err(corrupt)?,
            title: row.title,
            owner_id: UserId::new(row.owner_id).map_err(corrupt)?,
            is_free: row.is_free,
            price_cents: row.price_cents,
            storage_ref: row.storage_ref,
            file_kind: row.file_kind.parse::<FileKind>().map_err(corrupt)?,
            download_count: row.download_count,
        })
    }
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl ContentCatalog for PostgresContentCatalog {
    async fn find_by_id(&self, id: &ContentId) -> Result<Option<ContentItem>, DomainError> {
        sqlx::query_as::<_, ContentItemRow>(
            r#"
            SELECT id, title, owner_id, is_free, price_cents, storage_ref, file_kind,
                   download_count, created_at
            FROM content_items
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find content item", e))?
        .map(ContentItem::try_from)
        .transpose()
    }

    async fn list_by_owner(&self, owner_id: &UserId) -> Result<Vec<ContentItem>, DomainError> {
        sqlx::query_as::<_, ContentItemRow>(
            r#"
            SELECT id, title, owner_id, is_free, price_cents, storage_ref, file_kind,
                   download_count, created_at
            FROM content_items
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list content items", e))?
        .into_iter()
        .map(ContentItem::try_from)
        .collect()
    }

    async fn increment_download_count(&self, id: &ContentId) -> Result<(), DomainError> {
        sqlx::query("UPDATE content_items SET download_count = download_count + 1 WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("increment download count", e))?;
        Ok(())
    }
}

#[async_trait]
impl DownloadLog for PostgresContentCatalog {
    async fn record(&self, event: &DownloadEvent) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO downloads (id, user_id, content_id, downloaded_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(event.id.as_uuid())
        .bind(event.user_id.as_str())
        .bind(event.content_id.as_str())
        .bind(event.downloaded_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("record download", e))?;
        Ok(())
    }

    async fn count_for_content(&self, content_ids: &[ContentId]) -> Result<u64, DomainError> {
        let ids: Vec<String> = content_ids.iter().map(|id| id.as_str().to_string()).collect();

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM downloads WHERE content_id = ANY($1)")
                .bind(ids)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("count downloads", e))?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}
