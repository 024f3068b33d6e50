// Postgres persistence for content records and duplicate groups.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use feedline_common::{
    ContentRecord, DedupError, EngagementMetrics, MediaItem, NormalizedContent, Platform,
    ProcessingStatus,
};

use super::{is_stale, DuplicateStore, GroupPlan, NewContentRecord, Result, UpsertOutcome};

pub struct PgContentStore {
    pool: PgPool,
}

/// A row from the content_items table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ContentRow {
    id: Uuid,
    creator_id: String,
    platform: String,
    platform_content_id: String,
    url: Option<String>,
    title: Option<String>,
    description: Option<String>,
    content_body: Option<String>,
    author_name: Option<String>,
    thumbnail_url: Option<String>,
    media_urls: Json<Vec<MediaItem>>,
    engagement_metrics: Json<EngagementMetrics>,
    word_count: i32,
    reading_time_minutes: i32,
    published_at: DateTime<Utc>,
    content_hash: Option<String>,
    duplicate_group_id: Option<Uuid>,
    is_primary: bool,
    processing_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ContentRow {
    fn into_record(self) -> Result<ContentRecord> {
        let platform: Platform = self.platform.parse().map_err(DedupError::store)?;
        let processing_status = ProcessingStatus::parse(&self.processing_status).ok_or_else(|| {
            DedupError::store(format!(
                "unknown processing status '{}' on {}",
                self.processing_status, self.id
            ))
        })?;

        Ok(ContentRecord {
            id: self.id,
            content: NormalizedContent {
                creator_id: self.creator_id,
                platform,
                platform_content_id: self.platform_content_id,
                url: self.url,
                title: self.title,
                description: self.description,
                content_body: self.content_body,
                author_name: self.author_name,
                thumbnail_url: self.thumbnail_url,
                media_urls: self.media_urls.0,
                engagement_metrics: self.engagement_metrics.0,
                word_count: self.word_count.max(0) as u32,
                reading_time_minutes: self.reading_time_minutes.max(0) as u32,
                published_at: self.published_at,
            },
            content_hash: self.content_hash,
            duplicate_group_id: self.duplicate_group_id,
            is_primary: self.is_primary,
            processing_status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn into_records(rows: Vec<ContentRow>) -> Result<Vec<ContentRecord>> {
    rows.into_iter().map(ContentRow::into_record).collect()
}

fn to_i32(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Serialize writers on `key` until the transaction ends.
async fn advisory_lock(tx: &mut Transaction<'_, Postgres>, key: &str) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(key)
        .execute(&mut **tx)
        .await
        .map_err(DedupError::store)?;
    Ok(())
}

async fn ensure_single_primary(tx: &mut Transaction<'_, Postgres>, group_id: Uuid) -> Result<()> {
    let primaries: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM content_items WHERE duplicate_group_id = $1 AND is_primary",
    )
    .bind(group_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(DedupError::store)?;

    if primaries != 1 {
        warn!(%group_id, primaries, "Duplicate group primary count violated, rolling back");
        return Err(DedupError::store(format!(
            "duplicate group {group_id} would have {primaries} primaries"
        )));
    }
    Ok(())
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(DedupError::store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DuplicateStore for PgContentStore {
    async fn find_by_hash(&self, content_hash: &str) -> Result<Vec<ContentRecord>> {
        let rows = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT * FROM content_items
            WHERE content_hash = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(content_hash)
        .fetch_all(&self.pool)
        .await
        .map_err(DedupError::store)?;

        into_records(rows)
    }

    async fn find_recent_social(
        &self,
        creator_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ContentRecord>> {
        let social: Vec<String> = Platform::ALL
            .iter()
            .filter(|p| p.is_social())
            .map(|p| p.as_str().to_string())
            .collect();

        let rows = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT * FROM content_items
            WHERE creator_id = $1
              AND platform = ANY($2)
              AND content_hash IS NOT NULL
              AND published_at >= $3
            ORDER BY published_at DESC, created_at DESC
            "#,
        )
        .bind(creator_id)
        .bind(&social)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(DedupError::store)?;

        into_records(rows)
    }

    async fn find_group(&self, group_id: Uuid) -> Result<Vec<ContentRecord>> {
        let rows = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT * FROM content_items
            WHERE duplicate_group_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DedupError::store)?;

        into_records(rows)
    }

    async fn find_existing(
        &self,
        creator_id: &str,
        platform: Platform,
        platform_content_id: &str,
    ) -> Result<Option<ContentRecord>> {
        let row = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT * FROM content_items
            WHERE platform = $1 AND platform_content_id = $2 AND creator_id = $3
            "#,
        )
        .bind(platform.as_str())
        .bind(platform_content_id)
        .bind(creator_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DedupError::store)?;

        row.map(ContentRow::into_record).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentRecord>> {
        let row = sqlx::query_as::<_, ContentRow>("SELECT * FROM content_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DedupError::store)?;

        row.map(ContentRow::into_record).transpose()
    }

    async fn upsert(
        &self,
        record: NewContentRecord,
        plan: Option<&GroupPlan>,
    ) -> Result<UpsertOutcome> {
        let content = &record.content;
        let mut tx = self.pool.begin().await.map_err(DedupError::store)?;

        advisory_lock(&mut tx, &record.content_hash).await?;
        let mut groups: Vec<Uuid> = plan
            .map(|p| p.group_id)
            .into_iter()
            .chain(record.handover.map(|h| h.group_id))
            .collect();
        groups.sort();
        for group in &groups {
            advisory_lock(&mut tx, &group.to_string()).await?;
        }

        let others = sqlx::query_as::<_, (Uuid, Option<Uuid>)>(
            r#"
            SELECT id, duplicate_group_id FROM content_items
            WHERE content_hash = $1
              AND NOT (platform = $2 AND platform_content_id = $3 AND creator_id = $4)
            "#,
        )
        .bind(&record.content_hash)
        .bind(content.platform.as_str())
        .bind(&content.platform_content_id)
        .bind(&content.creator_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(DedupError::store)?;

        if is_stale(&others, plan) {
            debug!(hash = %record.content_hash, "Resolution went stale before write");
            return Err(DedupError::StaleResolution {
                content_hash: record.content_hash.clone(),
            });
        }

        let (id, created) = sqlx::query_as::<_, (Uuid, bool)>(
            r#"
            INSERT INTO content_items
                (id, creator_id, platform, platform_content_id, url, title,
                 description, content_body, author_name, thumbnail_url,
                 media_urls, engagement_metrics, word_count, reading_time_minutes,
                 published_at, content_hash, duplicate_group_id, is_primary)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (platform, platform_content_id, creator_id) DO UPDATE SET
                url = EXCLUDED.url,
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                content_body = EXCLUDED.content_body,
                author_name = EXCLUDED.author_name,
                thumbnail_url = EXCLUDED.thumbnail_url,
                media_urls = EXCLUDED.media_urls,
                engagement_metrics = EXCLUDED.engagement_metrics,
                word_count = EXCLUDED.word_count,
                reading_time_minutes = EXCLUDED.reading_time_minutes,
                published_at = EXCLUDED.published_at,
                content_hash = EXCLUDED.content_hash,
                duplicate_group_id = EXCLUDED.duplicate_group_id,
                is_primary = EXCLUDED.is_primary,
                updated_at = now()
            RETURNING id, (xmax = 0) AS inserted
            "#,
        )
        .bind(record.id)
        .bind(&content.creator_id)
        .bind(content.platform.as_str())
        .bind(&content.platform_content_id)
        .bind(&content.url)
        .bind(&content.title)
        .bind(&content.description)
        .bind(&content.content_body)
        .bind(&content.author_name)
        .bind(&content.thumbnail_url)
        .bind(Json(&content.media_urls))
        .bind(Json(&content.engagement_metrics))
        .bind(to_i32(content.word_count))
        .bind(to_i32(content.reading_time_minutes))
        .bind(content.published_at)
        .bind(&record.content_hash)
        .bind(record.duplicate_group_id)
        .bind(record.is_primary)
        .fetch_one(&mut *tx)
        .await
        .map_err(DedupError::store)?;

        if let Some(plan) = plan {
            // The plan names the incoming record by the id it was offered under.
            let primary = if plan.primary == record.id { id } else { plan.primary };
            let mut members = plan.members.clone();
            members.push(id);

            sqlx::query(
                r#"
                UPDATE content_items
                SET duplicate_group_id = $1,
                    is_primary = (id = $2),
                    updated_at = now()
                WHERE id = ANY($3) OR duplicate_group_id = $1
                "#,
            )
            .bind(plan.group_id)
            .bind(primary)
            .bind(&members)
            .execute(&mut *tx)
            .await
            .map_err(DedupError::store)?;

            ensure_single_primary(&mut tx, plan.group_id).await?;
        }

        if let Some(handover) = record.handover {
            let successor_stayed: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM content_items WHERE id = $1 AND duplicate_group_id = $2)",
            )
            .bind(handover.primary)
            .bind(handover.group_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(DedupError::store)?;

            if !successor_stayed {
                debug!(group_id = %handover.group_id, "Handover successor left the group before write");
                return Err(DedupError::StaleResolution {
                    content_hash: record.content_hash.clone(),
                });
            }

            sqlx::query(
                r#"
                UPDATE content_items
                SET is_primary = (id = $2), updated_at = now()
                WHERE duplicate_group_id = $1
                "#,
            )
            .bind(handover.group_id)
            .bind(handover.primary)
            .execute(&mut *tx)
            .await
            .map_err(DedupError::store)?;

            ensure_single_primary(&mut tx, handover.group_id).await?;
        }

        let row = sqlx::query_as::<_, ContentRow>("SELECT * FROM content_items WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(DedupError::store)?;

        tx.commit().await.map_err(DedupError::store)?;

        Ok(UpsertOutcome {
            record: row.into_record()?,
            created,
        })
    }

    async fn set_group_primary(&self, group_id: Uuid, record_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(DedupError::store)?;
        advisory_lock(&mut tx, &group_id.to_string()).await?;

        let is_member: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM content_items WHERE id = $1 AND duplicate_group_id = $2)",
        )
        .bind(record_id)
        .bind(group_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(DedupError::store)?;

        if !is_member {
            return Err(DedupError::NotInGroup { record_id, group_id });
        }

        sqlx::query(
            r#"
            UPDATE content_items
            SET is_primary = (id = $2), updated_at = now()
            WHERE duplicate_group_id = $1
            "#,
        )
        .bind(group_id)
        .bind(record_id)
        .execute(&mut *tx)
        .await
        .map_err(DedupError::store)?;

        ensure_single_primary(&mut tx, group_id).await?;
        tx.commit().await.map_err(DedupError::store)?;
        Ok(())
    }
}
