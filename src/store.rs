use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info, warn};
use sqlx::{PgPool, Row};

use crate::diff;
use crate::error::{StoreError, StoreResult};
use crate::models::{Claim, RecommendationStatus};

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn init(&self) -> anyhow::Result<()>;
    async fn read(&self) -> anyhow::Result<Option<String>>;
    async fn write(&self, payload: &str) -> anyhow::Result<()>;
    async fn clear(&self) -> anyhow::Result<()>;
}

const STORE_SLOT: i16 = 1;

pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StorageBackend for PgBackend {
    async fn init(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn read(&self) -> anyhow::Result<Option<String>> {
        let row = sqlx::query("SELECT payload FROM claims_pro.claim_store WHERE slot = $1")
            .bind(STORE_SLOT)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get("payload")))
    }

    async fn write(&self, payload: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO claims_pro.claim_store (slot, payload, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (slot) DO UPDATE
            SET payload = EXCLUDED.payload, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(STORE_SLOT)
        .bind(payload)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM claims_pro.claim_store")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub saved_count: usize,
    pub bytes: usize,
    pub usage_percent: u8,
}

pub struct ClaimStore<B> {
    backend: B,
    budget_bytes: usize,
    full_snapshots: usize,
}

impl<B: StorageBackend> ClaimStore<B> {
    pub fn new(backend: B, budget_bytes: usize, full_snapshots: usize) -> Self {
        Self {
            backend,
            budget_bytes,
            full_snapshots,
        }
    }

    pub async fn init(&self) -> StoreResult<()> {
        self.backend.init().await?;
        Ok(())
    }

    /// An unreadable payload is treated as an empty store.
    pub async fn fetch_all(&self) -> StoreResult<Vec<Claim>> {
        let Some(payload) = self.backend.read().await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&payload) {
            Ok(claims) => Ok(claims),
            Err(err) => {
                warn!("stored claim payload is unreadable, starting empty: {err}");
                Ok(Vec::new())
            }
        }
    }

    pub async fn import_dates(&self) -> StoreResult<Vec<NaiveDate>> {
        Ok(diff::import_dates(&self.fetch_all().await?))
    }

    /// Adds one import batch. A batch replaces every stored claim of the
    /// import dates it carries.
    pub async fn import_snapshot(&self, batch: Vec<Claim>) -> StoreResult<SaveReport> {
        let batch = dedup_by_id(batch);
        let dates: HashSet<NaiveDate> = batch.iter().map(|claim| claim.import_date).collect();
        let mut claims: Vec<Claim> = self
            .fetch_all()
            .await?
            .into_iter()
            .filter(|claim| !dates.contains(&claim.import_date))
            .collect();
        let kept = claims.len();
        let imported = batch.len();
        claims.extend(batch);
        info!("importing {imported} claims on top of {kept} stored");
        self.save_all(claims).await
    }

    pub async fn save_all(&self, claims: Vec<Claim>) -> StoreResult<SaveReport> {
        let optimized = retain_comments(claims, self.full_snapshots);
        let payload = serde_json::to_string(&optimized)?;
        let bytes = payload.len();

        if bytes > self.budget_bytes {
            return Err(StoreError::CapacityExceeded {
                bytes,
                budget: self.budget_bytes,
            });
        }

        self.backend.write(&payload).await?;
        let report = SaveReport {
            saved_count: optimized.len(),
            bytes,
            usage_percent: usage_percent(bytes, self.budget_bytes),
        };
        info!(
            "saved {} claims ({} bytes, {}% of budget)",
            report.saved_count, report.bytes, report.usage_percent
        );
        Ok(report)
    }

    /// Sets the task status of one claim, or advances it through the cycle
    /// when no target is given. Returns `None` for an unknown id.
    pub async fn update_recommendation_status(
        &self,
        id: &str,
        status: Option<RecommendationStatus>,
    ) -> StoreResult<Option<RecommendationStatus>> {
        let mut claims = self.fetch_all().await?;
        let Some(claim) = claims.iter_mut().find(|claim| claim.id == id) else {
            return Ok(None);
        };

        let next = status.unwrap_or_else(|| claim.recommendation_status().cycle());
        claim.recommendation_status = Some(next);
        self.save_all(claims).await?;
        Ok(Some(next))
    }

    pub async fn clear(&self) -> StoreResult<()> {
        self.backend.clear().await?;
        info!("claim store cleared");
        Ok(())
    }

    pub async fn usage_percent(&self) -> StoreResult<u8> {
        let bytes = self
            .backend
            .read()
            .await?
            .map(|payload| payload.len())
            .unwrap_or(0);
        Ok(usage_percent(bytes, self.budget_bytes))
    }
}

/// Keeps the last row for each id.
fn dedup_by_id(batch: Vec<Claim>) -> Vec<Claim> {
    let last: HashMap<String, usize> = batch
        .iter()
        .enumerate()
        .map(|(idx, claim)| (claim.id.clone(), idx))
        .collect();
    let total = batch.len();

    let unique: Vec<Claim> = batch
        .into_iter()
        .enumerate()
        .filter(|(idx, claim)| last.get(claim.id.as_str()) == Some(idx))
        .map(|(_, claim)| claim)
        .collect();

    if unique.len() < total {
        warn!(
            "dropped {} duplicate rows from import batch, keeping the last row per claim",
            total - unique.len()
        );
    }
    unique
}

pub fn retain_comments(claims: Vec<Claim>, keep: usize) -> Vec<Claim> {
    let full: HashSet<NaiveDate> = diff::import_dates(&claims).into_iter().take(keep).collect();
    let mut stripped = 0usize;

    let claims: Vec<Claim> = claims
        .into_iter()
        .map(|mut claim| {
            if !full.contains(&claim.import_date) && claim.last_comment.take().is_some() {
                stripped += 1;
            }
            claim
        })
        .collect();

    if stripped > 0 {
        debug!("stripped comments from {stripped} claims outside the {keep} newest snapshots");
    }
    claims
}

pub fn usage_percent(bytes: usize, budget: usize) -> u8 {
    if budget == 0 {
        return 100;
    }
    let percent = (bytes as f64 / budget as f64 * 100.0 + 0.5).floor();
    percent.min(100.0) as u8
}
