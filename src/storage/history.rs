// Prediction record persistence

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::schema::Storage;
use super::{Result, StorageError};
use crate::engine::{bmi_category, ObesityLabel, PredictionInput, PredictionResult, RiskTier};

/// Largest page a history query may request
pub const MAX_HISTORY_LIMIT: usize = 50;

/// Largest page size of the paginated admin listing
pub const MAX_PAGE_SIZE: usize = 100;

/// Stored prediction keyed by user and timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Row id
    pub id: i64,
    /// Owner of the prediction
    pub user_id: String,
    /// Questionnaire as submitted
    pub input: PredictionInput,
    /// Engine output
    pub result: PredictionResult,
    /// Insert time, second resolution
    pub created_at: DateTime<Utc>,
}

const SELECT_COLUMNS: &str = "id, user_id, input_data, prediction, confidence, probabilities, \
     bmi, bmi_category, risk_level, recommendations, created_at";

/// Columns as stored, before decoding the JSON and enum columns
struct RawRow {
    id: i64,
    user_id: String,
    input_data: String,
    prediction: String,
    confidence: f64,
    probabilities: String,
    bmi: f64,
    bmi_category: String,
    risk_level: String,
    recommendations: String,
    created_at: i64,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            input_data: row.get(2)?,
            prediction: row.get(3)?,
            confidence: row.get(4)?,
            probabilities: row.get(5)?,
            bmi: row.get(6)?,
            bmi_category: row.get(7)?,
            risk_level: row.get(8)?,
            recommendations: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn decode(self) -> Result<PredictionRecord> {
        let id = self.id;
        let corrupt = |message: String| StorageError::Corrupt { id, message };

        let label: ObesityLabel = self
            .prediction
            .parse()
            .map_err(|e| corrupt(format!("{e}")))?;
        let risk_tier: RiskTier = self.risk_level.parse().map_err(corrupt)?;
        // Rows written before the cross-check column existed carry ''
        let category = if self.bmi_category.is_empty() {
            bmi_category(self.bmi)
        } else {
            self.bmi_category
                .parse()
                .map_err(|e| corrupt(format!("{e}")))?
        };
        let probability_distribution: BTreeMap<ObesityLabel, f64> =
            serde_json::from_str(&self.probabilities)?;
        // Confidence is the label's share of the stored distribution
        let confidence = probability_distribution
            .get(&label)
            .copied()
            .unwrap_or(self.confidence);
        let created_at = DateTime::from_timestamp(self.created_at, 0)
            .ok_or_else(|| corrupt(format!("timestamp {} out of range", self.created_at)))?;

        Ok(PredictionRecord {
            id,
            user_id: self.user_id,
            input: serde_json::from_str(&self.input_data)?,
            result: PredictionResult {
                label,
                confidence,
                probability_distribution,
                bmi: self.bmi,
                bmi_category: category,
                risk_tier,
                recommendations: serde_json::from_str(&self.recommendations)?,
            },
            created_at,
        })
    }
}

/// Prediction store for insert and history queries
pub struct PredictionStore<'a> {
    storage: &'a Storage,
}

impl<'a> PredictionStore<'a> {
    /// Create a new prediction store
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Persist one prediction, returning its row id
    pub fn insert(
        &self,
        user_id: &str,
        input: &PredictionInput,
        result: &PredictionResult,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.storage.conn().execute(
            "INSERT INTO predictions (user_id, input_data, prediction, confidence, probabilities, bmi, bmi_category, risk_level, recommendations, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user_id,
                serde_json::to_string(input)?,
                result.label.as_str(),
                result.confidence,
                serde_json::to_string(&result.probability_distribution)?,
                result.bmi,
                result.bmi_category.as_str(),
                result.risk_tier.as_str(),
                serde_json::to_string(&result.recommendations)?,
                created_at.timestamp(),
            ],
        )?;

        Ok(self.storage.conn().last_insert_rowid())
    }

    /// Fetch one record by id
    pub fn get(&self, id: i64) -> Result<Option<PredictionRecord>> {
        let raw = self
            .storage
            .conn()
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM predictions WHERE id = ?1"),
                params![id],
                RawRow::from_row,
            )
            .optional()?;

        raw.map(RawRow::decode).transpose()
    }

    /// Most recent predictions of a user, newest first
    pub fn recent_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<PredictionRecord>> {
        if limit == 0 || limit > MAX_HISTORY_LIMIT {
            return Err(StorageError::InvalidLimit {
                limit,
                max: MAX_HISTORY_LIMIT,
            });
        }

        self.select_for_user(user_id, limit, 0)
    }

    /// One page of a user's predictions, newest first; pages start at 1
    pub fn page_for_user(
        &self,
        user_id: &str,
        page: usize,
        per_page: usize,
    ) -> Result<Vec<PredictionRecord>> {
        if page == 0 {
            return Err(StorageError::InvalidPage { page });
        }
        if per_page == 0 || per_page > MAX_PAGE_SIZE {
            return Err(StorageError::InvalidPageSize {
                per_page,
                max: MAX_PAGE_SIZE,
            });
        }

        let offset = (page - 1).saturating_mul(per_page);
        self.select_for_user(user_id, per_page, offset)
    }

    fn select_for_user(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PredictionRecord>> {
        let mut stmt = self.storage.conn().prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM predictions
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;

        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![user_id, limit as i64, offset], RawRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(RawRow::decode).collect()
    }

    /// Total number of stored predictions
    pub fn count(&self) -> Result<i64> {
        Ok(self
            .storage
            .conn()
            .query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))?)
    }

    /// Number of predictions stored for one user
    pub fn count_for_user(&self, user_id: &str) -> Result<i64> {
        Ok(self.storage.conn().query_row(
            "SELECT COUNT(*) FROM predictions WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    /// Remove every prediction of a user, returning how many were deleted
    pub fn delete_for_user(&self, user_id: &str) -> Result<usize> {
        Ok(self
            .storage
            .conn()
            .execute("DELETE FROM predictions WHERE user_id = ?1", params![user_id])?)
    }
}
