// Dashboard analytics over stored predictions

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rusqlite::{params, Result as SqliteResult};
use serde::{Deserialize, Serialize};

use super::schema::Storage;
use crate::engine::bmi::round2;

/// Window of the daily prediction chart
pub const DAILY_WINDOW_DAYS: i64 = 30;

/// Number of users listed as most active
pub const TOP_USERS: usize = 5;

/// Analytics for the admin dashboard
pub struct Analytics<'a> {
    storage: &'a Storage,
}

impl<'a> Analytics<'a> {
    /// Create a new analytics instance
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Total number of stored predictions
    pub fn total_predictions(&self) -> SqliteResult<i64> {
        self.storage
            .conn()
            .query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))
    }

    /// Number of users with at least one prediction
    pub fn distinct_users(&self) -> SqliteResult<i64> {
        self.storage.conn().query_row(
            "SELECT COUNT(DISTINCT user_id) FROM predictions",
            [],
            |row| row.get(0),
        )
    }

    /// Predictions per classifier label, most frequent first
    pub fn label_distribution(&self) -> SqliteResult<Vec<LabelCount>> {
        let total = self.total_predictions()?;
        let mut stmt = self.storage.conn().prepare(
            "SELECT prediction, COUNT(*) as count FROM predictions
             GROUP BY prediction
             ORDER BY count DESC, prediction ASC",
        )?;

        let counts = stmt
            .query_map([], |row| {
                let count: i64 = row.get(1)?;
                Ok(LabelCount {
                    label: row.get(0)?,
                    count,
                    percentage: percentage(count, total),
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(counts)
    }

    /// Predictions per risk tier
    pub fn risk_distribution(&self) -> SqliteResult<Vec<RiskCount>> {
        let mut stmt = self.storage.conn().prepare(
            "SELECT risk_level, COUNT(*) as count FROM predictions
             GROUP BY risk_level
             ORDER BY CASE risk_level
                 WHEN 'Low' THEN 0
                 WHEN 'Moderate' THEN 1
                 WHEN 'High' THEN 2
                 WHEN 'Critical' THEN 3
                 ELSE 4
             END",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok(RiskCount {
                    risk_level: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(counts)
    }

    /// Users with the most predictions
    pub fn top_users(&self, limit: usize) -> SqliteResult<Vec<UserActivity>> {
        let mut stmt = self.storage.conn().prepare(
            "SELECT user_id, COUNT(*) as count FROM predictions
             GROUP BY user_id
             ORDER BY count DESC, user_id ASC
             LIMIT ?1",
        )?;

        let users = stmt
            .query_map(params![limit as i64], |row| {
                Ok(UserActivity {
                    user_id: row.get(0)?,
                    predictions: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(users)
    }

    /// Predictions per UTC day since `since`, oldest day first
    pub fn daily_counts(&self, since: DateTime<Utc>) -> SqliteResult<Vec<DailyCount>> {
        let mut stmt = self.storage.conn().prepare(
            "SELECT date(created_at, 'unixepoch') as day, COUNT(*) as count FROM predictions
             WHERE created_at >= ?1
             GROUP BY day
             ORDER BY day",
        )?;

        let days = stmt
            .query_map(params![since.timestamp()], |row| {
                Ok(DailyCount {
                    date: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(days)
    }

    /// Everything the admin dashboard shows, as of `now`
    pub fn dashboard(&self, now: DateTime<Utc>) -> SqliteResult<DashboardStats> {
        Ok(DashboardStats {
            total_predictions: self.total_predictions()?,
            distinct_users: self.distinct_users()?,
            prediction_categories: self.label_distribution()?,
            risk_levels: self.risk_distribution()?,
            top_users: self.top_users(TOP_USERS)?,
            daily_predictions: self.daily_counts(daily_window_start(now))?,
            generated_at: now,
        })
    }
}

/// Midnight UTC opening a window of [`DAILY_WINDOW_DAYS`] calendar days
/// ending on the day of `now`
pub fn daily_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    (now.date_naive() - Duration::days(DAILY_WINDOW_DAYS - 1))
        .and_time(NaiveTime::default())
        .and_utc()
}

fn percentage(count: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(count as f64 * 100.0 / total as f64)
    }
}

/// Prediction count for one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCount {
    /// Classifier label
    #[serde(rename = "category")]
    pub label: String,
    /// Number of predictions
    pub count: i64,
    /// Share of all predictions, two decimals
    pub percentage: f64,
}

/// Prediction count for one risk tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskCount {
    /// Risk tier name
    pub risk_level: String,
    /// Number of predictions
    pub count: i64,
}

/// Prediction count for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserActivity {
    /// User identifier
    pub user_id: String,
    /// Number of predictions
    pub predictions: i64,
}

/// Prediction count for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    /// ISO date, UTC
    pub date: String,
    /// Number of predictions
    pub count: i64,
}

/// Admin dashboard payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// All stored predictions
    pub total_predictions: i64,
    /// Users with at least one prediction
    pub distinct_users: i64,
    /// Per-label counts
    pub prediction_categories: Vec<LabelCount>,
    /// Per-tier counts
    pub risk_levels: Vec<RiskCount>,
    /// Most active users
    pub top_users: Vec<UserActivity>,
    /// Daily counts over the last [`DAILY_WINDOW_DAYS`] days
    pub daily_predictions: Vec<DailyCount>,
    /// Snapshot time
    pub generated_at: DateTime<Utc>,
}
