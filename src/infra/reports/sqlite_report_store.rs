// SQLite implementation of the ReportStore trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::core::reports::{
    ReportOutput, ReportStore, ReportStoreError, StoredReport, StoredReportSummary,
};

pub struct SqliteReportStore {
    pool: SqlitePool,
}

fn db_err(e: sqlx::Error) -> ReportStoreError {
    ReportStoreError::Database(e.to_string())
}

fn parse_created_at(raw: &str) -> Result<DateTime<Utc>, ReportStoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ReportStoreError::Database(format!("bad created_at '{}': {}", raw, e)))
}

impl SqliteReportStore {
    /// Open (creating if needed) the database at `database_path`.
    pub async fn new(database_path: &str) -> anyhow::Result<Self> {
        let connection_string = format!("sqlite://{}?mode=rwc", database_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                report_name TEXT NOT NULL,
                property_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                payload TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_reports_name_created ON reports (report_name, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ReportStore for SqliteReportStore {
    async fn save(&self, output: &ReportOutput) -> Result<i64, ReportStoreError> {
        let payload = serde_json::to_string(output)?;
        let result = sqlx::query(
            r#"
            INSERT INTO reports (report_name, property_id, created_at, payload)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&output.report_name)
        .bind(&output.property_id)
        .bind(output.generated_at.to_rfc3339())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let id = result.last_insert_rowid();
        tracing::debug!(report_id = id, report_name = %output.report_name, "Stored report");
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Option<StoredReport>, ReportStoreError> {
        let row = sqlx::query("SELECT id, created_at, payload FROM reports WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => {
                let payload: String = row.get("payload");
                let created_at: String = row.get("created_at");
                Ok(Some(StoredReport {
                    id: row.get("id"),
                    created_at: parse_created_at(&created_at)?,
                    output: serde_json::from_str(&payload)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        report_name: Option<&str>,
        limit: u32,
    ) -> Result<Vec<StoredReportSummary>, ReportStoreError> {
        let rows = match report_name {
            Some(name) => sqlx::query(
                r#"
                SELECT id, report_name, property_id, created_at FROM reports
                WHERE report_name = ?
                ORDER BY created_at DESC, id DESC
                LIMIT ?
                "#,
            )
            .bind(name)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query(
                r#"
                SELECT id, report_name, property_id, created_at FROM reports
                ORDER BY created_at DESC, id DESC
                LIMIT ?
                "#,
            )
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await,
        }
        .map_err(db_err)?;

        rows.into_iter()
            .map(|row| {
                let created_at: String = row.get("created_at");
                Ok(StoredReportSummary {
                    id: row.get("id"),
                    report_name: row.get("report_name"),
                    property_id: row.get("property_id"),
                    created_at: parse_created_at(&created_at)?,
                })
            })
            .collect()
    }

    async fn delete(&self, id: i64) -> Result<bool, ReportStoreError> {
        let result = sqlx::query("DELETE FROM reports WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analytics::{DateRange, ReportRow};
    use crate::core::reports::report_models::derived_rates;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn output(name: &str, generated_at: DateTime<Utc>) -> ReportOutput {
        let mut totals = BTreeMap::new();
        totals.insert("sessions".to_string(), 12.0);
        ReportOutput {
            report_name: name.to_string(),
            property_id: "123".to_string(),
            date_range: DateRange {
                start_date: "2026-03-01".into(),
                end_date: "2026-03-07".into(),
            },
            dimension_headers: vec!["date".into()],
            metric_headers: vec!["sessions".into()],
            rows: vec![ReportRow {
                dimensions: vec!["20260301".into()],
                metrics: vec![12.0],
            }],
            totals,
            rates: BTreeMap::new(),
            generated_at,
        }
    }

    #[tokio::test]
    async fn saves_lists_and_deletes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports.db");
        let store = SqliteReportStore::new(path.to_str().unwrap()).await.unwrap();

        let t0 = Utc.with_ymd_and_hms(2026, 3, 8, 9, 0, 0).unwrap();
        let first = store.save(&output("Weekly Traffic", t0)).await.unwrap();
        let second = store
            .save(&output("Weekly Traffic", t0 + Duration::days(7)))
            .await
            .unwrap();
        store
            .save(&output("Daily Traffic", t0 + Duration::days(1)))
            .await
            .unwrap();

        let weekly = store.list(Some("Weekly Traffic"), 10).await.unwrap();
        assert_eq!(weekly.iter().map(|s| s.id).collect::<Vec<_>>(), vec![second, first]);
        assert_eq!(store.list(None, 2).await.unwrap().len(), 2);

        let loaded = store.get(first).await.unwrap().unwrap();
        assert_eq!(loaded.output, output("Weekly Traffic", t0));
        assert_eq!(loaded.created_at, t0);

        assert!(store.delete(first).await.unwrap());
        assert!(!store.delete(first).await.unwrap());
        assert!(store.get(first).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn totals_and_rates_load_back_exactly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports.db");
        let store = SqliteReportStore::new(path.to_str().unwrap()).await.unwrap();

        let generated_at = Utc.with_ymd_and_hms(2026, 3, 8, 9, 0, 0).unwrap()
            + Duration::nanoseconds(123_456_789);
        let mut report = output("Conversion Funnel", generated_at);
        report.metric_headers = vec![
            "sessions".into(),
            "conversions".into(),
            "totalUsers".into(),
        ];
        report.rows = vec![ReportRow {
            dimensions: vec!["20260301".into()],
            metrics: vec![3.0, 7.0, 0.1 + 0.2],
        }];
        report.totals = [
            ("sessions".to_string(), 3.0),
            ("conversions".to_string(), 7.0),
            ("totalUsers".to_string(), 0.1 + 0.2),
        ]
        .into_iter()
        .collect();
        report.rates = derived_rates(&report.totals);
        assert!(!report.rates.is_empty());

        let id = store.save(&report).await.unwrap();
        let loaded = store.get(id).await.unwrap().unwrap();

        assert_eq!(loaded.output, report);
        assert_eq!(loaded.created_at, generated_at);
        for (name, value) in &report.rates {
            assert_eq!(loaded.output.rates[name].to_bits(), value.to_bits(), "{name}");
        }
    }

    #[tokio::test]
    async fn reopening_keeps_reports() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports.db");
        let path = path.to_str().unwrap();
        let id = {
            let store = SqliteReportStore::new(path).await.unwrap();
            store.save(&output("Monthly", Utc::now())).await.unwrap()
        };
        let store = SqliteReportStore::new(path).await.unwrap();
        assert!(store.get(id).await.unwrap().is_some());
    }
}
