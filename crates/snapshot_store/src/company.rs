//! Company-data history, keyed by collection period.
//!
//! Daily files map `YYYY-MM-DD` to the document collected that day; monthly
//! files map `YYYY-MM` to the document collected on the month's last day.
//! Older files were plain lists of `{date, data}` entries (or a single such
//! object); they are folded into the keyed form on the next write.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use common::{EntityId, Error};
use serde_json::Value;
use tracing::{debug, warn};

type PeriodMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Monthly,
}

impl Period {
    pub fn key(self, date: NaiveDate) -> String {
        match self {
            Period::Daily => date.format("%Y-%m-%d").to_string(),
            Period::Monthly => date.format("%Y-%m").to_string(),
        }
    }

    fn dir_name(self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Monthly => "monthly",
        }
    }

    /// Period key for a legacy entry dated `YYYY-MM-DD`.
    fn key_from_legacy(self, date: &str) -> Option<String> {
        let parsed = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
        Some(self.key(parsed))
    }
}

pub fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt()
        .map_or(true, |next| next.month() != date.month())
}

fn legacy_entry(value: &Value) -> Option<(&str, &Value)> {
    let date = value.get("date")?.as_str()?;
    let data = value.get("data")?;
    Some((date, data))
}

fn fold_legacy<'a>(
    period: Period,
    entries: impl Iterator<Item = &'a Value>,
    path: &Path,
) -> PeriodMap {
    let mut map = PeriodMap::new();
    for entry in entries {
        match legacy_entry(entry).and_then(|(date, data)| Some((period.key_from_legacy(date)?, data))) {
            // Later entries for the same period win, as the newest collection.
            Some((key, data)) => {
                map.insert(key, data.clone());
            }
            None => warn!("Dropping unrecognised legacy entry in {}", path.display()),
        }
    }
    map
}

fn read_period_map(period: Period, path: &Path) -> Result<PeriodMap, Error> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PeriodMap::new()),
        Err(e) => return Err(Error::Snapshot(format!("{}: {}", path.display(), e))),
    };

    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Snapshot(format!("{} is not valid JSON: {}", path.display(), e)))?;

    match value {
        Value::Array(entries) => {
            debug!("Migrating legacy list in {}", path.display());
            Ok(fold_legacy(period, entries.iter(), path))
        }
        Value::Object(_) if legacy_entry(&value).is_some() => {
            Ok(fold_legacy(period, std::iter::once(&value), path))
        }
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err(Error::Snapshot(format!(
            "{} holds neither a list nor an object",
            path.display()
        ))),
    }
}

/// Per-airline company-data history under `<data_dir>/companydata`.
#[derive(Debug, Clone)]
pub struct CompanyDataStore {
    root: PathBuf,
}

impl CompanyDataStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join("companydata"),
        }
    }

    pub fn path_for(&self, period: Period, entity_id: EntityId) -> PathBuf {
        self.root
            .join(period.dir_name())
            .join(format!("{}.json", entity_id))
    }

    fn upsert(
        &self,
        period: Period,
        entity_id: EntityId,
        date: NaiveDate,
        data: &Value,
    ) -> Result<(), Error> {
        let path = self.path_for(period, entity_id);
        let mut map = read_period_map(period, &path)?;
        map.insert(period.key(date), data.clone());

        let bytes = serde_json::to_vec_pretty(&map)?;
        common::fs::write_atomic(&path, &bytes)
            .map_err(|e| Error::Snapshot(format!("{}: {}", path.display(), e)))
    }

    /// Store the document collected on `collected_on`. Always updates the
    /// daily history; the monthly history only on the last day of a month.
    /// Returns whether the monthly file was written.
    pub fn record(
        &self,
        entity_id: EntityId,
        collected_on: NaiveDate,
        data: &Value,
    ) -> Result<bool, Error> {
        self.upsert(Period::Daily, entity_id, collected_on, data)?;

        if !is_last_day_of_month(collected_on) {
            return Ok(false);
        }
        self.upsert(Period::Monthly, entity_id, collected_on, data)?;
        Ok(true)
    }

    /// Keyed history for one airline, for inspection and tests.
    pub fn history(&self, period: Period, entity_id: EntityId) -> Result<PeriodMap, Error> {
        read_period_map(period, &self.path_for(period, entity_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_last_day_of_month() {
        assert!(is_last_day_of_month(date(2024, 2, 29)));
        assert!(!is_last_day_of_month(date(2023, 2, 27)));
        assert!(is_last_day_of_month(date(2023, 2, 28)));
        assert!(is_last_day_of_month(date(2024, 12, 31)));
        assert!(!is_last_day_of_month(date(2024, 12, 30)));
    }

    #[test]
    fn test_same_day_rerun_replaces_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CompanyDataStore::new(dir.path());

        assert!(!store.record(5, date(2024, 3, 14), &json!({"pax": 1})).expect("first"));
        store.record(5, date(2024, 3, 14), &json!({"pax": 2})).expect("rerun");
        store.record(5, date(2024, 3, 15), &json!({"pax": 3})).expect("next day");

        let daily = store.history(Period::Daily, 5).expect("daily");
        assert_eq!(daily.len(), 2);
        assert_eq!(daily["2024-03-14"], json!({"pax": 2}));
        assert_eq!(daily["2024-03-15"], json!({"pax": 3}));
        assert!(!store.path_for(Period::Monthly, 5).exists());
    }

    #[test]
    fn test_month_end_writes_monthly_history() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CompanyDataStore::new(dir.path());

        assert!(store.record(9, date(2024, 4, 30), &json!({"fleet": 4})).expect("month end"));
        assert!(store.record(9, date(2024, 4, 30), &json!({"fleet": 5})).expect("rerun"));

        let monthly = store.history(Period::Monthly, 9).expect("monthly");
        assert_eq!(monthly.len(), 1);
        assert_eq!(monthly["2024-04"], json!({"fleet": 5}));
    }

    #[test]
    fn test_legacy_list_is_migrated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CompanyDataStore::new(dir.path());
        let path = store.path_for(Period::Daily, 1);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(
            &path,
            serde_json::to_vec(&json!([
                {"date": "2024-01-01", "data": {"v": 1}},
                {"date": "2024-01-02", "data": {"v": 2}},
                {"date": "2024-01-02", "data": {"v": 3}},
                {"unexpected": true}
            ]))
            .expect("fixture"),
        )
        .expect("write legacy");

        store.record(1, date(2024, 1, 3), &json!({"v": 4})).expect("record");

        let daily = store.history(Period::Daily, 1).expect("daily");
        let keys: Vec<_> = daily.keys().cloned().collect();
        assert_eq!(keys, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(daily["2024-01-02"], json!({"v": 3}));
    }

    #[test]
    fn test_legacy_single_entry_is_migrated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CompanyDataStore::new(dir.path());
        let path = store.path_for(Period::Monthly, 2);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, br#"{"date": "2023-11-30", "data": {"v": 1}}"#).expect("write");

        let monthly = store.history(Period::Monthly, 2).expect("monthly");
        assert_eq!(monthly.keys().collect::<Vec<_>>(), vec!["2023-11"]);
    }

    #[test]
    fn test_corrupt_history_is_not_overwritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = CompanyDataStore::new(dir.path());
        let path = store.path_for(Period::Daily, 3);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, b"{truncated").expect("write");

        let err = store.record(3, date(2024, 5, 1), &json!({})).expect_err("corrupt");
        assert!(matches!(err, Error::Snapshot(_)));
        assert_eq!(std::fs::read(&path).expect("read"), b"{truncated");
    }
}
