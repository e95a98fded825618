//! Append-only JSON-lines record of one collection run.
//!
//! Every run gets its own file under the log directory, named after the
//! UTC start time and the run id, so reruns on the same day never mix.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

pub struct RunJournal {
    path: PathBuf,
    writer: BufWriter<File>,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    events: usize,
}

impl RunJournal {
    /// Create `dir` if needed and start a fresh journal file in it.
    pub fn open(dir: PathBuf) -> std::io::Result<Self> {
        create_dir_all(&dir)?;
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let path = dir.join(format!(
            "run-{}-{}.jsonl",
            started_at.format("%Y%m%dT%H%M%SZ"),
            run_id.simple()
        ));
        let file = OpenOptions::new().create_new(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            run_id,
            started_at,
            events: 0,
        })
    }

    /// Append `event` stamped with `ts`, `run_id`, `seq` and `kind`.
    /// Non-object payloads are kept under `detail`. Write failures are
    /// logged, never returned.
    pub fn record(&mut self, kind: &str, event: Value) {
        let mut entry = match event {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => Map::from_iter([("detail".to_string(), other)]),
        };
        entry.insert(
            "ts".into(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true).into(),
        );
        entry.insert("run_id".into(), self.run_id.to_string().into());
        entry.insert("seq".into(), self.events.into());
        entry.insert("kind".into(), kind.into());

        match self.append(&Value::Object(entry)) {
            Ok(()) => self.events += 1,
            Err(e) => warn!("Run journal write to {} failed: {}", self.path.display(), e),
        }
    }

    fn append(&mut self, entry: &Value) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Seconds since the journal was opened.
    pub fn elapsed_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .expect("journal file")
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect()
    }

    #[test]
    fn test_events_are_stamped_and_appended() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut journal = RunJournal::open(dir.path().join("logs")).expect("open");

        journal.record("run_start", json!({"airlines": 3}));
        journal.record("entity_failed", json!({"entity_id": 2, "reason": "HTTP 500"}));

        let lines = read_lines(journal.path());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["kind"], json!("run_start"));
        assert_eq!(lines[0]["airlines"], json!(3));
        assert_eq!(lines[0]["seq"], json!(0));
        assert_eq!(lines[1]["seq"], json!(1));
        assert_eq!(lines[1]["entity_id"], json!(2));
        assert_eq!(lines[1]["run_id"], json!(journal.run_id().to_string()));
        assert!(lines[1]["ts"].is_string());
    }

    #[test]
    fn test_each_run_gets_its_own_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut first = RunJournal::open(dir.path().to_path_buf()).expect("first");
        let mut second = RunJournal::open(dir.path().to_path_buf()).expect("second");
        first.record("run_start", json!({}));
        second.record("run_start", json!({}));

        assert_ne!(first.path(), second.path());
        assert_eq!(read_lines(first.path()).len(), 1);
        assert_eq!(read_lines(second.path()).len(), 1);
        assert!(first.elapsed_secs() >= 0);
    }

    #[test]
    fn test_non_object_events_are_wrapped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut journal = RunJournal::open(dir.path().to_path_buf()).expect("open");
        journal.record("note", json!("cache empty"));

        let lines = read_lines(journal.path());
        assert_eq!(lines[0]["detail"], json!("cache empty"));
        assert_eq!(lines[0]["kind"], json!("note"));
    }
}
