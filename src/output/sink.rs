//! JSON persistence sink
//!
//! One record becomes one pretty-printed UTF-8 JSON file. Files are written to
//! a temporary file in the target directory and renamed into place, so a
//! reader never sees a half-written document.

use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors from writing records
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Invalid file name: '{0}'")]
    InvalidName(String),
}

/// Directory of JSON documents shared by every worker of a source run
#[derive(Debug, Clone)]
pub struct JsonSink {
    dir: PathBuf,
    written: Arc<Mutex<HashSet<String>>>,
}

impl JsonSink {
    /// Opens the sink, creating the directory if needed
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(io_error(&dir))?;

        Ok(Self {
            dir,
            written: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `record` to `<dir>/<file_name>`, replacing any existing file
    ///
    /// `file_name` must be a bare name without path separators. Overwriting a
    /// file that was already written by this sink is allowed but logged.
    pub fn save<T: Serialize>(&self, record: &T, file_name: &str) -> Result<PathBuf, SinkError> {
        if file_name.is_empty()
            || file_name.contains(['/', '\\'])
            || file_name == "."
            || file_name == ".."
        {
            return Err(SinkError::InvalidName(file_name.to_string()));
        }

        std::fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;

        let mut json = serde_json::to_string_pretty(record)?;
        json.push('\n');

        let target = self.dir.join(file_name);
        let mut staged = NamedTempFile::new_in(&self.dir).map_err(io_error(&self.dir))?;
        staged
            .write_all(json.as_bytes())
            .map_err(io_error(staged.path()))?;
        staged
            .persist(&target)
            .map_err(|e| SinkError::Io {
                path: target.clone(),
                source: e.error,
            })?;

        let first_write = match self.written.lock() {
            Ok(mut written) => written.insert(file_name.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(file_name.to_string()),
        };
        if !first_write {
            tracing::warn!(file = %target.display(), "Overwrote a record written earlier in this run");
        }

        tracing::debug!(file = %target.display(), bytes = json.len(), "Saved record");
        Ok(target)
    }

    /// Number of distinct files written by this sink
    pub fn written_count(&self) -> usize {
        match self.written.lock() {
            Ok(written) => written.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError {
    let path = path.to_path_buf();
    move |source| SinkError::Io { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Article, LawRecord, SourceKind};
    use tempfile::TempDir;
    use url::Url;

    fn sample_record(title: &str) -> LawRecord {
        let url = Url::parse("https://law.example.gov.tw/LawAll.aspx?pcode=A0000001").unwrap();
        let mut record = LawRecord::new(SourceKind::Central, &url);
        record.title = title.to_string();
        record.articles.push(Article::new("第 1 條", "中華民國基於三民主義，為民有民治民享之民主共和國。"));
        record
    }

    #[test]
    fn test_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("law_jsons");
        let sink = JsonSink::create(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(sink.dir(), dir.as_path());
    }

    #[test]
    fn test_save_writes_pretty_utf8_json() {
        let temp = TempDir::new().unwrap();
        let sink = JsonSink::create(temp.path()).unwrap();

        let path = sink.save(&sample_record("中華民國憲法"), "中華民國憲法.json").unwrap();
        let text = std::fs::read_to_string(&path).unwrap();

        assert!(text.contains("\n  \"LawName\": \"中華民國憲法\""));
        assert!(text.contains("民有民治民享"));
        assert!(!text.contains("\\u"));

        let parsed: LawRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, sample_record("中華民國憲法"));
    }

    #[test]
    fn test_last_write_wins() {
        let temp = TempDir::new().unwrap();
        let sink = JsonSink::create(temp.path()).unwrap();

        let mut first = sample_record("民法");
        first.category = "first".to_string();
        let mut second = sample_record("民法");
        second.category = "second".to_string();

        sink.save(&first, "民法.json").unwrap();
        let path = sink.save(&second, "民法.json").unwrap();

        let parsed: LawRecord = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed.category, "second");
        assert_eq!(sink.written_count(), 1);
    }

    #[test]
    fn test_no_temporary_files_left_behind() {
        let temp = TempDir::new().unwrap();
        let sink = JsonSink::create(temp.path()).unwrap();
        sink.save(&sample_record("刑法"), "刑法.json").unwrap();
        sink.save(&sample_record("民法"), "民法.json").unwrap();

        let mut names: Vec<String> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["刑法.json", "民法.json"]);
    }

    #[test]
    fn test_rejects_names_with_separators() {
        let temp = TempDir::new().unwrap();
        let sink = JsonSink::create(temp.path()).unwrap();
        for name in ["", "../escape.json", "a/b.json", "..", "a\\b.json"] {
            assert!(matches!(
                sink.save(&sample_record("x"), name),
                Err(SinkError::InvalidName(_))
            ));
        }
    }

    #[test]
    fn test_create_fails_when_path_is_a_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("occupied");
        std::fs::write(&file, "not a directory").unwrap();
        assert!(matches!(JsonSink::create(&file), Err(SinkError::Io { .. })));
    }
}
