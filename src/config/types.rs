use crate::model::SourceKind;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Main configuration structure
///
/// Every section is optional; a missing section takes the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

/// Request headers and timeouts shared by every source
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpSettings {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,

    /// Whole-request timeout (seconds)
    pub timeout_secs: u64,

    /// TCP/TLS connect timeout (seconds)
    pub connect_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            accept_language: "zh-TW,zh;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Automatic retry of transient failures
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub total: u32,

    /// Retry `n` waits `backoff_factor * 2^(n-1)` seconds
    pub backoff_factor: f64,

    /// Upper bound for a single backoff wait (seconds)
    pub backoff_max_secs: f64,

    /// Response statuses that are retried
    pub status_forcelist: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            total: 3,
            backoff_factor: 0.5,
            backoff_max_secs: 120.0,
            status_forcelist: vec![500, 502, 503, 504],
        }
    }
}

/// Log file location
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    pub log_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: "law_crawler.log".to_string(),
        }
    }
}

/// Per-source tables, `[sources.<name>]`
///
/// A table only overrides the keys it names; everything else keeps that
/// source's built-in value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "SourceTables")]
pub struct SourcesConfig {
    pub central: SourceConfig,
    pub taipei: SourceConfig,
    pub new_taipei: SourceConfig,
    pub taichung: SourceConfig,
    pub taoyuan: SourceConfig,
    pub kaohsiung: SourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            central: SourceConfig::new("https://law.moj.gov.tw/Law/", "law_jsons"),
            taipei: SourceConfig::new("https://www.laws.taipei.gov.tw/", "taipei_law_jsons"),
            new_taipei: SourceConfig::new("https://web.law.ntpc.gov.tw/", "new_taipei_law_jsons"),
            taichung: SourceConfig::new("https://law.taichung.gov.tw/", "taichung_law_jsons"),
            taoyuan: SourceConfig::new("https://law.tycg.gov.tw/", "taoyuan_law_jsons"),
            kaohsiung: SourceConfig::new("https://outlaw.kcg.gov.tw/", "kaohsiung_law_jsons"),
        }
    }
}

/// `[sources.*]` as written in the file
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct SourceTables {
    central: SourceTable,
    taipei: SourceTable,
    new_taipei: SourceTable,
    taichung: SourceTable,
    taoyuan: SourceTable,
    kaohsiung: SourceTable,
}

/// One `[sources.<name>]` table; absent keys are `None`
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct SourceTable {
    base_url: Option<String>,
    output_dir: Option<String>,
    max_workers: Option<usize>,
    batch_size: Option<usize>,
    delay_min: Option<f64>,
    delay_max: Option<f64>,
}

impl SourceTable {
    fn over(self, defaults: SourceConfig) -> SourceConfig {
        SourceConfig {
            base_url: self.base_url.unwrap_or(defaults.base_url),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            max_workers: self.max_workers.unwrap_or(defaults.max_workers),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            delay_min: self.delay_min.unwrap_or(defaults.delay_min),
            delay_max: self.delay_max.unwrap_or(defaults.delay_max),
        }
    }
}

impl From<SourceTables> for SourcesConfig {
    fn from(tables: SourceTables) -> Self {
        let defaults = SourcesConfig::default();
        Self {
            central: tables.central.over(defaults.central),
            taipei: tables.taipei.over(defaults.taipei),
            new_taipei: tables.new_taipei.over(defaults.new_taipei),
            taichung: tables.taichung.over(defaults.taichung),
            taoyuan: tables.taoyuan.over(defaults.taoyuan),
            kaohsiung: tables.kaohsiung.over(defaults.kaohsiung),
        }
    }
}

impl SourcesConfig {
    pub fn get(&self, kind: SourceKind) -> &SourceConfig {
        match kind {
            SourceKind::Central => &self.central,
            SourceKind::Taipei => &self.taipei,
            SourceKind::NewTaipei => &self.new_taipei,
            SourceKind::Taichung => &self.taichung,
            SourceKind::Taoyuan => &self.taoyuan,
            SourceKind::Kaohsiung => &self.kaohsiung,
        }
    }
}

/// Crawl settings for a single source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    /// Site root that relative paths are resolved against
    pub base_url: String,

    /// Directory receiving one JSON file per statute
    pub output_dir: String,

    /// Concurrent workers inside one batch
    pub max_workers: usize,

    /// Work items per batch
    pub batch_size: usize,

    /// Lower bound of the per-request delay (seconds)
    pub delay_min: f64,

    /// Upper bound of the per-request delay (seconds)
    pub delay_max: f64,
}

fn default_max_workers() -> usize {
    5
}

fn default_batch_size() -> usize {
    20
}

fn default_delay_min() -> f64 {
    1.0
}

fn default_delay_max() -> f64 {
    2.0
}

impl SourceConfig {
    pub fn new(base_url: &str, output_dir: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            output_dir: output_dir.to_string(),
            max_workers: default_max_workers(),
            batch_size: default_batch_size(),
            delay_min: default_delay_min(),
            delay_max: default_delay_max(),
        }
    }
}

/// Everything one source needs for one run
///
/// Built once from a validated [`Config`] and never changed afterwards.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub source: SourceKind,
    pub base_url: Url,
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub batch_size: usize,
    pub delay_min: Duration,
    pub delay_max: Duration,
    pub retry: RetryPolicy,
    pub http: HttpSettings,

    /// Cap on work items, for smoke runs
    pub limit: Option<usize>,
}

impl Config {
    /// Resolves the settings of one source into a [`RunConfig`]
    pub fn run_config(
        &self,
        source: SourceKind,
        limit: Option<usize>,
    ) -> Result<RunConfig, crate::ConfigError> {
        let entry = self.sources.get(source);
        let base_url = Url::parse(&entry.base_url).map_err(|e| {
            crate::ConfigError::InvalidUrl(format!(
                "Invalid base_url for {}: '{}': {}",
                source, entry.base_url, e
            ))
        })?;
        let delay = |secs: f64| {
            Duration::try_from_secs_f64(secs).map_err(|_| {
                crate::ConfigError::Validation(format!("Invalid delay for {}: {}", source, secs))
            })
        };

        Ok(RunConfig {
            source,
            base_url,
            output_dir: PathBuf::from(&entry.output_dir),
            concurrency: entry.max_workers,
            batch_size: entry.batch_size,
            delay_min: delay(entry.delay_min)?,
            delay_max: delay(entry.delay_max)?,
            retry: self.retry.clone(),
            http: self.http.clone(),
            limit,
        })
    }
}
