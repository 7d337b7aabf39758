use crate::assets::DEFAULT_CDN_URL;
use crate::cache::CachePolicy;
use crate::endpoints::DEFAULT_LOCALE;
use crate::keys::ResourceKind;
use crate::models::Version;
use crate::retry::RetryPolicy;
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// ddx - Data Dragon explorer
///
/// Browse champions, items, maps and runes from the League of Legends data feed.
/// Configuration priority: CLI args > Environment variables > Config file > Defaults
#[derive(Parser, Debug)]
#[command(name = "ddx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Data Dragon explorer", long_about = None)]
pub struct CliArgs {
    /// Feed base URL
    #[arg(long, env = "DDX_BASE_URL")]
    pub base_url: Option<String>,

    /// Data locale (e.g. en_US, ko_KR)
    #[arg(long, env = "DDX_LOCALE")]
    pub locale: Option<String>,

    /// Pin a feed version instead of using the newest one
    #[arg(long, env = "DDX_VERSION")]
    pub version: Option<String>,

    /// HTTP request timeout in milliseconds (1000-60000)
    #[arg(long, env = "DDX_HTTP_TIMEOUT_MS")]
    pub http_timeout_ms: Option<u64>,

    /// Retries after a failed fetch (0-10)
    #[arg(long, env = "DDX_RETRIES")]
    pub retries: Option<u32>,

    /// First retry delay in milliseconds; doubles per retry (1-60000)
    #[arg(long, env = "DDX_RETRY_BASE_MS")]
    pub retry_base_ms: Option<u64>,

    /// Upper bound on a single retry delay in milliseconds
    #[arg(long, env = "DDX_RETRY_MAX_MS")]
    pub retry_max_ms: Option<u64>,

    /// Minutes a fetched value counts as fresh (0-1440)
    #[arg(long, env = "DDX_STALE_MINUTES")]
    pub stale_minutes: Option<u64>,

    /// Minutes an unused cache entry is kept (1-1440)
    #[arg(long, env = "DDX_GC_MINUTES")]
    pub gc_minutes: Option<u64>,

    /// Rows per list page for every section (1-200)
    #[arg(long, env = "DDX_PAGE_SIZE")]
    pub page_size: Option<usize>,

    /// Optional config file path (TOML format)
    #[arg(long, env = "DDX_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// List published feed versions, newest first
    Versions,
    /// List champions
    Champions(ListArgs),
    /// Show one champion in detail
    Champion {
        /// Champion id (e.g. Ahri, MonkeyKing)
        id: String,
    },
    /// List items
    Items(ListArgs),
    /// List maps
    Maps(ListArgs),
    /// List rune trees
    Runes(ListArgs),
    /// Interactive browser over stdin
    Browse,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ListArgs {
    /// Case-insensitive text filter
    #[arg(short, long)]
    pub search: Option<String>,

    /// Tag filter; repeat for OR (e.g. -t Tank -t Mage)
    #[arg(short = 't', long = "tag")]
    pub tags: Vec<String>,

    /// 1-based page number
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,
}

/// Configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub locale: Option<String>,
    pub version: Option<String>,

    #[serde(default)]
    pub http: HttpSection,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub retry: RetrySection,

    #[serde(default)]
    pub list: ListSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpSection {
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSection {
    pub stale_minutes: Option<u64>,
    pub gc_minutes: Option<u64>,
    /// Resource kind name -> fresh window in minutes.
    #[serde(default)]
    pub stale_overrides: HashMap<String, u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrySection {
    pub max_retries: Option<u32>,
    pub base_ms: Option<u64>,
    pub max_ms: Option<u64>,
    /// Resource kind name -> retry count.
    #[serde(default)]
    pub overrides: HashMap<String, u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListSection {
    pub page_size: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub locale: String,
    pub version: Option<Version>,
    pub http_timeout_ms: u64,
    pub retries: u32,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    pub stale_minutes: u64,
    pub gc_minutes: u64,
    pub stale_overrides: HashMap<ResourceKind, u64>,
    pub retry_overrides: HashMap<ResourceKind, u32>,
    /// `None` keeps each section's own page size.
    pub page_size: Option<usize>,
    pub config_file: Option<PathBuf>,
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

/// Validate URL format (basic check)
fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

fn validate_locale(locale: &str) -> Result<()> {
    let ok = !locale.is_empty()
        && locale
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(anyhow!("DDX_LOCALE must look like en_US, got '{locale}'"))
    }
}

fn parse_overrides<T: Copy>(raw: &HashMap<String, T>, what: &str) -> Result<HashMap<ResourceKind, T>> {
    raw.iter()
        .map(|(name, v)| {
            let kind = name
                .parse::<ResourceKind>()
                .with_context(|| format!("Unknown resource kind in {what}"))?;
            Ok((kind, *v))
        })
        .collect()
}

/// Load configuration from TOML file
pub fn load_file(path: &Path) -> Result<FileConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
}

impl Config {
    /// Build from parsed CLI args (clap has already folded in the
    /// environment), reading the config file if one is named.
    pub fn from_args(args: &CliArgs) -> Result<Config> {
        let file = match &args.config_file {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Some(load_file(path)?)
            }
            None => None,
        };
        Self::resolve(args, file.unwrap_or_default())
    }

    /// Merge args over `file` over defaults, then validate.
    pub fn resolve(args: &CliArgs, file: FileConfig) -> Result<Config> {
        let base_url = args
            .base_url
            .clone()
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_CDN_URL.to_string());
        validate_url(&base_url, "DDX_BASE_URL")?;

        let locale = args
            .locale
            .clone()
            .or(file.locale)
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
        validate_locale(&locale)?;

        let version = args
            .version
            .clone()
            .or(file.version)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Version::new);

        let http_timeout_ms = args
            .http_timeout_ms
            .or(file.http.timeout_ms)
            .unwrap_or(crate::http::DEFAULT_TIMEOUT_MS);
        let http_timeout_ms =
            validate_in_range(http_timeout_ms, 1000, 60000, "DDX_HTTP_TIMEOUT_MS")?;

        let defaults = RetryPolicy::default();
        let retries = args
            .retries
            .or(file.retry.max_retries)
            .unwrap_or(defaults.max_retries);
        let retries = validate_in_range(retries, 0, 10, "DDX_RETRIES")?;

        let retry_base_ms = args
            .retry_base_ms
            .or(file.retry.base_ms)
            .unwrap_or(defaults.base_delay.as_millis() as u64);
        let retry_base_ms = validate_in_range(retry_base_ms, 1, 60000, "DDX_RETRY_BASE_MS")?;

        let retry_max_ms = args
            .retry_max_ms
            .or(file.retry.max_ms)
            .unwrap_or(defaults.max_delay.as_millis() as u64);
        let retry_max_ms =
            validate_in_range(retry_max_ms, retry_base_ms, 600_000, "DDX_RETRY_MAX_MS")?;

        let stale_minutes = args
            .stale_minutes
            .or(file.cache.stale_minutes)
            .unwrap_or(60);
        let stale_minutes = validate_in_range(stale_minutes, 0, 1440, "DDX_STALE_MINUTES")?;

        let gc_minutes = args.gc_minutes.or(file.cache.gc_minutes).unwrap_or(10);
        let gc_minutes = validate_in_range(gc_minutes, 1, 1440, "DDX_GC_MINUTES")?;

        let page_size = args.page_size.or(file.list.page_size);
        if let Some(n) = page_size {
            validate_in_range(n, 1, 200, "DDX_PAGE_SIZE")?;
        }

        let stale_overrides = parse_overrides(&file.cache.stale_overrides, "[cache.stale_overrides]")?;
        for (kind, mins) in &stale_overrides {
            validate_in_range(*mins, 0, 1440, &format!("cache.stale_overrides.{kind}"))?;
        }
        let retry_overrides = parse_overrides(&file.retry.overrides, "[retry.overrides]")?;
        for (kind, n) in &retry_overrides {
            validate_in_range(*n, 0, 10, &format!("retry.overrides.{kind}"))?;
        }

        Ok(Config {
            base_url,
            locale,
            version,
            http_timeout_ms,
            retries,
            retry_base_ms,
            retry_max_ms,
            stale_minutes,
            gc_minutes,
            stale_overrides,
            retry_overrides,
            page_size,
            config_file: args.config_file.clone(),
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn gc_time(&self) -> Duration {
        Duration::from_secs(self.gc_minutes * 60)
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            stale_time: Duration::from_secs(self.stale_minutes * 60),
            stale_overrides: self
                .stale_overrides
                .iter()
                .map(|(k, m)| (*k, Duration::from_secs(m * 60)))
                .collect(),
            gc_time: self.gc_time(),
            retry: RetryPolicy {
                max_retries: self.retries,
                base_delay: Duration::from_millis(self.retry_base_ms),
                max_delay: Duration::from_millis(self.retry_max_ms),
            },
            retry_overrides: self.retry_overrides.clone(),
        }
    }

    pub fn print_summary(&self) {
        log::info!("ddx configuration:");
        log::info!("  Base URL: {}", self.base_url);
        log::info!("  Locale: {}", self.locale);
        match &self.version {
            Some(v) => log::info!("  Version: {v} (pinned)"),
            None => log::info!("  Version: latest"),
        }
        log::info!("  HTTP Timeout: {}ms", self.http_timeout_ms);
        log::info!(
            "  Retries: {} (backoff {}ms doubling, cap {}ms)",
            self.retries,
            self.retry_base_ms,
            self.retry_max_ms
        );
        log::info!("  Fresh Window: {}min, GC: {}min", self.stale_minutes, self.gc_minutes);
        for (kind, mins) in &self.stale_overrides {
            log::info!("  Fresh Window [{kind}]: {mins}min");
        }
        for (kind, n) in &self.retry_overrides {
            log::info!("  Retries [{kind}]: {n}");
        }
        if let Some(n) = self.page_size {
            log::info!("  Page Size: {n}");
        }
        if let Some(path) = &self.config_file {
            log::info!("  Config File: {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> CliArgs {
        let mut full = vec!["ddx"];
        full.extend_from_slice(argv);
        CliArgs::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::resolve(&args(&[]), FileConfig::default()).unwrap();
        assert_eq!(cfg.base_url, DEFAULT_CDN_URL);
        assert_eq!(cfg.locale, "en_US");
        assert_eq!(cfg.http_timeout_ms, 10_000);
        let policy = cfg.cache_policy();
        assert_eq!(policy.stale_time, Duration::from_secs(3600));
        assert_eq!(policy.gc_time, Duration::from_secs(600));
        assert_eq!(policy.retry, RetryPolicy::default());
    }

    #[test]
    fn test_cli_beats_file() {
        let file: FileConfig = toml::from_str(
            r#"
            locale = "ko_KR"

            [http]
            timeout_ms = 5000

            [cache]
            stale_minutes = 5

            [cache.stale_overrides]
            versions = 1

            [retry]
            max_retries = 1

            [retry.overrides]
            champion = 0

            [list]
            page_size = 30
            "#,
        )
        .unwrap();
        let cfg = Config::resolve(&args(&["--http-timeout-ms", "2000", "champions"]), file).unwrap();
        assert_eq!(cfg.http_timeout_ms, 2000);
        assert_eq!(cfg.locale, "ko_KR");
        assert_eq!(cfg.stale_minutes, 5);
        assert_eq!(cfg.page_size, Some(30));

        let policy = cfg.cache_policy();
        assert_eq!(policy.stale_time_for(ResourceKind::Versions), Duration::from_secs(60));
        assert_eq!(policy.stale_time_for(ResourceKind::Items), Duration::from_secs(300));
        assert_eq!(policy.retry_for(ResourceKind::Champion).max_retries, 0);
        assert_eq!(policy.retry_for(ResourceKind::Items).max_retries, 1);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(Config::resolve(&args(&["--http-timeout-ms", "500"]), FileConfig::default()).is_err());
        assert!(Config::resolve(&args(&["--retries", "11"]), FileConfig::default()).is_err());
        assert!(Config::resolve(&args(&["--gc-minutes", "0"]), FileConfig::default()).is_err());
        assert!(Config::resolve(&args(&["--page-size", "0"]), FileConfig::default()).is_err());
        assert!(Config::resolve(&args(&["--base-url", "ftp://x"]), FileConfig::default()).is_err());
    }

    #[test]
    fn test_unknown_override_kind_rejected() {
        let file: FileConfig = toml::from_str("[retry.overrides]\nspells = 2\n").unwrap();
        assert!(Config::resolve(&args(&[]), file).is_err());
    }

    #[test]
    fn test_subcommand_parsing() {
        let a = args(&["champions", "-s", "ahri", "-t", "Mage", "-t", "Tank", "-p", "2"]);
        assert_eq!(
            a.command,
            Some(CliCommand::Champions(ListArgs {
                search: Some("ahri".into()),
                tags: vec!["Mage".into(), "Tank".into()],
                page: 2,
            }))
        );
    }
}
