use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::catalog::{find_book, Book, VersionId, DEFAULT_BOOKS};
use crate::models::Languages;

/// 程序配置
///
/// 所有区间都以秒为单位，`(最小值, 最大值)`。
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// worker 数量上限（实际数量不超过任务数）
    pub max_workers: usize,
    /// 每个任务最多包含的章节数
    pub batch_size: u32,
    /// 单章抓取的重试次数
    pub retry_attempts: u32,
    /// 重试之间的随机等待区间
    pub retry_delay_range: (f64, f64),
    /// 任意两次请求开始之间的最小间隔
    pub min_batch_interval: f64,
    /// 任意两次请求开始之间的最大间隔
    pub max_batch_interval: f64,
    /// 同一 worker 两个任务之间的基础停顿区间（再乘以疲劳系数）
    pub new_batch_delay_range: (f64, f64),
    /// 休眠 worker 占比达到该值时，请求间隔减半
    pub sleeping_threshold_ratio: f64,
    /// worker 从队列取任务的最长等待时间
    pub queue_timeout_secs: u64,
    /// 每次运行的输出根目录
    pub output_root: PathBuf,
    /// 检查点子目录名
    pub partial_results_dir: String,
    /// 要抓取的书卷（名称或缩写）
    pub books: Vec<String>,
    /// 要抓取的译本（后缀）
    pub versions: Vec<String>,
    /// 是否使用无头浏览器
    pub headless: bool,
    /// 页面加载超时
    pub page_timeout_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,

    // ---- 句子翻译 ----
    /// 待翻译句子的 JSON 文件
    pub sentences_file: Option<PathBuf>,
    /// 翻译运行的输出根目录，与抓经文的运行分开查找检查点
    pub translation_output_root: PathBuf,
    /// 每个任务最多包含的句子数
    pub sentence_batch_size: u32,
    /// 一次请求合并的句子数区间，每个任务随机取一次
    pub sentences_per_request_range: (u32, u32),
    /// 同一任务内累计多少次失败后冷却一次
    pub error_cooldown_threshold: u32,
    /// 冷却时长区间（再乘以 2）
    pub cooldown_delay_range: (f64, f64),
    /// 原文 / 译文 / 对照文本的语言代码
    pub languages: Languages,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: 6,
            batch_size: 10,
            retry_attempts: 3,
            retry_delay_range: (5.0, 15.0),
            min_batch_interval: 3.0,
            max_batch_interval: 8.0,
            new_batch_delay_range: (80.0, 150.0),
            sleeping_threshold_ratio: 0.5,
            queue_timeout_secs: 10,
            output_root: PathBuf::from("output/bibles"),
            partial_results_dir: "partial_results".to_string(),
            books: DEFAULT_BOOKS.iter().map(|s| s.to_string()).collect(),
            versions: VersionId::ALL
                .iter()
                .map(|v| v.suffix().to_string())
                .collect(),
            headless: true,
            page_timeout_ms: 60_000,
            verbose_logging: false,
            sentences_file: None,
            translation_output_root: PathBuf::from("output/translations"),
            sentence_batch_size: 15,
            sentences_per_request_range: (2, 5),
            error_cooldown_threshold: 5,
            cooldown_delay_range: (2.0, 10.0),
            languages: Languages::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_workers: env_parse("MAX_WORKERS").unwrap_or(default.max_workers),
            batch_size: env_parse("BATCH_SIZE").unwrap_or(default.batch_size),
            retry_attempts: env_parse("RETRY_ATTEMPTS").unwrap_or(default.retry_attempts),
            retry_delay_range: env_range("RETRY_DELAY_RANGE").unwrap_or(default.retry_delay_range),
            min_batch_interval: env_parse("MIN_BATCH_INTERVAL").unwrap_or(default.min_batch_interval),
            max_batch_interval: env_parse("MAX_BATCH_INTERVAL").unwrap_or(default.max_batch_interval),
            new_batch_delay_range: env_range("NEW_BATCH_DELAY_RANGE").unwrap_or(default.new_batch_delay_range),
            sleeping_threshold_ratio: env_parse("SLEEPING_THRESHOLD_RATIO").unwrap_or(default.sleeping_threshold_ratio),
            queue_timeout_secs: env_parse("QUEUE_TIMEOUT_SECS").unwrap_or(default.queue_timeout_secs),
            output_root: std::env::var("OUTPUT_ROOT").map(PathBuf::from).unwrap_or(default.output_root),
            partial_results_dir: std::env::var("PARTIAL_RESULTS_DIR").unwrap_or(default.partial_results_dir),
            books: env_list("BOOKS").unwrap_or(default.books),
            versions: env_list("VERSIONS").unwrap_or(default.versions),
            headless: env_parse("HEADLESS").unwrap_or(default.headless),
            page_timeout_ms: env_parse("PAGE_TIMEOUT_MS").unwrap_or(default.page_timeout_ms),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
            sentences_file: std::env::var("SENTENCES_FILE").ok().map(PathBuf::from).or(default.sentences_file),
            translation_output_root: std::env::var("TRANSLATION_OUTPUT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(default.translation_output_root),
            sentence_batch_size: env_parse("SENTENCE_BATCH_SIZE").unwrap_or(default.sentence_batch_size),
            sentences_per_request_range: env_range("SENTENCES_PER_REQUEST_RANGE")
                .map(|(min, max)| (min as u32, max as u32))
                .unwrap_or(default.sentences_per_request_range),
            error_cooldown_threshold: env_parse("ERROR_COOLDOWN_THRESHOLD").unwrap_or(default.error_cooldown_threshold),
            cooldown_delay_range: env_range("COOLDOWN_DELAY_RANGE").unwrap_or(default.cooldown_delay_range),
            languages: Languages {
                source: std::env::var("SOURCE_LANG").unwrap_or(default.languages.source),
                target: std::env::var("TARGET_LANG").unwrap_or(default.languages.target),
                original: std::env::var("ORIGINAL_LANG").unwrap_or(default.languages.original),
            },
        }
    }

    /// 从 TOML 文件加载，缺省字段取默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// `SCRAPER_CONFIG` 指向配置文件时读文件，否则读环境变量
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var("SCRAPER_CONFIG") {
            Ok(path) => Self::from_toml_file(Path::new(&path)),
            Err(_) => Ok(Self::from_env()),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::MustBePositive { name: "max_workers" });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::MustBePositive { name: "batch_size" });
        }
        check_range("retry_delay_range", self.retry_delay_range)?;
        check_range(
            "batch_interval",
            (self.min_batch_interval, self.max_batch_interval),
        )?;
        check_range("new_batch_delay_range", self.new_batch_delay_range)?;
        if !(self.sleeping_threshold_ratio > 0.0 && self.sleeping_threshold_ratio <= 1.0) {
            return Err(ConfigError::InvalidRatio {
                name: "sleeping_threshold_ratio",
                value: self.sleeping_threshold_ratio,
            });
        }
        if self.sentence_batch_size == 0 {
            return Err(ConfigError::MustBePositive { name: "sentence_batch_size" });
        }
        let (min_per_request, max_per_request) = self.sentences_per_request_range;
        if min_per_request == 0 {
            return Err(ConfigError::MustBePositive { name: "sentences_per_request_range" });
        }
        check_range(
            "sentences_per_request_range",
            (f64::from(min_per_request), f64::from(max_per_request)),
        )?;
        if self.error_cooldown_threshold == 0 {
            return Err(ConfigError::MustBePositive { name: "error_cooldown_threshold" });
        }
        check_range("cooldown_delay_range", self.cooldown_delay_range)?;
        self.check_languages()?;
        self.resolve_books()?;
        self.resolve_versions()?;
        Ok(())
    }

    /// 语言代码非空且互不相同（它们会成为同一条记录里的字段名）
    fn check_languages(&self) -> Result<(), ConfigError> {
        let Languages {
            source,
            target,
            original,
        } = &self.languages;
        let codes = [source, target, original];
        if codes.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::InvalidLanguages("语言代码不能为空".to_string()));
        }
        if source == target || source == original || target == original {
            return Err(ConfigError::InvalidLanguages(format!(
                "语言代码必须互不相同: {} / {} / {}",
                source, target, original
            )));
        }
        Ok(())
    }

    /// 把书卷名称解析为目录中的书卷
    pub fn resolve_books(&self) -> Result<Vec<&'static Book>, ConfigError> {
        self.books
            .iter()
            .map(|name| find_book(name).ok_or_else(|| ConfigError::UnknownBook(name.clone())))
            .collect()
    }

    /// 把译本后缀解析为译本标识
    pub fn resolve_versions(&self) -> Result<Vec<VersionId>, ConfigError> {
        self.versions
            .iter()
            .map(|s| VersionId::from_suffix(s).ok_or_else(|| ConfigError::UnknownVersion(s.clone())))
            .collect()
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_timeout_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }
}

fn check_range(name: &'static str, (min, max): (f64, f64)) -> Result<(), ConfigError> {
    if min < 0.0 || max < min || !min.is_finite() || !max.is_finite() {
        return Err(ConfigError::InvalidRange { name, min, max });
    }
    Ok(())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// "5,15" → (5.0, 15.0)
fn env_range(key: &str) -> Option<(f64, f64)> {
    std::env::var(key).ok().and_then(|v| parse_range(&v))
}

fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|v| {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

pub(crate) fn parse_range(value: &str) -> Option<(f64, f64)> {
    let (min, max) = value.split_once(',')?;
    Some((min.trim().parse().ok()?, max.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resolve_books().unwrap().len(), DEFAULT_BOOKS.len());
        assert_eq!(config.resolve_versions().unwrap().len(), VersionId::ALL.len());
    }

    #[test]
    fn test_toml_overrides_and_defaults() {
        let config = Config::from_toml_str(
            r#"
            max_workers = 2
            batch_size = 15
            retry_delay_range = [1.0, 2.5]
            books = ["Genesis", "REV"]
            versions = ["niv"]
            "#,
        )
        .unwrap();

        assert_eq!(config.max_workers, 2);
        assert_eq!(config.batch_size, 15);
        assert_eq!(config.retry_delay_range, (1.0, 2.5));
        assert_eq!(config.retry_attempts, Config::default().retry_attempts);
        assert_eq!(config.resolve_versions().unwrap(), vec![VersionId::Niv]);
        assert_eq!(
            config
                .resolve_books()
                .unwrap()
                .iter()
                .map(|b| b.id)
                .collect::<Vec<_>>(),
            vec![1, 73]
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            max_workers: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MustBePositive { name: "max_workers" })
        ));

        let config = Config {
            min_batch_interval: 10.0,
            max_batch_interval: 1.0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRange { .. })));

        let config = Config {
            books: vec!["Nope".into()],
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::UnknownBook(_))));

        let config = Config {
            sentences_per_request_range: (0, 3),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::MustBePositive { .. })));
    }

    #[test]
    fn test_languages_must_be_distinct() {
        let mut config = Config::default();
        config.languages.original = config.languages.source.clone();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLanguages(_))));
    }

    #[test]
    fn test_toml_languages_table() {
        let config = Config::from_toml_str(
            r#"
            sentence_batch_size = 20
            sentences_per_request_range = [1, 3]

            [languages]
            source = "fr"
            target = "br"
            "#,
        )
        .unwrap();

        assert_eq!(config.sentence_batch_size, 20);
        assert_eq!(config.sentences_per_request_range, (1, 3));
        assert_eq!(config.languages.direction(), "FR2BR");
        assert_eq!(config.languages.original, "original");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("5,15"), Some((5.0, 15.0)));
        assert_eq!(parse_range(" 0.5 , 2 "), Some((0.5, 2.0)));
        assert_eq!(parse_range("5"), None);
    }
}
