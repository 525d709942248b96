use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub path: PathBuf,
    pub config: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub source: SourceMeta,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub classify: ClassifyRules,
}

impl SourceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.source.key.trim().is_empty() {
            bail!("source.key must not be empty");
        }
        if self.source.name.trim().is_empty() {
            bail!("source.name must not be empty");
        }

        match self.fetch.mode {
            FetchMode::Http => {
                let Some(base_url) = self.fetch.base_url.as_ref() else {
                    bail!("fetch.base_url is required for http mode");
                };
                Url::parse(base_url)
                    .with_context(|| format!("fetch.base_url is not a valid url: {base_url}"))?;
            }
            FetchMode::File => {
                if self.fetch.file_path.is_none() {
                    bail!("fetch.file_path is required for file mode");
                }
            }
            FetchMode::Inline => {
                if self.fetch.inline_data.is_none() {
                    bail!("fetch.inline_data is required for inline mode");
                }
            }
        }

        if self.classify.chapter_keywords.is_empty() {
            bail!("classify.chapter_keywords must not be empty");
        }
        if self.classify.code_group_separator.is_empty() {
            bail!("classify.code_group_separator must not be empty");
        }

        Ok(())
    }

    pub fn sanitized_source_dir_name(&self) -> String {
        sanitize_for_path(&self.source.key)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceMeta {
    pub key: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    #[default]
    Http,
    File,
    Inline,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default)]
    pub mode: FetchMode,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(default)]
    pub inline_data: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u8,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mode: FetchMode::Http,
            base_url: None,
            file_path: None,
            inline_data: None,
            headers: BTreeMap::new(),
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractFormat {
    #[default]
    Text,
    PdfText,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExtractConfig {
    #[serde(default)]
    pub format: ExtractFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyRules {
    #[serde(default = "default_chapter_keywords")]
    pub chapter_keywords: Vec<String>,
    #[serde(default = "default_duty_keywords")]
    pub duty_keywords: Vec<String>,
    #[serde(default = "default_preference_a_keywords")]
    pub preference_a_keywords: Vec<String>,
    #[serde(default = "default_preference_b_keywords")]
    pub preference_b_keywords: Vec<String>,
    #[serde(default = "default_preference_c_keywords")]
    pub preference_c_keywords: Vec<String>,
    #[serde(default = "default_header_labels")]
    pub header_labels: Vec<String>,
    #[serde(default = "default_code_group_separator")]
    pub code_group_separator: String,
    #[serde(default = "default_true")]
    pub unlabeled_rate_to_duty: bool,
}

impl Default for ClassifyRules {
    fn default() -> Self {
        Self {
            chapter_keywords: default_chapter_keywords(),
            duty_keywords: default_duty_keywords(),
            preference_a_keywords: default_preference_a_keywords(),
            preference_b_keywords: default_preference_b_keywords(),
            preference_c_keywords: default_preference_c_keywords(),
            header_labels: default_header_labels(),
            code_group_separator: default_code_group_separator(),
            unlabeled_rate_to_duty: true,
        }
    }
}

pub fn load_sources_from_dir(config_dir: &Path) -> Result<Vec<LoadedSource>> {
    if !config_dir.exists() {
        bail!("config dir does not exist: {}", config_dir.display());
    }

    let mut loaded = Vec::new();
    for entry in WalkDir::new(config_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("toml") {
            continue;
        }

        loaded.push(load_source_file(path)?);
    }

    loaded.sort_by(|a, b| a.config.source.key.cmp(&b.config.source.key));
    Ok(loaded)
}

pub fn load_source_file(config_path: &Path) -> Result<LoadedSource> {
    let text = std::fs::read_to_string(config_path)
        .with_context(|| format!("failed to read source config: {}", config_path.display()))?;
    let config: SourceConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse toml in {}", config_path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid source config {}", config_path.display()))?;
    Ok(LoadedSource {
        path: config_path.to_path_buf(),
        config,
    })
}

pub fn resolve_path(base_config_path: &Path, maybe_relative: &Path) -> Result<PathBuf> {
    if maybe_relative.is_absolute() {
        return Ok(maybe_relative.to_path_buf());
    }

    let parent = base_config_path.parent().ok_or_else(|| {
        anyhow!(
            "source config has no parent directory: {}",
            base_config_path.display()
        )
    })?;

    Ok(parent.join(maybe_relative))
}

pub fn sanitize_for_path(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_retry_attempts() -> u8 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_chapter_keywords() -> Vec<String> {
    vec!["Chapter".to_string(), "الفصل".to_string()]
}

fn default_duty_keywords() -> Vec<String> {
    vec!["DUTY RATE".to_string()]
}

fn default_preference_a_keywords() -> Vec<String> {
    vec!["EFTA".to_string()]
}

fn default_preference_b_keywords() -> Vec<String> {
    vec!["SG".to_string()]
}

fn default_preference_c_keywords() -> Vec<String> {
    vec!["USA".to_string()]
}

fn default_header_labels() -> Vec<String> {
    vec![
        "HEADING".to_string(),
        "H.S CODE".to_string(),
        "DESCRIPTION".to_string(),
    ]
}

fn default_code_group_separator() -> String {
    ".".to_string()
}
