//! Configuration for the evaluation harness.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Search backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the Elasticsearch cluster (e.g., "http://localhost:9200")
    pub url: String,

    /// Index holding the document collection
    pub index: String,

    /// Fields searched by the keyword strategy
    #[serde(default = "default_keyword_fields")]
    pub keyword_fields: Vec<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_keyword_fields() -> Vec<String> {
    vec!["title".to_string(), "parsedParagraphs".to_string()]
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index: "student_index".to_string(),
            keyword_fields: default_keyword_fields(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Evaluation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Cutoff depths at which precision and recall are computed.
    #[serde(default = "default_cutoffs")]
    pub cutoffs: Vec<usize>,

    /// Number of results requested from the backend per query.
    #[serde(default = "default_depth")]
    pub depth: usize,
}

fn default_cutoffs() -> Vec<usize> {
    vec![5, 10]
}

fn default_depth() -> usize {
    40
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            cutoffs: default_cutoffs(),
            depth: default_depth(),
        }
    }
}

/// LLM configuration for the answer check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API, including its version path
    /// (e.g., "https://api.openai.com/v1")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name (e.g., "gemini-2.5-flash")
    pub model: String,

    /// Maximum tokens for response (optional)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation (optional)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.0
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Search backend settings
    pub search: SearchConfig,
    /// Evaluation settings
    pub eval: EvalConfig,
    /// LLM settings
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    search: Option<SearchFileSection>,
    eval: Option<EvalFileSection>,
    llm: Option<LlmFileSection>,
}

#[derive(Debug, Deserialize)]
struct SearchFileSection {
    url: Option<String>,
    index: Option<String>,
    keyword_fields: Option<Vec<String>>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EvalFileSection {
    cutoffs: Option<Vec<usize>>,
    depth: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct LlmFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        EvalError::InvalidConfig(format!("{} has an invalid value '{}'", name, raw))
    })
}

/// Parse a comma-separated list of cutoffs such as "5,10".
pub fn parse_cutoffs(raw: &str) -> Result<Vec<usize>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| EvalError::InvalidConfig(format!("'{}' is not a valid cutoff", s)))
        })
        .collect()
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (ES_URL, ES_INDEX, ES_TIMEOUT_SECS, EVAL_CUTOFFS,
    ///    EVAL_DEPTH, LLM_API_BASE, LLM_API_KEY, LLM_MODEL, LLM_MAX_TOKENS, LLM_TEMPERATURE)
    /// 2. Config file (~/.config/ir-eval/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_overrides(|name| env::var(name).ok())?;
        Ok(config)
    }

    /// Apply overrides looked up by variable name. A value that does not
    /// parse is an error, never silently ignored.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var("ES_URL") {
            self.search.url = url;
        }

        if let Some(index) = var("ES_INDEX") {
            self.search.index = index;
        }

        if let Some(timeout) = var("ES_TIMEOUT_SECS") {
            self.search.timeout_secs = parse_var("ES_TIMEOUT_SECS", &timeout)?;
        }

        if let Some(cutoffs) = var("EVAL_CUTOFFS") {
            self.eval.cutoffs = parse_cutoffs(&cutoffs)?;
        }

        if let Some(depth) = var("EVAL_DEPTH") {
            self.eval.depth = parse_var("EVAL_DEPTH", &depth)?;
        }

        if let Some(api_base) = var("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }

        if let Some(api_key) = var("LLM_API_KEY")
            .or_else(|| var("GEMINI_API_KEY"))
            .or_else(|| var("GOOGLE_API_KEY"))
        {
            self.llm.api_key = api_key;
        }

        if let Some(model) = var("LLM_MODEL") {
            self.llm.model = model;
        }

        if let Some(max_tokens) = var("LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_var("LLM_MAX_TOKENS", &max_tokens)?;
        }

        if let Some(temperature) = var("LLM_TEMPERATURE") {
            self.llm.temperature = parse_var("LLM_TEMPERATURE", &temperature)?;
        }

        Ok(())
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text, filling unspecified values with defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| EvalError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(search) = file_config.search {
            if let Some(url) = search.url {
                config.search.url = url;
            }
            if let Some(index) = search.index {
                config.search.index = index;
            }
            if let Some(fields) = search.keyword_fields {
                config.search.keyword_fields = fields;
            }
            if let Some(timeout_secs) = search.timeout_secs {
                config.search.timeout_secs = timeout_secs;
            }
        }

        if let Some(eval) = file_config.eval {
            if let Some(cutoffs) = eval.cutoffs {
                config.eval.cutoffs = cutoffs;
            }
            if let Some(depth) = eval.depth {
                config.eval.depth = depth;
            }
        }

        if let Some(llm) = file_config.llm {
            if let Some(api_base) = llm.api_base {
                config.llm.api_base = api_base;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = api_key;
            }
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                config.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                config.llm.temperature = temperature;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ir-eval")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate the search backend settings.
    pub fn validate_search(&self) -> Result<()> {
        if self.search.url.is_empty() {
            return Err(EvalError::Config(
                "Search URL is required. Set ES_URL environment variable or add to config file."
                    .to_string(),
            ));
        }

        if self.search.index.is_empty() {
            return Err(EvalError::Config(
                "Search index is required. Set ES_INDEX environment variable or add to config file."
                    .to_string(),
            ));
        }

        if self.search.keyword_fields.is_empty() {
            return Err(EvalError::Config(
                "At least one keyword field is required.".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate the evaluation settings.
    pub fn validate_eval(&self) -> Result<()> {
        if self.eval.depth == 0 {
            return Err(EvalError::InvalidConfig(
                "Result depth must be at least 1".to_string(),
            ));
        }

        if self.eval.cutoffs.is_empty() {
            return Err(EvalError::InvalidConfig(
                "At least one cutoff is required".to_string(),
            ));
        }

        for &cutoff in &self.eval.cutoffs {
            if cutoff == 0 {
                return Err(EvalError::InvalidConfig(
                    "Cutoff 0 is not allowed".to_string(),
                ));
            }
            if cutoff > self.eval.depth {
                return Err(EvalError::InvalidConfig(format!(
                    "Cutoff {} exceeds result depth {}",
                    cutoff, self.eval.depth
                )));
            }
        }

        Ok(())
    }

    /// Validate the LLM settings.
    pub fn validate_llm(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(EvalError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file."
                    .to_string(),
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(EvalError::Config(
                "LLM API key is required. Set LLM_API_KEY (or GEMINI_API_KEY) environment variable or add to config file."
                    .to_string(),
            ));
        }

        if self.llm.model.is_empty() {
            return Err(EvalError::Config("LLM model is required.".to_string()));
        }

        Ok(())
    }

    /// Validate the search and evaluation settings.
    pub fn validate(&self) -> Result<()> {
        self.validate_search()?;
        self.validate_eval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = Config::default();
        config.apply_overrides(|name| vars.get(name).cloned())?;
        Ok(config)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.search.url, "http://localhost:9200");
        assert_eq!(config.search.index, "student_index");
        assert_eq!(config.search.keyword_fields, vec!["title", "parsedParagraphs"]);
        assert_eq!(config.search.timeout_secs, 30);
        assert_eq!(config.eval.cutoffs, vec![5, 10]);
        assert_eq!(config.eval.depth, 40);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let yaml = r#"
search:
  index: wiki_index
eval:
  cutoffs: [2, 5]
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.search.index, "wiki_index");
        assert_eq!(config.search.url, "http://localhost:9200");
        assert_eq!(config.eval.cutoffs, vec![2, 5]);
        assert_eq!(config.eval.depth, 40);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(Config::from_yaml_str("search: [unclosed").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_cutoffs() {
        let mut config = Config::default();
        config.eval.cutoffs = vec![];
        assert!(config.validate_eval().is_err());

        config.eval.cutoffs = vec![0, 5];
        assert!(config.validate_eval().is_err());

        config.eval.cutoffs = vec![50];
        assert!(config.validate_eval().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_index() {
        let mut config = Config::default();
        config.search.index.clear();
        assert!(config.validate_search().is_err());
    }

    #[test]
    fn test_parse_cutoffs() {
        assert_eq!(parse_cutoffs("5, 10").unwrap(), vec![5, 10]);
        assert_eq!(parse_cutoffs("20,").unwrap(), vec![20]);
        assert!(parse_cutoffs("five").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let config = overrides(&[
            ("ES_INDEX", "wiki"),
            ("ES_TIMEOUT_SECS", "5"),
            ("EVAL_DEPTH", " 20 "),
            ("EVAL_CUTOFFS", "2,4"),
            ("GEMINI_API_KEY", "g-key"),
            ("LLM_MODEL", "gpt-4o-mini"),
        ])
        .unwrap();
        assert_eq!(config.search.index, "wiki");
        assert_eq!(config.search.timeout_secs, 5);
        assert_eq!(config.eval.depth, 20);
        assert_eq!(config.eval.cutoffs, vec![2, 4]);
        assert_eq!(config.llm.api_key, "g-key");
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_llm_key_prefers_generic_variable() {
        let config = overrides(&[("GEMINI_API_KEY", "g-key"), ("LLM_API_KEY", "l-key")]).unwrap();
        assert_eq!(config.llm.api_key, "l-key");
    }

    #[test]
    fn test_unparsable_env_values_rejected() {
        for (name, raw) in [
            ("ES_TIMEOUT_SECS", "soon"),
            ("EVAL_DEPTH", "-3"),
            ("EVAL_CUTOFFS", "five"),
            ("LLM_MAX_TOKENS", "lots"),
            ("LLM_TEMPERATURE", "warm"),
        ] {
            let err = overrides(&[(name, raw)]).unwrap_err();
            assert!(matches!(err, EvalError::InvalidConfig(_)), "{name}");
        }
    }

    #[test]
    fn test_llm_section_and_validation() {
        let yaml = r#"
llm:
  api_base: https://api.openai.com/v1
  model: gpt-4o
"#;
        let mut config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.llm.api_base, "https://api.openai.com/v1");
        assert_eq!(config.llm.max_tokens, 4096);
        assert!(config.validate_llm().is_err());

        config.llm.api_key = "secret".to_string();
        assert!(config.validate_llm().is_ok());
    }
}
