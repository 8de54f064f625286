use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

// ── Top-level config ──────────────────────────────────────────────

/// Top-level cartflow configuration, loaded from a `config.toml`.
///
/// Every field has a default matching the engine's stock behavior, so an
/// empty file (or no file at all) yields a working configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Conversation-context store settings (`[context]`).
    #[serde(default)]
    pub context: ContextConfig,

    /// Cart transaction settings and business-rule caps (`[cart]`).
    #[serde(default)]
    pub cart: CartConfig,

    /// Reference-resolution scoring knobs and vocabularies (`[resolver]`).
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Catalog search tuning (`[catalog]`).
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Conversation-context store configuration (`[context]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Command-history entries retained per session. Default: `20`.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Idle minutes before a session's context expires. Default: `30`.
    #[serde(default = "default_session_timeout_minutes")]
    pub session_timeout_minutes: u64,
    /// Minimum minutes between full expiry sweeps. Default: `60`.
    #[serde(default = "default_context_sweep_minutes")]
    pub sweep_interval_minutes: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            session_timeout_minutes: default_session_timeout_minutes(),
            sweep_interval_minutes: default_context_sweep_minutes(),
        }
    }
}

/// Cart transaction configuration (`[cart]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartConfig {
    /// Maximum total quantity across all lines of one cart. Default: `50`.
    #[serde(default = "default_max_cart_items")]
    pub max_cart_items: u32,
    /// Maximum quantity on a single line. Default: `100`.
    #[serde(default = "default_max_item_quantity")]
    pub max_item_quantity: u32,
    /// Maximum distinct products per cart. Default: `5`.
    #[serde(default = "default_max_distinct_products")]
    pub max_distinct_products: usize,
    /// Idle minutes before a session's cart expires. Default: `30`.
    #[serde(default = "default_session_timeout_minutes")]
    pub session_timeout_minutes: u64,
    /// Seconds between lifecycle sweeper ticks. Default: `60`.
    #[serde(default = "default_cart_sweep_seconds")]
    pub sweep_interval_seconds: u64,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            max_cart_items: default_max_cart_items(),
            max_item_quantity: default_max_item_quantity(),
            max_distinct_products: default_max_distinct_products(),
            session_timeout_minutes: default_session_timeout_minutes(),
            sweep_interval_seconds: default_cart_sweep_seconds(),
        }
    }
}

/// Reference-resolution configuration (`[resolver]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Minimum candidate score for a substitution. Default: `0.6`.
    #[serde(default = "default_acceptance_threshold")]
    pub acceptance_threshold: f64,
    /// History turns considered when collecting candidates. Default: `5`.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Score lost per step of history recency. Default: `0.15`.
    #[serde(default = "default_recency_decay")]
    pub recency_decay: f64,
    /// Multiplier applied to cart-sourced candidates. Default: `1.2`.
    #[serde(default = "default_cart_source_boost")]
    pub cart_source_boost: f64,
    /// Multiplier for entities from successful turns. Default: `1.2`.
    #[serde(default = "default_success_boost")]
    pub success_boost: f64,
    /// Multiplier for entities from failed turns. Default: `0.8`.
    #[serde(default = "default_failure_penalty")]
    pub failure_penalty: f64,
    /// Injected word lists (`[resolver.vocabulary]`).
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: default_acceptance_threshold(),
            history_window: default_history_window(),
            recency_decay: default_recency_decay(),
            cart_source_boost: default_cart_source_boost(),
            success_boost: default_success_boost(),
            failure_penalty: default_failure_penalty(),
            vocabulary: VocabularyConfig::default(),
        }
    }
}

/// Injected vocabularies so new catalogs or locales do not require a
/// recompile. Defaults cover the stock English retail vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyConfig {
    /// Product keywords that mark an item as clothing (size/color prompts).
    #[serde(default = "default_clothing_keywords")]
    pub clothing_keywords: Vec<String>,
    /// Bare pronouns treated as vague without cart context.
    #[serde(default = "default_pronoun_words")]
    pub pronoun_words: Vec<String>,
    /// Words that trigger comparative resolution.
    #[serde(default = "default_comparative_words")]
    pub comparative_words: Vec<String>,
    /// Fixed phrases that recall the last successful add.
    #[serde(default = "default_cross_command_phrases")]
    pub cross_command_phrases: Vec<String>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            clothing_keywords: default_clothing_keywords(),
            pronoun_words: default_pronoun_words(),
            comparative_words: default_comparative_words(),
            cross_command_phrases: default_cross_command_phrases(),
        }
    }
}

/// Catalog search configuration (`[catalog]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Result cap for fuzzy name search. Default: `10`.
    #[serde(default = "default_fuzzy_limit")]
    pub fuzzy_limit: usize,
    /// Suggestions returned by the relaxation ladder. Default: `5`.
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
    /// Minimum weighted similarity for a fuzzy hit. Default: `0.3`.
    #[serde(default = "default_fuzzy_score_floor")]
    pub fuzzy_score_floor: f64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            fuzzy_limit: default_fuzzy_limit(),
            suggestion_limit: default_suggestion_limit(),
            fuzzy_score_floor: default_fuzzy_score_floor(),
        }
    }
}

fn default_max_history() -> usize {
    20
}

fn default_session_timeout_minutes() -> u64 {
    30
}

fn default_context_sweep_minutes() -> u64 {
    60
}

fn default_max_cart_items() -> u32 {
    50
}

fn default_max_item_quantity() -> u32 {
    100
}

fn default_max_distinct_products() -> usize {
    5
}

fn default_cart_sweep_seconds() -> u64 {
    60
}

fn default_acceptance_threshold() -> f64 {
    0.6
}

fn default_history_window() -> usize {
    5
}

fn default_recency_decay() -> f64 {
    0.15
}

fn default_cart_source_boost() -> f64 {
    1.2
}

fn default_success_boost() -> f64 {
    1.2
}

fn default_failure_penalty() -> f64 {
    0.8
}

fn default_fuzzy_limit() -> usize {
    10
}

fn default_suggestion_limit() -> usize {
    5
}

fn default_fuzzy_score_floor() -> f64 {
    0.3
}

fn default_clothing_keywords() -> Vec<String> {
    [
        "shirt", "pants", "dress", "jacket", "sweater", "jeans", "shorts", "skirt", "blouse",
        "hoodie", "coat", "top",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_pronoun_words() -> Vec<String> {
    ["it", "that", "this", "them", "those", "these"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

fn default_comparative_words() -> Vec<String> {
    [
        "cheaper",
        "expensive",
        "larger",
        "smaller",
        "bigger",
        "better",
        "different",
        "alternative",
        "other",
        "another",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn default_cross_command_phrases() -> Vec<String> {
    [
        "same as before",
        "like last time",
        "the previous one",
        "what i ordered",
        "my usual",
        "the same thing",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;
        tracing::info!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Save the configuration back to a TOML file.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .await
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Reject configurations the engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.resolver.acceptance_threshold) {
            anyhow::bail!(
                "resolver.acceptance_threshold {} outside 0.0..=1.0",
                self.resolver.acceptance_threshold
            );
        }
        if self.cart.max_item_quantity == 0 || self.cart.max_cart_items == 0 {
            anyhow::bail!("cart quantity caps must be positive");
        }
        if self.cart.max_distinct_products == 0 {
            anyhow::bail!("cart.max_distinct_products must be positive");
        }
        if self.context.max_history == 0 {
            anyhow::bail!("context.max_history must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_stock_limits() {
        let config = Config::default();
        assert_eq!(config.context.max_history, 20);
        assert_eq!(config.context.session_timeout_minutes, 30);
        assert_eq!(config.cart.max_cart_items, 50);
        assert_eq!(config.cart.max_item_quantity, 100);
        assert_eq!(config.cart.max_distinct_products, 5);
        assert_eq!(config.resolver.acceptance_threshold, 0.6);
    }

    #[test]
    fn empty_toml_parses_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.context.max_history, 20);
        assert!(config
            .resolver
            .vocabulary
            .clothing_keywords
            .contains(&"shirt".to_string()));
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str("[cart]\nmax_cart_items = 10\n").unwrap();
        assert_eq!(config.cart.max_cart_items, 10);
        assert_eq!(config.cart.max_item_quantity, 100);
        assert_eq!(config.context.max_history, 20);
    }

    #[test]
    fn validate_rejects_bad_threshold() {
        let mut config = Config::default();
        config.resolver.acceptance_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_caps() {
        let mut config = Config::default();
        config.cart.max_cart_items = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn load_missing_file_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load(&tmp.path().join("absent.toml")).await.unwrap();
        assert_eq!(config.cart.max_cart_items, 50);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config::default();
        config.cart.max_cart_items = 12;
        config.resolver.vocabulary.clothing_keywords = vec!["kimono".to_string()];
        config.save(&path).await.unwrap();

        let loaded = Config::load(&path).await.unwrap();
        assert_eq!(loaded.cart.max_cart_items, 12);
        assert_eq!(
            loaded.resolver.vocabulary.clothing_keywords,
            vec!["kimono".to_string()]
        );
    }
}
