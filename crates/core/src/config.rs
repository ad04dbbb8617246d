use serde::Deserialize;
use std::time::Duration;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CAMPAIGN_GEN__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Generation SLA and progress reporting.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// Hard deadline measured from request acceptance.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    /// Bound on writing the FAILED record after a timeout or failure.
    #[serde(default = "default_failure_record_timeout_ms")]
    pub failure_record_timeout_ms: u64,
    /// Fraction of the total budget given to LinkedIn when both platforms run.
    #[serde(default = "default_linkedin_budget_share")]
    pub linkedin_budget_share: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    #[serde(default = "default_advisor_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_deadline_ms() -> u64 {
    30_000
}
fn default_progress_interval_ms() -> u64 {
    1_000
}
fn default_failure_record_timeout_ms() -> u64 {
    5_000
}
fn default_linkedin_budget_share() -> f64 {
    0.5
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    250
}
fn default_max_delay_ms() -> u64 {
    2_000
}
fn default_jitter_ms() -> u64 {
    50
}
fn default_advisor_timeout_ms() -> u64 {
    10_000
}
fn default_max_suggestions() -> usize {
    10
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_cache_max_entries() -> usize {
    10_000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            progress_interval_ms: default_progress_interval_ms(),
            failure_record_timeout_ms: default_failure_record_timeout_ms(),
            linkedin_budget_share: default_linkedin_budget_share(),
        }
    }
}

impl GenerationConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }

    pub fn failure_record_timeout(&self) -> Duration {
        Duration::from_millis(self.failure_record_timeout_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_advisor_timeout_ms(),
            max_suggestions: default_max_suggestions(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            generation: GenerationConfig::default(),
            retry: RetryConfig::default(),
            advisor: AdvisorConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("CAMPAIGN_GEN")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Reject settings the generation pipeline cannot honor.
    pub fn validate(&self) -> Result<(), crate::CampaignError> {
        if self.generation.deadline_ms == 0 {
            return Err(crate::CampaignError::Config(
                "generation.deadline_ms must be positive".into(),
            ));
        }
        if self.generation.progress_interval_ms == 0 {
            return Err(crate::CampaignError::Config(
                "generation.progress_interval_ms must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.generation.linkedin_budget_share) {
            return Err(crate::CampaignError::Config(
                "generation.linkedin_budget_share must be within [0, 1]".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(crate::CampaignError::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
