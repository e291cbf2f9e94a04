//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::LlmBackend;

/// Session value time-to-live: 48 hours.
pub const SESSION_TTL: Duration = Duration::from_secs(172_800);

/// Per-user concurrency policy applied by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyPolicy {
    /// At most one queued-or-running task per user; extra events are rejected.
    SerializePerUser,
    /// Tasks from the same user may run concurrently (last write wins).
    Interleave,
}

impl std::str::FromStr for ConcurrencyPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serialize" | "serialize_per_user" => Ok(Self::SerializePerUser),
            "interleave" => Ok(Self::Interleave),
            other => Err(ConfigError::InvalidValue {
                key: "RESUME_BOT_POLICY".to_string(),
                message: format!("unknown policy '{other}' (expected serialize or interleave)"),
            }),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of long-lived workers.
    pub worker_count: usize,
    /// Maximum number of pending tasks.
    pub queue_capacity: usize,
    /// TTL for both resume and job texts.
    pub session_ttl: Duration,
    /// Upper bound on a single posting fetch.
    pub fetch_timeout: Duration,
    /// Where downloaded documents are stored until parsed.
    pub upload_dir: PathBuf,
    pub policy: ConcurrencyPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: 3,
            queue_capacity: 50,
            session_ttl: SESSION_TTL,
            fetch_timeout: Duration::from_secs(15),
            upload_dir: PathBuf::from("./uploads"),
            policy: ConcurrencyPolicy::SerializePerUser,
        }
    }
}

impl PipelineConfig {
    /// Build from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let worker_count = parse_env("RESUME_BOT_WORKERS")?.unwrap_or(defaults.worker_count);
        if worker_count == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RESUME_BOT_WORKERS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let queue_capacity =
            parse_env("RESUME_BOT_QUEUE_CAPACITY")?.unwrap_or(defaults.queue_capacity);
        if queue_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RESUME_BOT_QUEUE_CAPACITY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let fetch_timeout = parse_env::<u64>("RESUME_BOT_FETCH_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.fetch_timeout);

        let upload_dir = std::env::var("RESUME_BOT_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.upload_dir);

        let policy = match std::env::var("RESUME_BOT_POLICY") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.policy,
        };

        Ok(Self {
            worker_count,
            queue_capacity,
            session_ttl: SESSION_TTL,
            fetch_timeout,
            upload_dir,
            policy,
        })
    }
}

/// Process-level configuration: credentials and adapter selection.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    /// `None` when running the local CLI messenger.
    pub telegram_token: Option<SecretString>,
    pub telegram_allowed_users: Vec<String>,
    pub llm_backend: LlmBackend,
    pub llm_api_key: SecretString,
    pub llm_model: String,
    pub redis_url: Option<String>,
    pub posting_domains: Vec<String>,
}

impl AppConfig {
    /// Load configuration from the environment. Missing credentials are fatal.
    pub fn from_env() -> Result<Self, ConfigError> {
        let pipeline = PipelineConfig::from_env()?;

        let use_cli = std::env::var("RESUME_BOT_CLI")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let telegram_token = if use_cli {
            None
        } else {
            let token = std::env::var("TELEGRAM_BOT_TOKEN")
                .map_err(|_| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".to_string()))?;
            Some(SecretString::from(token))
        };

        let telegram_allowed_users = split_list(
            &std::env::var("TELEGRAM_ALLOWED_USERS").unwrap_or_else(|_| "*".to_string()),
        );

        let llm_backend = match std::env::var("RESUME_BOT_LLM")
            .unwrap_or_else(|_| "anthropic".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "anthropic" => LlmBackend::Anthropic,
            "openai" => LlmBackend::OpenAi,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "RESUME_BOT_LLM".to_string(),
                    message: format!("unknown backend '{other}'"),
                });
            }
        };

        let key_var = match llm_backend {
            LlmBackend::Anthropic => "ANTHROPIC_API_KEY",
            LlmBackend::OpenAi => "OPENAI_API_KEY",
        };
        let llm_api_key = std::env::var(key_var)
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingEnvVar(key_var.to_string()))?;

        let llm_model = std::env::var("RESUME_BOT_MODEL").unwrap_or_else(|_| {
            match llm_backend {
                LlmBackend::Anthropic => "claude-sonnet-4-20250514",
                LlmBackend::OpenAi => "gpt-4o",
            }
            .to_string()
        });

        let redis_url = std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty());

        let posting_domains = std::env::var("RESUME_BOT_POSTING_DOMAINS")
            .map(|v| split_list(&v))
            .unwrap_or_else(|_| {
                crate::fetcher::DEFAULT_DOMAINS
                    .iter()
                    .map(|d| d.to_string())
                    .collect()
            });

        Ok(Self {
            pipeline,
            telegram_token,
            telegram_allowed_users,
            llm_backend,
            llm_api_key,
            llm_model,
            redis_url,
            posting_domains,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
