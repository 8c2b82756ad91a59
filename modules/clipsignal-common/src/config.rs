use std::env;
use std::time::Duration;

/// Pipeline configuration loaded once from environment variables and threaded
/// through every component; extraction logic never reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_url: String,
    pub store_service_key: String,
    pub youtube_api_key: Option<String>,
    pub openai_api_key: Option<String>,

    pub review_model: String,
    pub default_video_limit: u32,
    pub min_confidence: f32,
    pub transcript_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            store_url: required_env("STORE_URL"),
            store_service_key: required_env("STORE_SERVICE_ROLE_KEY"),
            youtube_api_key: env::var("YOUTUBE_API_KEY").ok().filter(|v| !v.is_empty()),
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty()),
            review_model: env::var("PIPELINE_REVIEW_MODEL")
                .unwrap_or_else(|_| "gpt-4.1-mini".to_string()),
            default_video_limit: parse_positive_int(
                env::var("PIPELINE_DEFAULT_VIDEO_LIMIT").ok(),
                5,
            ),
            min_confidence: parse_float(env::var("PIPELINE_MIN_CONFIDENCE").ok(), 0.45),
            transcript_timeout: Duration::from_millis(u64::from(parse_positive_int(
                env::var("PIPELINE_TRANSCRIPT_TIMEOUT_MS").ok(),
                12_000,
            ))),
        }
    }

    pub fn require_youtube(&self) -> &str {
        self.youtube_api_key
            .as_deref()
            .unwrap_or_else(|| panic!("YOUTUBE_API_KEY environment variable is required"))
    }

    pub fn require_openai(&self) -> &str {
        self.openai_api_key
            .as_deref()
            .unwrap_or_else(|| panic!("OPENAI_API_KEY environment variable is required"))
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parse_positive_int(value: Option<String>, fallback: u32) -> u32 {
    value
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(fallback)
}

fn parse_float(value: Option<String>, fallback: f32) -> f32 {
    value
        .and_then(|v| v.parse::<f32>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(fallback)
}
