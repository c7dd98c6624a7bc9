//! Process configuration from environment variables.

use anyhow::bail;

const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
    pub rate_limit_per_minute: u32,
    pub max_job_retries: u32,
    pub backoff_base_seconds: u64,
    pub queue_depth_alert_threshold: usize,
    pub allow_self_registration: bool,
    pub slack_webhook_url: Option<String>,
    pub pagerduty_routing_key: Option<String>,
    /// Out-of-band role bootstrap: this user id is granted admin at startup.
    pub bootstrap_admin: Option<String>,
    /// Selects the Redis queue/rate-limit backends when the `redis` feature
    /// is compiled in.
    pub redis_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            jwt_secret: "insecure-dev-secret".to_string(),
            access_ttl_minutes: 30,
            refresh_ttl_days: 14,
            rate_limit_per_minute: 120,
            max_job_retries: 3,
            backoff_base_seconds: 2,
            queue_depth_alert_threshold: 1000,
            allow_self_registration: false,
            slack_webhook_url: None,
            pagerduty_routing_key: None,
            bootstrap_admin: None,
            redis_url: None,
        }
    }
}

impl AppConfig {
    /// Load from `LINGORA_*` environment variables, falling back to the
    /// defaults above. Fails on an unparseable value or a too-short secret.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let jwt_secret = match std::env::var("LINGORA_JWT_SECRET") {
            Ok(secret) => {
                if secret.len() < MIN_SECRET_LEN {
                    bail!("LINGORA_JWT_SECRET must be at least {MIN_SECRET_LEN} bytes");
                }
                secret
            }
            Err(_) => {
                tracing::warn!("LINGORA_JWT_SECRET not set; using insecure dev default");
                defaults.jwt_secret
            }
        };

        Ok(Self {
            bind_addr: var_or("LINGORA_BIND_ADDR", defaults.bind_addr),
            jwt_secret,
            access_ttl_minutes: parsed_var("LINGORA_ACCESS_TTL_MINUTES", defaults.access_ttl_minutes)?,
            refresh_ttl_days: parsed_var("LINGORA_REFRESH_TTL_DAYS", defaults.refresh_ttl_days)?,
            rate_limit_per_minute: parsed_var(
                "LINGORA_RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            )?,
            max_job_retries: parsed_var("LINGORA_MAX_JOB_RETRIES", defaults.max_job_retries)?,
            backoff_base_seconds: parsed_var(
                "LINGORA_BACKOFF_BASE_SECONDS",
                defaults.backoff_base_seconds,
            )?,
            queue_depth_alert_threshold: parsed_var(
                "LINGORA_QUEUE_DEPTH_ALERT_THRESHOLD",
                defaults.queue_depth_alert_threshold,
            )?,
            allow_self_registration: parsed_var(
                "LINGORA_ALLOW_SELF_REGISTRATION",
                defaults.allow_self_registration,
            )?,
            slack_webhook_url: std::env::var("LINGORA_SLACK_WEBHOOK_URL").ok(),
            pagerduty_routing_key: std::env::var("LINGORA_PAGERDUTY_ROUTING_KEY").ok(),
            bootstrap_admin: std::env::var("LINGORA_BOOTSTRAP_ADMIN").ok(),
            redis_url: std::env::var("LINGORA_REDIS_URL").ok(),
        })
    }
}

fn var_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{name} has unparseable value {raw:?}")),
        Err(_) => Ok(default),
    }
}
