//! Service wiring: stores, queue, limiter, worker, metrics.

use std::sync::Arc;

use chrono::Duration;

use lingora_auth::{Role, TokenIssuer};
use lingora_core::UserId;
use lingora_imports::{
    ImportService, InMemoryIdempotencyStore, InMemoryImportJobStore, Worker, WorkerConfig,
};
use lingora_infra::{
    AlertClient, CredentialStore, InMemoryCredentialStore, InMemoryQueue, InMemoryRevocationStore,
    InMemoryRoleStore, JobQueue, RateLimiter, RevocationStore, RoleStore, SlidingWindowLimiter,
};
use lingora_observability::MetricsRegistry;

use crate::config::AppConfig;

pub struct AppServices {
    pub config: AppConfig,
    pub issuer: Arc<TokenIssuer>,
    pub credentials: Arc<dyn CredentialStore>,
    pub roles: Arc<dyn RoleStore>,
    pub revocations: Arc<dyn RevocationStore>,
    pub imports: ImportService,
    pub worker: Arc<Worker>,
    pub queue: Arc<dyn JobQueue>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub alerts: AlertClient,
    pub metrics: Arc<MetricsRegistry>,
}

/// Assemble the full service graph. Backend selection (in-memory vs Redis)
/// happens here; route handlers only ever see the traits.
pub fn build_services(config: AppConfig) -> AppServices {
    let issuer = Arc::new(TokenIssuer::new(
        config.jwt_secret.as_bytes(),
        Duration::minutes(config.access_ttl_minutes),
        Duration::days(config.refresh_ttl_days),
    ));

    let credentials: Arc<dyn CredentialStore> = Arc::new(InMemoryCredentialStore::new());
    let roles: Arc<dyn RoleStore> = Arc::new(InMemoryRoleStore::new());
    let revocations: Arc<dyn RevocationStore> = Arc::new(InMemoryRevocationStore::new());
    let metrics = Arc::new(MetricsRegistry::new());
    let alerts = AlertClient::new(
        config.slack_webhook_url.clone(),
        config.pagerduty_routing_key.clone(),
    );

    let queue = build_queue(&config);
    let rate_limiter = build_rate_limiter(&config);

    let job_store = Arc::new(InMemoryImportJobStore::new());
    let idempotency_store = Arc::new(InMemoryIdempotencyStore::new());
    let imports = ImportService::new(job_store.clone(), idempotency_store, queue.clone());

    let worker = Arc::new(Worker::new(
        queue.clone(),
        job_store,
        alerts.clone(),
        metrics.clone(),
        WorkerConfig {
            max_retries: config.max_job_retries,
            backoff_base_seconds: config.backoff_base_seconds,
            ..WorkerConfig::default()
        },
    ));

    bootstrap_admin(&config, roles.as_ref());

    AppServices {
        config,
        issuer,
        credentials,
        roles,
        revocations,
        imports,
        worker,
        queue,
        rate_limiter,
        alerts,
        metrics,
    }
}

fn build_queue(config: &AppConfig) -> Arc<dyn JobQueue> {
    #[cfg(feature = "redis")]
    {
        if let Some(url) = &config.redis_url {
            match lingora_infra::queue::RedisQueue::connect(url, "imports", "imports:dlq") {
                Ok(queue) => return Arc::new(queue),
                Err(error) => {
                    tracing::warn!(%error, "redis queue unavailable, falling back to in-memory");
                }
            }
        }
    }
    let _ = config;
    Arc::new(InMemoryQueue::new())
}

fn build_rate_limiter(config: &AppConfig) -> Arc<dyn RateLimiter> {
    #[cfg(feature = "redis")]
    {
        if let Some(url) = &config.redis_url {
            match lingora_infra::rate_limit::FixedWindowLimiter::connect(
                url,
                config.rate_limit_per_minute,
            ) {
                Ok(limiter) => return Arc::new(limiter),
                Err(error) => {
                    tracing::warn!(%error, "redis rate limiter unavailable, falling back to in-memory");
                }
            }
        }
    }
    Arc::new(SlidingWindowLimiter::new(config.rate_limit_per_minute))
}

/// Grant the configured bootstrap user the admin role. All later grants go
/// through an admin-authenticated path; this is the way the first admin
/// comes into existence.
fn bootstrap_admin(config: &AppConfig, roles: &dyn RoleStore) {
    let Some(raw) = &config.bootstrap_admin else {
        return;
    };
    match UserId::parse(raw) {
        Ok(user_id) => {
            if let Err(error) = roles.set_role(&user_id, Role::Admin) {
                tracing::error!(%error, user_id = %user_id, "bootstrap admin grant failed");
            } else {
                tracing::info!(user_id = %user_id, "bootstrap admin granted");
            }
        }
        Err(error) => {
            tracing::error!(%error, "LINGORA_BOOTSTRAP_ADMIN is not a valid user id");
        }
    }
}
