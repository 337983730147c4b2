use std::{sync::Arc, time::Duration};

use anyhow::{Error, Result};
use chrono::{SecondsFormat, Utc};
use futures_util::StreamExt;
use lapin::message::Delivery;
use notification_router::{
    api::run_api_server,
    clients::{
        authorization::HttpAuthorizationClient,
        circuit_breaker::CircuitBreaker,
        config_service::HttpRemoteConfig,
        health::HealthChecker,
        rbmq::{RabbitMqClient, RetryingForwarder},
        redis::{self as redis_client, RedisMappingCache},
    },
    config::Config,
    mapping::{
        cache::{MappingCache, TtlCache},
        dispatch::DispatchResolver,
        local::LocalMappingStore,
        resolver::{NotificationResolver, StockingRuleSource, VehicleConfigCache},
    },
    models::{
        mapping::{CacheBackend, ConfigMap, ResolverMode},
        message::DlqMessage,
    },
    pipeline::NotificationPipeline,
    routing::ForwardingRouter,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_SERVICE: &str = "config_service";
const AUTHORIZATION_SERVICE: &str = "authorization_service";

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    info!(
        resolver_mode = ?config.resolver_mode,
        cache_backend = ?config.mapping_cache_backend,
        "Configuration loaded"
    );

    let redis = redis_client::connect(&config.redis_url).await?;

    let config_breaker = CircuitBreaker::new(
        CONFIG_SERVICE,
        redis.clone(),
        config.circuit_breaker_config(),
    );
    let authorization_breaker = CircuitBreaker::new(
        AUTHORIZATION_SERVICE,
        redis.clone(),
        config.circuit_breaker_config(),
    );

    let local = Arc::new(LocalMappingStore::load(&config.notification_mapping_path)?);

    let resolver = match config.resolver_mode {
        ResolverMode::Static => NotificationResolver::new_static(local),
        ResolverMode::StockingRule => {
            let cache: Arc<dyn MappingCache> = match config.mapping_cache_backend {
                CacheBackend::Redis => Arc::new(RedisMappingCache::new(redis.clone())),
                CacheBackend::Memory => {
                    let cache = Arc::new(TtlCache::<ConfigMap>::new());
                    spawn_cache_purge(Arc::clone(&cache), config.mapping_cache_ttl());
                    cache
                }
            };

            let remote = HttpRemoteConfig::new(
                &config.config_service_url,
                config.config_service_timeout(),
            )?
            .with_circuit_breaker(config_breaker.clone());

            let source = StockingRuleSource::new(
                config.stocking_rule_config(),
                Arc::new(remote),
                VehicleConfigCache::new(&config.service_name, cache, config.mapping_cache_ttl()),
            );

            NotificationResolver::new_stocking_rule(local, source)
        }
    };

    let dispatch = DispatchResolver::from_resolver(Arc::new(resolver));

    let rabbitmq = Arc::new(RabbitMqClient::connect(&config).await?);

    let authorization = HttpAuthorizationClient::new(
        &config.authorization_service_url,
        config.authorization_timeout(),
    )?
    .with_circuit_breaker(authorization_breaker.clone());

    let forwarder = RetryingForwarder::new(rabbitmq.clone(), config.retry_config());

    let router = ForwardingRouter::new(
        Arc::new(authorization),
        Arc::new(forwarder),
        &config.service_id,
    );

    let pipeline = Arc::new(NotificationPipeline::new(dispatch, router));

    let health_checker = HealthChecker::new(
        config.clone(),
        redis,
        vec![config_breaker, authorization_breaker],
    );
    let server_port = config.server_port;
    tokio::spawn(async move {
        if let Err(e) = run_api_server(server_port, health_checker).await {
            error!(error = %e, "Health check server stopped");
        }
    });

    let consumer = rabbitmq.create_consumer().await?;
    let concurrency = config.worker_concurrency.max(1);

    info!(concurrency, "Worker started");

    let worker = consumer.for_each_concurrent(concurrency, |delivery| {
        let pipeline = Arc::clone(&pipeline);
        let rabbitmq = Arc::clone(&rabbitmq);

        async move {
            match delivery {
                Ok(delivery) => handle_delivery(delivery, &pipeline, &rabbitmq).await,
                Err(e) => error!(error = %e, "Failed to receive delivery"),
            }
        }
    });

    tokio::select! {
        _ = worker => warn!("Consumer stream ended"),
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
    }

    Ok(())
}

async fn handle_delivery(
    delivery: Delivery,
    pipeline: &NotificationPipeline,
    rabbitmq: &RabbitMqClient,
) {
    let payload = String::from_utf8_lossy(&delivery.data);

    match pipeline.process_message(&payload).await {
        Ok(outcome) => {
            debug!(outcome = ?outcome, "Delivery processed");
            if let Err(e) = rabbitmq.acknowledge(delivery.delivery_tag).await {
                error!(error = %e, "Failed to acknowledge delivery");
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to process delivery");

            let dlq_message = DlqMessage {
                original_payload: payload.to_string(),
                failure_reason: e.to_string(),
                failed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            };

            if let Err(dlq_err) = rabbitmq.publish_to_dlq(&dlq_message).await {
                error!(error = %dlq_err, "Failed to publish to dead letter queue");
            }

            if let Err(reject_err) = rabbitmq.reject(delivery.delivery_tag, false).await {
                error!(error = %reject_err, "Failed to reject delivery");
            }
        }
    }
}

fn spawn_cache_purge(cache: Arc<TtlCache<ConfigMap>>, ttl: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ttl.max(Duration::from_secs(1)));
        loop {
            interval.tick().await;
            let purged = cache.purge_expired();
            if purged > 0 {
                debug!(purged, remaining = cache.len(), "Purged expired vehicle configurations");
            }
        }
    });
}
