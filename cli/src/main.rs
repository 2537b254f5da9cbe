use crate::cli::{Args, Command, LogFormat, ServeArgs};
use anyhow::{anyhow, Context};
use clap::Parser;
use sparql_proxy_cache::{Cache, CacheStoreConfig, CacheStoreKind, Compressor};
use sparql_proxy_engine::{JobSettings, PluginChain, ProxyConfig, QueueConfig, SparqlProxy};
use sparql_proxy_query::Limits;
use sparql_proxy_web::{AdminCredentials, ServerConfig};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_format)?;
    match args.command {
        Command::Serve(options) => serve(options).await,
    }
}

fn init_logging(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level {level}"))?;
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => subscriber.try_init(),
        LogFormat::Json => subscriber.json().try_init(),
    }
    .map_err(|error| anyhow!("Could not install the logger: {error}"))
}

async fn serve(options: ServeArgs) -> anyhow::Result<()> {
    let compressor = options.compressor.parse::<Compressor>()?;
    let store_config = cache_store_config(&options)?;
    info!(store = ?store_config.kind(), %compressor, "Opening cache");
    let store = store_config.open().await.context("Could not open the cache")?;

    let proxy = SparqlProxy::start(
        proxy_config(&options),
        Cache::new(store, compressor),
        PluginChain::default(),
    )?;
    sparql_proxy_web::serve(server_config(options, proxy)).await
}

fn cache_store_config(options: &ServeArgs) -> anyhow::Result<CacheStoreConfig> {
    Ok(match options.cache_store.parse::<CacheStoreKind>()? {
        CacheStoreKind::Null => CacheStoreConfig::Null,
        CacheStoreKind::Memory => CacheStoreConfig::Memory {
            max_entries: options.memory_cache_max_entries,
        },
        CacheStoreKind::File => CacheStoreConfig::File {
            root: options.cache_store_path.clone(),
        },
        CacheStoreKind::Redis => CacheStoreConfig::Redis {
            url: options.redis_url.clone(),
        },
        CacheStoreKind::Memcache => CacheStoreConfig::Memcache {
            servers: options.memcache_servers.clone(),
        },
    })
}

fn proxy_config(options: &ServeArgs) -> ProxyConfig {
    ProxyConfig {
        backend: options.backend.clone(),
        timeout: Duration::from_millis(options.job_timeout),
        settings: JobSettings {
            limits: Limits {
                max_limit: options.max_limit,
                max_chunk_limit: options.max_chunk_limit,
            },
            splitting: options.enable_query_splitting && !options.passthrough,
        },
        passthrough: options.passthrough,
        queue: QueueConfig {
            max_waiting: options.max_waiting.unwrap_or(usize::MAX),
            max_concurrency: options.max_concurrency,
            retention: Duration::from_millis(options.duration_to_keep_old_jobs),
            ..QueueConfig::default()
        },
    }
}

fn server_config(options: ServeArgs, proxy: SparqlProxy) -> ServerConfig {
    let admin = options
        .admin_user
        .zip(options.admin_password)
        .map(|(user, password)| AdminCredentials { user, password });
    ServerConfig {
        proxy,
        bind: options
            .bind
            .unwrap_or_else(|| format!("0.0.0.0:{}", options.port)),
        cors: options.cors,
        trust_proxy: options.trust_proxy,
        admin,
        query_log: options.query_log_path,
    }
}
