use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;
use url::Url;

#[derive(Parser)]
#[command(about, version, name = "sparql-proxy")]
/// Caching and load-shaping reverse proxy for SPARQL endpoints
pub struct Args {
    /// Default log filter, overridden by `RUST_LOG`
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
    /// Format of the log lines
    #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the proxy HTTP server
    Serve(ServeArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ServeArgs {
    /// The SPARQL endpoint that queries are sent to
    #[arg(long, env = "SPARQL_BACKEND", value_hint = ValueHint::Url)]
    pub backend: Url,
    /// Host and port to listen to
    ///
    /// Takes precedence over `--port`.
    #[arg(short, long, value_hint = ValueHint::Hostname)]
    pub bind: Option<String>,
    /// Port to listen to on all interfaces
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,
    /// Allows cross-origin requests
    #[arg(long, env = "CORS")]
    pub cors: bool,
    /// Takes the client address from the first `X-Forwarded-For` entry
    #[arg(long, env = "TRUST_PROXY")]
    pub trust_proxy: bool,

    /// The largest number of queries waiting for the backend, unbounded by default
    #[arg(long, env = "MAX_WAITING")]
    pub max_waiting: Option<usize>,
    /// The largest number of queries sent to the backend at the same time
    #[arg(long, env = "MAX_CONCURRENCY", default_value_t = 1)]
    pub max_concurrency: usize,
    /// How long finished jobs can be polled, in milliseconds
    #[arg(long, env = "DURATION_TO_KEEP_OLD_JOBS", default_value_t = 5 * 60 * 1000)]
    pub duration_to_keep_old_jobs: u64,
    /// Deadline of every backend request, in milliseconds
    #[arg(long, env = "JOB_TIMEOUT", default_value_t = 5 * 60 * 1000)]
    pub job_timeout: u64,

    /// The largest number of rows a SELECT query may return
    #[arg(long, env = "MAX_LIMIT", default_value_t = 10_000)]
    pub max_limit: usize,
    /// The largest number of rows fetched from the backend in one request when splitting
    #[arg(long, env = "MAX_CHUNK_LIMIT", default_value_t = 1_000)]
    pub max_chunk_limit: usize,
    /// Fetches SELECT results in chunks of `--max-chunk-limit` rows
    #[arg(long, env = "ENABLE_QUERY_SPLITTING")]
    pub enable_query_splitting: bool,
    /// Sends queries verbatim, without normalization, splitting or caching
    #[arg(long, env = "PASSTHROUGH")]
    pub passthrough: bool,

    /// Where results are cached: null, memory, file, redis or memcache
    #[arg(long, env = "CACHE_STORE", default_value = "null")]
    pub cache_store: String,
    /// How cached results are compressed: raw or snappy
    #[arg(long, env = "COMPRESSOR", default_value = "raw")]
    pub compressor: String,
    /// Root directory of the file cache
    #[arg(long, env = "CACHE_STORE_PATH", default_value = "/tmp/sparql-proxy/cache", value_hint = ValueHint::DirPath)]
    pub cache_store_path: PathBuf,
    /// The number of results kept by the memory cache
    #[arg(long, env = "MEMORY_CACHE_MAX_ENTRIES", default_value_t = 1_000)]
    pub memory_cache_max_entries: usize,
    /// Connection URL of the redis cache
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1/", value_hint = ValueHint::Url)]
    pub redis_url: String,
    /// Comma separated `host:port` list of the memcache servers
    #[arg(long, env = "MEMCACHE_SERVERS", default_value = "localhost:11211", value_delimiter = ',')]
    pub memcache_servers: Vec<String>,

    /// User allowed on the admin routes, which are disabled without it
    #[arg(long, env = "ADMIN_USER", requires = "admin_password")]
    pub admin_user: Option<String>,
    /// Password of `--admin-user`
    #[arg(long, env = "ADMIN_PASSWORD", requires = "admin_user", hide_env_values = true)]
    pub admin_password: Option<String>,
    /// File receiving one JSON line per answered query
    #[arg(long, env = "QUERY_LOG_PATH", value_hint = ValueHint::FilePath)]
    pub query_log_path: Option<PathBuf>,
}
