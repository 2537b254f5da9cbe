use serde::Serialize;
use sparql_proxy_engine::ProxyResponse;
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// Appends one JSON document per answered query to a file.
#[derive(Clone, Debug)]
pub struct QueryLog {
    path: Arc<PathBuf>,
    write_lock: Arc<Mutex<()>>,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct QueryLogRecord<'a> {
    #[serde(with = "time::serde::rfc3339")]
    started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    done_at: OffsetDateTime,
    /// Milliseconds.
    elapsed: i128,
    ip: &'a str,
    query: &'a str,
    cache_hit: bool,
    response: LoggedResponse<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct LoggedResponse<'a> {
    content_type: &'a str,
    body: &'a str,
}

impl QueryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Records `response`. Failures are logged and otherwise ignored.
    pub async fn append(
        &self,
        started_at: OffsetDateTime,
        ip: &str,
        query: &str,
        response: &ProxyResponse,
    ) {
        let done_at = OffsetDateTime::now_utc();
        let record = QueryLogRecord {
            started_at,
            done_at,
            elapsed: (done_at - started_at).whole_milliseconds(),
            ip,
            query,
            cache_hit: response.cache_hit,
            response: LoggedResponse {
                content_type: &response.content_type,
                body: &response.body,
            },
        };

        let mut line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(error) => {
                warn!(%error, "Could not serialize query log record");
                return;
            }
        };
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Err(error) = self.write(line.as_bytes()).await {
            warn!(path = %self.path.display(), %error, "Could not write query log");
        }
    }

    async fn write(&self, line: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_path())
            .await?;
        file.write_all(line).await?;
        file.flush().await
    }
}
