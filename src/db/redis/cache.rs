use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::error::AppResult;

/// Keys under which computed responses are cached
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// One strategy's ranked list for one subject and result bound
    ///
    /// `generation` is the category index generation the list was computed
    /// against, so lists from a replaced index are never read back.
    Recommendations {
        source: String,
        subject: String,
        max: usize,
        generation: u64,
    },
    /// Every cached list of one strategy, for invalidation
    SourcePattern(String),
}

impl CacheKey {
    pub fn recommendations(source: &str, subject: &str, max: usize, generation: u64) -> Self {
        CacheKey::Recommendations {
            source: source.to_string(),
            subject: subject.to_string(),
            max,
            generation,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendations {
                source,
                subject,
                max,
                generation,
            } => write!(f, "rec:{}:{}:{}:g{}", source, subject, max, generation),
            CacheKey::SourcePattern(source) => write!(f, "rec:{}:*", source),
        }
    }
}

/// Opens a Redis client for the response cache
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

struct PendingWrite {
    key: String,
    payload: String,
    ttl: u64,
}

/// Read-through response cache backed by Redis
///
/// Reads go straight to Redis. Writes are queued to a background task so a
/// request never waits on a cache write.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<PendingWrite>,
}

/// What the background writer did over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub written: u64,
    pub failed: u64,
}

/// Stops the background writer once queued writes are flushed
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<WriterStats>,
}

impl CacheWriterHandle {
    /// Signals the writer and waits until every queued write was attempted
    pub async fn shutdown(self) -> WriterStats {
        let _ = self.shutdown_tx.send(()).await;
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "Cache writer task failed");
                WriterStats::default()
            }
        }
    }
}

impl Cache {
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        let task = tokio::spawn(Self::run_writer(client, write_rx, shutdown_rx));

        (
            Self {
                redis_client,
                write_tx,
            },
            CacheWriterHandle { shutdown_tx, task },
        )
    }

    async fn run_writer(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) -> WriterStats {
        tracing::info!("Cache writer started");
        let mut stats = WriterStats::default();

        loop {
            tokio::select! {
                Some(write) = write_rx.recv() => {
                    Self::record(&client, write, &mut stats).await;
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    while let Some(write) = write_rx.recv().await {
                        Self::record(&client, write, &mut stats).await;
                    }
                    tracing::info!(written = stats.written, failed = stats.failed, "Cache writer stopped");
                    return stats;
                }
            }
        }
    }

    async fn record(client: &Client, write: PendingWrite, stats: &mut WriterStats) {
        let key = write.key.clone();
        match Self::store(client, write).await {
            Ok(()) => stats.written += 1,
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(error = %e, key = %key, failed = stats.failed, "Cache write failed");
            }
        }
    }

    async fn store(client: &Client, write: PendingWrite) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(write.key, write.payload, write.ttl).await?;
        Ok(())
    }

    /// Returns the cached value for `key`, or `None` on a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json)
                    .map_err(|e| AppError::Internal(format!("Cached payload is unreadable: {}", e)))
            })
            .transpose()
    }

    /// Queues `value` for storage under `key` and returns immediately
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Could not serialize value for cache");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            payload,
            ttl,
        };

        if self.write_tx.send(write).is_err() {
            tracing::warn!(key = %key, "Cache writer is gone, dropping write");
        }
    }

    /// Deletes every cached list produced by `source`
    ///
    /// Returns how many keys were removed.
    pub async fn invalidate_source(&self, source: &str) -> AppResult<usize> {
        let pattern = CacheKey::SourcePattern(source.to_string()).to_string();
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter = conn.scan_match::<_, String>(&pattern).await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }

        if !keys.is_empty() {
            let _: () = conn.del(&keys).await?;
        }

        tracing::debug!(pattern = %pattern, removed = keys.len(), "Invalidated cached recommendations");
        Ok(keys.len())
    }
}
