//! Redis client for the remote backend.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::info;

use crate::backend::KeyValueClient;
use crate::error::Result;

/// Reconnecting Redis connection. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(url, "redis: connected");
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueClient for RedisClient {
    async fn hset_multiple(&self, key: &str, fields: &[(&str, Vec<u8>)]) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in fields {
            cmd.arg(*field).arg(value.as_slice());
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, Vec<u8>> =
            redis::cmd("HGETALL").arg(key).query_async(&mut conn).await?;
        Ok(fields)
    }

    async fn pexpire(&self, key: &str, ttl_ms: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
        Ok(())
    }
}
