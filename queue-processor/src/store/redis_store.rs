use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;

use super::{Batch, Op, Store};

// SPOP returns nil on an empty set, which Lua sees as false. A member that
// already has a marker goes back to its set untouched.
const CLAIM_SCRIPT: &str = r#"
local member = redis.call('SPOP', KEYS[1])
if not member then
    return false
end
if redis.call('HSETNX', KEYS[2], member, ARGV[1]) == 0 then
    redis.call('SADD', KEYS[1], member)
    return false
end
return member
"#;

/// [`Store`] backed by Redis.
///
/// The connection manager reconnects on its own and is cheap to clone, so
/// every call works on its own clone and concurrent jobs never wait on each
/// other for a connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    claim: Script,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("Invalid Redis connection URL")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self {
            conn,
            claim: Script::new(CLAIM_SCRIPT),
        })
    }

    /// Build a connection URL from the address, optional password and
    /// database index.
    pub fn url(addr: &str, password: Option<&str>, db: i64) -> String {
        match password.filter(|p| !p.is_empty()) {
            Some(password) => format!(
                "redis://:{}@{}/{}",
                urlencoding::encode(password),
                addr,
                db
            ),
            None => format!("redis://{}/{}", addr, db),
        }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn claim(&self, set: &str, in_flight: &str, marker: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let member: Option<String> = self
            .claim
            .key(set)
            .key(in_flight)
            .arg(marker)
            .invoke_async(&mut conn)
            .await
            .with_context(|| format!("Failed to claim a member of {}", set))?;

        Ok(member)
    }

    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn
            .hgetall(key)
            .await
            .with_context(|| format!("Failed to read hash {}", key))?;

        Ok(fields)
    }

    async fn apply(&self, batch: Batch) -> Result<()> {
        let mut pipe = redis::pipe();
        pipe.atomic();

        for op in batch.ops() {
            match op {
                Op::SetField { key, field, value } => {
                    pipe.hset(key, field, value).ignore();
                }
                Op::RemoveField { key, field } => {
                    pipe.hdel(key, field).ignore();
                }
                Op::AddMember { set, member } => {
                    pipe.sadd(set, member).ignore();
                }
                Op::Delete { key } => {
                    pipe.del(key).ignore();
                }
            }
        }

        let mut conn = self.conn.clone();
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .context("Failed to execute Redis transaction")?;

        Ok(())
    }
}
