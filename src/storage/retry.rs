//! 数据库写入重试
//!
//! 只对瞬时错误（连接池、死锁、SQLite BUSY）做指数退避重试，其余错误立即返回。

use std::future::Future;
use std::time::Duration;

use sea_orm::DbErr;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;

/// 退避参数
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl From<&DatabaseConfig> for RetryPolicy {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        }
    }
}

/// Transient failures worth another attempt
pub fn is_transient(err: &DbErr) -> bool {
    use sea_orm::error::RuntimeErr;

    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(runtime) | DbErr::Query(runtime) => match runtime {
            RuntimeErr::SqlxError(sqlx_err) => {
                if let Some(code) = sqlx_err.as_database_error().and_then(|db| db.code()) {
                    // MySQL 1213/1205, PostgreSQL 40001/40P01, SQLite BUSY/LOCKED
                    return matches!(code.as_ref(), "1213" | "1205" | "40001" | "40P01" | "5" | "6");
                }
                mentions_lock_contention(&sqlx_err.to_string())
            }
            RuntimeErr::Internal(msg) => mentions_lock_contention(msg),
            #[allow(unreachable_patterns)]
            _ => false,
        },
        _ => false,
    }
}

fn mentions_lock_contention(message: &str) -> bool {
    let message = message.to_lowercase();
    ["deadlock", "lock wait timeout", "database is locked", "serialization failure"]
        .iter()
        .any(|needle| message.contains(needle))
}

/// Runs `operation` until it succeeds, fails permanently or retries run out.
pub async fn with_retry<T, F, Fut>(label: &str, policy: RetryPolicy, mut operation: F) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{} succeeded after {} retries", label, attempt);
                }
                return Ok(value);
            }
            Err(e) if attempt < policy.max_retries && is_transient(&e) => {
                attempt += 1;
                let delay = backoff_delay(attempt, policy);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {} ms",
                    label,
                    attempt,
                    policy.max_retries + 1,
                    e,
                    delay
                );
                sleep(Duration::from_millis(delay)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// 指数退避，附加 0-25% 抖动
fn backoff_delay(attempt: u32, policy: RetryPolicy) -> u64 {
    let exponent = attempt.saturating_sub(1);
    let capped = policy
        .base_delay_ms
        .saturating_mul(2u64.saturating_pow(exponent))
        .min(policy.max_delay_ms);
    capped.saturating_add(rand::random_range(0..=capped / 4))
}
