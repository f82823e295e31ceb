//! 调用节奏控制 - 业务能力层
//!
//! 两次外部调用之间的固定等待，用来遵守服务端的速率限制。
//! 不是重试也不是退避，只是在下一次调用之前等一段时间。

use std::time::Duration;

use futures::future::BoxFuture;
use tracing::info;

/// 调用节奏控制
///
/// 测试里用 [`NoPacing`] 替换，避免真实的等待
pub trait Pacer: Send + Sync {
    /// 在下一次调用之前等待
    fn wait(&self) -> BoxFuture<'_, ()>;
}

/// 固定间隔等待
#[derive(Debug, Clone, Copy)]
pub struct FixedIntervalPacer {
    interval: Duration,
}

impl FixedIntervalPacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Pacer for FixedIntervalPacer {
    fn wait(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.interval.is_zero() {
                return;
            }
            info!("⏳ 等待 {} 秒以遵守速率限制...", self.interval.as_secs());
            tokio::time::sleep(self.interval).await;
        })
    }
}

/// 不等待
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacing;

impl Pacer for NoPacing {
    fn wait(&self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fixed_interval_waits_full_interval() {
        let pacer = FixedIntervalPacer::new(Duration::from_secs(65));
        let start = tokio::time::Instant::now();

        pacer.wait().await;

        assert!(start.elapsed() >= Duration::from_secs(65));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pacing_returns_immediately() {
        let start = tokio::time::Instant::now();
        NoPacing.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
