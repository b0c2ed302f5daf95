//! 区域并发调度
//!
//! 一次 check 在单个逻辑任务内并发处理各区域（observe / upsert / 进行中检查），
//! Semaphore 限制同时在途的外部调用数；结果按输入顺序返回。

use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Semaphore;

pub struct RegionScheduler {
    permits: Arc<Semaphore>,
}

impl RegionScheduler {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// 并发执行，全部完成后返回；单个失败不影响其他项
    pub async fn run_all<I, F, Fut, T>(&self, items: I, f: F) -> Vec<T>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = T>,
    {
        let tasks = items.into_iter().map(|item| {
            let permits = Arc::clone(&self.permits);
            let task = f(item);
            async move {
                // 信号量从不关闭
                let _permit = permits.acquire_owned().await.ok();
                task.await
            }
        });
        join_all(tasks).await
    }
}

impl Default for RegionScheduler {
    fn default() -> Self {
        Self::new(8)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let scheduler = RegionScheduler::new(2);
        let out = scheduler
            .run_all(vec![30u64, 10, 20], |ms| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                ms
            })
            .await;
        assert_eq!(out, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let scheduler = RegionScheduler::new(2);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        scheduler
            .run_all(0..6, |_| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            })
            .await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
