//! Barrier stages for the processing pipeline.
//!
//! A stage fans out one task per item and only returns once every task has
//! finished, so the next stage never sees a partially processed batch.

use futures_util::future::join_all;
use std::future::Future;

/// Run `f` over every item concurrently and wait for all of them.
///
/// Items come back in their original order. Tasks are polled on the calling
/// task, so they overlap only at their await points.
pub async fn barrier<T, F, Fut>(items: Vec<T>, f: F) -> Vec<T>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = T>,
{
    join_all(items.into_iter().map(f)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_barrier_preserves_order() {
        let out = barrier(vec![30u64, 10, 20], |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms * 2
        })
        .await;
        assert_eq!(out, vec![60, 20, 40]);
    }

    #[tokio::test]
    async fn test_next_stage_starts_after_all_finish() {
        let finished = Arc::new(AtomicUsize::new(0));

        let first = {
            let finished = finished.clone();
            barrier(vec![5u64, 25, 1], move |ms| {
                let finished = finished.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    ms
                }
            })
            .await
        };

        let seen = barrier(first, |ms| {
            let finished = finished.clone();
            async move {
                // Every first-stage task is done before any second-stage task runs.
                assert_eq!(finished.load(Ordering::SeqCst), 3);
                ms
            }
        })
        .await;
        assert_eq!(seen, vec![5, 25, 1]);
    }

    #[tokio::test]
    async fn test_tasks_overlap_within_stage() {
        let start = std::time::Instant::now();
        barrier(vec![50u64; 4], |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms
        })
        .await;
        assert!(start.elapsed() < Duration::from_millis(190));
    }
}
