//! Bounded-parallelism batch executor.
//!
//! Every network-bound batch operation (run creation, result submission,
//! attachment upload, run closing) goes through [`resolve_in_chunks`], which
//! caps peak concurrent outbound calls at the configured chunk size.

use std::future::Future;

use futures::future::join_all;
use tracing::debug;

/// Apply `f` to every item, `chunk_size` at a time.
///
/// Chunks run strictly in sequence: all futures within a chunk are awaited
/// together before the next chunk starts. `None` results (the "failed,
/// already logged" convention) are filtered out; surviving results keep
/// input order. A failed item never aborts its siblings or later chunks.
pub async fn resolve_in_chunks<T, R, F, Fut>(items: Vec<T>, chunk_size: usize, f: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Option<R>>,
{
    let chunk_size = chunk_size.max(1);
    let total_chunks = items.len().div_ceil(chunk_size);

    let mut results = Vec::new();
    let mut remaining = items.into_iter();
    let mut index = 0;

    loop {
        let chunk: Vec<T> = remaining.by_ref().take(chunk_size).collect();
        if chunk.is_empty() {
            break;
        }
        index += 1;
        debug!(chunk = index, total_chunks, size = chunk.len(), "processing chunk");

        let settled = join_all(chunk.into_iter().map(&f)).await;
        results.extend(settled.into_iter().flatten());
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn results_keep_input_order_and_filter_failures() {
        let results = resolve_in_chunks(vec![1u64, 2, 3, 4, 5], 2, |n| async move {
            // Odd items "fail"
            (n % 2 == 0).then_some(n * 10)
        })
        .await;
        assert_eq!(results, vec![20, 40]);
    }

    #[tokio::test]
    async fn all_successes_preserve_full_order() {
        let results = resolve_in_chunks((0..7u64).collect(), 3, |n| async move { Some(n) }).await;
        assert_eq!(results, (0..7).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let results: Vec<u64> =
            resolve_in_chunks(Vec::<u64>::new(), 10, |n| async move { Some(n) }).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn zero_chunk_size_is_clamped_to_one() {
        let results = resolve_in_chunks(vec![1u64, 2], 0, |n| async move { Some(n) }).await;
        assert_eq!(results, vec![1, 2]);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_chunk_size() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = resolve_in_chunks((0..10u64).collect(), 3, |n| {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Some(n)
            }
        })
        .await;

        assert_eq!(results.len(), 10);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn next_chunk_starts_only_after_previous_settles() {
        let events = Arc::new(Mutex::new(Vec::new()));

        resolve_in_chunks(vec![0u64, 1, 2], 2, |n| {
            let events = Arc::clone(&events);
            async move {
                events.lock().unwrap().push(format!("start {}", n));
                // First chunk items take longer than the second chunk item
                let delay = if n < 2 { 20 } else { 1 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                events.lock().unwrap().push(format!("end {}", n));
                Some(n)
            }
        })
        .await;

        let events = events.lock().unwrap();
        let position = |needle: &str| events.iter().position(|e| e == needle).unwrap();
        assert!(position("start 2") > position("end 0"));
        assert!(position("start 2") > position("end 1"));
    }
}
