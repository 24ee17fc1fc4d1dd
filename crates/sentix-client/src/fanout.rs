use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use futures_util::future::join_all;

/// Run `f` over `items` with at most `limit` calls in flight on the current task.
///
/// Workers pull the next index from a shared cursor; `out[i]` is always the result for
/// `items[i]`, whatever order the calls complete in.
pub async fn run_indexed<T, R, F, Fut>(items: &[T], limit: usize, f: F) -> Vec<R>
where
    F: Fn(usize, &T) -> Fut,
    Fut: Future<Output = R>,
{
    if items.is_empty() {
        return Vec::new();
    }
    let workers = limit.clamp(1, items.len());
    let cursor = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<R>>> = Mutex::new(items.iter().map(|_| None).collect());

    let (cursor, slots_ref, f) = (&cursor, &slots, &f);
    let worker = || async move {
        loop {
            let idx = cursor.fetch_add(1, Ordering::SeqCst);
            let Some(item) = items.get(idx) else {
                break;
            };
            let out = f(idx, item).await;
            slots_ref.lock().unwrap_or_else(PoisonError::into_inner)[idx] = Some(out);
        }
    };
    join_all((0..workers).map(|_| worker())).await;

    slots
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .into_iter()
        .flatten()
        .collect()
}
