use crate::foundation::{LoadError, Result};
use std::future::Future;
use tokio::sync::mpsc;

/// Runs one spawned task per item and gathers their results over a channel.
///
/// Successes come back in input order. The first error to arrive is returned as soon as it is
/// received; tasks still running are left to finish on their own.
pub async fn fan_out<I, T, F, Fut>(items: Vec<I>, unit: F) -> Result<Vec<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let count = items.len();
    let (tx, mut rx) = mpsc::channel(count.max(1));
    for (index, item) in items.into_iter().enumerate() {
        let tx = tx.clone();
        let work = unit(item);
        tokio::spawn(async move {
            let outcome = work.await;
            let _ = tx.send((index, outcome)).await;
        });
    }
    drop(tx);

    let mut slots: Vec<Option<T>> = (0..count).map(|_| None).collect();
    while let Some((index, outcome)) = rx.recv().await {
        slots[index] = Some(outcome?);
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.ok_or_else(|| LoadError::TaskFailed(format!("fan-out unit {index} ended without a result"))))
        .collect()
}
