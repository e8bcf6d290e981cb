//! Settling of concurrent sub-fetches
//!
//! A sub-fetch either yields its records or degrades to an empty value.
//! Failures never cross into sibling sub-fetches; they are reported to the
//! engine's observer and replaced by the empty value.

use crate::error::Result;
use crate::metrics::{SearchObserver, Stage};
use futures::future::join_all;
use std::future::Future;

/// Settle one sub-fetch result into its records
pub fn settle<T>(
    engine: &str,
    stage: Stage,
    observer: &dyn SearchObserver,
    result: Result<Vec<T>>,
) -> Vec<T> {
    match result {
        Ok(items) => {
            observer.on_success(engine, stage, items.len());
            items
        }
        Err(e) => {
            observer.on_failure(engine, stage, &e);
            Vec::new()
        }
    }
}

/// Run every future to completion and settle each one independently.
///
/// The output has one slot per input, in input order; failed futures
/// leave `None` in their slot.
pub async fn settle_all<F, T>(
    engine: &str,
    stage: Stage,
    observer: &dyn SearchObserver,
    futures: impl IntoIterator<Item = F>,
) -> Vec<Option<T>>
where
    F: Future<Output = Result<Option<T>>>,
{
    join_all(futures)
        .await
        .into_iter()
        .map(|outcome| match outcome {
            Ok(value) => {
                observer.on_success(engine, stage, usize::from(value.is_some()));
                value
            }
            Err(e) => {
                observer.on_failure(engine, stage, &e);
                None
            }
        })
        .collect()
}
