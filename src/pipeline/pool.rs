//! Bounded fan-out over independent fetches.
//!
//! Every task yields a [`TaskOutcome`]; callers decide what to do with
//! failures through [`keep_successes`] instead of swallowing them inside
//! the task.

use std::fmt::Display;
use std::future::Future;

use futures::stream::{self, StreamExt};

use crate::error::Result;

/// Result of one task, tagged with the key it was submitted for.
#[derive(Debug)]
pub struct TaskOutcome<K, T> {
    pub key: K,
    pub result: Result<T>,
}

/// Order in which outcomes are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Submission,
    Completion,
}

/// Run `task` for every key with at most `concurrency` in flight and wait
/// for all of them.
pub async fn run_bounded<K, T, F, Fut>(
    keys: Vec<K>,
    concurrency: usize,
    order: Order,
    task: F,
) -> Vec<TaskOutcome<K, T>>
where
    K: Clone,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let limit = concurrency.max(1);
    let tasks = stream::iter(keys).map(|key| {
        let fut = task(key.clone());
        async move {
            TaskOutcome {
                key,
                result: fut.await,
            }
        }
    });

    match order {
        Order::Submission => tasks.buffered(limit).collect().await,
        Order::Completion => tasks.buffer_unordered(limit).collect().await,
    }
}

/// Drop failed tasks, logging each one, and return the successful values.
pub fn keep_successes<K: Display, T>(stage: &str, outcomes: Vec<TaskOutcome<K, T>>) -> Vec<T> {
    let total = outcomes.len();
    let mut values = Vec::with_capacity(total);
    let mut failures = 0usize;

    for outcome in outcomes {
        match outcome.result {
            Ok(value) => values.push(value),
            Err(error) => {
                failures += 1;
                log::debug!("{stage}: dropping {}: {error}", outcome.key);
            }
        }
    }

    if failures > 0 {
        log::warn!("{stage}: {failures} of {total} tasks failed and were dropped");
    }
    values
}
