//! # Aggregator
//!
//! Wait-for-all combinator over a variable set of in-flight completions.
//!
//! The aggregator never abandons work: it drives every supplied future to
//! completion, then reports success, the single failure, or an aggregate of all
//! failures in the order they were observed. It can be `reset` and awaited
//! again; each publish builds its own, so concurrent publishes share nothing.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::error::{BusError, BusResult};

/// Boxed completion of a single subscriber, interceptor tail or child bus.
pub type Completion<'a> = BoxFuture<'a, BusResult<()>>;

pub struct Aggregator<'a> {
    pending: FuturesUnordered<Completion<'a>>,
    failures: Vec<BusError>,
}

impl<'a> Aggregator<'a> {
    pub fn new() -> Self {
        Self {
            pending: FuturesUnordered::new(),
            failures: Vec::new(),
        }
    }

    /// Replace whatever was pending with a new set of completions.
    pub fn reset(&mut self, completions: impl IntoIterator<Item = Completion<'a>>) {
        self.pending.clear();
        self.failures.clear();
        self.pending.extend(completions);
    }

    pub fn push(&mut self, completion: Completion<'a>) {
        self.pending.push(completion);
    }

    /// Completions not yet settled.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drive every completion to the end, then report the combined outcome.
    pub async fn wait_all(&mut self) -> BusResult<()> {
        while let Some(outcome) = self.pending.next().await {
            if let Err(error) = outcome {
                self.failures.push(error);
            }
        }
        BusError::from_failures(std::mem::take(&mut self.failures))
    }
}

impl Default for Aggregator<'_> {
    fn default() -> Self {
        Self::new()
    }
}
