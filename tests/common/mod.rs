//! Shared commands, subscribers and interceptors for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use command_bus::{
    AsyncSubscriber, BusError, BusResult, CancellationToken, Command, Interceptor, Next,
    Subscriber,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct Ping(pub u32);
impl Command for Ping {}

#[derive(Debug, Clone)]
pub struct Pong;
impl Command for Pong {}

/// Ordered record of everything the test doubles observed.
#[derive(Debug, Default, Clone)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Subscriber counting the `Ping`s it receives, usable as sync or async.
#[derive(Debug, Default)]
pub struct PingCounter {
    hits: AtomicUsize,
}

impl PingCounter {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Subscriber for PingCounter {
    fn receive(&self, command: &dyn Command) -> BusResult<()> {
        if command.is::<Ping>() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[async_trait]
impl AsyncSubscriber for PingCounter {
    async fn receive_async(
        &self,
        command: &dyn Command,
        _cancel: &CancellationToken,
    ) -> BusResult<()> {
        tokio::task::yield_now().await;
        self.receive(command)
    }
}

/// Sync subscriber writing a label into a journal.
pub struct Recorder {
    pub label: &'static str,
    pub journal: Journal,
}

impl Subscriber for Recorder {
    fn receive(&self, command: &dyn Command) -> BusResult<()> {
        match command.downcast_ref::<Ping>() {
            Some(ping) => self.journal.record(format!("{}:{}", self.label, ping.0)),
            None => self.journal.record(self.label),
        }
        Ok(())
    }
}

/// Sync subscriber that always fails.
pub struct FailingSubscriber;

impl Subscriber for FailingSubscriber {
    fn receive(&self, command: &dyn Command) -> BusResult<()> {
        Err(BusError::subscriber(
            command.command_name(),
            anyhow::anyhow!("sync failure"),
        ))
    }
}

/// Async subscriber that sleeps, then records completion or fails.
pub struct SlowSubscriber {
    pub label: &'static str,
    pub delay: Duration,
    pub fail: bool,
    pub journal: Journal,
}

#[async_trait]
impl AsyncSubscriber for SlowSubscriber {
    async fn receive_async(
        &self,
        command: &dyn Command,
        _cancel: &CancellationToken,
    ) -> BusResult<()> {
        tokio::time::sleep(self.delay).await;
        if self.fail {
            self.journal.record(format!("{}-failed", self.label));
            return Err(BusError::subscriber(command.command_name(), self.label));
        }
        self.journal.record(format!("{}-done", self.label));
        Ok(())
    }
}

/// Async subscriber that blocks until released, announcing when it started.
pub struct GatedSubscriber {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
    pub journal: Journal,
}

#[async_trait]
impl AsyncSubscriber for GatedSubscriber {
    async fn receive_async(
        &self,
        command: &dyn Command,
        _cancel: &CancellationToken,
    ) -> BusResult<()> {
        let label = command
            .downcast_ref::<Ping>()
            .map_or_else(|| "gated".to_string(), |ping| format!("gated:{}", ping.0));
        self.journal.record(format!("{label}-start"));
        self.started.notify_one();
        self.release.notified().await;
        self.journal.record(format!("{label}-end"));
        Ok(())
    }
}

/// Interceptor that writes `<label>-before` / `<label>-after` around onward dispatch.
pub struct TraceInterceptor {
    pub label: &'static str,
    pub journal: Journal,
}

#[async_trait]
impl Interceptor for TraceInterceptor {
    async fn invoke(
        &self,
        command: &dyn Command,
        cancel: &CancellationToken,
        next: Next<'_>,
    ) -> BusResult<()> {
        self.journal.record(format!("{}-before", self.label));
        let result = next.run(command, cancel).await;
        self.journal.record(format!("{}-after", self.label));
        result
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

/// Interceptor that completes without calling onward.
pub struct ShortCircuit;

#[async_trait]
impl Interceptor for ShortCircuit {
    async fn invoke(
        &self,
        _command: &dyn Command,
        _cancel: &CancellationToken,
        _next: Next<'_>,
    ) -> BusResult<()> {
        Ok(())
    }
}

/// Interceptor that rejects every command before dispatch.
pub struct RejectingInterceptor;

#[async_trait]
impl Interceptor for RejectingInterceptor {
    async fn invoke(
        &self,
        _command: &dyn Command,
        _cancel: &CancellationToken,
        _next: Next<'_>,
    ) -> BusResult<()> {
        Err(BusError::interceptor("rejecting", "not allowed"))
    }

    fn name(&self) -> &'static str {
        "rejecting"
    }
}

pub fn recorder(label: &'static str, journal: &Journal) -> Arc<Recorder> {
    Arc::new(Recorder {
        label,
        journal: journal.clone(),
    })
}

pub fn tracer(label: &'static str, journal: &Journal) -> Arc<TraceInterceptor> {
    Arc::new(TraceInterceptor {
        label,
        journal: journal.clone(),
    })
}

pub fn slow(
    label: &'static str,
    millis: u64,
    fail: bool,
    journal: &Journal,
) -> Arc<SlowSubscriber> {
    Arc::new(SlowSubscriber {
        label,
        delay: Duration::from_millis(millis),
        fail,
        journal: journal.clone(),
    })
}
