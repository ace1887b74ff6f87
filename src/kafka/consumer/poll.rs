use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use log::{error, info};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;

use super::types::{Argument, Message};
use crate::kafka::error::{Error, Result};

/// Anything that can fetch one batch of messages for an [`Argument`].
#[async_trait]
pub trait MessageSource: Send + Sync + 'static {
    async fn fetch(&self, argument: &Argument) -> Result<Vec<Message>>;
}

/// Cancellation handle of a running poll loop.
///
/// Cancelling consumes the handle, so it can only happen once. Dropping the
/// handle stops the loop as well.
#[derive(Debug)]
pub struct PollHandle {
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stops the loop before its next tick. A fetch already in flight
    /// completes and is still handed to the handler.
    pub fn cancel(self) {
        let _ = self.cancel.send(());
    }

    /// Cancels and waits for the loop task to exit.
    pub async fn stop(self) {
        let _ = self.cancel.send(());
        if let Err(e) = self.task.await {
            error!("Poll task ended abnormally: {:?}", e);
        }
    }

    /// True once the loop has exited, by cancellation or after a failed fetch.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

fn check_period(period: Duration) -> Result<()> {
    if period.is_zero() {
        return Err(Error::InvalidArgument("poll interval must be positive".to_string()));
    }
    Ok(())
}

/// First tick one full period from now, late ticks skipped rather than bunched up.
fn ticker(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Spawns the poll loop on the current tokio runtime.
pub fn spawn<S, F>(
    source: S,
    period: Duration,
    argument: Argument,
    mut on_message: F,
) -> Result<PollHandle>
where
    S: MessageSource,
    F: FnMut(Result<Vec<Message>>) + Send + 'static,
{
    check_period(period)?;
    let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let mut ticker = ticker(period);
        info!(
            "Polling consumer {} every {:?}",
            argument.consumer_name, period
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut cancel_rx => {
                    info!("Polling consumer {} cancelled", argument.consumer_name);
                    return;
                }
                _ = ticker.tick() => {}
            }

            match source.fetch(&argument).await {
                Ok(messages) => on_message(Ok(messages)),
                Err(e) => {
                    error!(
                        "Polling consumer {} stopped: {}",
                        argument.consumer_name, e
                    );
                    on_message(Err(e));
                    return;
                }
            }
        }
    });

    Ok(PollHandle {
        cancel: cancel_tx,
        task,
    })
}

/// Poll schedule as a stream: one item per tick, ending right after the first error.
pub fn stream<S>(
    source: S,
    period: Duration,
    argument: Argument,
) -> Result<BoxStream<'static, Result<Vec<Message>>>>
where
    S: MessageSource,
{
    check_period(period)?;
    let ticks = IntervalStream::new(ticker(period));
    let source = Arc::new(source);

    let stream = stream::unfold(Some(ticks), move |ticks| {
        let source = source.clone();
        let argument = argument.clone();
        async move {
            let mut ticks = ticks?;
            ticks.next().await?;
            let batch = source.fetch(&argument).await;
            let ticks = batch.is_ok().then_some(ticks);
            Some((batch, ticks))
        }
    });

    Ok(stream.boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Hands out one message per fetch, failing on the configured call.
    struct FakeSource {
        calls: Arc<AtomicUsize>,
        busy: Arc<AtomicBool>,
        overlapped: Arc<AtomicBool>,
        fail_on: Option<usize>,
        delay: Duration,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                busy: Arc::new(AtomicBool::new(false)),
                overlapped: Arc::new(AtomicBool::new(false)),
                fail_on: None,
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl MessageSource for FakeSource {
        async fn fetch(&self, argument: &Argument) -> Result<Vec<Message>> {
            if self.busy.swap(true, Ordering::SeqCst) {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                time::sleep(self.delay).await;
            }
            self.busy.store(false, Ordering::SeqCst);

            if self.fail_on == Some(call) {
                return Err(Error::InvalidArgument(format!("fetch {} failed", call)));
            }
            Ok(vec![Message {
                topic: argument.topic_name.clone(),
                offset: call as i64,
                ..Default::default()
            }])
        }
    }

    type Seen = Arc<Mutex<Vec<std::result::Result<Vec<i64>, String>>>>;

    fn recorder() -> (Seen, impl FnMut(Result<Vec<Message>>) + Send + 'static) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = move |batch: Result<Vec<Message>>| {
            let entry = batch
                .map(|messages| messages.iter().map(|m| m.offset).collect())
                .map_err(|e| e.to_string());
            sink.lock().unwrap().push(entry);
        };
        (seen, handler)
    }

    fn argument() -> Argument {
        Argument::new("orders", "c1").with_group("g1")
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_one_batch_per_tick() {
        let source = FakeSource::new();
        let calls = source.calls.clone();
        let (seen, handler) = recorder();

        let handle = spawn(source, Duration::from_millis(100), argument(), handler).unwrap();
        time::sleep(Duration::from_millis(350)).await;
        handle.stop().await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Ok(vec![1]), Ok(vec![2]), Ok(vec![3])]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_first_tick_means_no_calls() {
        let source = FakeSource::new();
        let calls = source.calls.clone();
        let (seen, handler) = recorder();

        let handle = spawn(source, Duration::from_millis(100), argument(), handler).unwrap();
        handle.cancel();
        time::sleep(Duration::from_secs(1)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_polling() {
        let source = FakeSource::new();
        let calls = source.calls.clone();
        let (_seen, handler) = recorder();

        let handle = spawn(source, Duration::from_millis(100), argument(), handler).unwrap();
        time::sleep(Duration::from_millis(150)).await;
        drop(handle);
        time::sleep(Duration::from_secs(1)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_is_fatal() {
        let mut source = FakeSource::new();
        source.fail_on = Some(3);
        let calls = source.calls.clone();
        let (seen, handler) = recorder();

        let handle = spawn(source, Duration::from_millis(100), argument(), handler).unwrap();
        time::sleep(Duration::from_secs(2)).await;

        assert!(handle.is_finished());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Ok(vec![1]),
                Ok(vec![2]),
                Err("Invalid argument: fetch 3 failed".to_string())
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_fetch_completes_after_cancel() {
        let mut source = FakeSource::new();
        source.delay = Duration::from_millis(50);
        let calls = source.calls.clone();
        let (seen, handler) = recorder();

        let handle = spawn(source, Duration::from_millis(100), argument(), handler).unwrap();
        // first fetch runs from 100ms to 150ms
        time::sleep(Duration::from_millis(120)).await;
        handle.stop().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock().unwrap(), vec![Ok(vec![1])]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetches_never_overlap() {
        let mut source = FakeSource::new();
        source.delay = Duration::from_millis(250);
        let calls = source.calls.clone();
        let overlapped = source.overlapped.clone();
        let (seen, handler) = recorder();

        let handle = spawn(source, Duration::from_millis(100), argument(), handler).unwrap();
        time::sleep(Duration::from_secs(1)).await;
        handle.stop().await;

        assert!(!overlapped.load(Ordering::SeqCst));
        let calls = calls.load(Ordering::SeqCst);
        assert!(calls > 0 && calls <= 4, "calls = {}", calls);
        assert_eq!(seen.lock().unwrap().len(), calls);
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let (_seen, handler) = recorder();
        let result = spawn(FakeSource::new(), Duration::ZERO, argument(), handler);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert!(stream(FakeSource::new(), Duration::ZERO, argument()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stream_ends_after_error() {
        let mut source = FakeSource::new();
        source.fail_on = Some(2);
        let calls = source.calls.clone();

        let batches: Vec<_> = stream(source, Duration::from_millis(100), argument())
            .unwrap()
            .collect()
            .await;

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].as_ref().unwrap()[0].offset, 1);
        assert_eq!(batches[0].as_ref().unwrap()[0].topic, "orders");
        assert!(batches[1].is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_waits_one_period_before_first_fetch() {
        let source = FakeSource::new();
        let calls = source.calls.clone();

        let start = Instant::now();
        let mut batches = stream(source, Duration::from_millis(100), argument()).unwrap();
        let first = batches.next().await.unwrap().unwrap();

        assert_eq!(first[0].offset, 1);
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
