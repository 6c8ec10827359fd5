//! Async input sources feeding the runtime channel.
//!
//! Both sources are tokio tasks that stop on their own once the receiving
//! side of the channel is dropped.

use std::sync::atomic::Ordering;
use std::time::Duration;

use core_events::{CHANNEL_SEND_FAILURES, Event};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::Sender;
use tokio::task::{self, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, trace, warn};

const READ_CHUNK: usize = 1024;

/// Spawn a task reading raw bytes from `reader` and forwarding them as
/// `Event::Input`. Sends `Event::Shutdown` on EOF or read error.
pub fn spawn_reader<R>(mut reader: R, sender: Sender<Event>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    task::spawn(async move {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    debug!(target: "input.source", "eof");
                    break;
                }
                Ok(n) => {
                    trace!(target: "input.source", bytes = n, "read");
                    if sender.send(Event::Input(buf[..n].to_vec())).await.is_err() {
                        CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                        debug!(target: "input.source", "receiver_closed");
                        return;
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!(target: "input.source", ?err, "read_failed");
                    break;
                }
            }
        }
        let _ = sender.send(Event::Shutdown).await;
    })
}

/// Spawn the stdin reader. The underlying blocking read cannot be
/// cancelled, so the runtime must be shut down with a timeout.
pub fn spawn_stdin_reader(sender: Sender<Event>) -> JoinHandle<()> {
    spawn_reader(tokio::io::stdin(), sender)
}

/// Spawn a task that polls `size` every `period` and sends
/// `Event::Resize` when it changes, `Event::Tick` otherwise.
pub fn spawn_size_watcher<F>(
    period: Duration,
    initial: (u16, u16),
    mut size: F,
    sender: Sender<Event>,
) -> JoinHandle<()>
where
    F: FnMut() -> Option<(u16, u16)> + Send + 'static,
{
    task::spawn(async move {
        let mut interval = time::interval_at(time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = IntervalStream::new(interval);
        let mut last = initial;
        while ticks.next().await.is_some() {
            let event = match size() {
                Some(now) if now != last => {
                    last = now;
                    trace!(target: "input.source", w = now.0, h = now.1, "resize");
                    Event::Resize(now.0, now.1)
                }
                _ => Event::Tick,
            };
            if sender.send(event).await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn reader_forwards_chunks_then_shutdown() {
        let (tx, mut rx) = mpsc::channel(16);
        spawn_reader(&b"hello"[..], tx).await.unwrap();
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.first(), Some(&Event::Input(b"hello".to_vec())));
        assert_eq!(events.last(), Some(&Event::Shutdown));
    }

    #[tokio::test]
    async fn reader_stops_when_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let before = CHANNEL_SEND_FAILURES.load(Ordering::Relaxed);
        spawn_reader(&b"lost"[..], tx).await.unwrap();
        assert!(CHANNEL_SEND_FAILURES.load(Ordering::Relaxed) > before);
    }

    #[tokio::test]
    async fn size_watcher_reports_changes() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut sizes = vec![(80, 24), (100, 30)].into_iter();
        let handle = spawn_size_watcher(Duration::from_millis(1), (80, 24), move || sizes.next(), tx);
        assert_eq!(rx.recv().await, Some(Event::Tick));
        assert_eq!(rx.recv().await, Some(Event::Resize(100, 30)));
        drop(rx);
        handle.await.unwrap();
    }
}
