use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream;
use tokio::sync::broadcast::{self, Receiver, Sender};
use tokio::time::timeout;

use super::event::ExecutionEvent;

/// Broadcast fan-out for [`ExecutionEvent`]s.
///
/// One hub serves every run a scheduler drives. Subscribers attach at any
/// time and see only events published after they subscribed; there is no
/// replay. Slow subscribers lag rather than block publishers, and both the
/// hub and each [`EventStream`] count what was missed.
#[derive(Debug)]
pub struct EventHub {
    sender: Sender<ExecutionEvent>,
    dropped_events: AtomicUsize,
    capacity: usize,
}

impl EventHub {
    pub fn new(capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Arc::new(Self {
            sender,
            dropped_events: AtomicUsize::new(0),
            capacity,
        })
    }

    /// Publishes to every live subscriber, returning how many received it.
    ///
    /// With no subscribers the event is counted as dropped and discarded;
    /// publishing is never an error from the scheduler's point of view.
    pub fn publish(&self, event: ExecutionEvent) -> usize {
        match self.sender.send(event) {
            Ok(received) => received,
            Err(broadcast::error::SendError(event)) => {
                drop(event);
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                0
            }
        }
    }

    pub fn subscribe(self: &Arc<Self>) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
            hub: Arc::clone(self),
            missed: 0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Events that never reached an observer: published with no subscribers,
    /// or overwritten in a lagging subscriber's buffer.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped_events.load(Ordering::Relaxed)
    }
}

/// One subscriber's view of the hub. Dropping it unsubscribes.
#[derive(Debug)]
pub struct EventStream {
    receiver: Receiver<ExecutionEvent>,
    hub: Arc<EventHub>,
    missed: u64,
}

impl EventStream {
    pub async fn recv(&mut self) -> Result<ExecutionEvent, broadcast::error::RecvError> {
        match self.receiver.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(count)) => {
                self.note_lag(count);
                Err(broadcast::error::RecvError::Lagged(count))
            }
            Err(err) => Err(err),
        }
    }

    pub fn try_recv(&mut self) -> Result<ExecutionEvent, broadcast::error::TryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(event),
            Err(broadcast::error::TryRecvError::Lagged(count)) => {
                self.note_lag(count);
                Err(broadcast::error::TryRecvError::Lagged(count))
            }
            Err(err) => Err(err),
        }
    }

    /// Next event within `duration`, skipping over lag gaps. `None` on
    /// timeout or when the hub is gone.
    pub async fn next_timeout(&mut self, duration: Duration) -> Option<ExecutionEvent> {
        loop {
            match timeout(duration, self.recv()).await {
                Ok(Ok(event)) => return Some(event),
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                Err(_) => return None,
            }
        }
    }

    /// Events this stream skipped because it lagged behind the publisher.
    #[must_use]
    pub fn missed(&self) -> u64 {
        self.missed
    }

    pub fn into_inner(self) -> Receiver<ExecutionEvent> {
        self.receiver
    }

    /// Adapter for `futures_util::StreamExt` combinators. Lag gaps are
    /// skipped; the stream ends when the hub is dropped.
    pub fn into_async_stream(self) -> impl futures_util::stream::Stream<Item = ExecutionEvent> {
        stream::unfold(self, |mut stream| async move {
            loop {
                match stream.recv().await {
                    Ok(event) => return Some((event, stream)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
    }

    /// Iterator for non-async consumers; blocks the calling thread.
    pub fn into_blocking_iter(self) -> BlockingEventIter {
        BlockingEventIter {
            receiver: self.receiver,
            hub: self.hub,
        }
    }

    fn note_lag(&mut self, count: u64) {
        self.missed += count;
        self.hub
            .dropped_events
            .fetch_add(count as usize, Ordering::Relaxed);
    }
}

pub struct BlockingEventIter {
    receiver: Receiver<ExecutionEvent>,
    hub: Arc<EventHub>,
}

impl Iterator for BlockingEventIter {
    type Item = ExecutionEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.receiver.blocking_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    self.hub
                        .dropped_events
                        .fetch_add(count as usize, Ordering::Relaxed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
