//! Paired, bidirectional endpoints between the front-end and the controller.
//! Each direction is an independent `crossbeam-channel` lane.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use crossbeam_channel::{
    bounded, unbounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError,
    TrySendError,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("peer endpoint closed")]
    Closed,
    #[error("no value pending")]
    Empty,
    #[error("lane is full")]
    Full,
    #[error("timed out waiting for a value")]
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backlog {
    /// FIFO holding at most `n` pending values; `send` reports `Full` beyond that.
    Bounded(usize),
    #[default]
    Unbounded,
    /// At most one pending value; a new send evicts the one not yet received.
    LatestWins,
}

pub struct Outbox<T> {
    tx: Sender<T>,
    /// Only set for [`Backlog::LatestWins`]: used to evict the stale value.
    evict: Option<Receiver<T>>,
    receiver_gone: Arc<AtomicBool>,
}

impl<T> Clone for Outbox<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            evict: self.evict.clone(),
            receiver_gone: Arc::clone(&self.receiver_gone),
        }
    }
}

impl<T> Outbox<T> {
    pub fn send(&self, value: T) -> Result<(), ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }

        let Some(evict) = &self.evict else {
            return self.tx.try_send(value).map_err(|err| match err {
                TrySendError::Full(_) => ChannelError::Full,
                TrySendError::Disconnected(_) => ChannelError::Closed,
            });
        };

        let mut value = value;
        loop {
            match self.tx.try_send(value) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(rejected)) => {
                    // the receiver may win the race for the stale value; either way retry
                    let _ = evict.try_recv();
                    value = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return Err(ChannelError::Closed),
            }
        }
    }

    /// Like [`send`](Self::send), but waits up to `timeout` for room on a full
    /// bounded lane. `Err(Timeout)` leaves nothing queued.
    pub fn send_timeout(&self, value: T, timeout: Duration) -> Result<(), ChannelError> {
        if self.evict.is_some() {
            return self.send(value);
        }
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        self.tx.send_timeout(value, timeout).map_err(|err| match err {
            SendTimeoutError::Timeout(_) => ChannelError::Timeout,
            SendTimeoutError::Disconnected(_) => ChannelError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.receiver_gone.load(Ordering::Acquire)
    }
}

pub struct Inbox<T> {
    rx: Receiver<T>,
    peeked: Option<T>,
    receiver_gone: Arc<AtomicBool>,
}

impl<T> Inbox<T> {
    /// Non-blocking and non-consuming. `Err(Closed)` only once drained.
    pub fn poll(&mut self) -> Result<bool, ChannelError> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        match self.rx.try_recv() {
            Ok(value) => {
                self.peeked = Some(value);
                Ok(true)
            }
            Err(TryRecvError::Empty) => Ok(false),
            Err(TryRecvError::Disconnected) => Err(ChannelError::Closed),
        }
    }

    pub fn receive(&mut self) -> Result<T, ChannelError> {
        if let Some(value) = self.peeked.take() {
            return Ok(value);
        }
        self.rx.try_recv().map_err(|err| match err {
            TryRecvError::Empty => ChannelError::Empty,
            TryRecvError::Disconnected => ChannelError::Closed,
        })
    }

    pub fn receive_timeout(&mut self, timeout: Duration) -> Result<T, ChannelError> {
        if let Some(value) = self.peeked.take() {
            return Ok(value);
        }
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => ChannelError::Timeout,
            RecvTimeoutError::Disconnected => ChannelError::Closed,
        })
    }

    /// Newest pending value plus how many older ones it superseded.
    pub fn drain_latest(&mut self) -> Result<Option<(T, usize)>, ChannelError> {
        let mut latest = None;
        let mut superseded = 0;
        loop {
            match self.poll() {
                Ok(true) => {
                    let value = self.receive()?;
                    if latest.replace(value).is_some() {
                        superseded += 1;
                    }
                }
                Ok(false) => break,
                Err(ChannelError::Closed) if latest.is_some() => break,
                Err(err) => return Err(err),
            }
        }
        Ok(latest.map(|value| (value, superseded)))
    }
}

impl<T> Drop for Inbox<T> {
    fn drop(&mut self) {
        self.receiver_gone.store(true, Ordering::Release);
    }
}

fn lane<T>(backlog: Backlog) -> (Outbox<T>, Inbox<T>) {
    let (tx, rx) = match backlog {
        Backlog::Bounded(capacity) => bounded(capacity.max(1)),
        Backlog::Unbounded => unbounded(),
        Backlog::LatestWins => bounded(1),
    };
    let receiver_gone = Arc::new(AtomicBool::new(false));
    let evict = (backlog == Backlog::LatestWins).then(|| rx.clone());
    (
        Outbox {
            tx,
            evict,
            receiver_gone: Arc::clone(&receiver_gone),
        },
        Inbox {
            rx,
            peeked: None,
            receiver_gone,
        },
    )
}

pub struct Endpoint<Out, In> {
    outbox: Outbox<Out>,
    inbox: Inbox<In>,
}

impl<Out, In> Endpoint<Out, In> {
    pub fn send(&self, value: Out) -> Result<(), ChannelError> {
        self.outbox.send(value)
    }

    pub fn poll(&mut self) -> Result<bool, ChannelError> {
        self.inbox.poll()
    }

    pub fn receive(&mut self) -> Result<In, ChannelError> {
        self.inbox.receive()
    }

    pub fn receive_timeout(&mut self, timeout: Duration) -> Result<In, ChannelError> {
        self.inbox.receive_timeout(timeout)
    }

    pub fn drain_latest(&mut self) -> Result<Option<(In, usize)>, ChannelError> {
        self.inbox.drain_latest()
    }

    pub fn is_peer_closed(&self) -> bool {
        self.outbox.is_closed()
    }

    pub fn split(self) -> (Outbox<Out>, Inbox<In>) {
        (self.outbox, self.inbox)
    }

    /// Close this side; the peer observes `Closed` once it has drained.
    pub fn close(self) {
        drop(self);
    }
}

/// Create two connected endpoints. `a_to_b` governs values sent by the first
/// endpoint, `b_to_a` values sent by the second.
pub fn pair<A, B>(a_to_b: Backlog, b_to_a: Backlog) -> (Endpoint<A, B>, Endpoint<B, A>) {
    let (a_out, b_in) = lane::<A>(a_to_b);
    let (b_out, a_in) = lane::<B>(b_to_a);
    (
        Endpoint {
            outbox: a_out,
            inbox: a_in,
        },
        Endpoint {
            outbox: b_out,
            inbox: b_in,
        },
    )
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
