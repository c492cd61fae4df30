//! Cancellable single-consumer producers.
//!
//! A [`Producer`] owns a background task that pushes values through an
//! [`Emitter`]. The consumer pulls them one at a time with [`Producer::next`]
//! (or as a [`futures::Stream`]) and can stop the task with
//! [`Producer::cancel`]. Once cancelled, nothing more is handed out, even
//! values the task managed to queue before it noticed.

use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Producer<T> {
    rx: mpsc::Receiver<T>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

pub struct Emitter<T> {
    tx: mpsc::Sender<T>,
    token: CancellationToken,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            token: self.token.clone(),
        }
    }
}

impl<T: Send + 'static> Producer<T> {
    /// Spawns `body` on the current runtime.
    pub fn spawn<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Emitter<T>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let emitter = Emitter {
            tx,
            token: token.clone(),
        };
        let task = tokio::spawn(body(emitter));

        Self { rx, token, task }
    }
}

impl<T> Producer<T> {
    /// Next value, or `None` once the producer finished or was cancelled.
    pub async fn next(&mut self) -> Option<T> {
        if self.token.is_cancelled() {
            return None;
        }

        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            value = self.rx.recv() => {
                if self.token.is_cancelled() {
                    None
                } else {
                    value
                }
            }
        }
    }

    /// Stops the producer. Values not yet handed out are discarded.
    pub fn cancel(&mut self) {
        self.token.cancel();
        self.rx.close();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drains the producer and returns everything it emitted.
    pub async fn collect_all(mut self) -> Vec<T> {
        let mut values = Vec::new();
        while let Some(value) = self.next().await {
            values.push(value);
        }
        values
    }
}

impl<T> Drop for Producer<T> {
    fn drop(&mut self) {
        self.token.cancel();
        self.task.abort();
    }
}

impl<T> Stream for Producer<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        if this.token.is_cancelled() {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(_)) if this.token.is_cancelled() => Poll::Ready(None),
            other => other,
        }
    }
}

impl<T> std::fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl<T: Send> Emitter<T> {
    /// Hands `value` to the consumer. Returns `false` when the consumer is
    /// gone or the producer was cancelled; the body should stop then.
    pub async fn emit(&self, value: T) -> bool {
        if self.token.is_cancelled() {
            return false;
        }

        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            sent = self.tx.send(value) => sent.is_ok(),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.tx.is_closed()
    }

    /// Wraps the emitter so that a value equal to the previous one is dropped.
    pub fn distinct(self) -> DistinctEmitter<T>
    where
        T: PartialEq + Clone,
    {
        self.distinct_by(|value| Some(value.clone()))
    }

    /// Like [`Emitter::distinct`], comparing the keys `key` extracts. Values
    /// without a key are always emitted.
    pub fn distinct_by<K: PartialEq>(self, key: fn(&T) -> Option<K>) -> DistinctEmitter<T, K> {
        DistinctEmitter {
            inner: self,
            key,
            last: None,
        }
    }
}

pub struct DistinctEmitter<T, K = T> {
    inner: Emitter<T>,
    key: fn(&T) -> Option<K>,
    last: Option<K>,
}

impl<T: Send, K: PartialEq> DistinctEmitter<T, K> {
    pub async fn emit(&mut self, value: T) -> bool {
        let key = (self.key)(&value);
        if key.is_some() && key == self.last {
            return !self.inner.is_cancelled();
        }
        self.last = key;
        self.inner.emit(value).await
    }

    pub fn token(&self) -> &CancellationToken {
        self.inner.token()
    }
}
