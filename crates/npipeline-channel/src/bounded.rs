//! A single-producer/single-consumer-oriented bounded channel, used to carry
//! backpressure between adjacent pipeline stages. Cloning the sender turns it
//! into a multi-producer channel (used at fan-in merge points).

use crate::error::{RecvError, SendError};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

struct ChannelState<T> {
    buffer: VecDeque<T>,
    capacity: usize,
    is_closed: bool,
    senders: usize,
    has_receiver: bool,
    receiver_waker: Option<Waker>,
    sender_wakers: VecDeque<Waker>,
}

struct Channel<T> {
    state: RefCell<ChannelState<T>>,
}

/// Creates a bounded channel of the given capacity, returning a paired
/// sender/receiver. `capacity` of `0` still allows exactly one buffered item
/// in flight before a sender blocks; true zero-capacity rendezvous is not
/// supported.
#[must_use]
pub fn channel<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    let channel = Rc::new(Channel {
        state: RefCell::new(ChannelState {
            buffer: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            is_closed: false,
            senders: 1,
            has_receiver: true,
            receiver_waker: None,
            sender_wakers: VecDeque::new(),
        }),
    });

    (
        Sender {
            channel: channel.clone(),
        },
        Receiver { channel },
    )
}

/// The sending half of a [`channel`].
pub struct Sender<T> {
    channel: Rc<Channel<T>>,
}

/// The receiving half of a [`channel`].
pub struct Receiver<T> {
    channel: Rc<Channel<T>>,
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        self.channel.state.borrow_mut().senders += 1;
        Sender {
            channel: self.channel.clone(),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        let mut state = self.channel.state.borrow_mut();
        state.senders -= 1;
        if state.senders == 0 {
            state.is_closed = true;
            if let Some(waker) = state.receiver_waker.take() {
                waker.wake();
            }
        }
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        let mut state = self.channel.state.borrow_mut();
        state.has_receiver = false;
        state.is_closed = true;
        for waker in state.sender_wakers.drain(..) {
            waker.wake();
        }
    }
}

impl<T> Sender<T> {
    /// Attempts to enqueue `value` without waiting.
    pub fn try_send(&self, value: T) -> Result<(), SendError<T>> {
        let mut state = self.channel.state.borrow_mut();

        if state.is_closed || !state.has_receiver {
            return Err(SendError::Closed(value));
        }
        if state.buffer.len() >= state.capacity {
            return Err(SendError::Full(value));
        }

        state.buffer.push_back(value);
        if let Some(waker) = state.receiver_waker.take() {
            waker.wake();
        }
        Ok(())
    }

    /// Enqueues `value`, suspending at this point until there is capacity or
    /// the channel closes. This is the suspension point a pipe's enumeration
    /// observes cancellation at when it is backed by this channel.
    pub async fn send(&self, value: T) -> Result<(), SendError<T>> {
        SendFuture {
            sender: self.clone(),
            value: Some(value),
        }
        .await
    }

    /// Closes the channel; queued items remain available to the receiver.
    pub fn close(&self) {
        let mut state = self.channel.state.borrow_mut();
        state.is_closed = true;
        if let Some(waker) = state.receiver_waker.take() {
            waker.wake();
        }
        for waker in state.sender_wakers.drain(..) {
            waker.wake();
        }
    }

    /// Number of senders still alive on this channel.
    #[must_use]
    pub fn sender_count(&self) -> usize {
        self.channel.state.borrow().senders
    }
}

impl<T> Receiver<T> {
    /// Attempts to dequeue a value without waiting.
    pub fn try_recv(&self) -> Result<T, RecvError> {
        let mut state = self.channel.state.borrow_mut();

        if let Some(value) = state.buffer.pop_front() {
            if state.buffer.len() + 1 == state.capacity {
                if let Some(waker) = state.sender_wakers.pop_front() {
                    waker.wake();
                }
            }
            Ok(value)
        } else if state.is_closed {
            Err(RecvError::Closed)
        } else {
            Err(RecvError::Empty)
        }
    }

    /// Dequeues the next value, suspending until one is available or the
    /// channel closes.
    pub async fn recv(&self) -> Result<T, RecvError> {
        RecvFuture { receiver: self }.await
    }
}

struct SendFuture<T> {
    sender: Sender<T>,
    value: Option<T>,
}

impl<T> Unpin for SendFuture<T> {}

impl<T> Future for SendFuture<T> {
    type Output = Result<(), SendError<T>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let value = self
            .value
            .take()
            .expect("SendFuture polled after completion");

        match self.sender.try_send(value) {
            Ok(()) => Poll::Ready(Ok(())),
            Err(SendError::Full(value)) => {
                self.value = Some(value);
                self.sender
                    .channel
                    .state
                    .borrow_mut()
                    .sender_wakers
                    .push_back(cx.waker().clone());
                Poll::Pending
            }
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

struct RecvFuture<'a, T> {
    receiver: &'a Receiver<T>,
}

impl<T> Future for RecvFuture<'_, T> {
    type Output = Result<T, RecvError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<T, RecvError>> {
        match self.receiver.try_recv() {
            Ok(value) => Poll::Ready(Ok(value)),
            Err(RecvError::Empty) => {
                self.receiver
                    .channel
                    .state
                    .borrow_mut()
                    .receiver_waker = Some(cx.waker().clone());
                Poll::Pending
            }
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}
