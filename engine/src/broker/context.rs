//! Deferred broker requests made from inside a dispatch.
//!
//! While the broker fans an event out it is exclusively borrowed, so subscribers cannot call it
//! directly. Instead each call to [`Subscriber::receive`](crate::Subscriber::receive) gets a
//! [`Context`] that records requests into a command buffer. The broker applies the buffer, in
//! request order, as soon as the fan-out for the current event completes:
//!
//! ```text
//! send(event) ──► snapshot subscribers ──► receive(event, ctx) ──► ... ──► apply commands
//!                                                │                              │
//!                                                └──── push Command ────────────┘
//! ```
//!
//! Sends requested this way are dispatched before the outer send returns. Enqueued events join
//! the pending queue, so a flush in progress drains them in the same call.

use crate::{
    broker::{SubscriberId, delayed},
    error::Result,
    event::Event,
};

/// A deferred broker request.
pub(crate) enum Command<E: Event> {
    Send(E),
    Enqueue(E),
    Schedule(E, f32),
    Subscribe(SubscriberId, E::Category),
    Unsubscribe(SubscriberId, E::Category),
    UnsubscribeAll(SubscriberId),
}

/// Handle given to a subscriber for the duration of one `receive` call.
pub struct Context<'a, E: Event> {
    subscriber: SubscriberId,
    commands: &'a mut Vec<Command<E>>,
}

impl<'a, E: Event> Context<'a, E> {
    pub(crate) fn new(subscriber: SubscriberId, commands: &'a mut Vec<Command<E>>) -> Self {
        Self {
            subscriber,
            commands,
        }
    }

    /// Id of the subscriber being dispatched to.
    #[inline]
    pub fn subscriber(&self) -> SubscriberId {
        self.subscriber
    }

    /// Send a copy of `event` synchronously once the current fan-out completes.
    pub fn send(&mut self, event: &E) {
        self.commands.push(Command::Send(event.clone()));
    }

    /// Queue a copy of `event` for the pending queue.
    pub fn enqueue(&mut self, event: &E) {
        self.commands.push(Command::Enqueue(event.clone()));
    }

    /// Schedule a copy of `event` after `delay` seconds. A zero delay enqueues it instead.
    ///
    /// The delay is validated immediately.
    pub fn schedule(&mut self, event: &E, delay: f32) -> Result<()> {
        delayed::check_delay(delay)?;
        self.commands.push(Command::Schedule(event.clone(), delay));
        Ok(())
    }

    /// Subscribe the current subscriber to `category`.
    pub fn subscribe(&mut self, category: E::Category) {
        self.commands
            .push(Command::Subscribe(self.subscriber, category));
    }

    /// Unsubscribe the current subscriber from `category`.
    pub fn unsubscribe(&mut self, category: E::Category) {
        self.commands
            .push(Command::Unsubscribe(self.subscriber, category));
    }

    /// Unsubscribe the current subscriber from every category.
    pub fn unsubscribe_all(&mut self) {
        self.commands.push(Command::UnsubscribeAll(self.subscriber));
    }

    /// Number of requests recorded so far in this fan-out.
    #[inline]
    pub fn pending_requests(&self) -> usize {
        self.commands.len()
    }
}
