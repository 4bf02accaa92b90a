//! The event broker: subscription bookkeeping and dispatch.
//!
//! This module provides [`Broker`], which routes events of one [`Event`] type to the
//! [`Subscriber`]s registered for each category. It supports three delivery channels:
//!
//! - **Immediate**: [`send()`](Broker::send) fans an event out synchronously.
//! - **End of cycle**: [`enqueue()`](Broker::enqueue) copies an event onto the pending queue,
//!   delivered by the next [`flush_queue()`](Broker::flush_queue).
//! - **Delayed**: [`schedule()`](Broker::schedule) copies an event onto the delayed list. Each
//!   [`advance_time()`](Broker::advance_time) counts the list down and moves matured events onto
//!   the pending queue.
//!
//! # Cycle
//!
//! The driving loop calls `advance_time(dt)` and then `flush_queue()` once per cycle, or
//! [`pump(dt)`](Broker::pump) which does both (see also [`Pump`](crate::Pump)):
//!
//! ```text
//! schedule ──► delayed list ──advance_time──► pending queue ──flush_queue──► subscribers
//! enqueue  ─────────────────────────────────►      ▲                              │
//!                                                   └──── ctx.enqueue ◄───────────┘
//! send ───────────────────────────────────────────────────────────────────► subscribers
//! ```
//!
//! # Subscriber lifetime
//!
//! The broker never owns subscribers. [`register()`](Broker::register) stores a weak handle in a
//! live-subscriber registry along with the set of categories the subscriber is in. A subscriber
//! that is dropped while still subscribed is detected on the next dispatch that would reach it,
//! pruned from every category and reported (see [`Error::SubscriberDropped`]).
//!
//! # Example
//!
//! ```rust,ignore
//! let mut broker = Broker::<GameEvent>::new();
//! let hud = Rc::new(RefCell::new(Hud::default()));
//!
//! let id = broker.register(&hud)?;
//! broker.subscribe(id, GameEventCategory::GameStart)?;
//!
//! broker.send(&GameEvent::GameStart { start_time: 0.0 })?;
//! broker.schedule(&GameEvent::GameEnd { time_elapsed: 90.0 }, 90.0)?;
//!
//! loop {
//!     broker.pump(frame_delta)?;
//! }
//! ```

mod context;
mod delayed;
mod subscriber;

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::{Rc, Weak},
};

use log::{debug, error, trace, warn};

pub use context::Context;
pub use subscriber::{Subscriber, SubscriberId};

use crate::{
    config::Config,
    error::{Error, Result},
    event::{Category, Event},
};
use context::Command;
use delayed::DelayedList;
use subscriber::Registration;

/// Lifecycle state of a [`Broker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Subscriber sets are allocated and every operation is available.
    Initialized,
    /// Queues and subscriber sets were discarded. Only `initialize` and `teardown` are valid.
    TornDown,
}

/// Summary of one [`pump`](Broker::pump) cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cycle {
    /// Delayed events that matured onto the pending queue.
    pub promoted: usize,
    /// Events drained from the pending queue.
    pub drained: usize,
}

/// Typed, single-threaded event broker.
///
/// `Broker<E>` owns one subscriber set per category of `E`, the pending queue and the delayed
/// list. Every event it holds in a queue is its own copy; events passed to [`send`](Self::send)
/// are only borrowed.
///
/// # Thread Safety
///
/// `Broker` is not thread-safe and is `!Send`: it holds weak handles to `Rc<RefCell<_>>`
/// subscribers and is meant to be driven from the thread that runs the cycle loop.
pub struct Broker<E: Event> {
    state: State,
    config: Config,
    /// Subscriber set per category index. Set semantics are kept by `Registration::categories`.
    listeners: Vec<Vec<SubscriberId>>,
    /// Live-subscriber registry.
    registrations: HashMap<SubscriberId, Registration<E>>,
    next_id: u32,
    pending: VecDeque<E>,
    delayed: DelayedList<E>,
}

impl<E: Event> Broker<E> {
    /// Creates a new, initialized broker with the default [`Config`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new, initialized broker.
    ///
    /// One empty subscriber set is allocated per category of `E`.
    pub fn with_config(config: Config) -> Self {
        debug!(
            "event broker initialized with {} categories",
            E::Category::COUNT
        );
        Self {
            state: State::Initialized,
            config,
            listeners: vec![Vec::new(); E::Category::COUNT],
            registrations: HashMap::new(),
            next_id: 0,
            pending: VecDeque::with_capacity(config.queue_capacity),
            delayed: DelayedList::with_capacity(config.queue_capacity),
        }
    }

    /// Re-initializes a torn-down broker.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyInitialized`] if the broker is already initialized.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state == State::Initialized {
            return Err(Error::AlreadyInitialized);
        }
        self.listeners = vec![Vec::new(); E::Category::COUNT];
        self.state = State::Initialized;
        debug!(
            "event broker re-initialized with {} categories",
            E::Category::COUNT
        );
        Ok(())
    }

    /// Discards every pending and delayed event without dispatching it and clears all
    /// subscriber sets and registrations.
    ///
    /// Calling this on a torn-down broker does nothing.
    pub fn teardown(&mut self) {
        if self.state == State::TornDown {
            return;
        }
        let pending = self.pending.len();
        self.pending.clear();
        let delayed = self.delayed.clear();
        self.listeners.clear();
        self.registrations.clear();
        self.state = State::TornDown;
        debug!(
            "event broker torn down; discarded {} pending and {} delayed events",
            pending, delayed
        );
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ==================== Subscriptions ====================

    /// Registers a subscriber and returns its id.
    ///
    /// The broker keeps only a weak handle. Registering the same `Rc` again returns the id it
    /// already has.
    pub fn register<S>(&mut self, subscriber: &Rc<RefCell<S>>) -> Result<SubscriberId>
    where
        S: Subscriber<E> + 'static,
    {
        self.ensure_active("register")?;
        let handle = Rc::downgrade(subscriber);
        let handle: Weak<RefCell<dyn Subscriber<E>>> = handle;
        if let Some((id, _)) = self
            .registrations
            .iter()
            .find(|(_, registration)| registration.handle.ptr_eq(&handle))
        {
            return Ok(*id);
        }

        let name = match subscriber.try_borrow() {
            Ok(subscriber) => subscriber.name().to_string(),
            Err(_) => std::any::type_name::<S>().to_string(),
        };
        let id = SubscriberId::new(self.next_id);
        self.next_id += 1;
        debug!("registered subscriber {} ({})", id, name);
        self.registrations.insert(
            id,
            Registration::new(handle, name, E::Category::COUNT),
        );
        Ok(id)
    }

    /// Registers a subscriber and subscribes it to every category in `categories`.
    pub fn attach<S, I>(&mut self, subscriber: &Rc<RefCell<S>>, categories: I) -> Result<SubscriberId>
    where
        S: Subscriber<E> + 'static,
        I: IntoIterator<Item = E::Category>,
    {
        let id = self.register(subscriber)?;
        for category in categories {
            self.subscribe(id, category)?;
        }
        Ok(id)
    }

    /// Subscribes `id` to `category`. Returns `false` if it was already subscribed.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownSubscriber`] if `id` is not registered.
    pub fn subscribe(&mut self, id: SubscriberId, category: E::Category) -> Result<bool> {
        self.ensure_active("subscribe")?;
        let registration = self
            .registrations
            .get_mut(&id)
            .ok_or(Error::UnknownSubscriber { id })?;
        let index = category.index();
        if registration.categories.contains(index) {
            return Ok(false);
        }
        registration.categories.insert(index);
        self.listeners[index].push(id);
        trace!("subscriber {} subscribed to {}", id, category.name());
        Ok(true)
    }

    /// Unsubscribes `id` from `category`. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriberId, category: E::Category) -> Result<bool> {
        self.ensure_active("unsubscribe")?;
        let Some(registration) = self.registrations.get_mut(&id) else {
            return Ok(false);
        };
        let index = category.index();
        if !registration.categories.contains(index) {
            return Ok(false);
        }
        registration.categories.set(index, false);
        detach(&mut self.listeners[index], id);
        trace!("subscriber {} unsubscribed from {}", id, category.name());
        Ok(true)
    }

    /// Unsubscribes `id` from every category. Returns how many categories it left.
    ///
    /// The registration is kept, so the subscriber can subscribe again later.
    pub fn unsubscribe_all(&mut self, id: SubscriberId) -> Result<usize> {
        self.ensure_active("unsubscribe_all")?;
        Ok(self.detach_all(id))
    }

    /// Unsubscribes `id` from everything and forgets its registration. Returns `false` if it was
    /// not registered.
    pub fn remove_listener(&mut self, id: SubscriberId) -> Result<bool> {
        self.ensure_active("remove_listener")?;
        self.detach_all(id);
        Ok(self.registrations.remove(&id).is_some())
    }

    #[inline]
    pub fn is_registered(&self, id: SubscriberId) -> bool {
        self.registrations.contains_key(&id)
    }

    pub fn is_subscribed(&self, id: SubscriberId, category: E::Category) -> bool {
        self.registrations
            .get(&id)
            .is_some_and(|registration| registration.categories.contains(category.index()))
    }

    /// Categories `id` is subscribed to, in index order.
    pub fn subscriptions(&self, id: SubscriberId) -> Vec<E::Category> {
        self.registrations
            .get(&id)
            .map(|registration| {
                registration
                    .categories
                    .ones()
                    .filter_map(E::Category::from_index)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of subscribers in a category's set.
    pub fn subscriber_count(&self, category: E::Category) -> usize {
        self.listeners.get(category.index()).map_or(0, Vec::len)
    }

    // ==================== Dispatch ====================

    /// Synchronously dispatches `event` to every subscriber of its category. Returns the number
    /// of subscribers that received it.
    ///
    /// Requests subscribers make through their [`Context`] are applied after the fan-out, in
    /// request order. Sends among them are dispatched before this call returns.
    pub fn send(&mut self, event: &E) -> Result<usize> {
        self.ensure_active("send")?;
        self.dispatch(event, 0)
    }

    /// Copies `event` onto the pending queue. It is dispatched by the next
    /// [`flush_queue`](Self::flush_queue).
    pub fn enqueue(&mut self, event: &E) -> Result<()> {
        self.ensure_active("enqueue")?;
        trace!("queued {}", event.name());
        self.pending.push_back(event.clone());
        Ok(())
    }

    /// Copies `event` onto the delayed list, to mature after `delay` seconds of
    /// [`advance_time`](Self::advance_time). A delay of exactly zero enqueues it instead.
    ///
    /// The event matures once the time advanced since this call adds up to `delay`. Due times
    /// are kept against an elapsed-time clock, so steps such as three of `0.1` mature a delay of
    /// `0.3` despite `f32` rounding (matching is within one microsecond).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDelay`] if `delay` is negative, NaN or infinite.
    pub fn schedule(&mut self, event: &E, delay: f32) -> Result<()> {
        self.ensure_active("schedule")?;
        delayed::check_delay(delay)?;
        self.schedule_owned(event.clone(), delay);
        Ok(())
    }

    /// Counts every delayed event down by `dt` seconds. Events whose countdown reaches zero move
    /// to the pending queue in the order they were scheduled. Returns how many matured.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTimeStep`] if `dt` is negative, NaN or infinite.
    pub fn advance_time(&mut self, dt: f32) -> Result<usize> {
        self.ensure_active("advance_time")?;
        delayed::check_time_step(dt)?;
        let promoted = self.delayed.advance(dt, &mut self.pending);
        if promoted > 0 {
            trace!("{} delayed events matured", promoted);
        }
        Ok(promoted)
    }

    /// Dispatches pending events in FIFO order until the queue is empty, including events queued
    /// by subscribers during this flush. Returns how many events were drained.
    ///
    /// # Errors
    ///
    /// - [`Error::FlushLimitExceeded`] once more than [`Config::flush_limit`] events were
    ///   drained in this call. It is returned immediately and the remaining events stay queued.
    /// - The first error raised while dispatching, such as [`Error::SubscriberDropped`] in
    ///   strict mode or [`Error::SendDepthExceeded`]. The drain still runs to completion and the
    ///   error is returned once the queue is empty.
    pub fn flush_queue(&mut self) -> Result<usize> {
        self.ensure_active("flush_queue")?;
        let mut drained = 0;
        let mut failure = None;
        while let Some(event) = self.pending.pop_front() {
            if let Some(limit) = self.config.flush_limit {
                if drained >= limit {
                    self.pending.push_front(event);
                    return Err(Error::FlushLimitExceeded {
                        limit,
                        remaining: self.pending.len(),
                    });
                }
            }
            drained += 1;
            if let Err(err) = self.dispatch(&event, 0) {
                keep_first(&mut failure, err);
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(drained),
        }
    }

    /// Runs one cycle: [`advance_time(dt)`](Self::advance_time) then
    /// [`flush_queue()`](Self::flush_queue).
    pub fn pump(&mut self, dt: f32) -> Result<Cycle> {
        let promoted = self.advance_time(dt)?;
        let drained = self.flush_queue()?;
        Ok(Cycle { promoted, drained })
    }

    /// Number of events waiting for the next flush.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of events waiting for their delay to elapse.
    #[inline]
    pub fn delayed_len(&self) -> usize {
        self.delayed.len()
    }

    // ==================== Internals ====================

    fn ensure_active(&self, operation: &'static str) -> Result<()> {
        match self.state {
            State::Initialized => Ok(()),
            State::TornDown => Err(Error::TornDown { operation }),
        }
    }

    fn schedule_owned(&mut self, event: E, delay: f32) {
        if delay == 0.0 {
            trace!("queued {}", event.name());
            self.pending.push_back(event);
        } else {
            trace!("scheduled {} in {}s", event.name(), delay);
            self.delayed.push(event, delay);
        }
    }

    fn detach_all(&mut self, id: SubscriberId) -> usize {
        let Some(registration) = self.registrations.get_mut(&id) else {
            return 0;
        };
        let mut left = 0;
        for index in registration.categories.ones() {
            detach(&mut self.listeners[index], id);
            left += 1;
        }
        registration.categories.clear();
        left
    }

    fn dispatch(&mut self, event: &E, depth: usize) -> Result<usize> {
        if depth > self.config.max_send_depth {
            return Err(Error::SendDepthExceeded {
                limit: self.config.max_send_depth,
            });
        }

        // Snapshot so requests made during the fan-out can't disturb it.
        let targets = self.listeners[event.category().index()].clone();
        let mut commands = Vec::new();
        let mut dropped = Vec::new();
        let mut delivered = 0;
        for id in targets {
            let Some(registration) = self.registrations.get(&id) else {
                continue;
            };
            let Some(subscriber) = registration.handle.upgrade() else {
                dropped.push(id);
                continue;
            };
            match subscriber.try_borrow_mut() {
                Ok(mut subscriber) => {
                    let mut ctx = Context::new(id, &mut commands);
                    subscriber.receive(event, &mut ctx);
                    delivered += 1;
                }
                Err(_) => error!(
                    "skipped {} for subscriber {} ({}): subscriber is already borrowed",
                    event.name(),
                    id,
                    registration.name
                ),
            }
        }
        trace!("dispatched {} to {} subscribers", event.name(), delivered);

        let dropped = self.prune(dropped);
        let applied = self.apply(commands, depth);
        match dropped.into_iter().next() {
            Some(err) if self.config.strict_lifetimes => {
                if let Err(later) = applied {
                    warn!("{} while applying requests after a dropped subscriber", later);
                }
                Err(err)
            }
            _ => applied.map(|()| delivered),
        }
    }

    /// Forget subscribers whose handle no longer upgrades.
    fn prune(&mut self, ids: Vec<SubscriberId>) -> Vec<Error> {
        let mut errors = Vec::with_capacity(ids.len());
        for id in ids {
            self.detach_all(id);
            if let Some(registration) = self.registrations.remove(&id) {
                warn!(
                    "subscriber {} ({}) was dropped without unsubscribing; pruned it",
                    id, registration.name
                );
                errors.push(Error::SubscriberDropped {
                    id,
                    name: registration.name,
                });
            }
        }
        errors
    }

    /// Apply every request in order. A failing request does not stop the ones after it; the
    /// first error is returned once all were applied.
    fn apply(&mut self, commands: Vec<Command<E>>, depth: usize) -> Result<()> {
        let mut failure = None;
        for command in commands {
            let result = match command {
                Command::Send(event) => self.dispatch(&event, depth + 1).map(|_| ()),
                Command::Enqueue(event) => {
                    self.pending.push_back(event);
                    Ok(())
                }
                Command::Schedule(event, delay) => {
                    self.schedule_owned(event, delay);
                    Ok(())
                }
                Command::Subscribe(id, category) => self.subscribe(id, category).map(|_| ()),
                Command::Unsubscribe(id, category) => self.unsubscribe(id, category).map(|_| ()),
                Command::UnsubscribeAll(id) => {
                    self.detach_all(id);
                    Ok(())
                }
            };
            if let Err(err) = result {
                keep_first(&mut failure, err);
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<E: Event> Default for Broker<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> Drop for Broker<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Record `err` unless an earlier error is already held. Later errors are only logged.
fn keep_first(failure: &mut Option<Error>, err: Error) {
    match failure {
        Some(_) => warn!("{}", err),
        None => *failure = Some(err),
    }
}

/// Remove `id` from one category's subscriber set.
fn detach(listeners: &mut Vec<SubscriberId>, id: SubscriberId) {
    if let Some(position) = listeners.iter().position(|listener| *listener == id) {
        listeners.swap_remove(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Event;

    #[derive(Clone, Debug, PartialEq, Event)]
    enum TestEvent {
        Ping(u32),
        Pong(u32),
    }

    #[derive(Default)]
    struct Recorder {
        received: Vec<TestEvent>,
    }

    impl Subscriber<TestEvent> for Recorder {
        fn receive(&mut self, event: &TestEvent, _ctx: &mut Context<'_, TestEvent>) {
            self.received.push(event.clone());
        }

        fn name(&self) -> &str {
            "recorder"
        }
    }

    fn recorder() -> Rc<RefCell<Recorder>> {
        Rc::new(RefCell::new(Recorder::default()))
    }

    fn received(recorder: &Rc<RefCell<Recorder>>) -> Vec<TestEvent> {
        recorder.borrow().received.clone()
    }

    // ==================== Lifecycle ====================

    #[test]
    fn new_broker_is_initialized() {
        let broker = Broker::<TestEvent>::new();

        assert_eq!(broker.state(), State::Initialized);
        assert_eq!(broker.pending_len(), 0);
        assert_eq!(broker.delayed_len(), 0);
        assert_eq!(broker.subscriber_count(TestEventCategory::Ping), 0);
    }

    #[test]
    fn initialize_twice_is_an_error() {
        let mut broker = Broker::<TestEvent>::new();

        assert_eq!(broker.initialize(), Err(Error::AlreadyInitialized));
    }

    #[test]
    fn teardown_discards_queues_without_dispatch() {
        // Given
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        broker
            .attach(&subscriber, [TestEventCategory::Ping])
            .unwrap();
        broker.enqueue(&TestEvent::Ping(1)).unwrap();
        broker.schedule(&TestEvent::Ping(2), 1.0).unwrap();

        // When
        broker.teardown();

        // Then
        assert_eq!(broker.state(), State::TornDown);
        assert_eq!(broker.pending_len(), 0);
        assert_eq!(broker.delayed_len(), 0);
        assert!(received(&subscriber).is_empty());
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut broker = Broker::<TestEvent>::new();

        broker.teardown();
        broker.teardown();

        assert_eq!(broker.state(), State::TornDown);
    }

    #[test]
    fn operations_after_teardown_are_usage_errors() {
        // Given
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        let id = broker.register(&subscriber).unwrap();
        broker.teardown();

        // Then
        assert_eq!(
            broker.send(&TestEvent::Ping(1)),
            Err(Error::TornDown { operation: "send" })
        );
        assert_eq!(
            broker.enqueue(&TestEvent::Ping(1)),
            Err(Error::TornDown {
                operation: "enqueue"
            })
        );
        assert!(broker.schedule(&TestEvent::Ping(1), 1.0).is_err());
        assert!(broker.advance_time(1.0).is_err());
        assert!(broker.flush_queue().is_err());
        assert!(broker.subscribe(id, TestEventCategory::Ping).is_err());
        assert!(broker.register(&subscriber).is_err());
        assert_eq!(broker.subscriber_count(TestEventCategory::Ping), 0);
    }

    #[test]
    fn initialize_after_teardown_starts_clean() {
        // Given
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        let id = broker
            .attach(&subscriber, [TestEventCategory::Ping])
            .unwrap();
        broker.teardown();

        // When
        broker.initialize().unwrap();

        // Then - registrations are gone, the broker works again
        assert!(!broker.is_registered(id));
        assert_eq!(broker.send(&TestEvent::Ping(1)), Ok(0));
        let id = broker
            .attach(&subscriber, [TestEventCategory::Ping])
            .unwrap();
        assert_eq!(broker.send(&TestEvent::Ping(2)), Ok(1));
        assert!(broker.is_subscribed(id, TestEventCategory::Ping));
        assert_eq!(received(&subscriber), vec![TestEvent::Ping(2)]);
    }

    // ==================== Subscriptions ====================

    #[test]
    fn send_reaches_only_subscribed_category() {
        // Given - two categories, subscriber in the first one only
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        let id = broker.register(&subscriber).unwrap();
        broker.subscribe(id, TestEventCategory::Ping).unwrap();

        // When
        let pong = broker.send(&TestEvent::Pong(1)).unwrap();

        // Then
        assert_eq!(pong, 0);
        assert!(received(&subscriber).is_empty());

        // When
        let ping = broker.send(&TestEvent::Ping(42)).unwrap();

        // Then
        assert_eq!(ping, 1);
        assert_eq!(received(&subscriber), vec![TestEvent::Ping(42)]);
    }

    #[test]
    fn subscribe_is_idempotent() {
        // Given
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        let id = broker.register(&subscriber).unwrap();

        // When
        let first = broker.subscribe(id, TestEventCategory::Ping).unwrap();
        let second = broker.subscribe(id, TestEventCategory::Ping).unwrap();
        broker.send(&TestEvent::Ping(1)).unwrap();

        // Then
        assert!(first);
        assert!(!second);
        assert_eq!(broker.subscriber_count(TestEventCategory::Ping), 1);
        assert_eq!(received(&subscriber), vec![TestEvent::Ping(1)]);
    }

    #[test]
    fn register_same_subscriber_returns_same_id() {
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();

        let first = broker.register(&subscriber).unwrap();
        let second = broker.register(&subscriber).unwrap();
        let other = broker.register(&recorder()).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn subscribe_unknown_subscriber_fails() {
        let mut broker = Broker::<TestEvent>::new();
        let id = SubscriberId::new(99);

        assert_eq!(
            broker.subscribe(id, TestEventCategory::Ping),
            Err(Error::UnknownSubscriber { id })
        );
        assert_eq!(broker.unsubscribe(id, TestEventCategory::Ping), Ok(false));
        assert_eq!(broker.unsubscribe_all(id), Ok(0));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        // Given
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        let id = broker
            .attach(&subscriber, [TestEventCategory::Ping, TestEventCategory::Pong])
            .unwrap();
        broker.send(&TestEvent::Ping(1)).unwrap();

        // When
        let removed = broker.unsubscribe(id, TestEventCategory::Ping).unwrap();
        let removed_again = broker.unsubscribe(id, TestEventCategory::Ping).unwrap();
        broker.send(&TestEvent::Ping(2)).unwrap();
        broker.send(&TestEvent::Pong(3)).unwrap();

        // Then
        assert!(removed);
        assert!(!removed_again);
        assert_eq!(
            received(&subscriber),
            vec![TestEvent::Ping(1), TestEvent::Pong(3)]
        );
    }

    #[test]
    fn unsubscribe_all_leaves_every_category_once() {
        // Given
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        let id = broker
            .attach(&subscriber, [TestEventCategory::Ping, TestEventCategory::Pong])
            .unwrap();

        // When
        let first = broker.unsubscribe_all(id).unwrap();
        let second = broker.unsubscribe_all(id).unwrap();
        broker.send(&TestEvent::Ping(1)).unwrap();

        // Then
        assert_eq!(first, 2);
        assert_eq!(second, 0);
        assert!(broker.is_registered(id));
        assert!(broker.subscriptions(id).is_empty());
        assert!(received(&subscriber).is_empty());
    }

    #[test]
    fn remove_listener_forgets_registration() {
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        let id = broker
            .attach(&subscriber, [TestEventCategory::Pong])
            .unwrap();

        assert_eq!(broker.remove_listener(id), Ok(true));
        assert_eq!(broker.remove_listener(id), Ok(false));
        assert!(!broker.is_registered(id));
        assert_eq!(broker.subscriber_count(TestEventCategory::Pong), 0);
    }

    #[test]
    fn subscriptions_are_listed_in_index_order() {
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        let id = broker
            .attach(&subscriber, [TestEventCategory::Pong, TestEventCategory::Ping])
            .unwrap();

        assert_eq!(
            broker.subscriptions(id),
            vec![TestEventCategory::Ping, TestEventCategory::Pong]
        );
    }

    #[test]
    fn send_reaches_every_subscriber() {
        let mut broker = Broker::<TestEvent>::new();
        let subscribers: Vec<_> = (0..3).map(|_| recorder()).collect();
        for subscriber in &subscribers {
            broker
                .attach(subscriber, [TestEventCategory::Ping])
                .unwrap();
        }

        assert_eq!(broker.send(&TestEvent::Ping(5)), Ok(3));
        for subscriber in &subscribers {
            assert_eq!(received(subscriber), vec![TestEvent::Ping(5)]);
        }
    }

    #[test]
    fn closures_can_subscribe() {
        // Given
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let closure = Rc::new(RefCell::new(
            move |event: &TestEvent, _ctx: &mut Context<'_, TestEvent>| {
                sink.borrow_mut().push(event.clone());
            },
        ));
        let mut broker = Broker::<TestEvent>::new();
        broker.attach(&closure, [TestEventCategory::Pong]).unwrap();

        // When
        broker.send(&TestEvent::Pong(9)).unwrap();

        // Then
        assert_eq!(*seen.borrow(), vec![TestEvent::Pong(9)]);
    }

    // ==================== Queue and delay ====================

    #[test]
    fn enqueue_delivers_once_on_flush() {
        // Given
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        broker
            .attach(&subscriber, [TestEventCategory::Ping])
            .unwrap();

        // When
        broker.enqueue(&TestEvent::Ping(1)).unwrap();

        // Then - nothing before the flush
        assert!(received(&subscriber).is_empty());
        assert_eq!(broker.pending_len(), 1);

        // When
        let drained = broker.flush_queue().unwrap();
        let drained_again = broker.flush_queue().unwrap();

        // Then
        assert_eq!(drained, 1);
        assert_eq!(drained_again, 0);
        assert_eq!(received(&subscriber), vec![TestEvent::Ping(1)]);
    }

    #[test]
    fn flush_preserves_fifo_order() {
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        broker
            .attach(&subscriber, [TestEventCategory::Ping, TestEventCategory::Pong])
            .unwrap();

        broker.enqueue(&TestEvent::Pong(1)).unwrap();
        broker.enqueue(&TestEvent::Ping(2)).unwrap();
        broker.enqueue(&TestEvent::Pong(3)).unwrap();
        broker.flush_queue().unwrap();

        assert_eq!(
            received(&subscriber),
            vec![TestEvent::Pong(1), TestEvent::Ping(2), TestEvent::Pong(3)]
        );
    }

    #[test]
    fn schedule_delivers_after_cumulative_delay() {
        // Given
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        broker
            .attach(&subscriber, [TestEventCategory::Ping])
            .unwrap();
        broker.schedule(&TestEvent::Ping(1), 5.0).unwrap();

        // When
        let first = broker.pump(3.0).unwrap();

        // Then
        assert_eq!(first, Cycle::default());
        assert!(received(&subscriber).is_empty());

        // When
        let second = broker.pump(3.0).unwrap();
        let third = broker.pump(3.0).unwrap();

        // Then
        assert_eq!(
            second,
            Cycle {
                promoted: 1,
                drained: 1
            }
        );
        assert_eq!(third, Cycle::default());
        assert_eq!(received(&subscriber), vec![TestEvent::Ping(1)]);
    }

    #[test]
    fn matured_events_wait_for_flush() {
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        broker
            .attach(&subscriber, [TestEventCategory::Ping])
            .unwrap();
        broker.schedule(&TestEvent::Ping(1), 1.0).unwrap();

        assert_eq!(broker.advance_time(1.5), Ok(1));
        assert_eq!(broker.pending_len(), 1);
        assert_eq!(broker.delayed_len(), 0);
        assert!(received(&subscriber).is_empty());
    }

    #[test]
    fn simultaneous_maturation_keeps_schedule_order() {
        // Given
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        broker
            .attach(&subscriber, [TestEventCategory::Ping])
            .unwrap();
        broker.schedule(&TestEvent::Ping(1), 2.0).unwrap();
        broker.schedule(&TestEvent::Ping(2), 1.0).unwrap();

        // When
        let promoted = broker.advance_time(2.0).unwrap();
        broker.flush_queue().unwrap();

        // Then
        assert_eq!(promoted, 2);
        assert_eq!(
            received(&subscriber),
            vec![TestEvent::Ping(1), TestEvent::Ping(2)]
        );
    }

    #[test]
    fn zero_delay_is_routed_to_queue() {
        let mut broker = Broker::<TestEvent>::new();

        broker.schedule(&TestEvent::Ping(1), 0.0).unwrap();

        assert_eq!(broker.pending_len(), 1);
        assert_eq!(broker.delayed_len(), 0);
    }

    #[test]
    fn invalid_delays_and_time_steps_are_rejected() {
        let mut broker = Broker::<TestEvent>::new();

        assert_eq!(
            broker.schedule(&TestEvent::Ping(1), -1.0),
            Err(Error::InvalidDelay { delay: -1.0 })
        );
        assert!(broker.schedule(&TestEvent::Ping(1), f32::NAN).is_err());
        assert_eq!(
            broker.advance_time(-0.5),
            Err(Error::InvalidTimeStep { dt: -0.5 })
        );
        assert_eq!(broker.delayed_len(), 0);
        assert_eq!(broker.pending_len(), 0);
    }

    #[test]
    fn queued_events_are_independent_copies() {
        // Given
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        broker
            .attach(&subscriber, [TestEventCategory::Ping])
            .unwrap();
        let mut event = TestEvent::Ping(1);

        // When - producer reuses its event after queueing
        broker.enqueue(&event).unwrap();
        event = TestEvent::Ping(2);
        broker.flush_queue().unwrap();

        // Then
        assert_eq!(event, TestEvent::Ping(2));
        assert_eq!(received(&subscriber), vec![TestEvent::Ping(1)]);
    }

    // ==================== Re-entrancy ====================

    /// Answers every ping with a queued pong.
    struct Echo;

    impl Subscriber<TestEvent> for Echo {
        fn receive(&mut self, event: &TestEvent, ctx: &mut Context<'_, TestEvent>) {
            if let TestEvent::Ping(value) = event {
                ctx.enqueue(&TestEvent::Pong(*value));
            }
        }
    }

    #[test]
    fn flush_drains_events_queued_during_flush() {
        // Given
        let mut broker = Broker::<TestEvent>::new();
        let echo = Rc::new(RefCell::new(Echo));
        let subscriber = recorder();
        broker.attach(&echo, [TestEventCategory::Ping]).unwrap();
        broker
            .attach(&subscriber, [TestEventCategory::Pong])
            .unwrap();
        broker.enqueue(&TestEvent::Ping(7)).unwrap();

        // When
        let drained = broker.flush_queue().unwrap();

        // Then
        assert_eq!(drained, 2);
        assert_eq!(received(&subscriber), vec![TestEvent::Pong(7)]);
        assert_eq!(broker.pending_len(), 0);
    }

    #[test]
    fn flush_limit_stops_feedback_loops() {
        // Given - a subscriber that re-queues every event it receives
        let mut broker =
            Broker::<TestEvent>::with_config(Config::default().with_flush_limit(Some(10)));
        let looping = Rc::new(RefCell::new(
            |event: &TestEvent, ctx: &mut Context<'_, TestEvent>| ctx.enqueue(event),
        ));
        broker.attach(&looping, [TestEventCategory::Ping]).unwrap();
        broker.enqueue(&TestEvent::Ping(0)).unwrap();

        // When
        let result = broker.flush_queue();

        // Then
        assert_eq!(
            result,
            Err(Error::FlushLimitExceeded {
                limit: 10,
                remaining: 1
            })
        );
        assert_eq!(broker.pending_len(), 1);
    }

    #[test]
    fn nested_send_is_delivered_before_send_returns() {
        // Given
        let mut broker = Broker::<TestEvent>::new();
        let relay = Rc::new(RefCell::new(
            |event: &TestEvent, ctx: &mut Context<'_, TestEvent>| {
                if let TestEvent::Ping(value) = event {
                    ctx.send(&TestEvent::Pong(value + 1));
                }
            },
        ));
        let subscriber = recorder();
        broker.attach(&relay, [TestEventCategory::Ping]).unwrap();
        broker
            .attach(&subscriber, [TestEventCategory::Pong])
            .unwrap();

        // When
        let delivered = broker.send(&TestEvent::Ping(1)).unwrap();

        // Then
        assert_eq!(delivered, 1);
        assert_eq!(received(&subscriber), vec![TestEvent::Pong(2)]);
    }

    #[test]
    fn nested_send_depth_is_bounded() {
        let mut broker =
            Broker::<TestEvent>::with_config(Config::default().with_max_send_depth(3));
        let looping = Rc::new(RefCell::new(
            |event: &TestEvent, ctx: &mut Context<'_, TestEvent>| ctx.send(event),
        ));
        broker.attach(&looping, [TestEventCategory::Ping]).unwrap();

        assert_eq!(
            broker.send(&TestEvent::Ping(1)),
            Err(Error::SendDepthExceeded { limit: 3 })
        );
    }

    /// Forwards `Ping(n)` as `Ping(n + 1)` while `n < stop`.
    fn chain(stop: u32) -> Rc<RefCell<impl Subscriber<TestEvent>>> {
        Rc::new(RefCell::new(
            move |event: &TestEvent, ctx: &mut Context<'_, TestEvent>| {
                if let TestEvent::Ping(value) = event {
                    if *value < stop {
                        ctx.send(&TestEvent::Ping(value + 1));
                    }
                }
            },
        ))
    }

    #[test]
    fn send_depth_limit_counts_nested_sends_only() {
        // Given - three context sends nest below the outer send
        let mut broker =
            Broker::<TestEvent>::with_config(Config::default().with_max_send_depth(3));
        let within = chain(3);
        let subscriber = recorder();
        let id = broker.attach(&within, [TestEventCategory::Ping]).unwrap();
        broker
            .attach(&subscriber, [TestEventCategory::Ping])
            .unwrap();

        // When
        let result = broker.send(&TestEvent::Ping(0));

        // Then
        assert_eq!(result, Ok(2));
        assert_eq!(received(&subscriber).len(), 4);

        // When - a fourth nested send
        broker.remove_listener(id).unwrap();
        let beyond = chain(4);
        broker.attach(&beyond, [TestEventCategory::Ping]).unwrap();

        // Then
        assert_eq!(
            broker.send(&TestEvent::Ping(0)),
            Err(Error::SendDepthExceeded { limit: 3 })
        );
    }

    /// Sends a pong for every ping, then queues a follow-up ping.
    fn send_then_enqueue() -> Rc<RefCell<impl Subscriber<TestEvent>>> {
        Rc::new(RefCell::new(
            |event: &TestEvent, ctx: &mut Context<'_, TestEvent>| {
                if let TestEvent::Ping(value) = event {
                    ctx.send(&TestEvent::Pong(*value));
                    ctx.enqueue(&TestEvent::Ping(value + 100));
                }
            },
        ))
    }

    #[test]
    fn failed_nested_send_keeps_later_requests() {
        // Given - strict broker whose only pong subscriber was dropped
        let mut broker =
            Broker::<TestEvent>::with_config(Config::default().with_strict_lifetimes(true));
        let relay = send_then_enqueue();
        let gone = recorder();
        broker.attach(&relay, [TestEventCategory::Ping]).unwrap();
        let gone_id = broker.attach(&gone, [TestEventCategory::Pong]).unwrap();
        drop(gone);

        // When
        let result = broker.send(&TestEvent::Ping(1));

        // Then - the dropped subscriber is reported and the enqueue still applied
        assert_eq!(
            result,
            Err(Error::SubscriberDropped {
                id: gone_id,
                name: "recorder".into()
            })
        );
        assert_eq!(broker.pending_len(), 1);
    }

    #[test]
    fn exceeded_send_depth_keeps_later_requests() {
        let mut broker =
            Broker::<TestEvent>::with_config(Config::default().with_max_send_depth(0));
        let relay = send_then_enqueue();
        broker.attach(&relay, [TestEventCategory::Ping]).unwrap();

        assert_eq!(
            broker.send(&TestEvent::Ping(1)),
            Err(Error::SendDepthExceeded { limit: 0 })
        );
        assert_eq!(broker.pending_len(), 1);
    }

    #[test]
    fn subscription_changes_during_fan_out_apply_afterwards() {
        // Given - a one-shot subscriber that leaves on its first ping and joins pongs
        let mut broker = Broker::<TestEvent>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let one_shot = Rc::new(RefCell::new(
            move |event: &TestEvent, ctx: &mut Context<'_, TestEvent>| {
                sink.borrow_mut().push(event.clone());
                ctx.unsubscribe(TestEventCategory::Ping);
                ctx.subscribe(TestEventCategory::Pong);
            },
        ));
        let other = recorder();
        let id = broker
            .attach(&one_shot, [TestEventCategory::Ping])
            .unwrap();
        broker.attach(&other, [TestEventCategory::Ping]).unwrap();

        // When
        let first = broker.send(&TestEvent::Ping(1)).unwrap();
        let second = broker.send(&TestEvent::Ping(2)).unwrap();
        broker.send(&TestEvent::Pong(3)).unwrap();

        // Then - the fan-out in progress was unaffected
        assert_eq!(first, 2);
        assert_eq!(second, 1);
        assert_eq!(
            *seen.borrow(),
            vec![TestEvent::Ping(1), TestEvent::Pong(3)]
        );
        assert_eq!(received(&other), vec![TestEvent::Ping(1), TestEvent::Ping(2)]);
        assert_eq!(broker.subscriptions(id), vec![TestEventCategory::Pong]);
    }

    #[test]
    fn schedule_from_context_uses_delayed_list() {
        let mut broker = Broker::<TestEvent>::new();
        let timer = Rc::new(RefCell::new(
            |_event: &TestEvent, ctx: &mut Context<'_, TestEvent>| {
                ctx.schedule(&TestEvent::Pong(0), 2.0).unwrap();
                ctx.schedule(&TestEvent::Pong(1), 0.0).unwrap();
            },
        ));
        broker.attach(&timer, [TestEventCategory::Ping]).unwrap();

        broker.send(&TestEvent::Ping(0)).unwrap();

        assert_eq!(broker.delayed_len(), 1);
        assert_eq!(broker.pending_len(), 1);
    }

    // ==================== Lifetime ====================

    #[test]
    fn dropped_subscriber_is_pruned() {
        // Given
        let mut broker = Broker::<TestEvent>::new();
        let subscriber = recorder();
        let id = broker
            .attach(&subscriber, [TestEventCategory::Ping, TestEventCategory::Pong])
            .unwrap();

        // When - dropped without unsubscribing
        drop(subscriber);
        let delivered = broker.send(&TestEvent::Ping(1)).unwrap();

        // Then
        assert_eq!(delivered, 0);
        assert!(!broker.is_registered(id));
        assert_eq!(broker.subscriber_count(TestEventCategory::Ping), 0);
        assert_eq!(broker.subscriber_count(TestEventCategory::Pong), 0);
    }

    #[test]
    fn dropped_subscriber_is_an_error_in_strict_mode() {
        // Given
        let mut broker =
            Broker::<TestEvent>::with_config(Config::default().with_strict_lifetimes(true));
        let dropped = recorder();
        let survivor = recorder();
        let id = broker
            .attach(&dropped, [TestEventCategory::Ping])
            .unwrap();
        broker
            .attach(&survivor, [TestEventCategory::Ping])
            .unwrap();
        drop(dropped);

        // When
        let result = broker.send(&TestEvent::Ping(1));

        // Then - reported, but the fan-out to live subscribers still completed
        assert_eq!(
            result,
            Err(Error::SubscriberDropped {
                id,
                name: "recorder".into()
            })
        );
        assert_eq!(received(&survivor), vec![TestEvent::Ping(1)]);
        assert_eq!(broker.send(&TestEvent::Ping(2)), Ok(1));
    }

    #[test]
    fn strict_flush_drains_before_reporting_dropped_subscriber() {
        // Given
        let mut broker =
            Broker::<TestEvent>::with_config(Config::default().with_strict_lifetimes(true));
        let live = recorder();
        let dropped = recorder();
        broker.attach(&live, [TestEventCategory::Ping]).unwrap();
        let id = broker
            .attach(&dropped, [TestEventCategory::Ping])
            .unwrap();
        drop(dropped);
        broker.enqueue(&TestEvent::Ping(1)).unwrap();
        broker.enqueue(&TestEvent::Ping(2)).unwrap();

        // When
        let result = broker.flush_queue();

        // Then - every queued event reached the live subscriber
        assert_eq!(
            result,
            Err(Error::SubscriberDropped {
                id,
                name: "recorder".into()
            })
        );
        assert_eq!(
            received(&live),
            vec![TestEvent::Ping(1), TestEvent::Ping(2)]
        );
        assert_eq!(broker.pending_len(), 0);
        assert_eq!(broker.flush_queue(), Ok(0));
    }

    #[test]
    fn borrowed_subscriber_is_skipped() {
        // Given
        let mut broker = Broker::<TestEvent>::new();
        let busy = recorder();
        let idle = recorder();
        broker.attach(&busy, [TestEventCategory::Ping]).unwrap();
        broker.attach(&idle, [TestEventCategory::Ping]).unwrap();

        // When
        let delivered = {
            let _guard = busy.borrow_mut();
            broker.send(&TestEvent::Ping(1)).unwrap()
        };

        // Then
        assert_eq!(delivered, 1);
        assert!(received(&busy).is_empty());
        assert_eq!(received(&idle), vec![TestEvent::Ping(1)]);
    }
}
