use std::{cell::RefCell, fmt, rc::Weak};

use fixedbitset::FixedBitSet;

use crate::{broker::Context, event::Event};

/// Identifier handed out by [`Broker::register`](crate::Broker::register).
///
/// Ids are never reused by the broker that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u32);

impl SubscriberId {
    /// Create a new subscriber identifier.
    #[inline]
    pub const fn new(id: u32) -> Self {
        SubscriberId(id)
    }

    /// Get the raw identifier value.
    #[inline]
    pub const fn id(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A component that receives dispatched events.
///
/// Subscribers are shared with the broker as `Rc<RefCell<S>>`. The broker only keeps a weak
/// handle, so dropping the last `Rc` is always safe: a dropped subscriber is pruned on the next
/// dispatch that would have reached it.
///
/// `receive` borrows the event for the duration of the call only. Anything a subscriber wants
/// the broker to do in response (send, enqueue, schedule, change subscriptions) is requested
/// through the [`Context`] and applied once the current fan-out completes.
///
/// ```rust,ignore
/// struct Hud { score: u32 }
///
/// impl Subscriber<GameEvent> for Hud {
///     fn receive(&mut self, event: &GameEvent, ctx: &mut Context<'_, GameEvent>) {
///         if let GameEvent::GameEnd { .. } = event {
///             ctx.unsubscribe_all();
///         }
///     }
/// }
/// ```
pub trait Subscriber<E: Event> {
    /// Called once for every dispatched event in a category this subscriber is subscribed to.
    fn receive(&mut self, event: &E, ctx: &mut Context<'_, E>);

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<E, F> Subscriber<E> for F
where
    E: Event,
    F: FnMut(&E, &mut Context<'_, E>),
{
    fn receive(&mut self, event: &E, ctx: &mut Context<'_, E>) {
        self(event, ctx)
    }
}

/// Live-subscriber registry entry.
pub(crate) struct Registration<E: Event> {
    /// Non-owning handle, validated on every dispatch.
    pub(crate) handle: Weak<RefCell<dyn Subscriber<E>>>,
    pub(crate) name: String,
    /// Categories this subscriber is currently in, by category index.
    pub(crate) categories: FixedBitSet,
}

impl<E: Event> Registration<E> {
    pub(crate) fn new(
        handle: Weak<RefCell<dyn Subscriber<E>>>,
        name: String,
        category_count: usize,
    ) -> Self {
        Self {
            handle,
            name,
            categories: FixedBitSet::with_capacity(category_count),
        }
    }
}
