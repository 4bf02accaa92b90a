//! Event values and their categories.
//!
//! An event is an immutable value describing one occurrence. Each event belongs to exactly one
//! [`Category`] drawn from a closed set that is fixed at compile time. Events are plain sum types:
//! duplicating one for queuing is an ordinary [`Clone`].
//!
//! # Declaring events
//!
//! The usual way to declare events is an enum with `#[derive(Event)]`. Each variant is a category
//! and its fields are the category's payload:
//!
//! ```rust,ignore
//! use rusty_events::Event;
//!
//! #[derive(Clone, Debug, Event)]
//! pub enum GameEvent {
//!     GameStart { start_time: f32 },
//!     SoundCue { audio_event: i32 },
//!     Paused,
//! }
//!
//! // Generated alongside the enum:
//! // pub enum GameEventCategory { GameStart, SoundCue, Paused }
//! assert_eq!(GameEvent::Paused.category(), GameEventCategory::Paused);
//! assert_eq!(GameEventCategory::COUNT, 3);
//! ```
//!
//! The derive also records a field schema per category (see [`Category::fields`]) which the
//! [`Registry`] exposes for documentation and tooling. The broker never inspects payloads.

mod registry;

use std::{fmt, hash::Hash};

pub use registry::{Entry, Registry};

/// Name and type of a payload field, as written in the event declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    /// Field name. Tuple fields are named by position (`"0"`, `"1"`, ...).
    pub name: &'static str,
    /// Field type as source text with whitespace removed.
    pub ty: &'static str,
}

impl Field {
    #[inline]
    pub const fn new(name: &'static str, ty: &'static str) -> Self {
        Self { name, ty }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// A closed, ordered set of event categories.
///
/// Categories map one-to-one onto the indices `0..COUNT`, which the broker uses to address its
/// per-category subscriber sets.
pub trait Category: Copy + Eq + Hash + fmt::Debug + 'static {
    /// Number of categories in the set.
    const COUNT: usize;

    /// Dense index of this category, always `< COUNT`.
    fn index(self) -> usize;

    /// The category at `index`, or `None` if out of range.
    fn from_index(index: usize) -> Option<Self>;

    /// Human readable category name.
    fn name(self) -> &'static str;

    /// Payload schema of this category.
    fn fields(self) -> &'static [Field] {
        &[]
    }

    /// Iterate every category in index order.
    fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT).filter_map(Self::from_index)
    }
}

/// An event that can be dispatched by a [`Broker`](crate::Broker).
///
/// Events must be:
/// - `'static`: No borrowed data
/// - `Clone`: Queued and delayed events are owned copies
/// - `Debug`: For diagnostics and logging
pub trait Event: Clone + fmt::Debug + 'static {
    /// The category set this event type belongs to.
    type Category: Category;

    /// The category of this particular event.
    fn category(&self) -> Self::Category;

    /// Name of this event's category.
    fn name(&self) -> &'static str {
        self.category().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, rusty_events_macros::Event)]
    enum TestEvent {
        Start { at: f32, label: String },
        Cue(i32, Option<usize>),
        Stop,
    }

    #[test]
    fn test_derive_maps_variants_to_categories() {
        assert_eq!(
            TestEvent::Start {
                at: 0.5,
                label: "go".into()
            }
            .category(),
            TestEventCategory::Start
        );
        assert_eq!(TestEvent::Cue(3, None).category(), TestEventCategory::Cue);
        assert_eq!(TestEvent::Stop.category(), TestEventCategory::Stop);
    }

    #[test]
    fn test_derive_generates_dense_indices() {
        assert_eq!(TestEventCategory::COUNT, 3);
        for (index, category) in TestEventCategory::all().enumerate() {
            assert_eq!(category.index(), index);
            assert_eq!(TestEventCategory::from_index(index), Some(category));
        }
        assert_eq!(TestEventCategory::from_index(3), None);
    }

    #[test]
    fn test_derive_names() {
        assert_eq!(TestEventCategory::Start.name(), "Start");
        assert_eq!(TestEvent::Stop.name(), "Stop");
    }

    #[test]
    fn test_derive_records_field_schema() {
        assert_eq!(
            TestEventCategory::Start.fields(),
            &[Field::new("at", "f32"), Field::new("label", "String")]
        );
        assert_eq!(
            TestEventCategory::Cue.fields(),
            &[Field::new("0", "i32"), Field::new("1", "Option<usize>")]
        );
        assert!(TestEventCategory::Stop.fields().is_empty());
    }

    #[test]
    fn test_clone_is_independent() {
        // Given
        let original = TestEvent::Start {
            at: 1.0,
            label: "first".into(),
        };

        // When
        let mut copy = original.clone();
        if let TestEvent::Start { label, .. } = &mut copy {
            label.push_str("-changed");
        }

        // Then
        assert_eq!(
            original,
            TestEvent::Start {
                at: 1.0,
                label: "first".into()
            }
        );
        assert_ne!(original, copy);
    }

    #[test]
    fn test_field_display() {
        assert_eq!(Field::new("value", "f32").to_string(), "value: f32");
    }
}
