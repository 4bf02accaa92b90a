//! Read-only table view of a category set.
//!
//! The [`Registry`] lists every category of an event type together with its index and payload
//! schema. The broker does not need it; it exists for tooling such as command consoles that look
//! up categories by name, or for printing the event catalogue of an application.

use std::fmt;

use crate::event::{Category, Field};

/// One row of a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<C: Category> {
    pub category: C,
    pub index: usize,
    pub name: &'static str,
    pub fields: &'static [Field],
}

/// Ordered table of every category in `C`.
pub struct Registry<C: Category> {
    entries: Vec<Entry<C>>,
}

impl<C: Category> Registry<C> {
    /// Build the table for the category set `C`.
    pub fn new() -> Self {
        let entries = C::all()
            .map(|category| Entry {
                category,
                index: category.index(),
                name: category.name(),
                fields: category.fields(),
            })
            .collect();
        Self { entries }
    }

    /// Number of categories.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry<C>> {
        self.entries.iter()
    }

    /// Entry for a category.
    pub fn get(&self, category: C) -> Option<&Entry<C>> {
        self.entries.get(category.index())
    }

    /// Find a category by name, ignoring ASCII case.
    pub fn lookup(&self, name: &str) -> Option<C> {
        self.entries
            .iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| entry.category)
    }
}

impl<C: Category> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Category> fmt::Display for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            write!(f, "{:>3} {}", entry.index, entry.name)?;
            if !entry.fields.is_empty() {
                let fields: Vec<String> = entry.fields.iter().map(Field::to_string).collect();
                write!(f, " {{ {} }}", fields.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
