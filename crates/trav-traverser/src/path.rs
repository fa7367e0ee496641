//! Traverser path history
//!
//! A [`Path`] records every object a traverser visited together with the
//! labels of the step that produced it. Paths are owned by exactly one
//! traverser and copied on split.

use std::collections::BTreeSet;
use std::fmt;

/// Step labels attached to a path hop
pub type Labels = BTreeSet<String>;

/// One hop of a path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathEntry<T> {
    object: T,
    labels: Labels,
}

impl<T> PathEntry<T> {
    /// Object visited at this hop
    #[inline]
    #[must_use]
    pub fn object(&self) -> &T {
        &self.object
    }

    /// Labels of the step that produced the object
    #[inline]
    #[must_use]
    pub fn labels(&self) -> &Labels {
        &self.labels
    }
}

/// Ordered history of visited objects
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path<T> {
    entries: Vec<PathEntry<T>>,
}

impl<T> Default for Path<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Clone> Path<T> {
    /// Empty path
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Path holding a single start object
    #[must_use]
    pub fn start(object: T, labels: &Labels) -> Self {
        let mut path = Self::empty();
        path.extend(object, labels);
        path
    }

    /// Append a hop
    pub fn extend(&mut self, object: T, labels: &Labels) {
        self.entries.push(PathEntry {
            object,
            labels: labels.clone(),
        });
    }

    /// Add labels to the most recent hop
    pub fn label_head(&mut self, labels: &Labels) {
        if let Some(head) = self.entries.last_mut() {
            head.labels.extend(labels.iter().cloned());
        }
    }

    /// Number of hops
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check for an empty path
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent object
    #[must_use]
    pub fn head(&self) -> Option<&T> {
        self.entries.last().map(PathEntry::object)
    }

    /// Most recent object recorded under `label`
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&T> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.labels.contains(label))
            .map(PathEntry::object)
    }

    /// Check whether any hop carries `label`
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.entries.iter().any(|entry| entry.labels.contains(label))
    }

    /// Visited objects, oldest first
    pub fn objects(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(PathEntry::object)
    }

    /// Hops, oldest first
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[PathEntry<T>] {
        &self.entries
    }
}

impl<T: fmt::Debug> fmt::Display for Path<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("path[")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?}", entry.object)?;
        }
        f.write_str("]")
    }
}
