//! Tag sets and the tag reconciler.
//!
//! Tags are an unordered set of strings. The remote API may return them in
//! any order and may apply additions in any order, so everything here is
//! expressed with sets rather than sequences.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An unordered set of tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Inserts a tag, returning `false` if it was already present.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        self.0.insert(tag.into())
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        self.0.remove(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the tags in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Tags present in `self` but not in `other`.
    #[must_use]
    pub fn difference(&self, other: &TagSet) -> TagSet {
        TagSet(self.0.difference(&other.0).cloned().collect())
    }

    pub fn is_disjoint(&self, other: &TagSet) -> bool {
        self.0.is_disjoint(&other.0)
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        TagSet(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The minimal add/remove operations that turn an observed tag set into the
/// desired one.
///
/// `to_add` and `to_remove` are always disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDelta {
    pub to_add: TagSet,
    pub to_remove: TagSet,
}

impl TagDelta {
    /// Returns `true` when no tag operation is needed.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Applies the delta to `observed`: removals first, then additions.
    #[must_use]
    pub fn apply(&self, observed: &TagSet) -> TagSet {
        let mut result = observed.difference(&self.to_remove);
        for tag in self.to_add.iter() {
            result.insert(tag);
        }
        result
    }
}

/// Computes the tag delta between desired and observed tags.
///
/// `to_add = desired - observed`, `to_remove = observed - desired`.
pub fn diff(desired: &TagSet, observed: &TagSet) -> TagDelta {
    TagDelta {
        to_add: desired.difference(observed),
        to_remove: observed.difference(desired),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> TagSet {
        items.iter().copied().collect()
    }

    #[test]
    fn test_diff_adds_and_removes() {
        let delta = diff(&tags(&["foo", "baz"]), &tags(&["foo", "bar", "baz"]));
        assert_eq!(delta.to_add, TagSet::new());
        assert_eq!(delta.to_remove, tags(&["bar"]));

        let delta = diff(&tags(&["foo", "bar", "baz"]), &tags(&["foo", "bar"]));
        assert_eq!(delta.to_add, tags(&["baz"]));
        assert!(delta.to_remove.is_empty());
    }

    #[test]
    fn test_diff_empty_desired_removes_everything() {
        let observed = tags(&["a", "b"]);
        let delta = diff(&TagSet::new(), &observed);
        assert_eq!(delta.to_remove, observed);
        assert!(delta.to_add.is_empty());

        let delta = diff(&observed, &TagSet::new());
        assert_eq!(delta.to_add, observed);
        assert!(delta.to_remove.is_empty());
    }

    #[test]
    fn test_diff_equal_sets_is_empty() {
        let delta = diff(&tags(&["x", "y"]), &tags(&["y", "x"]));
        assert!(delta.is_empty());
    }

    #[test]
    fn test_diff_is_order_independent() {
        let a = diff(&tags(&["c", "a", "b"]), &tags(&["d", "a"]));
        let b = diff(&tags(&["b", "c", "a"]), &tags(&["a", "d"]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_diff_properties_over_many_sets() {
        let universe = ["alpha", "beta", "gamma", "delta", "eps"];
        // Every pair of subsets of a five element universe.
        for d_mask in 0u32..32 {
            for o_mask in 0u32..32 {
                let pick = |mask: u32| -> TagSet {
                    universe
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| mask & (1 << i) != 0)
                        .map(|(_, t)| *t)
                        .collect()
                };
                let desired = pick(d_mask);
                let observed = pick(o_mask);
                let delta = diff(&desired, &observed);

                assert_eq!(delta.to_add, desired.difference(&observed));
                assert_eq!(delta.to_remove, observed.difference(&desired));
                assert!(delta.to_add.is_disjoint(&delta.to_remove));
                assert_eq!(delta.apply(&observed), desired);
            }
        }
    }
}
