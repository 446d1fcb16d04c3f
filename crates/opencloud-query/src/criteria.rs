//! Query criteria.

use opencloud_client::ListHints;
use opencloud_core::{ProviderError, ProviderResult, Visibility};
use serde::{Deserialize, Serialize};

/// Criteria a candidate must satisfy to be selected.
///
/// Every field is optional; an unset field does not constrain the result.
/// Criteria are immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    name: Option<String>,
    visibility: Option<Visibility>,
    tag: Option<String>,
    size_min: Option<u64>,
    size_max: Option<u64>,
    #[serde(default)]
    most_recent: bool,
}

impl FilterCriteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact, case-sensitive name match.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Candidate must carry this tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Inclusive lower size bound in bytes.
    #[must_use]
    pub fn with_size_min(mut self, size_min: u64) -> Self {
        self.size_min = Some(size_min);
        self
    }

    /// Inclusive upper size bound in bytes.
    #[must_use]
    pub fn with_size_max(mut self, size_max: u64) -> Self {
        self.size_max = Some(size_max);
        self
    }

    /// Resolve several survivors to the most recently created one.
    #[must_use]
    pub fn with_most_recent(mut self, most_recent: bool) -> Self {
        self.most_recent = most_recent;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn visibility(&self) -> Option<Visibility> {
        self.visibility
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn size_min(&self) -> Option<u64> {
        self.size_min
    }

    pub fn size_max(&self) -> Option<u64> {
        self.size_max
    }

    pub fn most_recent(&self) -> bool {
        self.most_recent
    }

    /// Checks that the size bounds describe a non-empty range.
    pub fn validate(&self) -> ProviderResult<()> {
        if let (Some(min), Some(max)) = (self.size_min, self.size_max)
            && min > max
        {
            return Err(ProviderError::validation(format!(
                "size_min ({min}) must not exceed size_max ({max})"
            )));
        }
        Ok(())
    }

    /// Server-side pre-filters derived from these criteria.
    ///
    /// Size bounds and disambiguation are always applied client-side.
    pub fn list_hints(&self) -> ListHints {
        ListHints {
            name: self.name.clone(),
            visibility: self.visibility,
            tag: self.tag.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_size_range_is_rejected() {
        let criteria = FilterCriteria::new()
            .with_size_min(23_000_000)
            .with_size_max(13_000_000);
        let err = criteria.validate().unwrap_err();
        assert!(matches!(err, ProviderError::ValidationFailed { .. }));
    }

    #[test]
    fn test_equal_bounds_are_valid() {
        let criteria = FilterCriteria::new().with_size_min(10).with_size_max(10);
        assert!(criteria.validate().is_ok());
    }

    #[test]
    fn test_list_hints_skip_size() {
        let criteria = FilterCriteria::new()
            .with_name("CirrOS-tf_1")
            .with_visibility(Visibility::Private)
            .with_size_min(1);
        let hints = criteria.list_hints();
        assert_eq!(hints.name.as_deref(), Some("CirrOS-tf_1"));
        assert_eq!(hints.visibility, Some(Visibility::Private));
        assert_eq!(hints.tag, None);
    }
}
