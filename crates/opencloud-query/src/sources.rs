//! Read-only data sources.
//!
//! Each lookup lists or reads remote objects through the [`CloudClient`] and
//! resolves them to exactly one result. No remote state is modified.

use opencloud_client::{CloudClient, DataKey, ListHints};
use opencloud_core::{
    ObservedState, ProviderError, ProviderResult, ResourceKind, StackResource,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::criteria::FilterCriteria;
use crate::select::select;

/// Status a master key must report before it can issue data keys.
const KEY_ENABLED: &str = "enabled";

/// Allowed data key lengths in bits.
pub const DATA_KEY_MIN_BITS: u32 = 8;
pub const DATA_KEY_MAX_BITS: u32 = 1024;

/// A stack resource together with the stack it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackResourceMatch {
    pub stack_id: String,
    pub stack_name: String,
    pub resource: StackResource,
}

/// Finds the single image matching `criteria`.
pub async fn lookup_image(
    client: &dyn CloudClient,
    criteria: &FilterCriteria,
) -> ProviderResult<ObservedState> {
    criteria.validate()?;
    let candidates = client
        .list(ResourceKind::Image, &criteria.list_hints())
        .await?;
    let image = select(&candidates, criteria)?;
    info!(id = %image.id, name = %image.name, "Image lookup resolved");
    Ok(image)
}

/// Finds a named resource inside the most recent stack called `stack_name`.
pub async fn lookup_stack_resource(
    client: &dyn CloudClient,
    stack_name: &str,
    resource_name: &str,
) -> ProviderResult<StackResourceMatch> {
    let criteria = FilterCriteria::new()
        .with_name(stack_name)
        .with_most_recent(true);
    let stacks = client
        .list(ResourceKind::Stack, &ListHints::new().with_name(stack_name))
        .await?;
    let stack = select(&stacks, &criteria)?;

    let resources = stack
        .stack()
        .map(|details| details.resources.as_slice())
        .unwrap_or_default();
    let mut matching = resources
        .iter()
        .filter(|resource| resource.resource_name == resource_name);

    match (matching.next(), matching.next()) {
        (None, _) => Err(ProviderError::NoMatch {
            candidates: resources.len(),
        }),
        (Some(resource), None) => {
            debug!(
                stack_id = %stack.id,
                resource_name,
                resource_type = %resource.resource_type,
                "Stack resource lookup resolved"
            );
            Ok(StackResourceMatch {
                stack_id: stack.id.clone(),
                stack_name: stack.name.clone(),
                resource: resource.clone(),
            })
        }
        (Some(_), Some(_)) => Err(ProviderError::AmbiguousResult {
            count: 2 + matching.count(),
        }),
    }
}

/// Issues a data key under the master key `key_id`.
///
/// # Errors
///
/// - `ValidationFailed` if `length_bits` is not a multiple of 8 within
///   8..=1024.
/// - `NotFound` if the master key does not exist.
/// - `OperationFailed` if the master key is not enabled.
pub async fn lookup_data_key(
    client: &dyn CloudClient,
    key_id: &str,
    length_bits: u32,
) -> ProviderResult<DataKey> {
    if !(DATA_KEY_MIN_BITS..=DATA_KEY_MAX_BITS).contains(&length_bits) || length_bits % 8 != 0 {
        return Err(ProviderError::validation(format!(
            "datakey_length must be a multiple of 8 between {DATA_KEY_MIN_BITS} and {DATA_KEY_MAX_BITS}, got {length_bits}"
        )));
    }

    let key = client
        .get(ResourceKind::Key, key_id)
        .await
        .map_err(ProviderError::from_read)?;
    if key.status.as_str() != KEY_ENABLED {
        return Err(ProviderError::operation_failed(
            ResourceKind::Key,
            key_id,
            key.status.as_str(),
            "master key must be enabled to issue data keys",
        ));
    }

    Ok(client.create_data_key(key_id, length_bits).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencloud_client_memory::InMemoryCloud;

    #[test]
    fn test_data_key_length_bounds() {
        let cloud = InMemoryCloud::new();
        cloud.insert(ObservedState::new("k", ResourceKind::Key, "alias", KEY_ENABLED));

        for bits in [DATA_KEY_MIN_BITS, 256, DATA_KEY_MAX_BITS] {
            let key = tokio_test::block_on(lookup_data_key(&cloud, "k", bits)).unwrap();
            assert_eq!(key.plain_text.len() as u32, bits / 4);
        }
        let err = tokio_test::block_on(lookup_data_key(&cloud, "k", 12)).unwrap_err();
        assert!(matches!(err, ProviderError::ValidationFailed { .. }));
    }

    #[test]
    fn test_stack_without_resources() {
        let cloud = InMemoryCloud::new();
        cloud.insert(ObservedState::new(
            "s-1",
            ResourceKind::Stack,
            "empty",
            "CREATE_COMPLETE",
        ));
        let err = tokio_test::block_on(lookup_stack_resource(&cloud, "empty", "random"))
            .unwrap_err();
        assert!(matches!(err, ProviderError::NoMatch { candidates: 0 }));
    }
}
