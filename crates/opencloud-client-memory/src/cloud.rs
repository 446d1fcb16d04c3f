use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use opencloud_client::{CloudClient, CreateAccepted, DataKey, ListHints};
use opencloud_core::{
    ClientError, FieldChange, ImageDetails, KeyDetails, ObservedDetails, ObservedState,
    ResourceDescriptor, ResourceKind, ResourceStatus, StackDetails, StackResource, TagDelta,
    generate_id,
};
use papaya::HashMap as PapayaHashMap;
use time::OffsetDateTime;
use tracing::debug;

use crate::script::StatusScript;

/// Size reported for images created through this backend (CirrOS 0.3.5).
pub const DEFAULT_IMAGE_SIZE: u64 = 13_267_968;

type ObjectKey = String; // Format: "kind/id"

fn make_object_key(kind: ResourceKind, id: &str) -> ObjectKey {
    format!("{kind}/{id}")
}

/// The remote operations, used to count calls and inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientOperation {
    Create,
    Get,
    List,
    UpdateTags,
    UpdateFields,
    Delete,
    CreateDataKey,
}

impl ClientOperation {
    const ALL: [ClientOperation; 7] = [
        Self::Create,
        Self::Get,
        Self::List,
        Self::UpdateTags,
        Self::UpdateFields,
        Self::Delete,
        Self::CreateDataKey,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    state: ObservedState,
    pending: VecDeque<ResourceStatus>,
    vanish: bool,
    gone: bool,
}

impl StoredObject {
    fn settled(state: ObservedState) -> Self {
        Self {
            state,
            pending: VecDeque::new(),
            vanish: false,
            gone: false,
        }
    }

    /// Moves one step along the armed script.
    fn advanced(&self) -> Self {
        let mut next = self.clone();
        if let Some(status) = next.pending.pop_front() {
            next.state.status = status;
            next.state.updated_at = OffsetDateTime::now_utc();
        } else if next.vanish {
            next.gone = true;
        }
        next
    }

    /// Arms `script`, returning the object carrying the script's first status.
    fn armed(&self, script: &StatusScript) -> Self {
        let mut next = self.clone();
        let mut statuses: VecDeque<ResourceStatus> = script.statuses.iter().cloned().collect();
        if let Some(first) = statuses.pop_front() {
            next.state.status = first;
        }
        next.pending = statuses;
        next.vanish = script.vanish;
        next
    }
}

/// An in-memory cloud API.
///
/// Objects live in a papaya lock-free map. Create and delete calls arm a
/// [`StatusScript`] so asynchronous transitions can be simulated without
/// any background work. Every call is counted, and a failure can be armed
/// for the next call of a given operation.
#[derive(Debug)]
pub struct InMemoryCloud {
    objects: PapayaHashMap<ObjectKey, StoredObject>,
    create_scripts: PapayaHashMap<ResourceKind, StatusScript>,
    delete_scripts: PapayaHashMap<ResourceKind, StatusScript>,
    failures: PapayaHashMap<ClientOperation, ClientError>,
    calls: [AtomicU64; 7],
    image_size: AtomicU64,
}

impl Default for InMemoryCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCloud {
    /// Creates an empty cloud with the default status scripts.
    pub fn new() -> Self {
        Self {
            objects: PapayaHashMap::new(),
            create_scripts: PapayaHashMap::new(),
            delete_scripts: PapayaHashMap::new(),
            failures: PapayaHashMap::new(),
            calls: Default::default(),
            image_size: AtomicU64::new(DEFAULT_IMAGE_SIZE),
        }
    }

    /// Overrides the create progression for a kind.
    pub fn with_create_script(self, kind: ResourceKind, script: StatusScript) -> Self {
        self.create_scripts.pin().insert(kind, script);
        self
    }

    /// Overrides the delete progression for a kind.
    pub fn with_delete_script(self, kind: ResourceKind, script: StatusScript) -> Self {
        self.delete_scripts.pin().insert(kind, script);
        self
    }

    /// Sets the size reported for images created from now on.
    pub fn with_image_size(self, size_bytes: u64) -> Self {
        self.image_size.store(size_bytes, Ordering::SeqCst);
        self
    }

    /// Seeds an existing object, as if created out of band.
    pub fn insert(&self, state: ObservedState) {
        let key = make_object_key(state.kind, &state.id);
        self.objects.pin().insert(key, StoredObject::settled(state));
    }

    /// Queues statuses the object reports on its next `get` calls.
    ///
    /// Returns `false` if the object does not exist.
    pub fn queue_statuses<I, S>(&self, kind: ResourceKind, id: &str, statuses: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<ResourceStatus>,
    {
        let queued: Vec<ResourceStatus> = statuses.into_iter().map(Into::into).collect();
        let guard = self.objects.pin();
        guard
            .update(make_object_key(kind, id), |object| {
                let mut next = object.clone();
                next.pending.extend(queued.iter().cloned());
                next
            })
            .is_some()
    }

    /// Makes the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: ClientOperation, error: ClientError) {
        self.failures.pin().insert(operation, error);
    }

    /// Number of calls made for one operation.
    pub fn calls(&self, operation: ClientOperation) -> u64 {
        self.calls[operation.index()].load(Ordering::SeqCst)
    }

    /// Number of calls that mutate remote state.
    pub fn mutating_calls(&self) -> u64 {
        [
            ClientOperation::Create,
            ClientOperation::UpdateTags,
            ClientOperation::UpdateFields,
            ClientOperation::Delete,
        ]
        .into_iter()
        .map(|op| self.calls(op))
        .sum()
    }

    /// Number of calls of any operation.
    pub fn total_calls(&self) -> u64 {
        ClientOperation::ALL.into_iter().map(|op| self.calls(op)).sum()
    }

    /// Returns `true` if an object with this id is present.
    pub fn contains(&self, kind: ResourceKind, id: &str) -> bool {
        self.objects.pin().get(&make_object_key(kind, id)).is_some()
    }

    /// Counts the call and returns the armed failure, if any.
    fn enter(&self, operation: ClientOperation) -> Result<(), ClientError> {
        self.calls[operation.index()].fetch_add(1, Ordering::SeqCst);
        match self.failures.pin().remove(&operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn create_script(&self, kind: ResourceKind) -> StatusScript {
        self.create_scripts
            .pin()
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| StatusScript::default_create(kind))
    }

    fn delete_script(&self, kind: ResourceKind) -> StatusScript {
        self.delete_scripts
            .pin()
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| StatusScript::default_delete(kind))
    }

    fn build_state(&self, id: &str, descriptor: &ResourceDescriptor) -> ObservedState {
        let kind = descriptor.kind();
        let base = ObservedState::new(id, kind, descriptor.name(), "").with_tags(descriptor.tags());
        match descriptor {
            ResourceDescriptor::Image(d) => base
                .with_visibility(d.visibility)
                .with_size(self.image_size.load(Ordering::SeqCst))
                .with_details(ObservedDetails::Image(ImageDetails {
                    container_format: d.container_format.clone(),
                    disk_format: d.disk_format.clone(),
                    min_disk_gb: d.min_disk_gb,
                    min_ram_mb: d.min_ram_mb,
                    protected: d.protected,
                    checksum: None,
                    file: Some(format!("/v2/images/{id}/file")),
                    schema: Some("/v2/schemas/image".to_string()),
                    owner: None,
                })),
            ResourceDescriptor::Stack(d) => base.with_details(ObservedDetails::Stack(StackDetails {
                template_body: d.template_body.clone(),
                parameters: d.parameters.clone(),
                timeout_mins: d.timeout_mins,
                disable_rollback: d.disable_rollback,
                status_reason: None,
                resources: template_resources(&d.template_body),
            })),
            ResourceDescriptor::Key(d) => base.with_details(ObservedDetails::Key(KeyDetails {
                description: d.description.clone(),
                realm: None,
            })),
        }
    }
}

/// Derives the stack resources a template declares.
fn template_resources(template_body: &str) -> Vec<StackResource> {
    let Ok(template) = serde_json::from_str::<serde_json::Value>(template_body) else {
        return Vec::new();
    };
    let Some(resources) = template.get("resources").and_then(|r| r.as_object()) else {
        return Vec::new();
    };
    resources
        .iter()
        .map(|(name, definition)| StackResource {
            resource_name: name.clone(),
            physical_resource_id: generate_id(),
            resource_type: definition
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or_default()
                .to_string(),
            resource_status: "CREATE_COMPLETE".to_string(),
            status_reason: Some("state changed".to_string()),
            required_by: Vec::new(),
        })
        .collect()
}

fn matches_hints(state: &ObservedState, hints: &ListHints) -> bool {
    hints.name.as_ref().is_none_or(|name| &state.name == name)
        && hints
            .visibility
            .is_none_or(|visibility| state.visibility == Some(visibility))
        && hints.tag.as_ref().is_none_or(|tag| state.tags.contains(tag))
}

fn hex_material(bits: u32) -> String {
    let chars = (bits / 4) as usize;
    let mut out = String::with_capacity(chars + 32);
    while out.len() < chars {
        out.push_str(&uuid::Uuid::new_v4().simple().to_string());
    }
    out.truncate(chars);
    out
}

#[async_trait]
impl CloudClient for InMemoryCloud {
    async fn create(&self, descriptor: &ResourceDescriptor) -> Result<CreateAccepted, ClientError> {
        self.enter(ClientOperation::Create)?;
        let kind = descriptor.kind();
        let id = generate_id();
        let object = StoredObject::settled(self.build_state(&id, descriptor))
            .armed(&self.create_script(kind));
        let status = object.state.status.clone();
        self.objects
            .pin()
            .insert(make_object_key(kind, &id), object);
        debug!(kind = %kind, id = %id, status = %status, "In-memory create accepted");
        Ok(CreateAccepted::new(id, status))
    }

    async fn get(&self, kind: ResourceKind, id: &str) -> Result<ObservedState, ClientError> {
        self.enter(ClientOperation::Get)?;
        let key = make_object_key(kind, id);
        let guard = self.objects.pin();
        let object = guard
            .update(key.clone(), StoredObject::advanced)
            .ok_or_else(|| ClientError::not_found(kind, id))?;
        if object.gone {
            guard.remove(&key);
            return Err(ClientError::not_found(kind, id));
        }
        Ok(object.state.clone())
    }

    async fn list(
        &self,
        kind: ResourceKind,
        hints: &ListHints,
    ) -> Result<Vec<ObservedState>, ClientError> {
        self.enter(ClientOperation::List)?;
        let guard = self.objects.pin();
        let mut found: Vec<ObservedState> = guard
            .iter()
            .map(|(_, object)| object)
            .filter(|object| !object.gone && object.state.kind == kind)
            .filter(|object| matches_hints(&object.state, hints))
            .map(|object| object.state.clone())
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn update_tags(
        &self,
        kind: ResourceKind,
        id: &str,
        delta: &TagDelta,
    ) -> Result<(), ClientError> {
        self.enter(ClientOperation::UpdateTags)?;
        let guard = self.objects.pin();
        guard
            .update(make_object_key(kind, id), |object| {
                let mut next = object.clone();
                next.state.tags = delta.apply(&object.state.tags);
                next.state.updated_at = OffsetDateTime::now_utc();
                next
            })
            .map(|_| ())
            .ok_or_else(|| ClientError::not_found(kind, id))
    }

    async fn update_fields(
        &self,
        kind: ResourceKind,
        id: &str,
        changes: &[FieldChange],
    ) -> Result<(), ClientError> {
        self.enter(ClientOperation::UpdateFields)?;
        let guard = self.objects.pin();
        guard
            .update(make_object_key(kind, id), |object| {
                let mut next = object.clone();
                for change in changes {
                    apply_change(&mut next.state, change);
                }
                next.state.updated_at = OffsetDateTime::now_utc();
                next
            })
            .map(|_| ())
            .ok_or_else(|| ClientError::not_found(kind, id))
    }

    async fn delete(&self, kind: ResourceKind, id: &str) -> Result<ResourceStatus, ClientError> {
        self.enter(ClientOperation::Delete)?;
        let key = make_object_key(kind, id);
        let guard = self.objects.pin();
        let script = self.delete_script(kind);
        if script.statuses.is_empty() {
            return guard
                .remove(&key)
                .map(|_| ResourceStatus::new("deleted"))
                .ok_or_else(|| ClientError::not_found(kind, id));
        }
        let object = guard
            .update(key, |object| object.armed(&script))
            .ok_or_else(|| ClientError::not_found(kind, id))?;
        debug!(kind = %kind, id = %id, status = %object.state.status, "In-memory delete accepted");
        Ok(object.state.status.clone())
    }

    async fn create_data_key(&self, key_id: &str, length_bits: u32) -> Result<DataKey, ClientError> {
        self.enter(ClientOperation::CreateDataKey)?;
        let guard = self.objects.pin();
        let key = guard
            .get(&make_object_key(ResourceKind::Key, key_id))
            .filter(|object| !object.gone)
            .ok_or_else(|| ClientError::not_found(ResourceKind::Key, key_id))?;
        if key.state.status.as_str() != "enabled" {
            return Err(ClientError::rejected(format!(
                "key {key_id} is {} and cannot issue data keys",
                key.state.status
            )));
        }
        Ok(DataKey {
            key_id: key_id.to_string(),
            plain_text: hex_material(length_bits),
            cipher_text: hex_material(length_bits + 256),
        })
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}

fn apply_change(state: &mut ObservedState, change: &FieldChange) {
    match (change, &mut state.details) {
        (FieldChange::Name(name), _) => state.name = name.clone(),
        (FieldChange::Visibility(visibility), _) => state.visibility = Some(*visibility),
        (FieldChange::Protected(protected), ObservedDetails::Image(image)) => {
            image.protected = *protected
        }
        (FieldChange::MinDiskGb(gb), ObservedDetails::Image(image)) => image.min_disk_gb = *gb,
        (FieldChange::MinRamMb(mb), ObservedDetails::Image(image)) => image.min_ram_mb = *mb,
        (FieldChange::Description(description), ObservedDetails::Key(key)) => {
            key.description = description.clone()
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use opencloud_client::DynClient;
    use opencloud_core::{ImageDescriptor, TagSet, diff_tags};

    fn image() -> ResourceDescriptor {
        ResourceDescriptor::Image(ImageDescriptor::new("CirrOS-tf_1", "bare", "qcow2"))
    }

    #[tokio::test]
    async fn test_create_walks_the_script() {
        let cloud = InMemoryCloud::new();
        let accepted = cloud.create(&image()).await.unwrap();
        assert_eq!(accepted.status.as_str(), "queued");

        let first = cloud.get(ResourceKind::Image, &accepted.id).await.unwrap();
        assert_eq!(first.status.as_str(), "saving");
        let second = cloud.get(ResourceKind::Image, &accepted.id).await.unwrap();
        assert_eq!(second.status.as_str(), "active");
        let settled = cloud.get(ResourceKind::Image, &accepted.id).await.unwrap();
        assert_eq!(settled.status.as_str(), "active");
        assert_eq!(settled.size_bytes, Some(DEFAULT_IMAGE_SIZE));
        assert_eq!(cloud.calls(ClientOperation::Get), 3);
    }

    #[tokio::test]
    async fn test_vanishing_delete() {
        let cloud = InMemoryCloud::new();
        let template = r#"{"resources": {"random": {"type": "OS::Heat::RandomString"}}}"#;
        let stack = ResourceDescriptor::Stack(opencloud_core::StackDescriptor::new(
            "rts_stack",
            template,
        ));
        let accepted = cloud.create(&stack).await.unwrap();
        let observed = cloud.get(ResourceKind::Stack, &accepted.id).await.unwrap();
        let resources = &observed.stack().unwrap().resources;
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].resource_type, "OS::Heat::RandomString");

        let status = cloud.delete(ResourceKind::Stack, &accepted.id).await.unwrap();
        assert_eq!(status.as_str(), "DELETE_IN_PROGRESS");
        assert!(cloud.get(ResourceKind::Stack, &accepted.id).await.is_ok());
        let err = cloud.get(ResourceKind::Stack, &accepted.id).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!cloud.contains(ResourceKind::Stack, &accepted.id));
    }

    #[tokio::test]
    async fn test_fail_next_is_consumed_once() {
        let cloud = InMemoryCloud::new();
        cloud.fail_next(ClientOperation::Create, ClientError::transport("connection reset"));
        assert!(cloud.create(&image()).await.is_err());
        assert!(cloud.create(&image()).await.is_ok());
        assert_eq!(cloud.calls(ClientOperation::Create), 2);
    }

    #[tokio::test]
    async fn test_update_tags_applies_delta() {
        let cloud = InMemoryCloud::new();
        let seeded = ObservedState::new("img-1", ResourceKind::Image, "cirros", "active")
            .with_tags(["foo", "bar"].into_iter().collect());
        cloud.insert(seeded);

        let desired: TagSet = ["foo", "baz"].into_iter().collect();
        let current = cloud.get(ResourceKind::Image, "img-1").await.unwrap();
        let delta = diff_tags(&desired, &current.tags);
        cloud
            .update_tags(ResourceKind::Image, "img-1", &delta)
            .await
            .unwrap();

        let updated = cloud.get(ResourceKind::Image, "img-1").await.unwrap();
        assert_eq!(updated.tags, desired);
    }

    #[tokio::test]
    async fn test_data_key_requires_enabled_key() {
        let cloud = InMemoryCloud::new();
        cloud.insert(ObservedState::new("k1", ResourceKind::Key, "alias", "disabled"));
        let err = cloud.create_data_key("k1", 512).await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected { .. }));

        cloud.insert(ObservedState::new("k2", ResourceKind::Key, "alias2", "enabled"));
        let key = cloud.create_data_key("k2", 512).await.unwrap();
        assert_eq!(key.plain_text.len(), 128);
    }

    #[tokio::test]
    async fn test_queued_statuses_are_reported_in_order() {
        let cloud = InMemoryCloud::new();
        cloud.insert(ObservedState::new("img-1", ResourceKind::Image, "cirros", "active"));
        assert!(cloud.queue_statuses(ResourceKind::Image, "img-1", ["saving", "killed"]));
        assert!(!cloud.queue_statuses(ResourceKind::Image, "missing", ["saving"]));

        let mut seen = Vec::new();
        for _ in 0..3 {
            let observed = cloud.get(ResourceKind::Image, "img-1").await.unwrap();
            seen.push(observed.status.to_string());
        }
        assert_eq!(seen, ["saving", "killed", "killed"]);
        assert_eq!(cloud.mutating_calls(), 0);
    }

    #[tokio::test]
    async fn test_image_size_override_and_mutating_calls() {
        let client: DynClient = Arc::new(InMemoryCloud::new().with_image_size(25_000_000));
        let accepted = client.create(&image()).await.unwrap();
        let observed = client.get(ResourceKind::Image, &accepted.id).await.unwrap();
        assert_eq!(observed.size_bytes, Some(25_000_000));
        assert_eq!(client.backend_name(), "in-memory");

        let cloud = InMemoryCloud::new();
        let accepted = cloud.create(&image()).await.unwrap();
        let _ = cloud.get(ResourceKind::Image, &accepted.id).await.unwrap();
        let _ = cloud.list(ResourceKind::Image, &ListHints::new()).await.unwrap();
        cloud.delete(ResourceKind::Image, &accepted.id).await.unwrap();
        assert_eq!(cloud.mutating_calls(), 2);
        assert_eq!(cloud.total_calls(), 4);
    }
}
