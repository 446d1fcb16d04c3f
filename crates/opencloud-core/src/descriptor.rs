//! Desired-state descriptors.
//!
//! A descriptor is built by the schema layer from already validated, typed
//! input. There is one struct per resource kind; [`ResourceDescriptor`]
//! wraps them so the lifecycle controller can stay kind-agnostic.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};
use crate::kind::ResourceKind;
use crate::observed::{ObservedDetails, ObservedState};
use crate::tags::TagSet;

const CONTAINER_FORMATS: &[&str] = &["ami", "ari", "aki", "bare", "ovf", "ova", "docker"];
const DISK_FORMATS: &[&str] = &[
    "ami", "ari", "aki", "vhd", "vmdk", "raw", "qcow2", "vdi", "iso",
];

/// Image visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
    Shared,
    Community,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Shared => "shared",
            Self::Community => "community",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            "shared" => Ok(Self::Shared),
            "community" => Ok(Self::Community),
            other => Err(ProviderError::validation(format!(
                "invalid visibility '{other}', expected public, private, shared or community"
            ))),
        }
    }
}

/// Desired state of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub name: String,
    /// URL the image data is imported from.
    pub source_url: Option<String>,
    pub container_format: String,
    pub disk_format: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub tags: TagSet,
    #[serde(default)]
    pub min_disk_gb: u64,
    #[serde(default)]
    pub min_ram_mb: u64,
    #[serde(default)]
    pub protected: bool,
}

impl ImageDescriptor {
    pub fn new(
        name: impl Into<String>,
        container_format: impl Into<String>,
        disk_format: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_url: None,
            container_format: container_format.into(),
            disk_format: disk_format.into(),
            visibility: Visibility::default(),
            tags: TagSet::new(),
            min_disk_gb: 0,
            min_ram_mb: 0,
            protected: false,
        }
    }

    #[must_use]
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }
}

/// Desired state of an orchestration stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDescriptor {
    pub name: String,
    /// JSON template document.
    pub template_body: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    pub timeout_mins: u32,
    #[serde(default)]
    pub disable_rollback: bool,
    #[serde(default)]
    pub tags: TagSet,
}

impl StackDescriptor {
    pub fn new(name: impl Into<String>, template_body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template_body: template_body.into(),
            parameters: BTreeMap::new(),
            timeout_mins: 60,
            disable_rollback: false,
            tags: TagSet::new(),
        }
    }
}

/// Desired state of a key management master key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDescriptor {
    pub alias: String,
    #[serde(default)]
    pub description: String,
    /// Waiting period before a scheduled deletion takes effect.
    pub pending_days: u32,
}

impl KeyDescriptor {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            description: String::new(),
            pending_days: 7,
        }
    }
}

/// Desired state of any supported resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceDescriptor {
    Image(ImageDescriptor),
    Stack(StackDescriptor),
    Key(KeyDescriptor),
}

/// A changed mutable scalar attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldChange {
    Name(String),
    Visibility(Visibility),
    Protected(bool),
    MinDiskGb(u64),
    MinRamMb(u64),
    Description(String),
}

impl FieldChange {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Visibility(_) => "visibility",
            Self::Protected(_) => "protected",
            Self::MinDiskGb(_) => "min_disk_gb",
            Self::MinRamMb(_) => "min_ram_mb",
            Self::Description(_) => "description",
        }
    }
}

impl ResourceDescriptor {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Image(_) => ResourceKind::Image,
            Self::Stack(_) => ResourceKind::Stack,
            Self::Key(_) => ResourceKind::Key,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Image(d) => &d.name,
            Self::Stack(d) => &d.name,
            Self::Key(d) => &d.alias,
        }
    }

    /// Desired tags. Keys carry none.
    pub fn tags(&self) -> TagSet {
        match self {
            Self::Image(d) => d.tags.clone(),
            Self::Stack(d) => d.tags.clone(),
            Self::Key(_) => TagSet::new(),
        }
    }

    /// Checks the descriptor before anything is sent.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.name().trim().is_empty() {
            return Err(ProviderError::validation(format!(
                "{} name must not be empty",
                self.kind()
            )));
        }
        match self {
            Self::Image(d) => {
                if !CONTAINER_FORMATS.contains(&d.container_format.as_str()) {
                    return Err(ProviderError::validation(format!(
                        "invalid container_format '{}', expected one of {CONTAINER_FORMATS:?}",
                        d.container_format
                    )));
                }
                if !DISK_FORMATS.contains(&d.disk_format.as_str()) {
                    return Err(ProviderError::validation(format!(
                        "invalid disk_format '{}', expected one of {DISK_FORMATS:?}",
                        d.disk_format
                    )));
                }
            }
            Self::Stack(d) => {
                if d.timeout_mins == 0 {
                    return Err(ProviderError::validation("stack timeout_mins must be > 0"));
                }
                let template: serde_json::Value = serde_json::from_str(&d.template_body)
                    .map_err(|e| {
                        ProviderError::validation(format!("template_body is not valid JSON: {e}"))
                    })?;
                if !template.is_object() {
                    return Err(ProviderError::validation(
                        "template_body must be a JSON object",
                    ));
                }
            }
            Self::Key(d) => {
                if !(7..=1096).contains(&d.pending_days) {
                    return Err(ProviderError::validation(format!(
                        "pending_days must be between 7 and 1096, got {}",
                        d.pending_days
                    )));
                }
            }
        }
        Ok(())
    }

    /// Computes the scalar attributes that differ from `observed`.
    ///
    /// Tags are not included; see [`crate::tags::diff`]. Differences in
    /// attributes the remote API cannot change in place are rejected with
    /// `ValidationFailed` since they require replacing the resource.
    pub fn field_changes(&self, observed: &ObservedState) -> ProviderResult<Vec<FieldChange>> {
        if self.kind() != observed.kind {
            return Err(ProviderError::validation(format!(
                "descriptor kind {} does not match observed {} {}",
                self.kind(),
                observed.kind,
                observed.id
            )));
        }

        let mut changes = Vec::new();
        if self.name() != observed.name {
            match self {
                Self::Stack(_) => return Err(requires_replacement("name")),
                _ => changes.push(FieldChange::Name(self.name().to_string())),
            }
        }

        match (self, &observed.details) {
            (Self::Image(d), ObservedDetails::Image(o)) => {
                if d.container_format != o.container_format {
                    return Err(requires_replacement("container_format"));
                }
                if d.disk_format != o.disk_format {
                    return Err(requires_replacement("disk_format"));
                }
                if observed.visibility != Some(d.visibility) {
                    changes.push(FieldChange::Visibility(d.visibility));
                }
                if d.protected != o.protected {
                    changes.push(FieldChange::Protected(d.protected));
                }
                if d.min_disk_gb != o.min_disk_gb {
                    changes.push(FieldChange::MinDiskGb(d.min_disk_gb));
                }
                if d.min_ram_mb != o.min_ram_mb {
                    changes.push(FieldChange::MinRamMb(d.min_ram_mb));
                }
            }
            (Self::Stack(d), ObservedDetails::Stack(o)) => {
                if d.template_body != o.template_body {
                    return Err(requires_replacement("template_body"));
                }
                if d.parameters != o.parameters {
                    return Err(requires_replacement("parameters"));
                }
                if d.timeout_mins != o.timeout_mins {
                    return Err(requires_replacement("timeout_mins"));
                }
                if d.disable_rollback != o.disable_rollback {
                    return Err(requires_replacement("disable_rollback"));
                }
            }
            (Self::Key(d), ObservedDetails::Key(o)) => {
                if d.description != o.description {
                    changes.push(FieldChange::Description(d.description.clone()));
                }
            }
            _ => {
                return Err(ProviderError::validation(format!(
                    "observed {} {} carries details of another kind",
                    observed.kind, observed.id
                )));
            }
        }

        Ok(changes)
    }
}

fn requires_replacement(field: &str) -> ProviderError {
    ProviderError::validation(format!(
        "{field} cannot be changed in place; the resource must be replaced"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observed::ImageDetails;

    fn cirros() -> ImageDescriptor {
        ImageDescriptor::new("CirrOS-tf_1", "bare", "qcow2")
            .with_source_url("http://download.cirros-cloud.net/0.3.5/cirros-0.3.5-x86_64-disk.img")
    }

    fn observed_for(desc: &ImageDescriptor) -> ObservedState {
        ObservedState::new("img-1", ResourceKind::Image, &desc.name, "active")
            .with_visibility(desc.visibility)
            .with_tags(desc.tags.clone())
            .with_details(ObservedDetails::Image(ImageDetails {
                container_format: desc.container_format.clone(),
                disk_format: desc.disk_format.clone(),
                min_disk_gb: desc.min_disk_gb,
                min_ram_mb: desc.min_ram_mb,
                protected: desc.protected,
                ..ImageDetails::default()
            }))
    }

    #[test]
    fn test_validate_image_formats() {
        assert!(ResourceDescriptor::Image(cirros()).validate().is_ok());

        let bad = ImageDescriptor::new("x", "bare", "qcow3");
        let err = ResourceDescriptor::Image(bad).validate().unwrap_err();
        assert!(err.to_string().contains("disk_format"));

        let unnamed = ImageDescriptor::new("  ", "bare", "raw");
        assert!(ResourceDescriptor::Image(unnamed).validate().is_err());
    }

    #[test]
    fn test_validate_stack_template() {
        let stack = StackDescriptor::new("rts_stack", r#"{"heat_template_version": "2013-05-23"}"#);
        assert!(ResourceDescriptor::Stack(stack.clone()).validate().is_ok());

        let not_json = StackDescriptor::new("rts_stack", "resources: {}");
        assert!(ResourceDescriptor::Stack(not_json).validate().is_err());

        let zero = StackDescriptor {
            timeout_mins: 0,
            ..stack
        };
        assert!(ResourceDescriptor::Stack(zero).validate().is_err());
    }

    #[test]
    fn test_validate_key_pending_days() {
        let mut key = KeyDescriptor::new("key_alias_abcde");
        assert!(ResourceDescriptor::Key(key.clone()).validate().is_ok());
        key.pending_days = 3;
        assert!(ResourceDescriptor::Key(key).validate().is_err());
    }

    #[test]
    fn test_field_changes_identical_is_empty() {
        let desc = cirros();
        let observed = observed_for(&desc);
        let changes = ResourceDescriptor::Image(desc)
            .field_changes(&observed)
            .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_field_changes_name_and_visibility() {
        let desc = cirros();
        let observed = observed_for(&desc);
        let renamed = ImageDescriptor {
            name: "TerraformAccTest Rancher".to_string(),
            visibility: Visibility::Public,
            ..desc
        };
        let changes = ResourceDescriptor::Image(renamed)
            .field_changes(&observed)
            .unwrap();
        assert_eq!(
            changes,
            vec![
                FieldChange::Name("TerraformAccTest Rancher".to_string()),
                FieldChange::Visibility(Visibility::Public),
            ]
        );
    }

    #[test]
    fn test_field_changes_rejects_immutable_format() {
        let desc = cirros();
        let observed = observed_for(&desc);
        let raw = ImageDescriptor {
            disk_format: "raw".to_string(),
            ..desc
        };
        let err = ResourceDescriptor::Image(raw)
            .field_changes(&observed)
            .unwrap_err();
        assert!(matches!(err, ProviderError::ValidationFailed { .. }));
    }

    #[test]
    fn test_field_changes_rejects_kind_mismatch() {
        let observed = ObservedState::new("s1", ResourceKind::Stack, "CirrOS-tf_1", "CREATE_COMPLETE");
        assert!(
            ResourceDescriptor::Image(cirros())
                .field_changes(&observed)
                .is_err()
        );
    }

    #[test]
    fn test_visibility_from_str() {
        assert_eq!("private".parse::<Visibility>().unwrap(), Visibility::Private);
        assert!("Private".parse::<Visibility>().is_err());
    }
}
