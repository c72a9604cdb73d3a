//! Resource entity and its sparse request shapes.
//!
//! # Responsibility
//! - Define the persisted `Resource` record.
//! - Define the create input, the find-filter and the update-patch.
//!
//! # Invariants
//! - Every optional request field distinguishes "absent" (`None`) from a
//!   supplied value, including a supplied empty string.
//! - `blob` on a read result is `None` unless the payload was requested
//!   and stored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage-assigned primary key of a resource.
pub type ResourceId = i32;
/// Id of the owning user (external entity).
pub type UserId = i32;
/// Id of the note a resource is attached to (external entity).
pub type MemoId = i32;

/// Persisted attachment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub filename: String,
    /// Inline payload. Only populated when a query set `include_blob`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<Vec<u8>>,
    /// Location of an externally stored payload.
    pub external_link: Option<String>,
    /// MIME-like content type. Serialized as `type` to match storage naming.
    #[serde(rename = "type")]
    pub kind: String,
    /// Payload size in bytes.
    pub size: i64,
    pub creator_id: UserId,
    /// Unix epoch seconds.
    pub created_ts: i64,
    /// Unix epoch seconds.
    pub updated_ts: i64,
    /// Storage-backend specific location hint.
    pub internal_path: Option<String>,
    /// Owning note; `None` means unattached.
    pub memo_id: Option<MemoId>,
}

impl Resource {
    /// Returns whether this resource is attached to a note.
    pub fn is_attached(&self) -> bool {
        self.memo_id.is_some()
    }
}

/// Input for creating a resource.
///
/// `memo_id` and both timestamps are assigned by storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateResource {
    pub filename: String,
    pub blob: Option<Vec<u8>>,
    pub external_link: Option<String>,
    pub kind: String,
    pub size: i64,
    pub creator_id: UserId,
    pub internal_path: Option<String>,
}

impl CreateResource {
    /// Checks the fields storage cannot default.
    pub fn validate(&self) -> Result<(), ResourceValidationError> {
        if self.filename.trim().is_empty() {
            return Err(ResourceValidationError::EmptyFilename);
        }
        if self.kind.trim().is_empty() {
            return Err(ResourceValidationError::EmptyType);
        }
        if self.size < 0 {
            return Err(ResourceValidationError::NegativeSize(self.size));
        }
        Ok(())
    }
}

/// Sparse filter for listing resources. Absent fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindResource {
    pub id: Option<ResourceId>,
    pub creator_id: Option<UserId>,
    pub filename: Option<String>,
    pub memo_id: Option<MemoId>,
    /// Restricts to rows with a non-null `memo_id`.
    pub has_related_memo: bool,
    /// Fetches the `blob` column.
    pub include_blob: bool,
    pub limit: Option<u32>,
    /// Ignored unless `limit` is also set.
    pub offset: Option<u32>,
}

impl FindResource {
    /// Filter selecting one resource by id, without its payload.
    pub fn by_id(id: ResourceId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }
}

/// Sparse patch for one resource. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResource {
    pub id: ResourceId,
    pub updated_ts: Option<i64>,
    /// Written as given. `Some(String::new())` blanks the filename, which
    /// `CreateResource::validate` would reject on create.
    pub filename: Option<String>,
    pub internal_path: Option<String>,
    pub memo_id: Option<MemoId>,
    /// Sets `memo_id` to NULL. Takes precedence over `memo_id`.
    pub unbind_memo: bool,
    pub blob: Option<Vec<u8>>,
}

impl UpdateResource {
    /// Starts an empty patch targeting `id`.
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// Create input rejected before reaching storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceValidationError {
    #[error("resource filename must not be empty")]
    EmptyFilename,
    #[error("resource type must not be empty")]
    EmptyType,
    #[error("resource size must not be negative, got {0}")]
    NegativeSize(i64),
}
