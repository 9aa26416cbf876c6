//! Record types: descriptor, the three per-type shapes, and the `record!` macro that generates them.
//!
//! One declaration yields:
//! - the persisted record (`Note`): key, declared fields, creation timestamp; the response shape;
//! - the input shape (`NoteInput`): declared fields, optional timestamp, no key;
//! - the update shape (`NoteUpdate`): every non-key field wrapped in [`Patch`].

mod descriptor;
mod macros;

pub use descriptor::*;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Capability set required by the generic router: a key, a timestamp, serde, and a descriptor for persistence.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Full-record shape accepted on create.
    type Input: Serialize + DeserializeOwned + Send;
    /// Partial shape accepted on update.
    type Update: DeserializeOwned + Send;

    fn descriptor() -> &'static RecordDescriptor;

    fn id(&self) -> i64;

    fn timestamp(&self) -> chrono::DateTime<chrono::Utc>;

    /// Apply the fields present in `update`, leaving the rest untouched.
    fn apply(&mut self, update: Self::Update);
}

/// A field of an update body: absent (leave unchanged) or set to a value.
///
/// For nullable fields `T` is `Option<U>`, so an explicit `null` is `Set(None)` and clears the field.
#[derive(Clone, Debug, PartialEq)]
pub enum Patch<T> {
    Absent,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    /// Overwrite `target` when set.
    pub fn apply_to(self, target: &mut T) {
        if let Patch::Set(value) = self {
            *target = value;
        }
    }
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Set)
    }
}
