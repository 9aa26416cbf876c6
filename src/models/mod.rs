//! Record types compiled into the server, and the catalog that mounts them by name.

mod notes;
mod users;

pub use notes::{Note, NoteInput, NoteUpdate};
pub use users::{User, UserInput, UserUpdate};

use crate::config::ResourceRegistry;
use crate::error::ConfigError;
use crate::record::Record;

pub struct Catalog;

impl Catalog {
    /// Model names in mount order when none are selected.
    pub const NAMES: &'static [&'static str] = &["notes", "users"];

    pub fn all() -> Result<ResourceRegistry, ConfigError> {
        Self::select(Self::NAMES)
    }

    /// Register the named models in the given order. A name matches a table name or a type name.
    pub fn select<S: AsRef<str>>(names: &[S]) -> Result<ResourceRegistry, ConfigError> {
        let mut registry = ResourceRegistry::new();
        for name in names {
            let name = name.as_ref();
            if matches::<Note>(name) {
                registry.register::<Note>()?;
            } else if matches::<User>(name) {
                registry.register::<User>()?;
            } else {
                return Err(ConfigError::UnknownModel(name.to_string()));
            }
        }
        Ok(registry)
    }
}

fn matches<R: Record>(name: &str) -> bool {
    let d = R::descriptor();
    name == d.table_name || name == d.name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_by_table_or_type_name() {
        let registry = Catalog::select(&["users", "Note"]).unwrap();
        let tables: Vec<&str> = registry.descriptors().map(|d| d.table_name).collect();
        assert_eq!(tables, vec!["users", "notes"]);
    }

    #[test]
    fn unknown_and_repeated_names_fail() {
        assert!(matches!(
            Catalog::select(&["comments"]).err(),
            Some(ConfigError::UnknownModel(ref n)) if n == "comments"
        ));
        assert!(matches!(
            Catalog::select(&["notes", "notes"]).err(),
            Some(ConfigError::DuplicatePathSegment(_))
        ));
    }

    #[test]
    fn compiled_models_are_valid() {
        let registry = Catalog::all().unwrap();
        assert_eq!(registry.descriptors().count(), 2);
        let note = Note::descriptor();
        assert!(note.field("title").unwrap().indexed);
        assert!(!note.field("content").unwrap().indexed);
        assert!(User::descriptor().field("nickname").unwrap().indexed);
    }
}
