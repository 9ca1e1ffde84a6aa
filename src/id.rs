//! Code for handling IDs
use anyhow::{Result, ensure};
use indexmap::IndexSet;

/// A trait alias for ID types
pub trait IDLike:
    Eq + std::hash::Hash + std::borrow::Borrow<str> + Clone + std::fmt::Display + From<String>
{
}
impl<T> IDLike for T where
    T: Eq + std::hash::Hash + std::borrow::Borrow<str> + Clone + std::fmt::Display + From<String>
{
}

macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Clone,
            std::hash::Hash,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            serde::Deserialize,
            Debug,
            serde::Serialize,
        )]
        /// An ID type (e.g. `RegionID`, `TechnologyID`, etc.)
        pub struct $name(pub std::rc::Rc<str>);

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(std::rc::Rc::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(std::rc::Rc::from(s))
            }
        }

        impl $name {
            /// Create a new ID from a string slice
            pub fn new(id: &str) -> Self {
                $name(std::rc::Rc::from(id))
            }
        }
    };
}
pub(crate) use define_id_type;

#[cfg(test)]
define_id_type!(GenericID);

/// Indicates that the struct has an ID field
pub trait HasID<ID: IDLike> {
    /// Get the struct's ID
    fn get_id(&self) -> &ID;
}

/// Implement the `HasID` trait for the given type, assuming it has a field called `id`
macro_rules! define_id_getter {
    ($t:ty, $id_ty:ty) => {
        impl crate::id::HasID<$id_ty> for $t {
            fn get_id(&self) -> &$id_ty {
                &self.id
            }
        }
    };
}
pub(crate) use define_id_getter;

/// Build an [`IndexSet`] of the IDs of the given items, checking that they are unique
pub fn collect_unique_ids<'a, ID, T, I>(items: I) -> Result<IndexSet<ID>>
where
    ID: IDLike + 'a,
    T: HasID<ID> + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut ids = IndexSet::new();
    for item in items {
        let id = item.get_id().clone();
        ensure!(ids.insert(id.clone()), "Duplicate ID found: {id}");
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;

    struct Item {
        id: GenericID,
    }
    define_id_getter! {Item, GenericID}

    #[test]
    fn test_collect_unique_ids() {
        let items = [Item { id: "a".into() }, Item { id: "b".into() }];
        let ids: IndexSet<GenericID> = collect_unique_ids(&items).unwrap();
        assert_eq!(ids.len(), 2);

        let items = [Item { id: "a".into() }, Item { id: "a".into() }];
        assert_error!(
            collect_unique_ids::<GenericID, _, _>(&items),
            "Duplicate ID found: a"
        );
    }
}
