//! Data models exchanged with the annotation store.

mod annotation;
mod group;
mod query;

pub use annotation::{compare_sort_values, Annotation, DeleteResponse, SearchPage};
pub use group::{Group, GroupUpdate, NewGroup, Profile, PUBLIC_GROUP};
pub use query::{SearchQuery, SortField, SortOrder, PAGE_SIZE};
