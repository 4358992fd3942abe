pub mod cache;
pub(crate) mod index;
