//! Query-string filters for the search page (notes by author and category)
//! and the responses page (responses by note). Filters never fail: anything
//! we cannot make sense of is simply not filtered on.

pub mod components;
mod db_ops;
pub mod models;

pub use models::{NoteFilter, Params, ResponseFilter};
