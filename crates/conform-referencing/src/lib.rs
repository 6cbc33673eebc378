//! # conform-referencing
//!
//! JSON reference resolution for the `conform` schema validator.
//!
//! The pieces follow the resource model of the JSON Schema specification:
//! a [`ResourceIndex`] maps absolute URLs to registered [`Resource`]s,
//! each of which owns the anchor table for the plain-name fragments it
//! declares. A [`Scope`] resolves references against a base URL, walking
//! JSON Pointers with the draft's keyword position tables so that nested
//! identifiers re-base everything below them, and yielding a [`Target`]
//! with the node's canonical location. Documents that reference URLs the
//! index does not hold are fetched through a [`Loader`]; the meta-schemas
//! of every supported [`Draft`] ship embedded and are never fetched.
mod drafts;
mod error;
mod index;
mod loader;
pub mod meta;
pub mod pointer;
mod resource;
mod scope;
pub mod uri;

pub use drafts::Draft;
pub use error::{ReferenceFailure, ResolveError, UrlError};
pub use index::ResourceIndex;
pub use loader::{DefaultLoader, LoadError, Loader};
pub use resource::Resource;
pub use scope::{Scope, Target};

pub type Uri<T> = fluent_uri::Uri<T>;
pub type UriRef<T> = fluent_uri::UriRef<T>;
