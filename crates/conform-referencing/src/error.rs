//! Failures of URL handling, reference resolution and resource
//! registration.
use std::{error, fmt, num::ParseIntError, str::Utf8Error};

/// Why a URL, reference or resource could not be handled.
#[derive(Debug)]
pub enum ResolveError {
    /// A URL failed RFC 3986 parsing or reference resolution.
    InvalidUrl {
        input: String,
        source: UrlError,
    },
    /// A reference points at something that does not exist.
    InvalidReference {
        reference: String,
        reason: ReferenceFailure,
    },
    /// The loader callback could not produce the document at `url`.
    Loader {
        url: String,
        source: Box<dyn error::Error + Send + Sync>,
    },
    /// The resource owning `url` is not in the index, and resolution has
    /// no loader to fetch it with.
    NotLoaded { url: String },
    /// Two subresources of one registered resource claim the same
    /// identifier.
    DuplicateId { id: String },
    /// The same anchor name is declared twice within one resource.
    DuplicateAnchor { name: String, owner: String },
    /// A `$schema` value that does not name a supported draft.
    UnknownMetaschema { metaschema: String },
}

/// The specific way a reference missed its target.
#[derive(Debug)]
pub enum ReferenceFailure {
    /// The JSON Pointer walks off the document.
    Nowhere,
    /// A step into an array is not a valid index.
    BadIndex { token: String, source: ParseIntError },
    /// The target resource declares no anchor with this name.
    MissingAnchor { name: String },
    /// Anchor names never contain `/`; this fragment cannot be one.
    MalformedAnchor { name: String },
    /// The fragment's percent-encoding does not decode to UTF-8.
    Encoding { source: Utf8Error },
}

impl ResolveError {
    pub(crate) fn invalid_reference(
        reference: impl Into<String>,
        reason: ReferenceFailure,
    ) -> ResolveError {
        ResolveError::InvalidReference {
            reference: reference.into(),
            reason,
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::InvalidUrl { input, source } => {
                write!(f, "invalid URL '{input}': {source}")
            }
            ResolveError::InvalidReference { reference, reason } => {
                write!(f, "cannot resolve '{reference}': {reason}")
            }
            ResolveError::Loader { url, source } => {
                write!(f, "failed to load '{url}': {source}")
            }
            ResolveError::NotLoaded { url } => {
                write!(f, "the resource '{url}' has not been loaded")
            }
            ResolveError::DuplicateId { id } => {
                write!(f, "the identifier '{id}' is declared more than once")
            }
            ResolveError::DuplicateAnchor { name, owner } => {
                write!(f, "the anchor '{name}' is declared more than once in '{owner}'")
            }
            ResolveError::UnknownMetaschema { metaschema } => {
                write!(f, "'{metaschema}' does not name a supported draft")
            }
        }
    }
}

impl fmt::Display for ReferenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceFailure::Nowhere => f.write_str("the path does not exist in the document"),
            ReferenceFailure::BadIndex { token, .. } => {
                write!(f, "'{token}' is not an array index")
            }
            ReferenceFailure::MissingAnchor { name } => {
                write!(f, "no anchor named '{name}' is declared")
            }
            ReferenceFailure::MalformedAnchor { name } => {
                write!(f, "'{name}' is not a valid anchor name")
            }
            ReferenceFailure::Encoding { .. } => {
                f.write_str("the percent-encoded bytes are not valid UTF-8")
            }
        }
    }
}

impl error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ResolveError::InvalidUrl { source, .. } => Some(source),
            ResolveError::Loader { source, .. } => Some(&**source),
            ResolveError::InvalidReference { reason, .. } => match reason {
                ReferenceFailure::BadIndex { source, .. } => Some(source),
                ReferenceFailure::Encoding { source } => Some(source),
                _ => None,
            },
            _ => None,
        }
    }
}

/// An RFC 3986 level failure, from the underlying URI implementation.
#[derive(Debug)]
pub enum UrlError {
    Parse(fluent_uri::error::ParseError),
    Resolve(fluent_uri::error::ResolveError),
}

impl fmt::Display for UrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlError::Parse(source) => source.fmt(f),
            UrlError::Resolve(source) => source.fmt(f),
        }
    }
}

impl error::Error for UrlError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            UrlError::Parse(source) => Some(source),
            UrlError::Resolve(source) => Some(source),
        }
    }
}
