//! The loader callback: URL in, parsed document out.
use core::fmt;

use fluent_uri::Uri;
use serde_json::Value;

/// The error type loaders report with; wrapped into
/// [`crate::ResolveError::Loader`] together with the URL that failed.
pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

/// Produces the document behind a URL.
///
/// An index consults its loader whenever a registered document references
/// a URL it does not hold yet. Embedded meta-schemas never reach the
/// loader.
pub trait Loader: Send + Sync {
    /// Fetch and parse the document at `url`.
    ///
    /// # Errors
    ///
    /// Whatever prevented producing the document.
    fn load(&self, url: &Uri<&str>) -> Result<Value, LoadError>;
}

/// The stock loader: local files via `file://` and, when the
/// `resolve-http` feature is enabled, HTTP(S) over the network.
///
/// Responses are read to completion and parsed before registration; the
/// resulting documents belong to the index that asked for them.
#[derive(Debug, Default)]
pub struct DefaultLoader;

#[cfg(feature = "resolve-file")]
fn load_file(url: &Uri<&str>) -> Result<Value, LoadError> {
    let path = percent_encoding::percent_decode_str(url.path().as_str()).decode_utf8()?;
    let file = std::fs::File::open(path.as_ref())?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

#[cfg(feature = "resolve-http")]
fn load_http(url: &Uri<&str>) -> Result<Value, LoadError> {
    Ok(reqwest::blocking::get(url.as_str())?.json()?)
}

impl Loader for DefaultLoader {
    fn load(&self, url: &Uri<&str>) -> Result<Value, LoadError> {
        let scheme = url.scheme().as_str();
        #[cfg(feature = "resolve-file")]
        if scheme == "file" {
            return load_file(url);
        }
        #[cfg(feature = "resolve-http")]
        if scheme == "http" || scheme == "https" {
            return load_http(url);
        }
        Err(Box::new(UnsupportedScheme {
            scheme: scheme.to_string(),
        }))
    }
}

#[derive(Debug)]
struct UnsupportedScheme {
    scheme: String,
}

impl fmt::Display for UnsupportedScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no loader for '{}' URLs", self.scheme)
    }
}

impl std::error::Error for UnsupportedScheme {}

/// A loader for indexes that must stay self-contained; every request is
/// an error.
#[derive(Debug, Default)]
pub(crate) struct NoLoader;

impl Loader for NoLoader {
    fn load(&self, _: &Uri<&str>) -> Result<Value, LoadError> {
        Err("loading external resources is disabled".into())
    }
}
