//! User-defined keywords.
use serde_json::{Map, Value};

use crate::{paths::LazyLocation, ValidationError};

/// A compiled assertion for a user-registered keyword.
///
/// The compiler calls the registered [`KeywordFactory`] whenever it meets
/// the keyword; the returned assertion is stored in the compiled schema and
/// applied to every matching instance.
pub trait Keyword: Send + Sync {
    /// Validate the instance, returning the failure if any.
    ///
    /// Location fields on the returned error are filled in by the
    /// validator; [`ValidationError::custom`] is enough.
    fn validate(&self, instance: &Value, location: &LazyLocation) -> Result<(), ValidationError>;
    /// Boolean-only variant of [`Keyword::validate`].
    fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance, &LazyLocation::new()).is_ok()
    }
}

/// Builds a [`Keyword`] from the keyword's value within a schema object.
///
/// Implemented for closures of the matching shape, so registration can
/// pass a plain function.
pub trait KeywordFactory: Send + Sync {
    /// Compile the keyword value into an assertion.
    ///
    /// `parent` is the schema object the keyword appears in and `value`
    /// the keyword's own value.
    fn init(
        &self,
        parent: &Map<String, Value>,
        value: &Value,
    ) -> Result<Box<dyn Keyword>, ValidationError>;
}

impl<F> KeywordFactory for F
where
    F: Fn(&Map<String, Value>, &Value) -> Result<Box<dyn Keyword>, ValidationError> + Send + Sync,
{
    fn init(
        &self,
        parent: &Map<String, Value>,
        value: &Value,
    ) -> Result<Box<dyn Keyword>, ValidationError> {
        self(parent, value)
    }
}
