//! Error types.
use std::{error, fmt};

use serde_json::Value;

use crate::{
    paths::Location,
    primitive_type::{PrimitiveType, PrimitiveTypesBitMap},
};

/// A failed validation, structured as a tree.
///
/// Each node names the keyword that rejected the instance; `causes` holds
/// the nested failures that led to it, mirroring the keyword tree of the
/// schema. Rendering via [`fmt::Display`] produces an indented multi-line
/// listing.
#[derive(Debug)]
pub struct ValidationError {
    /// Why validation failed at this node.
    pub kind: ErrorKind,
    /// Path to the offending part of the instance.
    pub instance_location: Location,
    /// Evaluation path to the failing keyword, through any references.
    pub keyword_location: Location,
    /// Absolute location of the failing keyword: schema URL plus fragment.
    pub absolute_keyword_location: String,
    /// Nested failures that caused this one.
    pub causes: Vec<ValidationError>,
}

impl ValidationError {
    pub(crate) fn new(
        kind: ErrorKind,
        instance_location: Location,
        keyword_location: Location,
        absolute_keyword_location: String,
    ) -> ValidationError {
        ValidationError {
            kind,
            instance_location,
            keyword_location,
            absolute_keyword_location,
            causes: Vec::new(),
        }
    }

    pub(crate) fn with_causes(mut self, causes: Vec<ValidationError>) -> ValidationError {
        self.causes = causes;
        self
    }

    /// Create an error for a user-defined keyword.
    ///
    /// The validator fills in the location fields when the error surfaces
    /// from a registered extension.
    #[must_use]
    pub fn custom(message: impl Into<String>) -> ValidationError {
        ValidationError::new(
            ErrorKind::Custom {
                message: message.into(),
            },
            Location::new(),
            Location::new(),
            String::new(),
        )
    }

    /// The human-readable message for this node alone.
    #[must_use]
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// Iterate over this error and every transitive cause, depth-first.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.causes.iter().rev());
            Some(next)
        })
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for _ in 0..depth {
            f.write_str("  ")?;
        }
        writeln!(
            f,
            "at '{}': {} (schema path: '{}')",
            self.instance_location, self.kind, self.keyword_location
        )?;
        for cause in &self.causes {
            cause.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.causes.is_empty() && f.alternate() {
            return write!(f, "{}", self.kind);
        }
        self.fmt_indented(f, 0)
    }
}

impl error::Error for ValidationError {}

/// Kinds of validation failures.
#[derive(Debug)]
#[allow(missing_docs)]
pub enum ErrorKind {
    /// The input array contains more items than the tuple form allows.
    AdditionalItems { limit: usize },
    /// Unexpected properties.
    AdditionalProperties { unexpected: Vec<String> },
    /// The input value is not valid under any of the schemas listed in `anyOf`.
    AnyOf,
    /// The input value doesn't match the expected constant.
    Constant { expected: Value },
    /// The input array doesn't contain items conforming to the `contains` schema.
    Contains,
    /// Fewer matching items than `minContains`.
    MinContains { limit: u64, found: usize },
    /// More matching items than `maxContains`.
    MaxContains { limit: u64, found: usize },
    /// The input value does not respect the defined `contentEncoding`.
    ContentEncoding { content_encoding: String },
    /// The input value does not respect the defined `contentMediaType`.
    ContentMediaType { content_media_type: String },
    /// The decoded content does not conform to `contentSchema`.
    ContentSchema,
    /// Custom error message for user-defined validation.
    Custom { message: String },
    /// The input value doesn't match any of the specified options.
    Enum { options: Value },
    /// Value is too large.
    ExclusiveMaximum { limit: Value },
    /// Value is too small.
    ExclusiveMinimum { limit: Value },
    /// Everything is invalid for the `false` schema.
    FalseSchema,
    /// The input doesn't match the specified format.
    Format { format: String },
    /// A stream passed to `validate_reader` is not valid JSON.
    JsonParse { error: serde_json::Error },
    /// Too many items in an array.
    MaxItems { limit: u64 },
    /// Value is too large.
    Maximum { limit: Value },
    /// String is too long.
    MaxLength { limit: u64 },
    /// Too many properties in an object.
    MaxProperties { limit: u64 },
    /// Too few items in an array.
    MinItems { limit: u64 },
    /// Value is too small.
    Minimum { limit: Value },
    /// String is too short.
    MinLength { limit: u64 },
    /// Not enough properties in an object.
    MinProperties { limit: u64 },
    /// The number is not a multiple of the divisor.
    MultipleOf { multiple_of: Value },
    /// The negated schema accepted the value.
    Not,
    /// The value is valid under more than one `oneOf` subschema.
    OneOfMultipleValid { matches: Vec<usize> },
    /// The value is not valid under any `oneOf` subschema.
    OneOfNotValid,
    /// The input doesn't match the pattern.
    Pattern { pattern: String },
    /// An object property name is invalid.
    PropertyNames { property: String },
    /// A required property is missing.
    Required { property: String },
    /// A schema object with several failing keywords; see `causes`.
    Schema,
    /// The input value doesn't match the required type(s).
    Type { kind: TypeKind },
    /// Properties not covered by any evaluated schema.
    UnevaluatedProperties { unexpected: Vec<String> },
    /// Items not covered by any evaluated schema.
    UnevaluatedItems { unexpected: Vec<usize> },
    /// The input array has non-unique elements.
    UniqueItems,
}

#[derive(Debug)]
#[allow(missing_docs)]
pub enum TypeKind {
    Single(PrimitiveType),
    Multiple(PrimitiveTypesBitMap),
}

impl fmt::Display for ErrorKind {
    #[allow(clippy::too_many_lines)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::AdditionalItems { limit } => {
                write!(f, "the array has more than {limit} items")
            }
            ErrorKind::AdditionalProperties { unexpected } => {
                write!(f, "additional properties are not allowed (")?;
                fmt_quoted_list(f, unexpected.iter().map(String::as_str))?;
                f.write_str(" unexpected)")
            }
            ErrorKind::AnyOf => f.write_str(
                "the value is not valid under any of the schemas listed in the 'anyOf' keyword",
            ),
            ErrorKind::Constant { expected } => write!(f, "{expected} was expected"),
            ErrorKind::Contains => {
                f.write_str("none of the items are valid under the given schema")
            }
            ErrorKind::MinContains { limit, found } => write!(
                f,
                "fewer than {limit} items match the 'contains' schema ({found} matched)"
            ),
            ErrorKind::MaxContains { limit, found } => write!(
                f,
                "more than {limit} items match the 'contains' schema ({found} matched)"
            ),
            ErrorKind::ContentEncoding { content_encoding } => {
                write!(f, "the value is not encoded as '{content_encoding}'")
            }
            ErrorKind::ContentMediaType { content_media_type } => {
                write!(f, "the value is not of media type '{content_media_type}'")
            }
            ErrorKind::ContentSchema => {
                f.write_str("the decoded content does not conform to 'contentSchema'")
            }
            ErrorKind::Custom { message } => f.write_str(message),
            ErrorKind::Enum { options } => write!(f, "the value is not one of {options}"),
            ErrorKind::ExclusiveMaximum { limit } => {
                write!(f, "the value is greater than or equal to the maximum of {limit}")
            }
            ErrorKind::ExclusiveMinimum { limit } => {
                write!(f, "the value is less than or equal to the minimum of {limit}")
            }
            ErrorKind::FalseSchema => f.write_str("false schema does not allow any value"),
            ErrorKind::Format { format } => write!(f, "the value is not a '{format}'"),
            ErrorKind::JsonParse { error } => write!(f, "the input is not valid JSON: {error}"),
            ErrorKind::MaxItems { limit } => write!(f, "the array has more than {limit} items"),
            ErrorKind::Maximum { limit } => {
                write!(f, "the value is greater than the maximum of {limit}")
            }
            ErrorKind::MaxLength { limit } => {
                write!(f, "the string is longer than {limit} characters")
            }
            ErrorKind::MaxProperties { limit } => {
                write!(f, "the object has more than {limit} properties")
            }
            ErrorKind::MinItems { limit } => write!(f, "the array has less than {limit} items"),
            ErrorKind::Minimum { limit } => {
                write!(f, "the value is less than the minimum of {limit}")
            }
            ErrorKind::MinLength { limit } => {
                write!(f, "the string is shorter than {limit} characters")
            }
            ErrorKind::MinProperties { limit } => {
                write!(f, "the object has less than {limit} properties")
            }
            ErrorKind::MultipleOf { multiple_of } => {
                write!(f, "the value is not a multiple of {multiple_of}")
            }
            ErrorKind::Not => f.write_str("the negated schema accepted the value"),
            ErrorKind::OneOfMultipleValid { matches } => {
                write!(
                    f,
                    "the value is valid under more than one of the schemas listed in the 'oneOf' keyword (branches "
                )?;
                for (i, idx) in matches.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{idx}")?;
                }
                f.write_str(")")
            }
            ErrorKind::OneOfNotValid => f.write_str(
                "the value is not valid under any of the schemas listed in the 'oneOf' keyword",
            ),
            ErrorKind::Pattern { pattern } => write!(f, "the value does not match \"{pattern}\""),
            ErrorKind::PropertyNames { property } => {
                write!(f, "property name '{property}' is invalid")
            }
            ErrorKind::Required { property } => {
                write!(f, "'{property}' is a required property")
            }
            ErrorKind::Schema => f.write_str("the value does not conform to the schema"),
            ErrorKind::Type {
                kind: TypeKind::Single(expected),
            } => write!(f, "the value is not of type \"{expected}\""),
            ErrorKind::Type {
                kind: TypeKind::Multiple(types),
            } => {
                f.write_str("the value is not of types ")?;
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "\"{ty}\"")?;
                }
                Ok(())
            }
            ErrorKind::UnevaluatedProperties { unexpected } => {
                write!(f, "unevaluated properties are not allowed (")?;
                fmt_quoted_list(f, unexpected.iter().map(String::as_str))?;
                f.write_str(" unexpected)")
            }
            ErrorKind::UnevaluatedItems { unexpected } => {
                write!(f, "unevaluated items are not allowed (at ")?;
                for (i, idx) in unexpected.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{idx}")?;
                }
                f.write_str(")")
            }
            ErrorKind::UniqueItems => f.write_str("the array has non-unique elements"),
        }
    }
}

fn fmt_quoted_list<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a str>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "'{item}'")?;
    }
    Ok(())
}

/// Errors that can abort a compile run.
#[derive(Debug)]
pub enum CompileError {
    /// The document failed to parse, including duplicate object keys.
    Parse(serde_json::Error),
    /// The schema document was rejected by its meta-schema or is not a
    /// schema-shaped value.
    SchemaNotValid(Box<ValidationError>),
    /// Reference resolution, resource registration or loading failed.
    Resolve(referencing::ResolveError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Parse(error) => write!(f, "Failed to parse the document: {error}"),
            CompileError::SchemaNotValid(error) => {
                writeln!(f, "The schema is not valid:")?;
                error.fmt_indented(f, 1)
            }
            CompileError::Resolve(error) => error.fmt(f),
        }
    }
}

impl error::Error for CompileError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            CompileError::Parse(error) => Some(error),
            CompileError::SchemaNotValid(error) => Some(&**error),
            CompileError::Resolve(error) => Some(error),
        }
    }
}

impl From<referencing::ResolveError> for CompileError {
    fn from(error: referencing::ResolveError) -> Self {
        CompileError::Resolve(error)
    }
}

impl From<serde_json::Error> for CompileError {
    fn from(error: serde_json::Error) -> Self {
        CompileError::Parse(error)
    }
}

impl From<ValidationError> for CompileError {
    fn from(error: ValidationError) -> Self {
        CompileError::SchemaNotValid(Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ValidationError};
    use crate::paths::Location;

    fn leaf(kind: ErrorKind, instance: &str, keyword: &str) -> ValidationError {
        let mut instance_location = Location::new();
        for segment in instance.split('/').filter(|s| !s.is_empty()) {
            instance_location = instance_location.join(segment);
        }
        let mut keyword_location = Location::new();
        for segment in keyword.split('/').filter(|s| !s.is_empty()) {
            keyword_location = keyword_location.join(segment);
        }
        ValidationError::new(
            kind,
            instance_location,
            keyword_location,
            String::new(),
        )
    }

    #[test]
    fn renders_indented_tree() {
        let error = leaf(ErrorKind::Schema, "", "").with_causes(vec![
            leaf(ErrorKind::Minimum { limit: 0.into() }, "/a", "/properties/a/minimum"),
            leaf(ErrorKind::UniqueItems, "/b", "/properties/b/uniqueItems"),
        ]);
        let rendered = error.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("at '':"));
        assert!(lines[1].starts_with("  at '/a': the value is less than the minimum of 0"));
        assert!(lines[2].contains("/properties/b/uniqueItems"));
    }

    #[test]
    fn iter_walks_depth_first() {
        let error = leaf(ErrorKind::Schema, "", "").with_causes(vec![
            leaf(ErrorKind::UniqueItems, "/a", "/uniqueItems"),
            leaf(ErrorKind::Not, "/b", "/not"),
        ]);
        let kinds: Vec<String> = error.iter().map(|e| e.kind.to_string()).collect();
        assert_eq!(kinds.len(), 3);
        assert!(kinds[1].contains("non-unique"));
    }
}
