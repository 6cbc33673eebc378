//! Locations within schemas and validated instances.
use std::{fmt, sync::Arc};

/// A JSON Pointer into a schema or an instance, stored in its display form.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Location(Arc<str>);

impl Location {
    /// The root location.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::from(""))
    }
    /// Extend this location with a new segment.
    #[must_use]
    pub fn join<'a>(&self, segment: impl Into<LocationSegment<'a>>) -> Self {
        let segment = segment.into();
        let mut buffer = String::with_capacity(self.0.len() + 8);
        buffer.push_str(&self.0);
        write_segment(&mut buffer, segment);
        Self(Arc::from(buffer.as_str()))
    }
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn write_segment(buffer: &mut String, segment: LocationSegment<'_>) {
    buffer.push('/');
    match segment {
        LocationSegment::Property(property) => {
            for ch in property.chars() {
                match ch {
                    '/' => buffer.push_str("~1"),
                    '~' => buffer.push_str("~0"),
                    _ => buffer.push(ch),
                }
            }
        }
        LocationSegment::Index(idx) => buffer.push_str(itoa::Buffer::new().format(idx)),
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for Location {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// A single segment of a location: a property name or an array index.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LocationSegment<'a> {
    /// Property name within a JSON object.
    Property(&'a str),
    /// Index within a JSON array.
    Index(usize),
}

impl<'a> From<&'a str> for LocationSegment<'a> {
    #[inline]
    fn from(value: &'a str) -> LocationSegment<'a> {
        LocationSegment::Property(value)
    }
}

impl<'a> From<&'a String> for LocationSegment<'a> {
    #[inline]
    fn from(value: &'a String) -> LocationSegment<'a> {
        LocationSegment::Property(value)
    }
}

impl From<usize> for LocationSegment<'_> {
    #[inline]
    fn from(value: usize) -> Self {
        LocationSegment::Index(value)
    }
}

/// A lazily-materialised location.
///
/// Built as a linked list of borrowed segments on the call stack during
/// validation, so the happy path allocates nothing; converted into a
/// [`Location`] only when an error is reported.
#[derive(Debug, Clone)]
pub struct LazyLocation<'a, 'b> {
    pub(crate) segment: LocationSegment<'a>,
    pub(crate) parent: Option<&'b LazyLocation<'b, 'a>>,
}

impl Default for LazyLocation<'_, '_> {
    fn default() -> Self {
        LazyLocation::new()
    }
}

impl<'a, 'b> LazyLocation<'a, 'b> {
    /// The root of an instance or schema path.
    #[must_use]
    pub const fn new() -> Self {
        LazyLocation {
            // Never rendered; the root has no parent.
            segment: LocationSegment::Index(0),
            parent: None,
        }
    }

    /// Push a new segment onto the path.
    #[inline]
    #[must_use]
    pub fn push(&'a self, segment: impl Into<LocationSegment<'a>>) -> Self {
        LazyLocation {
            segment: segment.into(),
            parent: Some(self),
        }
    }
}

impl From<&LazyLocation<'_, '_>> for Location {
    fn from(location: &LazyLocation<'_, '_>) -> Self {
        let mut segments = Vec::new();
        let mut head = location;
        while let Some(parent) = head.parent {
            segments.push(head.segment);
            head = parent;
        }
        let mut buffer = String::new();
        for segment in segments.into_iter().rev() {
            write_segment(&mut buffer, segment);
        }
        Location(Arc::from(buffer.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::{LazyLocation, Location};

    #[test]
    fn join_escapes_pointer_tokens() {
        let location = Location::new().join("a/b").join("c~d").join(3);
        assert_eq!(location.as_str(), "/a~1b/c~0d/3");
    }

    #[test]
    fn lazy_location_materialises_in_order() {
        let root = LazyLocation::new();
        let first = root.push("outer");
        let second = first.push(1);
        let third = second.push("inner");
        assert_eq!(Location::from(&third).as_str(), "/outer/1/inner");
        assert_eq!(Location::from(&root).as_str(), "");
    }
}
