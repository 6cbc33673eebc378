use std::{fmt, str::FromStr};

/// JSON instance types recognised by the `type` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveType {
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveType::Array => f.write_str("array"),
            PrimitiveType::Boolean => f.write_str("boolean"),
            PrimitiveType::Integer => f.write_str("integer"),
            PrimitiveType::Null => f.write_str("null"),
            PrimitiveType::Number => f.write_str("number"),
            PrimitiveType::Object => f.write_str("object"),
            PrimitiveType::String => f.write_str("string"),
        }
    }
}

impl FromStr for PrimitiveType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "array" => Ok(PrimitiveType::Array),
            "boolean" => Ok(PrimitiveType::Boolean),
            "integer" => Ok(PrimitiveType::Integer),
            "null" => Ok(PrimitiveType::Null),
            "number" => Ok(PrimitiveType::Number),
            "object" => Ok(PrimitiveType::Object),
            "string" => Ok(PrimitiveType::String),
            _ => Err(()),
        }
    }
}

const fn bit(primitive_type: PrimitiveType) -> u8 {
    match primitive_type {
        PrimitiveType::Array => 1,
        PrimitiveType::Boolean => 1 << 1,
        PrimitiveType::Integer => 1 << 2,
        PrimitiveType::Null => 1 << 3,
        PrimitiveType::Number => 1 << 4,
        PrimitiveType::Object => 1 << 5,
        PrimitiveType::String => 1 << 6,
    }
}

/// A compact set of [`PrimitiveType`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrimitiveTypesBitMap(u8);

impl PrimitiveTypesBitMap {
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }
    #[must_use]
    pub const fn add_type(self, primitive_type: PrimitiveType) -> Self {
        Self(self.0 | bit(primitive_type))
    }
    #[must_use]
    pub const fn contains_type(self, primitive_type: PrimitiveType) -> bool {
        self.0 & bit(primitive_type) != 0
    }
    pub fn iter(self) -> impl Iterator<Item = PrimitiveType> {
        [
            PrimitiveType::Array,
            PrimitiveType::Boolean,
            PrimitiveType::Integer,
            PrimitiveType::Null,
            PrimitiveType::Number,
            PrimitiveType::Object,
            PrimitiveType::String,
        ]
        .into_iter()
        .filter(move |ty| self.contains_type(*ty))
    }
}

impl From<PrimitiveType> for PrimitiveTypesBitMap {
    fn from(value: PrimitiveType) -> Self {
        PrimitiveTypesBitMap::new().add_type(value)
    }
}
