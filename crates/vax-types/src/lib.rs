//! Validated text types shared across the vaccination crates.
//!
//! Each type trims its input on construction and enforces a character limit, so
//! a value that exists has already passed the same checks the request layer
//! would apply.

/// Maximum length, in characters, of a vaccine scheme name.
pub const MAX_SCHEME_NAME_LEN: usize = 200;

/// Maximum length, in characters, of a vaccine lot number.
pub const MAX_LOT_NUMBER_LEN: usize = 50;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
    /// The trimmed input exceeded the field's character limit
    #[error("{field} exceeds maximum length of {max} characters (got {len})")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },
}

fn bounded(field: &'static str, input: &str, max: usize) -> Result<String, TextError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TextError::Empty { field });
    }
    let len = trimmed.chars().count();
    if len > max {
        return Err(TextError::TooLong { field, max, len });
    }
    Ok(trimmed.to_owned())
}

/// Human-readable name of a vaccine scheme (for example `Gardasil 9`).
///
/// Non-empty after trimming and at most [`MAX_SCHEME_NAME_LEN`] characters.
/// Ordering is plain string ordering, which is what scheme listings sort by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemeName(String);

impl SchemeName {
    /// Creates a new `SchemeName` from the given input.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] for blank input and [`TextError::TooLong`] when
    /// the trimmed input is longer than [`MAX_SCHEME_NAME_LEN`] characters.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        bounded("scheme name", input.as_ref(), MAX_SCHEME_NAME_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Manufacturer lot number printed on a vaccine vial.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LotNumber(String);

impl LotNumber {
    /// Creates a new `LotNumber`, trimmed and at most [`MAX_LOT_NUMBER_LEN`] characters.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        bounded("lot number", input.as_ref(), MAX_LOT_NUMBER_LEN).map(Self)
    }

    /// Parses an optional lot number where blank input means "not recorded".
    ///
    /// # Errors
    ///
    /// Returns [`TextError::TooLong`] when the trimmed input exceeds [`MAX_LOT_NUMBER_LEN`].
    pub fn optional(input: Option<&str>) -> Result<Option<Self>, TextError> {
        match input {
            Some(raw) if !raw.trim().is_empty() => Self::new(raw).map(Some),
            _ => Ok(None),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_backed {
    ($ty:ident) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $ty::new(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

string_backed!(SchemeName);
string_backed!(LotNumber);
