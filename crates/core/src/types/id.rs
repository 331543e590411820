//! Typed identifiers for catalog entities.
//!
//! The backing document store assigns opaque string identifiers on creation,
//! so every ID wraps a `String`. Use the `define_id!` macro to create
//! type-safe wrappers that prevent accidentally mixing IDs from different
//! entity types.

/// Defines a `String`-backed ID newtype.
///
/// The wrapper serializes transparently as its inner string and carries
/// `new()`, `as_str()`, `into_inner()`, `Display`, and the usual `From`
/// conversions. Two IDs defined this way are distinct types even when they
/// hold the same string, so a `ProductId` cannot stand in for a `UserId`.
///
/// ```rust
/// # use meridian_core::define_id;
/// define_id!(OrderId);
/// let id = OrderId::new("abc123");
/// assert_eq!(id.as_str(), "abc123");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId);
define_id!(MainCategoryId);
define_id!(SubCategoryId);
define_id!(ProductId);
define_id!(ProductImageId);
define_id!(DocumentId);
define_id!(CarouselId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        let id = ProductId::new("p-42");
        assert_eq!(id.as_str(), "p-42");
        assert_eq!(id.to_string(), "p-42");
        assert_eq!(String::from(id), "p-42");
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = UserId::new("u-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"u-1\"");

        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_from_str() {
        let id: SubCategoryId = "s-9".into();
        assert_eq!(id.as_str(), "s-9");
    }
}
