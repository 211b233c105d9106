//! Nominal id types, one per entity.
//!
//! Every id is a string on the wire (`#[serde(transparent)]`) but a distinct
//! type in Rust, so a `PartId` can never be passed where a
//! `PartInstanceId` is expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hashing::sha256_hex_parts;

/// Number of hex characters kept from a content hash.
const DERIVED_ID_LEN: usize = 24;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// A fresh, time-ordered id.
            pub fn generate() -> Self {
                Self(Uuid::now_v7().simple().to_string())
            }

            /// A content-addressed id: the same components always yield
            /// the same id.
            pub fn derived(parts: &[&str]) -> Self {
                let mut hex = sha256_hex_parts(parts);
                hex.truncate(DERIVED_ID_LEN);
                Self(hex)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(
    /// A studio: the unit that owns one device timeline.
    StudioId
);
define_id!(PlaylistId);
define_id!(RundownId);
define_id!(SegmentId);
define_id!(PartId);
define_id!(PieceId);
define_id!(AdLibPieceId);
define_id!(PartInstanceId);
define_id!(PieceInstanceId);
define_id!(
    /// Identifies one on-air activation of a playlist. A new one is minted
    /// on every activate.
    ActivationId
);
define_id!(ShowStyleVariantId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_ids_are_stable() {
        let a = PartId::derived(&["rundown-1", "part-ext-7"]);
        let b = PartId::derived(&["rundown-1", "part-ext-7"]);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), DERIVED_ID_LEN);
        assert_ne!(a, PartId::derived(&["rundown-2", "part-ext-7"]));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(ActivationId::generate(), ActivationId::generate());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = RundownId::new("ro1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ro1\"");
        let back: RundownId = serde_json::from_str("\"ro1\"").unwrap();
        assert_eq!(back, id);
    }
}
