//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `RecordId` where a
//! `TenantId` is expected. Tenant stores address records with integer ids;
//! actors and audit entries use UUIDs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate Uuid-backed typed ID wrappers.
macro_rules! typed_uuid {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

/// Macro to generate i64-backed typed ID wrappers.
macro_rules! typed_i64 {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Returns the inner integer.
            #[must_use]
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

typed_uuid!(ActorId, "Unique identifier for a user acting on a request.");
typed_uuid!(AuditEntryId, "Unique identifier for an audit log entry.");

typed_i64!(TenantId, "Opaque identifier of an independently-owned tenant store.");
typed_i64!(RecordId, "Identifier of a request record, unique within its tenant.");

/// Globally unique address of an authoritative request record.
///
/// The central index never becomes the source of truth; this pair is the
/// only way to reach the authoritative copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestRef {
    /// The owning tenant store.
    pub tenant_id: TenantId,
    /// The record within that tenant.
    pub record_id: RecordId,
}

impl RequestRef {
    /// Creates a new request reference.
    #[must_use]
    pub const fn new(tenant_id: TenantId, record_id: RecordId) -> Self {
        Self {
            tenant_id,
            record_id,
        }
    }
}

impl std::fmt::Display for RequestRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.tenant_id, self.record_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_actor_id_roundtrip() {
        let id = ActorId::new();
        let parsed = ActorId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_actor_ids_unique() {
        assert_ne!(ActorId::new(), ActorId::new());
    }

    #[test]
    fn test_request_ref_display() {
        let request = RequestRef::new(TenantId(42), RecordId(7));
        assert_eq!(request.to_string(), "42:7");
    }

    #[test]
    fn test_tenant_id_from_i64() {
        let id: TenantId = 42.into();
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_request_ref_equality_is_pairwise() {
        let a = RequestRef::new(TenantId(1), RecordId(2));
        let b = RequestRef::new(TenantId(2), RecordId(1));
        assert_ne!(a, b);
    }
}
