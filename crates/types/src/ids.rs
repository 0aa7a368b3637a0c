//! Newtype identifiers for every entity family in the core.

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new random id.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Create an id from a known string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// A community - the outermost sharing boundary.
    CommunityId
);
entity_id!(
    /// An individual member account.
    MemberId
);
entity_id!(
    /// A council - a managing body inside a community.
    CouncilId
);
entity_id!(
    /// A catalog item (good or service).
    ItemId
);
entity_id!(
    /// A member or council need.
    NeedId
);
entity_id!(
    /// A council-owned inventory pool.
    PoolId
);
entity_id!(
    /// A contribution offered into a pool.
    ContributionId
);
entity_id!(
    /// An entry in the distribution ledger.
    DistributionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(NeedId::generate(), NeedId::generate());
    }

    #[test]
    fn display_round_trips() {
        let id = PoolId::new("pool-1");
        assert_eq!(id.to_string(), "pool-1");
        assert_eq!(id.as_str(), "pool-1");
    }
}
