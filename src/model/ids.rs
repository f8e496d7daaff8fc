//! Integer identifiers for review entities

use serde::{Deserialize, Serialize};

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

record_id!(
    /// Identifier of a submitted proposal (assigned by the ingestion side)
    ProposalId
);
record_id!(
    /// Identifier of a committee member
    VoterId
);
record_id!(
    /// Identifier of a rubric standard
    StandardId
);
record_id!(
    /// Identifier of a second-round batch group
    BatchGroupId
);
record_id!(
    /// Row identifier of a screening vote, stable across overwrites
    VoteId
);
record_id!(
    /// Row identifier of a batch vote, stable across overwrites
    BatchVoteId
);
record_id!(MessageId);
