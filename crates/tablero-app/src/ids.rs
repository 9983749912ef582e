// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_uid {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            // Generated on the client before `create` runs, so uploads can
            // reference a record the store has not seen yet.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_uid!(UserUid);
entity_uid!(CompanyUid);
entity_uid!(PostUid);
entity_uid!(CommentUid);
entity_uid!(PaymentUid);
entity_uid!(PointEntryUid);
entity_uid!(ShopItemUid);
entity_uid!(ItemOptionUid);
entity_uid!(AddressUid);
entity_uid!(AttachmentUid);

#[cfg(test)]
mod tests {
    use super::PostUid;

    #[test]
    fn generated_uids_are_unique() {
        let first = PostUid::generate();
        let second = PostUid::generate();
        assert_ne!(first, second);
    }

    #[test]
    fn uid_round_trips_through_string() {
        let uid = PostUid::new("b0a2f9c4");
        assert_eq!(uid.as_str(), "b0a2f9c4");
        assert_eq!(PostUid::from(uid.clone().into_string()), uid);
    }
}
