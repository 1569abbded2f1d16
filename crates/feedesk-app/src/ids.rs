// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

entity_id!(RecordId);
entity_id!(CardId);

/// Hands out identifiers for records and cards created at runtime or filled in
/// during normalization.
pub trait IdSource {
    fn next_record_id(&mut self) -> RecordId;
    fn next_card_id(&mut self) -> CardId;

    /// Milliseconds used for the placeholder zone code of a fresh row.
    fn now_millis(&mut self) -> i128;
}

/// Time-derived ids with a random suffix. The sequence number keeps ids issued
/// within the same millisecond apart even if the suffixes collide.
#[derive(Debug, Default)]
pub struct ClockIds {
    issued: u64,
}

impl ClockIds {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self, prefix: &str) -> String {
        self.issued = self.issued.wrapping_add(1);
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{prefix}-{:x}-{:x}-{}",
            self.now_millis(),
            self.issued,
            &suffix[..8]
        )
    }
}

impl IdSource for ClockIds {
    fn next_record_id(&mut self) -> RecordId {
        RecordId::new(self.next("fee"))
    }

    fn next_card_id(&mut self) -> CardId {
        CardId::new(self.next("card"))
    }

    fn now_millis(&mut self) -> i128 {
        OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
    }
}
