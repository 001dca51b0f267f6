use shortlinks_core::StorageError;
use std::fmt::{self, Display, Formatter};

const LIVE: &str = "s";
const TOMBSTONE: &str = "d";
const HISTORY_PREFIX: &str = "h";

/// The entity kind an item belongs to, encoded as its partition key.
///
/// | kind | `pk` | `sk` |
/// |---|---|---|
/// | live link | `s` | `from` |
/// | tombstone | `d` | `from` |
/// | history | `h` + `from` | encoded `when` |
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Partition {
    Live,
    Tombstone,
    History(String),
}

impl Partition {
    pub fn history(from: impl Into<String>) -> Self {
        Self::History(from.into())
    }

    /// Renders the partition key stored in the `pk` attribute.
    pub fn key(&self) -> String {
        match self {
            Partition::Live => LIVE.to_string(),
            Partition::Tombstone => TOMBSTONE.to_string(),
            Partition::History(from) => format!("{HISTORY_PREFIX}{from}"),
        }
    }

    /// Recovers the entity kind from a stored `pk`.
    pub fn parse(pk: &str) -> Result<Self, StorageError> {
        match pk {
            LIVE => Ok(Partition::Live),
            TOMBSTONE => Ok(Partition::Tombstone),
            _ => match pk.strip_prefix(HISTORY_PREFIX) {
                Some(from) if !from.is_empty() => Ok(Partition::History(from.to_string())),
                _ => Err(StorageError::Marshaling(format!(
                    "unknown partition key '{pk}'"
                ))),
            },
        }
    }
}

impl Display for Partition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
