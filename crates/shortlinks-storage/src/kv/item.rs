use crate::kv::key::Partition;
use jiff::Timestamp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shortlinks_core::model::{decode_timestamp, encode_timestamp};
use shortlinks_core::{History, Result, Shortlink, StorageError};

/// A stored item: a flat attribute map that always carries `pk` and `sk`.
pub type Item = Map<String, Value>;

pub const PK: &str = "pk";
pub const SK: &str = "sk";

/// Shape of live-link and tombstone items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct LinkItem {
    pub pk: String,
    #[serde(rename = "sk")]
    pub from: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
    #[serde(rename = "d", default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl LinkItem {
    pub fn new(partition: &Partition, link: &Shortlink) -> Self {
        Self {
            pk: partition.key(),
            from: link.from.clone(),
            to: link.to.clone(),
            description: link.description.clone(),
        }
    }

    /// Converts back into a link, checking the item sits in `expected`.
    pub fn into_link(self, expected: &Partition) -> Result<Shortlink> {
        if Partition::parse(&self.pk)? != *expected {
            return Err(StorageError::Marshaling(format!(
                "item '{}' found in partition '{}', expected '{expected}'",
                self.from, self.pk
            )));
        }

        Ok(Shortlink {
            from: self.from,
            to: self.to,
            description: self.description,
        })
    }
}

/// Shape of history items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct HistoryItem {
    pub pk: String,
    #[serde(rename = "sk")]
    pub when: String,
    #[serde(default)]
    pub who: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
    #[serde(rename = "d", default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl HistoryItem {
    pub fn new(entry: &History, when: Timestamp) -> Self {
        Self {
            pk: Partition::history(entry.from.as_str()).key(),
            when: encode_timestamp(when),
            who: entry.who.clone(),
            to: entry.to.clone(),
            description: entry.description.clone(),
        }
    }

    pub fn into_history(self) -> Result<History> {
        let Partition::History(from) = Partition::parse(&self.pk)? else {
            return Err(StorageError::Marshaling(format!(
                "history item found in partition '{}'",
                self.pk
            )));
        };

        Ok(History {
            from,
            to: self.to,
            when: Some(decode_timestamp(&self.when)?),
            who: self.who,
            description: self.description,
        })
    }
}

pub(crate) fn marshal<T: Serialize>(value: &T) -> Result<Item> {
    match serde_json::to_value(value) {
        Ok(Value::Object(item)) => Ok(item),
        Ok(other) => Err(StorageError::Marshaling(format!(
            "expected an attribute map, got {other}"
        ))),
        Err(e) => Err(StorageError::Marshaling(e.to_string())),
    }
}

pub(crate) fn unmarshal<T: DeserializeOwned>(item: Item) -> Result<T> {
    serde_json::from_value(Value::Object(item)).map_err(|e| StorageError::Marshaling(e.to_string()))
}

/// Reads the `pk`/`sk` pair every item must carry.
pub fn item_key(item: &Item) -> Result<(&str, &str)> {
    Ok((string_attr(item, PK)?, string_attr(item, SK)?))
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Result<&'a str> {
    item.get(name).and_then(Value::as_str).ok_or_else(|| {
        StorageError::Marshaling(format!("item is missing string attribute '{name}'"))
    })
}
