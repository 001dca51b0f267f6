use crate::error::{Result, StorageError};
use jiff::Timestamp;
use typed_builder::TypedBuilder;

/// Marker written into `to` and `description` of the history entry that
/// records a delete.
pub const DELETED_SENTINEL: &str = "«deleted»";

/// A redirect from `/{from}` to `to`.
///
/// `to` may contain one `%s` placeholder which is replaced by the rest of
/// the request path, see [`Shortlink::expand`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shortlink {
    pub from: String,
    pub to: String,
    /// Free text; empty means no description.
    pub description: String,
}

/// The retained copy of a deleted [`Shortlink`].
pub type Tombstone = Shortlink;

impl Shortlink {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns the destination with the first `%s` replaced by `suffix`.
    ///
    /// Later placeholders are left as they are; a destination without a
    /// placeholder is returned unchanged.
    pub fn expand(&self, suffix: &str) -> String {
        self.to.replacen("%s", suffix, 1)
    }
}

/// One immutable audit record for a create, update or delete of `from`.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct History {
    #[builder(setter(into))]
    pub from: String,
    #[builder(setter(into))]
    pub to: String,
    /// Assigned by the backend when the entry is appended; always set on
    /// entries read back from storage.
    #[builder(default, setter(strip_option))]
    pub when: Option<Timestamp>,
    /// Actor identity, empty when unauthenticated.
    #[builder(default, setter(into))]
    pub who: String,
    #[builder(default, setter(into))]
    pub description: String,
}

impl History {
    /// The history entry recorded when `link` is created or updated by `who`.
    pub fn for_link(link: &Shortlink, who: impl Into<String>) -> Self {
        Self {
            from: link.from.clone(),
            to: link.to.clone(),
            when: None,
            who: who.into(),
            description: link.description.clone(),
        }
    }

    /// The history entry recorded when `from` is deleted by `who`.
    pub fn deleted(from: impl Into<String>, who: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: DELETED_SENTINEL.to_string(),
            when: None,
            who: who.into(),
            description: DELETED_SENTINEL.to_string(),
        }
    }

    pub fn is_delete(&self) -> bool {
        self.to == DELETED_SENTINEL
    }
}

/// Encodes a timestamp as fixed-width RFC 3339 in UTC with nanoseconds.
///
/// Every encoded value has the same length, so byte-wise order of the
/// strings is chronological order.
pub fn encode_timestamp(ts: Timestamp) -> String {
    format!(
        "{}.{:09}Z",
        ts.strftime("%Y-%m-%dT%H:%M:%S"),
        ts.subsec_nanosecond()
    )
}

/// Parses a timestamp written by [`encode_timestamp`] (any RFC 3339 value is
/// accepted).
pub fn decode_timestamp(raw: &str) -> Result<Timestamp> {
    raw.parse::<Timestamp>()
        .map_err(|e| StorageError::Marshaling(format!("invalid timestamp '{raw}': {e}")))
}
