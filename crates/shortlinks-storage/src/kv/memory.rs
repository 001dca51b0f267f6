use crate::kv::item::{item_key, Item};
use crate::kv::table::{KvTable, Page};
use async_trait::async_trait;
use parking_lot::RwLock;
use shortlinks_core::Result;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::ops::Bound;
use typed_builder::TypedBuilder;

/// Default number of items a query page holds.
pub const DEFAULT_PAGE_SIZE: usize = 100;

type Partitions = BTreeMap<String, BTreeMap<String, Item>>;

/// In-process [`KvTable`].
///
/// Partitions are ordered maps keyed by sort key, so queries come back in
/// sort-key order and are cut into pages of `page_size` items just like a
/// remote engine would.
#[derive(Debug, TypedBuilder)]
pub struct MemoryTable {
    #[builder(default = DEFAULT_PAGE_SIZE)]
    page_size: usize,
    #[builder(default, setter(skip))]
    partitions: RwLock<Partitions>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self::builder().page_size(page_size).build()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of items across all partitions.
    pub fn len(&self) -> usize {
        self.partitions.read().values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvTable for MemoryTable {
    async fn get_item(&self, pk: &str, sk: &str) -> Result<Option<Item>> {
        let partitions = self.partitions.read();
        Ok(partitions.get(pk).and_then(|p| p.get(sk)).cloned())
    }

    async fn put_item(&self, item: Item) -> Result<()> {
        let (pk, sk) = item_key(&item)?;
        let (pk, sk) = (pk.to_string(), sk.to_string());

        self.partitions
            .write()
            .entry(pk)
            .or_default()
            .insert(sk, item);
        Ok(())
    }

    async fn put_item_if_absent(&self, item: Item) -> Result<bool> {
        let (pk, sk) = item_key(&item)?;
        let (pk, sk) = (pk.to_string(), sk.to_string());

        let mut partitions = self.partitions.write();
        match partitions.entry(pk).or_default().entry(sk) {
            Entry::Vacant(slot) => {
                slot.insert(item);
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    async fn delete_item(&self, pk: &str, sk: &str) -> Result<()> {
        let mut partitions = self.partitions.write();
        if let Some(partition) = partitions.get_mut(pk) {
            partition.remove(sk);
            if partition.is_empty() {
                partitions.remove(pk);
            }
        }
        Ok(())
    }

    async fn query(&self, pk: &str, exclusive_start: Option<&str>) -> Result<Page> {
        let partitions = self.partitions.read();
        let Some(partition) = partitions.get(pk) else {
            return Ok(Page::default());
        };

        let lower = match exclusive_start {
            Some(start) => Bound::Excluded(start),
            None => Bound::Unbounded,
        };

        let page_size = self.page_size.max(1);
        let mut range = partition.range::<str, _>((lower, Bound::Unbounded));
        let items: Vec<(String, Item)> = range
            .by_ref()
            .take(page_size)
            .map(|(sk, item)| (sk.clone(), item.clone()))
            .collect();

        let last_evaluated_key = match range.next() {
            Some(_) => items.last().map(|(sk, _)| sk.clone()),
            None => None,
        };

        Ok(Page {
            items: items.into_iter().map(|(_, item)| item).collect(),
            last_evaluated_key,
        })
    }
}
