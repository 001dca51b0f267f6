use crate::kv::item::Item;
use async_trait::async_trait;
use shortlinks_core::Result;
use tracing::trace;

/// One page of a partition query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Items in ascending sort-key order.
    pub items: Vec<Item>,
    /// Sort key of the last item returned when more may follow; pass it as
    /// `exclusive_start` to fetch the next page.
    pub last_evaluated_key: Option<String>,
}

/// A single table addressed by `(pk, sk)`.
///
/// Every call is atomic for the one item it touches and nothing more;
/// there are no multi-item transactions.
#[async_trait]
pub trait KvTable: Send + Sync + 'static {
    /// Loads the item at `(pk, sk)`.
    async fn get_item(&self, pk: &str, sk: &str) -> Result<Option<Item>>;

    /// Writes `item`, replacing whatever is stored under its `pk`/`sk`.
    async fn put_item(&self, item: Item) -> Result<()>;

    /// Writes `item` only if nothing is stored under its `pk`/`sk`.
    /// Returns `false`, leaving the stored item untouched, on a collision.
    async fn put_item_if_absent(&self, item: Item) -> Result<bool>;

    /// Removes the item at `(pk, sk)`. Removing a missing item is not an error.
    async fn delete_item(&self, pk: &str, sk: &str) -> Result<()>;

    /// Returns one page of the items in partition `pk` whose sort key is
    /// strictly greater than `exclusive_start`.
    async fn query(&self, pk: &str, exclusive_start: Option<&str>) -> Result<Page>;
}

/// Walks every page of a partition query.
pub struct QueryPaginator<'a, T: ?Sized> {
    table: &'a T,
    pk: &'a str,
    next: Option<String>,
    done: bool,
}

impl<'a, T: KvTable + ?Sized> QueryPaginator<'a, T> {
    pub fn new(table: &'a T, pk: &'a str) -> Self {
        Self {
            table,
            pk,
            next: None,
            done: false,
        }
    }

    pub fn has_more_pages(&self) -> bool {
        !self.done
    }

    /// Fetches the next page. Returns an empty page once exhausted.
    pub async fn next_page(&mut self) -> Result<Page> {
        if self.done {
            return Ok(Page::default());
        }

        let page = self.table.query(self.pk, self.next.as_deref()).await?;
        trace!(
            pk = %self.pk,
            items = page.items.len(),
            more = page.last_evaluated_key.is_some(),
            "fetched query page"
        );

        self.next.clone_from(&page.last_evaluated_key);
        self.done = self.next.is_none();
        Ok(page)
    }

    /// Follows continuation keys until the partition is exhausted.
    pub async fn collect_all(mut self) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        while self.has_more_pages() {
            items.extend(self.next_page().await?.items);
        }
        Ok(items)
    }
}
