//! Shared pagination driver
//!
//! Stores expose a synchronous "read up to N entries before this cursor"
//! primitive; this module turns it into the pull-based [`Page`] /
//! [`NextPage`] protocol. Cursors are keys, not offsets, so entries added or
//! removed between page fetches never shift a page boundary.

use std::sync::Arc;

use futures::FutureExt;
use strand_core::{Created, Meta, NextPage, Order, Page, PageFuture, StoreError};

/// Position after which the next page starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Last `created` tuple returned in `Order::Created`
    Created(Created),
    /// Last `added` value returned in `Order::Added`
    Added(u64),
}

impl Cursor {
    /// The cursor pointing just past an entry
    pub fn after(order: Order, meta: &Meta) -> Self {
        match order {
            Order::Created => Self::Created(meta.created.clone()),
            Order::Added => Self::Added(meta.added),
        }
    }
}

/// Synchronous page reads against a store's current state
pub trait PageSource<E>: Send + Sync + 'static {
    /// Read up to `limit` entries in descending `order`, strictly past `before`
    fn read_page(
        &self,
        order: Order,
        before: Option<&Cursor>,
        limit: usize,
    ) -> Result<Vec<(E, Meta)>, StoreError>;
}

/// Build the page starting after `before`
///
/// One extra entry is read to learn whether another page follows, so the
/// final page never carries a continuation.
pub fn page_after<E, S>(
    source: Arc<S>,
    order: Order,
    before: Option<Cursor>,
    page_size: usize,
) -> PageFuture<E>
where
    E: Send + 'static,
    S: PageSource<E>,
{
    async move {
        let limit = page_size.max(1);
        let mut entries = source.read_page(order, before.as_ref(), limit + 1)?;

        if entries.len() <= limit {
            return Ok(Page::last(entries));
        }
        entries.truncate(limit);

        let cursor = match entries.last() {
            Some((_, meta)) => Cursor::after(order, meta),
            None => return Ok(Page::last(entries)),
        };
        let next = NextPage::new(move || page_after(source, order, Some(cursor), limit));
        Ok(Page::with_next(entries, next))
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Source over a fixed list of created values, already in descending order
    struct Fixed(Vec<i64>);

    impl PageSource<i64> for Fixed {
        fn read_page(
            &self,
            _order: Order,
            before: Option<&Cursor>,
            limit: usize,
        ) -> Result<Vec<(i64, Meta)>, StoreError> {
            Ok(self
                .0
                .iter()
                .filter(|v| match before {
                    Some(Cursor::Created(c)) => Created::from([**v]) < *c,
                    _ => true,
                })
                .take(limit)
                .map(|v| (*v, Meta::new(Created::from([*v]))))
                .collect())
        }
    }

    async fn collect_pages(source: Fixed, page_size: usize) -> Vec<Vec<i64>> {
        let mut pages = Vec::new();
        let mut page = page_after(Arc::new(source), Order::Created, None, page_size)
            .await
            .unwrap();
        loop {
            pages.push(page.entries.iter().map(|(e, _)| *e).collect());
            match page.next {
                Some(next) => page = next.fetch().await.unwrap(),
                None => break,
            }
        }
        pages
    }

    #[tokio::test]
    async fn test_pages_split_by_size() {
        let pages = collect_pages(Fixed(vec![5, 4, 3, 2, 1]), 2).await;
        assert_eq!(pages, vec![vec![5, 4], vec![3, 2], vec![1]]);
    }

    #[tokio::test]
    async fn test_exact_fit_has_no_trailing_page() {
        let pages = collect_pages(Fixed(vec![4, 3, 2, 1]), 2).await;
        assert_eq!(pages, vec![vec![4, 3], vec![2, 1]]);
    }

    #[tokio::test]
    async fn test_empty_source_yields_one_empty_page() {
        let pages = collect_pages(Fixed(vec![]), 10).await;
        assert_eq!(pages, vec![Vec::<i64>::new()]);
    }

    #[tokio::test]
    async fn test_zero_page_size_is_treated_as_one() {
        let pages = collect_pages(Fixed(vec![2, 1]), 0).await;
        assert_eq!(pages, vec![vec![2], vec![1]]);
    }

    #[test]
    fn test_cursor_after_entry() {
        let mut meta = Meta::new(Created::from([9]));
        meta.added = 3;
        assert_eq!(Cursor::after(Order::Created, &meta), Cursor::Created(Created::from([9])));
        assert_eq!(Cursor::after(Order::Added, &meta), Cursor::Added(3));
    }
}
