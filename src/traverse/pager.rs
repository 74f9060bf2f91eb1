//! Page-cursor iteration
//!
//! Wraps a "fetch one page, get next-page token" operation as a stateful
//! iterator. Pages are fetched lazily, one at a time, so callers that stop
//! early (exact-match search, `Flow::Stop` visitors) never pay for the
//! rest of the collection. Once the iterator is done it never fetches
//! again; there is no retry.

use std::marker::PhantomData;

use super::TraversalError;
use crate::forge::types::Paged;
use crate::forge::ClientError;

/// Visitor verdict: keep going or stop the iteration for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Iterator state over one paginated collection.
///
/// A fresh pager starts at the first page (no token). The token is opaque;
/// its absence in a response marks the last page.
pub struct Pager<T, F> {
    fetch: F,
    token: Option<String>,
    done: bool,
    pages: u32,
    _items: PhantomData<fn() -> T>,
}

impl<T, F> Pager<T, F>
where
    F: AsyncFnMut(Option<String>) -> Result<Paged<T>, ClientError>,
{
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            token: None,
            done: false,
            pages: 0,
            _items: PhantomData,
        }
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> u32 {
        self.pages
    }

    /// Fetch the next page, or `None` once the sequence is exhausted.
    ///
    /// A fetch failure ends the iteration; the error carries the 1-based
    /// number of the page that failed.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>, TraversalError> {
        if self.done {
            return Ok(None);
        }

        let page = match (self.fetch)(self.token.clone()).await {
            Ok(page) => page,
            Err(source) => {
                self.done = true;
                return Err(TraversalError::Transport {
                    page: self.pages + 1,
                    source,
                });
            }
        };

        self.pages += 1;
        self.token = page.next_page_token;
        if self.token.is_none() {
            self.done = true;
        }

        Ok(Some(page.items))
    }

    /// Visit every item in page order, fetching pages lazily.
    ///
    /// Stops permanently when `visit` returns [`Flow::Stop`] or errors, or
    /// when the last page has been consumed.
    pub async fn for_each<V>(&mut self, mut visit: V) -> Result<(), TraversalError>
    where
        V: AsyncFnMut(T) -> Result<Flow, TraversalError>,
    {
        while let Some(items) = self.next_page().await? {
            for item in items {
                match visit(item).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Stop) => {
                        self.done = true;
                        return Ok(());
                    }
                    Err(err) => {
                        self.done = true;
                        return Err(err);
                    }
                }
            }
        }
        Ok(())
    }
}
