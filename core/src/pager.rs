// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Lazy, forward-only iteration over paged listings.
//!
//! Services split large listings into pages. Each page carries an opaque
//! continuation token which, handed back to the service, yields the next
//! page. A [`Pager`] wraps the "fetch the page for this token" call into a
//! sequence that fetches nothing until asked and can be resumed later from a
//! saved token.

use std::fmt::Debug;
use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, TryStreamExt};

use crate::pipeline::check_status;
use crate::request::{clone_request, RequestUrl};
use crate::{Error, Pipeline, Result};

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items of this page, possibly none.
    pub items: Vec<T>,
    /// Token of the next page, `None` (or empty) on the last page.
    pub continuation_token: Option<String>,
}

impl<T> Page<T> {
    /// Create a new page.
    pub fn new(items: Vec<T>, continuation_token: Option<String>) -> Self {
        Self {
            items,
            continuation_token,
        }
    }
}

/// FetchPage loads the page identified by a continuation token.
///
/// `None` asks for the first page. Any `Fn(Option<String>) -> impl Future`
/// closure implements it.
#[async_trait]
pub trait FetchPage<T>: Send + Sync + 'static {
    /// Fetch one page.
    async fn fetch_page(&self, continuation: Option<String>) -> Result<Page<T>>;
}

#[async_trait]
impl<T, F, Fut> FetchPage<T> for F
where
    T: Send + 'static,
    F: Fn(Option<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<T>>> + Send,
{
    async fn fetch_page(&self, continuation: Option<String>) -> Result<Page<T>> {
        (self)(continuation).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PagerState {
    First,
    Next(String),
    Done,
}

/// Pager walks a paged listing one page at a time.
pub struct Pager<T> {
    fetcher: Box<dyn FetchPage<T>>,
    state: PagerState,
}

impl<T> Debug for Pager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pager").field("state", &self.state).finish()
    }
}

impl<T: Send + 'static> Pager<T> {
    /// Create a pager starting at the first page.
    pub fn new(fetcher: impl FetchPage<T>) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            state: PagerState::First,
        }
    }

    /// Create a pager resuming at the page identified by `token`.
    pub fn with_continuation(fetcher: impl FetchPage<T>, token: impl Into<String>) -> Self {
        Self::new(fetcher).continue_from(token)
    }

    /// Move this pager to the page identified by `token`.
    ///
    /// An empty token means the first page.
    pub fn continue_from(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.state = if token.is_empty() {
            PagerState::First
        } else {
            PagerState::Next(token)
        };
        self
    }

    /// Token the next call to [`Pager::next_page`] will send.
    ///
    /// Persist it to resume the listing later with [`Pager::with_continuation`].
    /// `None` before the first page and after the last one.
    pub fn continuation_token(&self) -> Option<&str> {
        match &self.state {
            PagerState::Next(token) => Some(token),
            _ => None,
        }
    }

    /// Whether the last page has been returned (or an error happened).
    pub fn is_done(&self) -> bool {
        self.state == PagerState::Done
    }

    /// Go back to the first page.
    pub fn restart(&mut self) {
        self.state = PagerState::First;
    }

    /// Fetch the next page.
    ///
    /// Returns `Ok(None)` once the listing is over. After an error the pager
    /// is done, [`Pager::restart`] or a new pager is needed to try again.
    pub async fn next_page(&mut self) -> Result<Option<Page<T>>> {
        let token = match &self.state {
            PagerState::Done => return Ok(None),
            PagerState::First => None,
            PagerState::Next(token) => Some(token.clone()),
        };

        let page = match self.fetcher.fetch_page(token.clone()).await {
            Ok(page) => page,
            Err(err) => {
                self.state = PagerState::Done;
                return Err(err);
            }
        };

        match page.continuation_token.as_deref().filter(|t| !t.is_empty()) {
            None => self.state = PagerState::Done,
            Some(next) if Some(next) == token.as_deref() => {
                self.state = PagerState::Done;
                return Err(Error::unexpected(format!(
                    "service returned the continuation token it was given: {next}"
                )));
            }
            Some(next) => self.state = PagerState::Next(next.to_string()),
        }

        Ok(Some(page))
    }

    /// Drain every remaining page and return their items.
    pub async fn collect_items(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page.items);
        }
        Ok(items)
    }

    /// Turn the pager into a stream of pages. The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Page<T>>> + Send {
        stream::unfold(self, |mut pager| async move {
            match pager.next_page().await {
                Ok(Some(page)) => Some((Ok(page), pager)),
                Ok(None) => None,
                Err(err) => Some((Err(err), pager)),
            }
        })
    }

    /// Turn the pager into a stream of items.
    pub fn into_item_stream(self) -> impl Stream<Item = Result<T>> + Send {
        self.into_stream()
            .map_ok(|page| stream::iter(page.items.into_iter().map(Ok)))
            .try_flatten()
    }
}

/// Decodes one response body into a page.
pub type DecodePage<T> = fn(&Bytes) -> Result<Page<T>>;

/// Build a pager following the next links returned by a service.
///
/// `first` is sent as is for the first page. For the following pages the
/// continuation token is a link: absolute links are used as is, rooted or
/// query-only links are resolved against `first`. Follow-up requests are
/// `GET`s carrying the headers of `first`, minus its body headers.
pub fn next_link_pager<T: Send + 'static>(
    pipeline: Pipeline,
    operation: &str,
    first: http::Request<Bytes>,
    decode: DecodePage<T>,
) -> Pager<T> {
    let operation = operation.to_string();

    Pager::new(move |link: Option<String>| {
        let pipeline = pipeline.clone();
        let operation = operation.clone();
        let req = match link {
            None => Ok(clone_request(&first)),
            Some(link) => follow_link(&first, &link),
        };

        async move {
            let resp = pipeline.send_operation(&operation, req?).await?;
            let resp = check_status(resp)?;
            decode(resp.body())
        }
    })
}

fn follow_link(first: &http::Request<Bytes>, link: &str) -> Result<http::Request<Bytes>> {
    let uri = RequestUrl::parse(first.uri())?.resolve(link)?.build()?;

    let mut req = http::Request::new(Bytes::new());
    *req.method_mut() = http::Method::GET;
    *req.uri_mut() = uri;
    *req.headers_mut() = first.headers().clone();
    for name in [
        http::header::CONTENT_LENGTH,
        http::header::CONTENT_TYPE,
        http::header::CONTENT_ENCODING,
    ] {
        req.headers_mut().remove(name);
    }
    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    /// A listing of `0..total` split in pages of `size`, tokens are offsets.
    fn numbers(
        total: usize,
        size: usize,
        calls: Arc<Mutex<Vec<Option<String>>>>,
    ) -> impl FetchPage<usize> {
        move |token: Option<String>| {
            calls.lock().unwrap().push(token.clone());
            async move {
                let start = match token {
                    None => 0,
                    Some(t) => t
                        .parse::<usize>()
                        .map_err(|_| Error::unexpected("bad token"))?,
                };
                let end = (start + size).min(total);
                let next = (end < total).then(|| end.to_string());
                Ok::<_, Error>(Page::new((start..end).collect(), next))
            }
        }
    }

    #[tokio::test]
    async fn test_pager_is_lazy_and_forward_only() -> Result<()> {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut pager = Pager::new(numbers(5, 2, calls.clone()));
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(pager.continuation_token(), None);

        assert_eq!(pager.next_page().await?.unwrap().items, vec![0, 1]);
        assert_eq!(pager.continuation_token(), Some("2"));
        assert_eq!(pager.next_page().await?.unwrap().items, vec![2, 3]);
        assert_eq!(pager.next_page().await?.unwrap().items, vec![4]);
        assert!(pager.is_done());
        assert!(pager.next_page().await?.is_none());

        assert_eq!(
            *calls.lock().unwrap(),
            vec![None, Some("2".to_string()), Some("4".to_string())]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_pager_resumes_from_token() -> Result<()> {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pager = Pager::with_continuation(numbers(5, 2, calls.clone()), "2");
        assert_eq!(pager.collect_items().await?, vec![2, 3, 4]);

        let mut pager = Pager::with_continuation(numbers(5, 2, calls.clone()), "4");
        pager.next_page().await?;
        pager.restart();
        assert_eq!(pager.collect_items().await?, vec![0, 1, 2, 3, 4]);
        Ok(())
    }

    #[tokio::test]
    async fn test_pager_skips_empty_pages() -> Result<()> {
        let pager = Pager::new(|token: Option<String>| async move {
            Ok::<_, Error>(match token.as_deref() {
                None => Page::new(vec![], Some("a".to_string())),
                Some("a") => Page::new(vec!["x"], Some(String::new())),
                Some(_) => unreachable!(),
            })
        });

        let pages = pager.into_stream().try_collect::<Vec<_>>().await?;
        assert_eq!(pages.len(), 2);
        assert!(pages[0].items.is_empty());
        assert_eq!(pages[1].items, vec!["x"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_pager_rejects_repeated_token() {
        let mut pager = Pager::new(|_: Option<String>| async move {
            Ok::<_, Error>(Page::new(vec![1], Some("same".to_string())))
        });

        assert!(pager.next_page().await.unwrap().is_some());
        let err = pager.next_page().await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Unexpected);
        assert!(pager.is_done());
    }

    #[tokio::test]
    async fn test_item_stream_stops_on_error() {
        let stream = Pager::new(|token: Option<String>| async move {
            match token {
                None => Ok(Page::new(vec![1, 2], Some("next".to_string()))),
                Some(_) => Err::<Page<i32>, _>(Error::io("connection reset")),
            }
        })
        .into_item_stream();

        let items = stream.collect::<Vec<_>>().await;
        assert_eq!(items.len(), 3);
        assert_eq!(*items[0].as_ref().unwrap(), 1);
        assert_eq!(*items[1].as_ref().unwrap(), 2);
        assert!(items[2].is_err());
    }

    #[test]
    fn test_follow_link() -> Result<()> {
        let first = http::Request::post("https://vault.example.com/keys?api-version=7.4")
            .header("x-ms-version", "7.4")
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Bytes::from_static(b"{}"))
            .unwrap();

        let req = follow_link(
            &first,
            "https://vault.example.com/keys?api-version=7.4&$skiptoken=abc",
        )?;
        assert_eq!(req.method(), http::Method::GET);
        assert_eq!(
            req.uri().to_string(),
            "https://vault.example.com/keys?api-version=7.4&$skiptoken=abc"
        );
        assert!(req.body().is_empty());
        assert!(req.headers().get(http::header::CONTENT_TYPE).is_none());
        assert_eq!(req.headers().get("x-ms-version").unwrap(), "7.4");

        let req = follow_link(&first, "/keys?marker=2")?;
        assert_eq!(
            req.uri().to_string(),
            "https://vault.example.com/keys?marker=2"
        );
        Ok(())
    }
}
