//! In-memory wiki for exercising the lister and fetcher without a network.

use crate::fetch::FetchOptions;
use crate::recentchanges::{ArticleReference, NewPages, NewPagesBatch};
use crate::retry::RetryPolicy;
use crate::{Continue, Error, Extracts, Since};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

pub fn reference(title: &str, timestamp: &str) -> ArticleReference {
    ArticleReference {
        ns: 0,
        title: title.to_owned(),
        created_at: DateTime::parse_from_rfc3339(timestamp)
            .unwrap()
            .with_timezone(&Utc),
    }
}

/// Options with no delays and three attempts for both listing and fetching.
pub fn options(since: &str, max_articles: usize) -> FetchOptions {
    let mut options = FetchOptions::new("de", since, max_articles, "unused.txt").unwrap();
    options.delay = Duration::ZERO;
    options.list_retry = RetryPolicy::fixed(3, Duration::ZERO);
    options.fetch_retry = RetryPolicy::incremental(3, Duration::ZERO);
    options
}

/// Serves fixed listing batches, linked by `rccontinue` values "1", "2", ...
/// Every listed title has the text "Text of <title>" unless removed.
///
/// The batches ignore the requested limit, like an upstream that over-delivers.
#[derive(Default)]
pub struct FakeWiki {
    batches: Vec<Vec<ArticleReference>>,
    missing: HashSet<String>,
    flaky: RefCell<HashMap<String, u32>>,
    listing_failures: Cell<u32>,
    broken_batch: Cell<Option<usize>>,
    list_calls: RefCell<Vec<(usize, Option<String>)>>,
    extract_calls: RefCell<Vec<String>>,
}
impl FakeWiki {
    pub fn new(batches: Vec<Vec<ArticleReference>>) -> FakeWiki {
        FakeWiki {
            batches,
            ..FakeWiki::default()
        }
    }
    pub fn without(mut self, title: &str) -> FakeWiki {
        self.missing.insert(title.to_owned());
        self
    }
    /// The next `failures` extract requests for `title` fail transiently.
    pub fn flaky(self, title: &str, failures: u32) -> FakeWiki {
        self.flaky.borrow_mut().insert(title.to_owned(), failures);
        self
    }
    pub fn fail_listing(&self, failures: u32) {
        self.listing_failures.set(failures);
    }
    /// Every request for batch `index` fails transiently.
    pub fn break_batch(&self, index: usize) {
        self.broken_batch.set(Some(index));
    }
    pub fn limits(&self) -> Vec<usize> {
        self.list_calls.borrow().iter().map(|(limit, _)| *limit).collect()
    }
    pub fn cursors(&self) -> Vec<Option<String>> {
        self.list_calls.borrow().iter().map(|(_, cont)| cont.clone()).collect()
    }
    pub fn extracted(&self) -> Vec<String> {
        self.extract_calls.borrow().clone()
    }
}
impl NewPages for FakeWiki {
    fn new_pages(
        &self,
        _since: &Since,
        limit: usize,
        cont: Option<&Continue>,
    ) -> Result<NewPagesBatch, Error> {
        let token = cont.and_then(|cont| cont.get("rccontinue")).map(str::to_owned);
        self.list_calls.borrow_mut().push((limit, token.clone()));
        if self.listing_failures.get() > 0 {
            self.listing_failures.set(self.listing_failures.get() - 1);
            return Err(Error::Status(StatusCode::SERVICE_UNAVAILABLE));
        }
        let index: usize = token.map(|t| t.parse().unwrap()).unwrap_or(0);
        if self.broken_batch.get() == Some(index) {
            return Err(Error::Status(StatusCode::SERVICE_UNAVAILABLE));
        }
        let next = index + 1;
        Ok(NewPagesBatch {
            pages: self.batches.get(index).cloned().unwrap_or_default(),
            cont: (next < self.batches.len())
                .then(|| Continue::from_rccontinue(&next.to_string())),
        })
    }
}
impl Extracts for FakeWiki {
    fn extract(&self, title: &str) -> Result<String, Error> {
        self.extract_calls.borrow_mut().push(title.to_owned());
        if let Some(left) = self.flaky.borrow_mut().get_mut(title) {
            if *left > 0 {
                *left -= 1;
                return Err(Error::Status(StatusCode::BAD_GATEWAY));
            }
        }
        if self.missing.contains(title) {
            return Err(Error::Unavailable(title.to_owned()));
        }
        Ok(format!("Text of {}", title))
    }
}
