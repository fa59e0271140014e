// Copyright © 2025, Peter Atashian
use crate::fetch::FetchOptions;
use crate::retry::RetryPolicy;
use crate::{Continue, Error, Json, Mediawiki, Since};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::thread::sleep;
use std::time::Duration;

/// Largest `rclimit` the API grants to anonymous clients.
pub const MAX_LIMIT: usize = 500;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArticleReference {
    pub ns: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}
impl ArticleReference {
    fn from_json(json: &Json) -> Result<ArticleReference, Error> {
        let bad = || Error::Json(json.clone());
        let title = json.get("title").and_then(Json::as_str).ok_or_else(bad)?;
        let timestamp = json.get("timestamp").and_then(Json::as_str).ok_or_else(bad)?;
        let created_at = DateTime::parse_from_rfc3339(timestamp).map_err(|_| bad())?;
        Ok(ArticleReference {
            ns: json.get("ns").and_then(Json::as_i64).unwrap_or(0),
            title: title.to_owned(),
            created_at: created_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Default)]
pub struct NewPagesBatch {
    pub pages: Vec<ArticleReference>,
    pub cont: Option<Continue>,
}

pub trait NewPages {
    /// One page of main-namespace creations, oldest first, starting at `since`.
    fn new_pages(
        &self,
        since: &Since,
        limit: usize,
        cont: Option<&Continue>,
    ) -> Result<NewPagesBatch, Error>;
}
impl NewPages for Mediawiki {
    fn new_pages(
        &self,
        since: &Since,
        limit: usize,
        cont: Option<&Continue>,
    ) -> Result<NewPagesBatch, Error> {
        let mut query = self.query();
        query.arg("list", "recentchanges");
        query.arg("rctype", "new");
        query.arg("rcnamespace", "0");
        query.arg("rcstart", since.api_timestamp());
        query.arg("rcdir", "newer");
        query.arg("rcprop", "title|timestamp");
        query.arg("rclimit", limit.min(MAX_LIMIT).to_string());
        query.resume(cont);
        let batch = query.list("recentchanges")?;
        let pages = batch
            .items
            .iter()
            .map(ArticleReference::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NewPagesBatch {
            pages,
            cont: batch.cont,
        })
    }
}

/// Lazily walks the new-page listing, threading the continuation through
/// successive requests.
///
/// Ends when the listing runs out, when an entry predates `since`, or once
/// `max_articles` references have been yielded. A listing failure that
/// survives the retry policy is yielded once as `Err` and ends the sequence.
pub struct TitleLister<'a, W: ?Sized> {
    wiki: &'a W,
    since: Since,
    remaining: usize,
    retry: RetryPolicy,
    pause: Duration,
    cursor: Option<Continue>,
    buffer: VecDeque<ArticleReference>,
    requested: bool,
    exhausted: bool,
}
impl<'a, W: NewPages + ?Sized> TitleLister<'a, W> {
    pub fn new(wiki: &'a W, options: &FetchOptions) -> TitleLister<'a, W> {
        TitleLister {
            wiki,
            since: options.since,
            remaining: options.max_articles,
            retry: options.list_retry,
            pause: options.delay,
            cursor: options.cursor.clone(),
            buffer: VecDeque::new(),
            requested: false,
            exhausted: false,
        }
    }
    /// Continuation for the next listing request, if any.
    pub fn cursor(&self) -> Option<&Continue> {
        self.cursor.as_ref()
    }
    fn finish(&mut self) {
        self.remaining = 0;
        self.buffer.clear();
        self.exhausted = true;
    }
    fn fill(&mut self) -> Result<(), Error> {
        if self.requested {
            sleep(self.pause);
        }
        self.requested = true;
        let limit = self.remaining.min(MAX_LIMIT);
        let (wiki, since, cursor) = (self.wiki, &self.since, self.cursor.as_ref());
        let batch = self
            .retry
            .run("list new pages", || wiki.new_pages(since, limit, cursor))?;
        tracing::info!(count = batch.pages.len(), "listed new pages");
        if let Some(cont) = &batch.cont {
            tracing::debug!(rccontinue = cont.get("rccontinue"), "next listing cursor");
        }
        self.exhausted = batch.cont.is_none() || batch.pages.is_empty();
        self.cursor = batch.cont;
        self.buffer.extend(batch.pages);
        Ok(())
    }
}
impl<'a, W: NewPages + ?Sized> Iterator for TitleLister<'a, W> {
    type Item = Result<ArticleReference, Error>;
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.remaining == 0 {
                return None;
            }
            if let Some(reference) = self.buffer.pop_front() {
                if !self.since.admits(&reference.created_at) {
                    tracing::debug!(title = %reference.title, created_at = %reference.created_at, "listing reached entries before cutoff");
                    self.finish();
                    return None;
                }
                if reference.ns != 0 {
                    continue;
                }
                self.remaining -= 1;
                return Some(Ok(reference));
            }
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fill() {
                self.finish();
                return Some(Err(e));
            }
        }
    }
}
