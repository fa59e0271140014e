// Copyright © 2025, Peter Atashian
//! Fetch Wikipedia articles created since a given date and dump their plain
//! text to a file.
//!
//! The crate is split the same way a MediaWiki client usually is: [`Mediawiki`]
//! owns the HTTP client and knows how to talk to `api.php`, while individual
//! capabilities ([`recentchanges::NewPages`], [`extracts::Extracts`]) are
//! traits implemented on it. The run itself lives in [`fetch`].

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

pub mod extracts;
pub mod fetch;
pub mod recentchanges;
pub mod retry;
pub mod since;
#[cfg(test)]
mod test_helpers;

pub use crate::extracts::Extracts;
pub use crate::fetch::{fetch_and_save, ArticleRecord, FetchOptions, FetchSummary};
pub use crate::recentchanges::{ArticleReference, NewPages, TitleLister};
pub use crate::since::Since;

pub type Json = serde_json::Value;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("API error {code}: {info}")]
    Api { code: String, info: String },
    #[error("unexpected response: {0}")]
    Json(Json),
    #[error("invalid date {0:?}, expected YYYY-MM-DD or an ISO-8601 timestamp")]
    InvalidDate(String),
    #[error("invalid language code {0:?}")]
    InvalidLanguage(String),
    #[error("page unavailable: {0}")]
    Unavailable(String),
}

fn default_useragent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned()
}
fn default_timeout() -> u64 {
    30
}

/// Client settings, loadable from a JSON file.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_useragent")]
    pub useragent: String,
    /// Full URL of `api.php`. When absent it is derived from the language.
    #[serde(default)]
    pub baseapi: Option<String>,
    #[serde(default)]
    pub maxlag: Option<u32>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}
impl Default for Config {
    fn default() -> Config {
        Config {
            useragent: default_useragent(),
            baseapi: None,
            maxlag: None,
            timeout_secs: default_timeout(),
        }
    }
}
impl Config {
    pub fn load_path(path: &Path) -> Result<Config, Error> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Checks a Wikipedia subdomain such as `de`, `als`, `zh-yue` or `simple`.
pub fn validate_language(lang: &str) -> Result<(), Error> {
    static LANG: OnceLock<Regex> = OnceLock::new();
    let reg = LANG.get_or_init(|| Regex::new(r"^([a-z]{2,3}|simple)(-[a-z0-9]+)*$").expect("valid regex"));
    if reg.is_match(lang) {
        Ok(())
    } else {
        Err(Error::InvalidLanguage(lang.to_owned()))
    }
}

pub struct Mediawiki {
    client: Client,
    baseapi: String,
    config: Config,
}
impl Mediawiki {
    pub fn new(baseapi: &str, config: Config) -> Result<Mediawiki, Error> {
        let client = Client::builder()
            .user_agent(config.useragent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Mediawiki {
            client,
            baseapi: baseapi.to_owned(),
            config,
        })
    }
    /// Client for `https://<lang>.wikipedia.org/w/api.php`, unless the config
    /// names another endpoint.
    pub fn wikipedia(lang: &str, config: Config) -> Result<Mediawiki, Error> {
        validate_language(lang)?;
        let baseapi = match &config.baseapi {
            Some(baseapi) => baseapi.clone(),
            None => format!("https://{}.wikipedia.org/w/api.php", lang),
        };
        Mediawiki::new(&baseapi, config)
    }
    pub fn baseapi(&self) -> &str {
        &self.baseapi
    }
    pub fn request(&self) -> RequestBuilder {
        let mut request = RequestBuilder {
            mw: self,
            args: Vec::new(),
        };
        request.arg("format", "json");
        request.arg("formatversion", "2");
        if let Some(maxlag) = self.config.maxlag {
            request.arg("maxlag", maxlag.to_string());
        }
        request
    }
    pub fn query(&self) -> QueryBuilder {
        let mut request = self.request();
        request.arg("action", "query");
        QueryBuilder {
            request,
            cont: None,
        }
    }
    fn do_request(&self, args: &[(String, String)]) -> Result<Json, Error> {
        tracing::debug!(api = %self.baseapi, ?args, "GET");
        let response = self.client.get(&self.baseapi).query(args).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }
        let body = response.text()?;
        let json: Json = serde_json::from_str(&body)?;
        if let Some(error) = json.get("error") {
            let field = |name: &str| error.get(name).and_then(Json::as_str).unwrap_or_default().to_owned();
            return Err(Error::Api {
                code: field("code"),
                info: field("info"),
            });
        }
        Ok(json)
    }
}

pub struct RequestBuilder<'a> {
    mw: &'a Mediawiki,
    args: Vec<(String, String)>,
}
impl<'a> RequestBuilder<'a> {
    pub fn arg(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.args.push((key.into(), value.into()));
    }
    pub fn get(&self) -> Result<Json, Error> {
        self.mw.do_request(&self.args)
    }
}

/// Opaque continuation returned by `action=query`, passed back verbatim.
#[derive(Clone, Debug, PartialEq)]
pub struct Continue(serde_json::Map<String, Json>);
impl Continue {
    /// Rebuilds a recentchanges continuation from a bare `rccontinue` value.
    pub fn from_rccontinue(token: &str) -> Continue {
        let mut map = serde_json::Map::new();
        map.insert("rccontinue".into(), Json::String(token.into()));
        map.insert("continue".into(), Json::String("-||".into()));
        Continue(map)
    }
    fn from_response(json: &Json) -> Option<Continue> {
        json.get("continue")
            .and_then(Json::as_object)
            .map(|map| Continue(map.clone()))
    }
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Json::as_str)
    }
    fn args(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.0.iter().map(|(key, value)| {
            let value = match value {
                Json::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
    }
}

/// One page of an `action=query` list.
#[derive(Debug)]
pub struct Batch {
    pub items: Vec<Json>,
    pub cont: Option<Continue>,
}

pub struct QueryBuilder<'a> {
    request: RequestBuilder<'a>,
    cont: Option<Continue>,
}
impl<'a> QueryBuilder<'a> {
    pub fn arg(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.request.arg(key, value);
    }
    pub fn resume(&mut self, cont: Option<&Continue>) {
        self.cont = cont.cloned();
    }
    /// Runs the query and returns the items found under `query.<name>`.
    pub fn list(&self, name: &str) -> Result<Batch, Error> {
        let mut args = self.request.args.clone();
        if let Some(cont) = &self.cont {
            args.extend(cont.args());
        }
        let json = self.request.mw.do_request(&args)?;
        let items = match json.get("query") {
            Some(query) => query
                .get(name)
                .and_then(Json::as_array)
                .cloned()
                .ok_or_else(|| Error::Json(json.clone()))?,
            None => Vec::new(),
        };
        Ok(Batch {
            items,
            cont: Continue::from_response(&json),
        })
    }
    /// Runs the query and returns the `query` member.
    pub fn get(&self) -> Result<Json, Error> {
        let json = self.request.get()?;
        match json.get("query") {
            Some(query) => Ok(query.clone()),
            None => Err(Error::Json(json)),
        }
    }
}
