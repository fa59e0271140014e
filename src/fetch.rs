use crate::recentchanges::{ArticleReference, NewPages, TitleLister};
use crate::retry::RetryPolicy;
use crate::{validate_language, Config, Continue, Error, Extracts, Mediawiki, Since};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

pub const DELIMITER: &str =
    "================================================================================";

/// Everything a run needs, fixed before the first request is made.
#[derive(Clone, Debug)]
pub struct FetchOptions {
    /// Wikipedia edition; [`FetchOptions::client`] builds the matching client.
    pub language: String,
    pub since: Since,
    pub max_articles: usize,
    pub output: PathBuf,
    /// Pause after every article and between listing pages.
    pub delay: Duration,
    pub list_retry: RetryPolicy,
    pub fetch_retry: RetryPolicy,
    /// Listing continuation to start from instead of the beginning.
    pub cursor: Option<Continue>,
}
impl FetchOptions {
    pub fn new(
        language: &str,
        since: &str,
        max_articles: usize,
        output: impl Into<PathBuf>,
    ) -> Result<FetchOptions, Error> {
        validate_language(language)?;
        Ok(FetchOptions {
            language: language.to_owned(),
            since: Since::parse(since)?,
            max_articles,
            output: output.into(),
            delay: Duration::from_millis(200),
            list_retry: RetryPolicy::fixed(3, Duration::from_secs(1)),
            fetch_retry: RetryPolicy::incremental(3, Duration::from_secs(1)),
            cursor: None,
        })
    }
    /// Client for this run's language edition.
    pub fn client(&self, config: Config) -> Result<Mediawiki, Error> {
        Mediawiki::wikipedia(&self.language, config)
    }
}

/// `wikipedia_articles_<lang>_<max>_since_<date>.txt`
pub fn default_output(language: &str, max_articles: usize, since: &str) -> PathBuf {
    let since = since.replace(':', "-");
    PathBuf::from(format!(
        "wikipedia_articles_{}_{}_since_{}.txt",
        language, max_articles, since
    ))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArticleRecord {
    pub title: String,
    pub content: String,
}
impl ArticleRecord {
    /// Writes the whole record in one call and flushes it.
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(self.to_string().as_bytes())?;
        out.flush()
    }
}
impl fmt::Display for ArticleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", DELIMITER)?;
        writeln!(f, "TITLE: {}", self.title)?;
        writeln!(f, "{}", DELIMITER)?;
        writeln!(f)?;
        writeln!(f, "{}", self.content)?;
        writeln!(f)
    }
}

pub struct ArticleFetcher<'a, W: ?Sized> {
    wiki: &'a W,
    retry: RetryPolicy,
    delay: Duration,
}
impl<'a, W: Extracts + ?Sized> ArticleFetcher<'a, W> {
    pub fn new(wiki: &'a W, options: &FetchOptions) -> ArticleFetcher<'a, W> {
        ArticleFetcher {
            wiki,
            retry: options.fetch_retry,
            delay: options.delay,
        }
    }
    /// Fetches one article, then waits out the rate-limit delay whatever the
    /// outcome.
    pub fn fetch(&self, reference: &ArticleReference) -> Result<ArticleRecord, Error> {
        let title = &reference.title;
        let result = self.retry.run(title, || self.wiki.extract(title));
        sleep(self.delay);
        Ok(ArticleRecord {
            title: title.clone(),
            content: result?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub listed: usize,
    pub written: usize,
    pub skipped: usize,
}

/// Lists new articles and writes each one that can be fetched to
/// `options.output`, which is created or truncated first.
///
/// Listing failures abort the run. Articles that cannot be fetched are
/// logged and skipped.
pub fn fetch_and_save<W>(wiki: &W, options: &FetchOptions) -> Result<FetchSummary, Error>
where
    W: NewPages + Extracts + ?Sized,
{
    let mut out = BufWriter::new(File::create(&options.output)?);
    let mut summary = FetchSummary::default();
    if options.max_articles == 0 {
        tracing::info!(output = %options.output.display(), "nothing to fetch");
        return Ok(summary);
    }
    tracing::info!(
        language = %options.language,
        since = %options.since,
        max_articles = options.max_articles,
        "fetching new articles"
    );
    let fetcher = ArticleFetcher::new(wiki, options);
    for reference in TitleLister::new(wiki, options) {
        let reference = reference?;
        summary.listed += 1;
        match fetcher.fetch(&reference) {
            Ok(record) => {
                record.write_to(&mut out)?;
                summary.written += 1;
                tracing::info!(
                    title = %record.title,
                    fetched = summary.written,
                    remaining = options.max_articles - summary.written,
                    "saved article"
                );
            }
            Err(e) => {
                summary.skipped += 1;
                tracing::warn!(title = %reference.title, error = %e, "skipping article");
            }
        }
        if summary.written >= options.max_articles {
            break;
        }
    }
    out.flush()?;
    log_summary(&summary, &options.output);
    Ok(summary)
}

fn log_summary(summary: &FetchSummary, output: &Path) {
    if summary.listed == 0 {
        tracing::warn!("no articles found");
    }
    tracing::info!(
        listed = summary.listed,
        written = summary.written,
        skipped = summary.skipped,
        output = %output.display(),
        "done"
    );
}
