use crate::{Error, Json, Mediawiki};

pub trait Extracts {
    /// Plain-text extract of a page, with markup stripped.
    ///
    /// Missing pages, broken redirects and pages without any text fail with
    /// [`Error::Unavailable`].
    fn extract(&self, title: &str) -> Result<String, Error>;
}
impl Extracts for Mediawiki {
    fn extract(&self, title: &str) -> Result<String, Error> {
        let mut query = self.query();
        query.arg("prop", "extracts");
        query.arg("explaintext", "1");
        query.arg("exsectionformat", "plain");
        query.arg("redirects", "1");
        query.arg("titles", title);
        let json = query.get()?;
        page_text(title, &json)
    }
}

fn page_text(title: &str, query: &Json) -> Result<String, Error> {
    let page = query
        .get("pages")
        .and_then(Json::as_array)
        .and_then(|pages| pages.first())
        .ok_or_else(|| Error::Json(query.clone()))?;
    let flag = |name: &str| page.get(name).and_then(Json::as_bool).unwrap_or(false);
    if flag("missing") || flag("invalid") {
        return Err(Error::Unavailable(title.to_owned()));
    }
    match page.get("extract").and_then(Json::as_str).map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_owned()),
        _ => Err(Error::Unavailable(title.to_owned())),
    }
}
