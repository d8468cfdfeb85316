use crate::url::Scheme;
use crate::UrlError;
use url::Url;

/// Query parameters that only track visitors and never change page content
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "_ga", "_gl"];

/// Normalizes a URL into the form used for the visited set and cache keys
///
/// Two links that point at the same page normalize to the same URL: the
/// host is lowercased, dot segments, empty segments and a trailing slash are
/// removed, the fragment is dropped, and the query is stripped of tracking
/// parameters and sorted. The scheme is kept, so `http://` and `https://`
/// variants of a page stay distinct.
///
/// ```
/// use trawl::url::normalize_url;
///
/// let url = normalize_url("http://WWW.EXAMPLE.COM/page/?b=2&a=1#top").unwrap();
/// assert_eq!(url.as_str(), "http://www.example.com/page?a=1&b=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if Scheme::of(&url).is_none() {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    let path = clean_path(url.path());
    url.set_path(&path);
    url.set_fragment(None);

    let query = sorted_query(&url);
    if query.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(query);
    }

    Ok(url)
}

fn clean_path(path: &str) -> String {
    let segments = path.split('/').fold(Vec::new(), |mut kept, segment| {
        match segment {
            "" | "." => {}
            ".." => {
                kept.pop();
            }
            other => kept.push(other),
        }
        kept
    });
    format!("/{}", segments.join("/"))
}

fn sorted_query(url: &Url) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !key.starts_with("utm_") && !TRACKING_PARAMS.contains(&&**key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    pairs.sort();
    pairs
}
