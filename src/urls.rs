//! URL helpers shared by the extractors and the navigator

use url::Url;

/// Completes a link found on an RT page against the site origin
///
/// Absolute `http(s)` links pass through unchanged. Protocol-relative links
/// get `https:`, everything else is appended to the origin.
pub fn absolutize(origin: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("{origin}{href}")
    } else {
        format!("{origin}/{href}")
    }
}

/// Resolves an embed `src` against the page that contained it
///
/// Returns `None` if neither the page URL nor the resulting link parse.
pub fn resolve_embed(page_url: &str, src: &str) -> Option<Url> {
    match Url::parse(src) {
        Ok(url) => Some(url),
        Err(_) => Url::parse(page_url).ok()?.join(src).ok(),
    }
}

/// Host part of a URL, if it has one
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_string)
}

/// Builds a plugin callback URL of the form `base?k=v&k=v`
pub fn plugin_url(base: &str, params: &[(&str, &str)]) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{base}?{query}")
}
