//! Page fetching
//!
//! Retrieves HTML pages over blocking HTTP with a browser identity and
//! yields the decoded text. Everything downstream consumes pages through the
//! [`PageSource`] trait so extraction never depends on the network directly.

use flate2::read::GzDecoder;
use log::debug;
use reqwest::blocking::ClientBuilder;
use reqwest::header::CONTENT_ENCODING;
use std::io::Read;
use thiserror::Error;

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be set up
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Connection or transport failure
    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    /// The server answered with a non-success status
    #[error("HTTP {status} while fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// The body declared gzip encoding but could not be decompressed
    #[error("Failed to decompress response body: {0}")]
    Decompress(#[source] std::io::Error),

    /// The body is not valid UTF-8
    #[error("Response body is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
}

/// A fetched page, never modified after creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePage {
    /// The URL the page was requested from
    pub url: String,
    /// Decoded page text
    pub html: String,
}

/// Anything that can turn a URL into page text
pub trait PageSource {
    /// Fetches the page at `url`
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on transport failures, HTTP error statuses or
    /// bodies that cannot be decoded. No partial pages are returned.
    fn fetch(&self, url: &str) -> Result<SourcePage, FetchError>;
}

/// Blocking HTTP page source
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Creates a fetcher sending the given user agent
    ///
    /// No timeout is configured beyond the transport default.
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Value of the `User-Agent` header on every request
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the user agent is not a valid
    /// header value or the TLS backend cannot be initialized.
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        Self::with_builder(reqwest::blocking::Client::builder(), user_agent)
    }

    fn with_builder(builder: ClientBuilder, user_agent: &str) -> Result<Self, FetchError> {
        let client = builder
            .user_agent(user_agent)
            .build()
            .map_err(FetchError::ClientBuild)?;

        Ok(Self { client })
    }
}

impl PageSource for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<SourcePage, FetchError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let gzipped = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case("gzip"));

        let body = response.bytes().map_err(|e| FetchError::Request {
            url: url.to_string(),
            source: e,
        })?;

        Ok(SourcePage {
            url: url.to_string(),
            html: decode_body(&body, gzipped)?,
        })
    }
}

/// Decodes a response body as UTF-8, gunzipping it first when requested
pub(crate) fn decode_body(body: &[u8], gzipped: bool) -> Result<String, FetchError> {
    if !gzipped {
        return Ok(String::from_utf8(body.to_vec())?);
    }

    let mut decompressed = Vec::new();
    GzDecoder::new(body)
        .read_to_end(&mut decompressed)
        .map_err(FetchError::Decompress)?;

    Ok(String::from_utf8(decompressed)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::cell::RefCell;
    use crate::config::DEFAULT_USER_AGENT;
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// In-memory page source recording every requested URL
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pages: HashMap<String, String>,
        pub requests: RefCell<Vec<String>>,
    }

    impl FakeSource {
        pub(crate) fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl PageSource for FakeSource {
        fn fetch(&self, url: &str) -> Result<SourcePage, FetchError> {
            self.requests.borrow_mut().push(url.to_string());
            match self.pages.get(url) {
                Some(html) => Ok(SourcePage {
                    url: url.to_string(),
                    html: html.clone(),
                }),
                None => Err(FetchError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    /// Serves one canned response on a local port
    ///
    /// Returns the base URL and a handle yielding the raw request head.
    fn serve_once(head: &str, body: Vec<u8>) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/page", listener.local_addr().unwrap());
        let head = head.to_string();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request: Vec<u8> = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let mut response = format!(
                "{head}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .into_bytes();
            response.extend_from_slice(&body);
            // the client may hang up early on error statuses
            let _ = stream.write_all(&response);

            String::from_utf8_lossy(&request).into_owned()
        });

        (url, handle)
    }

    fn local_fetcher() -> HttpFetcher {
        let builder = reqwest::blocking::Client::builder().no_proxy();
        HttpFetcher::with_builder(builder, DEFAULT_USER_AGENT).unwrap()
    }

    fn header_value(request: &str, name: &str) -> Option<String> {
        request.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }

    #[test]
    fn test_http_fetch_sends_user_agent_and_gunzips() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<video src=\"https://cdn/live.m3u8\">").unwrap();
        let compressed = encoder.finish().unwrap();

        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Encoding: gzip",
            compressed,
        );

        let page = local_fetcher().fetch(&url).unwrap();
        let request = server.join().unwrap();

        assert_eq!(page.url, url);
        assert_eq!(page.html, "<video src=\"https://cdn/live.m3u8\">");
        assert_eq!(
            header_value(&request, "user-agent").as_deref(),
            Some(DEFAULT_USER_AGENT)
        );
    }

    #[test]
    fn test_http_fetch_plain_body() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html",
            b"<p>plain</p>".to_vec(),
        );

        let page = local_fetcher().fetch(&url).unwrap();
        server.join().unwrap();

        assert_eq!(page.html, "<p>plain</p>");
    }

    #[test]
    fn test_http_fetch_error_status() {
        let (url, server) = serve_once("HTTP/1.1 403 Forbidden", b"denied".to_vec());

        let result = local_fetcher().fetch(&url);
        server.join().unwrap();

        assert!(matches!(
            result,
            Err(FetchError::HttpStatus { status: 403, .. })
        ));
    }

    #[test]
    fn test_invalid_user_agent_fails_client_build() {
        let result = HttpFetcher::new("broken\nagent");

        let Err(error) = result else {
            panic!("client with an invalid user agent was built");
        };
        assert!(matches!(error, FetchError::ClientBuild(_)));
        assert!(error.to_string().starts_with("Failed to build HTTP client"));
    }

    #[test]
    fn test_decode_plain_body() {
        let html = decode_body("<p>Привет</p>".as_bytes(), false).unwrap();
        assert_eq!(html, "<p>Привет</p>");
    }

    #[test]
    fn test_decode_gzipped_body() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<html>stream.m3u8</html>").unwrap();
        let compressed = encoder.finish().unwrap();

        let html = decode_body(&compressed, true).unwrap();
        assert_eq!(html, "<html>stream.m3u8</html>");
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let result = decode_body(&[0xff, 0xfe, 0x00], false);
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_bad_gzip() {
        let result = decode_body(b"definitely not gzip", true);
        assert!(matches!(result, Err(FetchError::Decompress(_))));
    }

    #[test]
    fn test_fake_source_records_requests() {
        let source = FakeSource::default().with_page("https://a/", "<p>a</p>");
        assert!(source.fetch("https://a/").is_ok());
        assert!(source.fetch("https://b/").is_err());
        assert_eq!(source.request_count(), 2);
    }
}
