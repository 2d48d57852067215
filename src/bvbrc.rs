use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, info, warn};

use crate::domain::GenomeId;
use crate::error::FetchError;

/// Back-off grows by this much per failed attempt.
const RETRY_STEP: Duration = Duration::from_millis(500);

pub const GENOME_SEQUENCE_URL: &str = "https://patricbrc.org/api/genome_sequence/?&http_download=true&http_accept=application/dna+fasta";

/// The service answers browser-shaped requests; these mirror a desktop Firefox.
pub const DEFAULT_HEADERS: [(&str, &str); 13] = [
    (
        "User-Agent",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:105.0) Gecko/20100101 Firefox/105.0",
    ),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "en-GB,en;q=0.5"),
    ("Origin", "https://www.bv-brc.org"),
    ("DNT", "1"),
    ("Connection", "keep-alive"),
    ("Referer", "https://www.bv-brc.org/"),
    ("Upgrade-Insecure-Requests", "1"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "cross-site"),
    ("Sec-Fetch-User", "?1"),
    ("Sec-GPC", "1"),
];

pub trait SequenceClient: Send + Sync {
    /// Returns the FASTA text for one genome; an empty string is a valid answer.
    fn fetch_fasta(&self, id: &GenomeId) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub retries: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            url: GENOME_SEQUENCE_URL.to_string(),
            headers: DEFAULT_HEADERS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            retries: 0,
        }
    }
}

impl ClientSettings {
    /// A header set from the config file replaces the built-in one.
    pub fn with_overrides(
        mut self,
        url: Option<String>,
        headers: Option<BTreeMap<String, String>>,
    ) -> Self {
        if let Some(url) = url {
            self.url = url;
        }
        if let Some(headers) = headers {
            self.headers = headers.into_iter().collect();
        }
        self
    }
}

#[derive(Clone)]
pub struct BvbrcHttpClient {
    client: Client,
    url: String,
    retries: usize,
}

impl BvbrcHttpClient {
    pub fn new(settings: ClientSettings) -> Result<Self, FetchError> {
        let headers = build_headers(&settings.headers)?;
        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| FetchError::ApiHttp(err.to_string()))?;
        Ok(Self {
            client,
            url: settings.url,
            retries: settings.retries,
        })
    }
}

impl SequenceClient for BvbrcHttpClient {
    fn fetch_fasta(&self, id: &GenomeId) -> Result<String, FetchError> {
        let rql = rql_query(id);
        debug!(rql = %rql, "posting genome_sequence query");
        let response = send_with_backoff(id, self.retries, || {
            self.client.post(&self.url).form(&[("rql", &rql)])
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::ApiStatus {
                genome_id: id.to_string(),
                status: status.as_u16(),
            });
        }
        info!(genome_id = %id, status = status.as_u16(), "genome sequence request succeeded");
        response
            .text()
            .map_err(|err| FetchError::ApiHttp(err.to_string()))
    }
}

/// RQL selecting every contig of one genome. The template is already
/// percent-escaped and is form-encoded once more on the wire, which is what
/// the service expects.
pub fn rql_query(id: &GenomeId) -> String {
    format!("in(genome_id%2C({id}))%26sort(%2Bsequence_id)%26limit(2500000)")
}

/// Sends the request built by `request`, retrying up to `retries` more times
/// while the failure looks transient (see `is_retryable_status` and
/// `is_retryable_error`). The last response is returned whatever its status.
fn send_with_backoff<F>(
    genome_id: &GenomeId,
    retries: usize,
    mut request: F,
) -> Result<Response, FetchError>
where
    F: FnMut() -> RequestBuilder,
{
    let mut attempt = 0u32;
    loop {
        let exhausted = attempt as usize >= retries;
        let reason = match request().send() {
            Ok(response) if exhausted || !is_retryable_status(response.status().as_u16()) => {
                return Ok(response);
            }
            Err(err) if exhausted || !is_retryable_error(&err) => {
                return Err(FetchError::ApiHttp(err.to_string()));
            }
            Ok(response) => format!("status {}", response.status()),
            Err(err) => err.to_string(),
        };
        attempt += 1;
        let delay = RETRY_STEP * attempt;
        warn!(
            genome_id = %genome_id,
            attempt,
            reason = %reason,
            delay = ?delay,
            "BV-BRC request failed, retrying"
        );
        thread::sleep(delay);
    }
}

fn build_headers(headers: &[(String, String)]) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|err| FetchError::InvalidHeader {
                name: name.clone(),
                message: err.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|err| FetchError::InvalidHeader {
            name: name.clone(),
            message: err.to_string(),
        })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
