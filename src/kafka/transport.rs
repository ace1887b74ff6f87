use bytes::Bytes;
use log::debug;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::config::Config;
use super::error::{Error, ErrorMessage, Result};

/// Joins `segments` onto the path of `base`, percent-encoding each segment.
pub fn url_join(base: &str, segments: &[&str]) -> Result<String> {
    let base = Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{}: {}", base, e)))?;
    Ok(join(&base, segments)?.to_string())
}

fn join(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::InvalidUrl(format!("{} cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// One REST call: method, path under the base URL, optional query and JSON body,
/// and the status code that counts as success.
#[derive(Debug)]
pub(crate) struct Call<'a> {
    method: Method,
    segments: &'a [&'a str],
    query: Vec<(&'static str, String)>,
    body: Option<Vec<u8>>,
    expected: StatusCode,
}

impl<'a> Call<'a> {
    fn new(method: Method, segments: &'a [&'a str]) -> Self {
        Self {
            method,
            segments,
            query: Vec::new(),
            body: None,
            expected: StatusCode::OK,
        }
    }

    pub(crate) fn get(segments: &'a [&'a str]) -> Self {
        Self::new(Method::GET, segments)
    }

    pub(crate) fn post(segments: &'a [&'a str]) -> Self {
        Self::new(Method::POST, segments)
    }

    pub(crate) fn delete(segments: &'a [&'a str]) -> Self {
        Self::new(Method::DELETE, segments)
    }

    pub(crate) fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    pub(crate) fn query(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    pub(crate) fn expect(mut self, status: StatusCode) -> Self {
        self.expected = status;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Transport {
    http: reqwest::Client,
    base: Url,
    accept: HeaderValue,
    content_type: HeaderValue,
}

impl Transport {
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let base = Url::parse(&config.url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", config.url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidUrl(format!("{} cannot be a base URL", config.url)));
        }

        let accept = HeaderValue::from_str(&config.accept)
            .map_err(|_| Error::InvalidArgument(format!("accept header {:?}", config.accept)))?;
        let content_type = HeaderValue::from_str(&config.content_type).map_err(|_| {
            Error::InvalidArgument(format!("content type header {:?}", config.content_type))
        })?;

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base,
            accept,
            content_type,
        })
    }

    pub(crate) fn base(&self) -> &Url {
        &self.base
    }

    /// Executes the call and returns the raw body once the status matched.
    pub(crate) async fn send(&self, call: Call<'_>) -> Result<Bytes> {
        let url = join(&self.base, call.segments)?;
        debug!("{} {}", call.method, url);

        let mut request = self
            .http
            .request(call.method.clone(), url.clone())
            .header(ACCEPT, self.accept.clone());
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(body) = call.body {
            request = request.header(CONTENT_TYPE, self.content_type.clone()).body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!("{} {} -> {} ({} bytes)", call.method, url, status, body.len());

        validate_status(status, call.expected, &body)?;
        Ok(body)
    }

    /// Executes the call and decodes the body, an empty body being the zero value.
    pub(crate) async fn fetch<T>(&self, call: Call<'_>) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let body = self.send(call).await?;
        decode(&body)
    }
}

fn validate_status(status: StatusCode, expected: StatusCode, body: &Bytes) -> Result<()> {
    if status == expected {
        return Ok(());
    }

    if is_blank(body) {
        return Err(Error::Status {
            status,
            error_code: 0,
            message: String::new(),
        });
    }

    match serde_json::from_slice::<ErrorMessage>(body) {
        Ok(msg) => Err(Error::Status {
            status,
            error_code: msg.error_code,
            message: msg.message,
        }),
        Err(_) => Err(Error::Api {
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        }),
    }
}

fn decode<T>(body: &Bytes) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if is_blank(body) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}

fn is_blank(body: &[u8]) -> bool {
    body.iter().all(|b| b.is_ascii_whitespace())
}
