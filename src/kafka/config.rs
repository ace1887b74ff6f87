use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{Error, Result};

pub const DEFAULT_URL: &str = "http://localhost:8082";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_ACCEPT: &str = "application/vnd.kafka+json, application/json";
pub const DEFAULT_CONTENT_TYPE: &str = "application/vnd.kafka+json";

/// Embedded format of keys and values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Binary,
    Avro,
}

/// Where a new consumer starts when it has no committed offset.
/// `Earliest`/`Latest` belong to API v2, `Smallest`/`Largest` to API v1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Offset {
    Earliest,
    Latest,
    Smallest,
    Largest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    V1,
    V2,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Binary => "binary",
            Format::Avro => "avro",
        }
    }
}

impl Offset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Offset::Earliest => "earliest",
            Offset::Latest => "latest",
            Offset::Smallest => "smallest",
            Offset::Largest => "largest",
        }
    }

    /// API version this reset policy is understood by
    pub fn version(&self) -> Version {
        match self {
            Offset::Earliest | Offset::Latest => Version::V2,
            Offset::Smallest | Offset::Largest => Version::V1,
        }
    }
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::V1 => "v1",
            Version::V2 => "v2",
        }
    }
}

macro_rules! impl_str_enum {
    ($ty:ty, $what:literal, [$($variant:expr),+]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let s = s.trim();
                [$($variant),+]
                    .into_iter()
                    .find(|v: &$ty| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| Error::InvalidArgument(format!("unknown {} {:?}", $what, s)))
            }
        }
    };
}

impl_str_enum!(Format, "format", [Format::Json, Format::Binary, Format::Avro]);
impl_str_enum!(
    Offset,
    "offset reset policy",
    [Offset::Earliest, Offset::Latest, Offset::Smallest, Offset::Largest]
);
impl_str_enum!(Version, "API version", [Version::V1, Version::V2]);

/// Settings for a REST proxy connection.
///
/// Start from `Config::default()` and override with the `with_*` setters;
/// each setter replaces the previous value, so later calls win.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub url: String,
    /// Applies to every request made through the client
    pub timeout: Duration,
    pub accept: String,
    pub content_type: String,
    pub format: Format,
    pub offset: Offset,
    pub version: Version,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            accept: DEFAULT_ACCEPT.to_string(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            format: Format::Binary,
            offset: Offset::Largest,
            version: Version::V1,
        }
    }
}

impl Config {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = accept.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_offset(mut self, offset: Offset) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Defaults overridden by the `KAFKA_REST_*` environment variables that are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("KAFKA_REST_URL") {
            config = config.with_url(url);
        }
        if let Some(ms) = lookup("KAFKA_REST_TIMEOUT_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .map_err(|_| Error::InvalidArgument(format!("KAFKA_REST_TIMEOUT_MS {:?}", ms)))?;
            config = config.with_timeout(Duration::from_millis(ms));
        }
        if let Some(format) = lookup("KAFKA_REST_FORMAT") {
            config = config.with_format(format.parse()?);
        }
        if let Some(offset) = lookup("KAFKA_REST_OFFSET") {
            config = config.with_offset(offset.parse()?);
        }
        if let Some(version) = lookup("KAFKA_REST_API_VERSION") {
            config = config.with_version(version.parse()?);
        }

        Ok(config)
    }
}
