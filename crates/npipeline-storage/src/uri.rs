//! [`StorageUri`]: the scheme+host+path+query-params record every storage
//! operation addresses a location with (spec §4.7).

use crate::error::Error;
use std::collections::BTreeMap;
use std::fmt;

/// An addressable storage location, independent of which provider resolves
/// it (`file://`, `s3://`, `az://`, ...). Parsed once at the connector
/// boundary the way the teacher's `StorageType` config resolves a
/// `base_uri` string into a concrete backend (see `object_store.rs`), but
/// kept provider-agnostic here since this crate defines the contract only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUri {
    scheme: String,
    host: String,
    path: String,
    query_params: BTreeMap<String, String>,
}

impl StorageUri {
    /// Builds a `StorageUri` directly from its parts, bypassing string
    /// parsing — useful when a caller already holds the pieces (e.g. a
    /// provider resolving a relative path against its own root).
    #[must_use]
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
        query_params: BTreeMap<String, String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            path: path.into(),
            query_params,
        }
    }

    /// Parses a URI string such as `s3://my-bucket/telemetry/part-1.parquet?delay=5ms`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderError`] if `raw` is not a well-formed URI.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let url = url::Url::parse(raw).map_err(|e| Error::ProviderError(e.to_string()))?;

        let scheme = url.scheme().to_string();
        let host = url.host_str().unwrap_or_default().to_string();
        let path = url.path().trim_start_matches('/').to_string();
        let query_params = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();

        Ok(Self {
            scheme,
            host,
            path,
            query_params,
        })
    }

    /// The URI scheme (`file`, `s3`, `az`, ...).
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The URI host (bucket, container, or empty for local paths).
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The path component, without a leading slash.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query-string parameters, decoded.
    #[must_use]
    pub fn query_params(&self) -> &BTreeMap<String, String> {
        &self.query_params
    }

    /// A single query parameter, if present.
    #[must_use]
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query_params.get(key).map(String::as_str)
    }
}

impl fmt::Display for StorageUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.host, self.path)?;
        if !self.query_params.is_empty() {
            write!(f, "?")?;
            for (i, (k, v)) in self.query_params.iter().enumerate() {
                if i > 0 {
                    write!(f, "&")?;
                }
                write!(f, "{k}={v}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scheme_host_path_query() {
        let uri = StorageUri::parse("s3://my-bucket/telemetry/part-1.parquet?delay=5ms").unwrap();
        assert_eq!(uri.scheme(), "s3");
        assert_eq!(uri.host(), "my-bucket");
        assert_eq!(uri.path(), "telemetry/part-1.parquet");
        assert_eq!(uri.query_param("delay"), Some("5ms"));
    }

    #[test]
    fn parses_local_file_uri_with_empty_host() {
        let uri = StorageUri::parse("file:///tmp/data.csv").unwrap();
        assert_eq!(uri.scheme(), "file");
        assert_eq!(uri.host(), "");
        assert_eq!(uri.path(), "tmp/data.csv");
    }

    #[test]
    fn rejects_malformed_uri() {
        assert!(StorageUri::parse("not a uri").is_err());
    }

    #[test]
    fn display_round_trips_scheme_host_path() {
        let uri = StorageUri::parse("az://container/prefix/file.txt").unwrap();
        assert_eq!(uri.to_string(), "az://container/prefix/file.txt");
    }
}
