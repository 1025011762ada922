// src/interfaces/http_supplier.rs

//! A thin `reqwest`-backed `PackageSupplier` talking to a DUB-compatible
//! package registry's HTTP API. Gated behind the `registry-http` feature
//! (`spec.md` §1: "network transport to registries ... treated as an
//! injectable `PackageSupplier` interface" — the wire protocol itself is
//! out of scope for the core and is not exercised in this crate's tests
//! against a live registry; it exists so embedders have a real starting
//! point instead of only the in-memory fake).

use crate::error::{Error, Result};
use crate::recipe::{parse_recipe_json, Recipe};
use crate::version::VersionId;

use super::package_supplier::PackageSupplier;

pub struct HttpPackageSupplier {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpPackageSupplier {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpPackageSupplier {
            base_url: base_url.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl PackageSupplier for HttpPackageSupplier {
    fn list_versions(&self, name: &str) -> Result<Vec<VersionId>> {
        let url = format!("{}/packages/{name}/info", self.base_url);
        let body: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(http_error)?
            .json()
            .map_err(http_error)?;
        let versions = body
            .get("versions")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.get("version").and_then(|s| s.as_str()))
                    .filter_map(|s| semver::Version::parse(s).ok())
                    .map(VersionId::Release)
                    .collect()
            })
            .unwrap_or_default();
        Ok(versions)
    }

    fn fetch_recipe(&self, name: &str, version: &VersionId) -> Result<Recipe> {
        let url = format!("{}/packages/{name}/{version}/info", self.base_url);
        let body = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(http_error)?
            .text()
            .map_err(http_error)?;
        parse_recipe_json(&body, std::path::Path::new("dub.json"))
    }

    fn fetch_archive(&self, name: &str, version: &VersionId) -> Result<Vec<u8>> {
        let url = format!("{}/packages/{name}/{version}/zip", self.base_url);
        let bytes = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(http_error)?
            .bytes()
            .map_err(http_error)?;
        Ok(bytes.to_vec())
    }

    fn describe(&self) -> String {
        format!("http registry at {}", self.base_url)
    }
}

fn http_error(e: reqwest::Error) -> Error {
    Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}
