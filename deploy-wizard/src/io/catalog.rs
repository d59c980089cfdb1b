//! Static reference catalogs: oracle data sources and exchange apis.
//!
//! Loaded once at startup from the embedded default or an override file, then
//! shared read-only with the validator through [`ReferenceCatalog`].

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::core::rules::{QuerySyntax, ReferenceCatalog};

const DEFAULT_CATALOG: &str = include_str!("../../catalog/default.toml");

#[derive(Debug, Deserialize)]
struct RawCatalog {
    data_sources: Vec<RawDataSource>,
    #[serde(default)]
    exchanges: Vec<Exchange>,
}

#[derive(Debug, Deserialize)]
struct RawDataSource {
    name: String,
    query_pattern: String,
    sample_queries: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DataSource {
    pub name: String,
    query_pattern: Regex,
    sample_queries: Vec<String>,
}

impl QuerySyntax for DataSource {
    fn is_query_valid(&self, query: &str) -> bool {
        self.query_pattern.is_match(query.trim())
    }

    fn sample_queries(&self) -> &[String] {
        &self.sample_queries
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Exchange {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    data_sources: Vec<DataSource>,
    exchanges: Vec<Exchange>,
}

impl Catalog {
    /// Catalog shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::parse(DEFAULT_CATALOG).context("parse built-in catalog")
    }

    /// Load the override at `path` when given, otherwise the built-in catalog.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Self::builtin();
        };
        debug!(path = %path.display(), "loading catalog");
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parse catalog {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let raw: RawCatalog = toml::from_str(contents).context("parse catalog toml")?;

        let mut names = HashSet::new();
        let mut data_sources = Vec::with_capacity(raw.data_sources.len());
        for src in raw.data_sources {
            if !names.insert(src.name.clone()) {
                bail!("duplicate data source '{}'", src.name);
            }
            let query_pattern = Regex::new(&src.query_pattern)
                .with_context(|| format!("compile query pattern for '{}'", src.name))?;
            if src.sample_queries.is_empty() {
                bail!("data source '{}' has no sample queries", src.name);
            }
            if let Some(bad) = src
                .sample_queries
                .iter()
                .find(|q| !query_pattern.is_match(q))
            {
                return Err(anyhow!(
                    "sample query '{}' does not match pattern of '{}'",
                    bad,
                    src.name
                ));
            }
            data_sources.push(DataSource {
                name: src.name,
                query_pattern,
                sample_queries: src.sample_queries,
            });
        }

        let mut keys = HashSet::new();
        for exchange in &raw.exchanges {
            if !keys.insert(exchange.key.as_str()) {
                bail!("duplicate exchange key '{}'", exchange.key);
            }
        }

        debug!(
            data_sources = data_sources.len(),
            exchanges = raw.exchanges.len(),
            "catalog loaded"
        );
        Ok(Self {
            data_sources,
            exchanges: raw.exchanges,
        })
    }

    pub fn data_sources(&self) -> &[DataSource] {
        &self.data_sources
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }
}

impl ReferenceCatalog for Catalog {
    fn data_source(&self, name: &str) -> Option<&dyn QuerySyntax> {
        self.data_sources
            .iter()
            .find(|src| src.name == name)
            .map(|src| src as &dyn QuerySyntax)
    }

    fn has_exchange(&self, key: &str) -> bool {
        self.exchanges.iter().any(|ex| ex.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::DEFAULT_ORACLE_QUERY;

    #[test]
    fn builtin_catalog_loads() {
        let catalog = Catalog::builtin().expect("builtin");
        let names: Vec<&str> = catalog
            .data_sources()
            .iter()
            .map(|src| src.name.as_str())
            .collect();
        assert_eq!(names, vec!["URL", "WolframAlpha", "IPFS"]);
        assert!(catalog.has_exchange("KRA"));
        assert!(!catalog.has_exchange("Kraken"));
    }

    /// The form's default oracle query satisfies the default data source.
    #[test]
    fn default_query_is_valid_for_url_source() {
        let catalog = Catalog::builtin().expect("builtin");
        let url = catalog.data_source("URL").expect("URL source");
        assert!(url.is_query_valid(DEFAULT_ORACLE_QUERY));
        assert!(!url.is_query_valid("kraken eth price"));
    }

    #[test]
    fn ipfs_requires_multihash() {
        let catalog = Catalog::builtin().expect("builtin");
        let ipfs = catalog.data_source("IPFS").expect("IPFS source");
        assert!(!ipfs.is_query_valid("Qm123"));
        assert!(ipfs.is_query_valid(&ipfs.sample_queries()[0]));
    }

    #[test]
    fn rejects_sample_that_fails_its_own_pattern() {
        let raw = r#"
            [[data_sources]]
            name = "Num"
            query_pattern = '^\d+$'
            sample_queries = ["abc"]
        "#;
        let err = Catalog::parse(raw).expect_err("bad sample");
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn rejects_duplicate_exchange_keys() {
        let raw = r#"
            data_sources = []
            [[exchanges]]
            key = "BIN"
            name = "Binance"
            [[exchanges]]
            key = "BIN"
            name = "Binance US"
        "#;
        let err = Catalog::parse(raw).expect_err("duplicate");
        assert!(err.to_string().contains("duplicate exchange key"));
    }

    #[test]
    fn load_reads_override_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("catalog.toml");
        fs::write(
            &path,
            "[[data_sources]]\nname = \"Only\"\nquery_pattern = '^x$'\nsample_queries = [\"x\"]\n",
        )
        .expect("write");
        let catalog = Catalog::load(Some(&path)).expect("load");
        assert_eq!(catalog.data_sources().len(), 1);
        assert!(catalog.exchanges().is_empty());
    }
}
