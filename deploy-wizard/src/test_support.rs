//! Test-only helpers: fixed clock, stub catalog, recording deployer, temp workspace.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, FixedOffset};
use regex::Regex;

use crate::core::rules::{QuerySyntax, ReferenceCatalog};
use crate::core::types::{FormState, Mode};
use crate::io::clock::Clock;
use crate::io::deployer::Deployer;

/// Deterministic "now" used across tests: 2026-10-19 15:30 at UTC+2.
pub fn fixed_now() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2026-10-19T15:30:00+02:00").expect("fixed timestamp")
}

pub struct FixedClock(pub DateTime<FixedOffset>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(fixed_now())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

pub struct StubSource {
    pattern: Regex,
    samples: Vec<String>,
}

impl QuerySyntax for StubSource {
    fn is_query_valid(&self, query: &str) -> bool {
        self.pattern.is_match(query)
    }

    fn sample_queries(&self) -> &[String] {
        &self.samples
    }
}

/// Catalog with a single `URL` source accepting `json(<url>).<path>` and two exchanges.
pub struct StubCatalog {
    url: StubSource,
    exchanges: Vec<&'static str>,
}

impl Default for StubCatalog {
    fn default() -> Self {
        Self {
            url: StubSource {
                pattern: Regex::new(r"^json\(https?://\S+\)(\.\S+)?$").expect("stub regex"),
                samples: vec!["json(https://example.com).price".to_string()],
            },
            exchanges: vec!["BIN", "KRA"],
        }
    }
}

impl ReferenceCatalog for StubCatalog {
    fn data_source(&self, name: &str) -> Option<&dyn QuerySyntax> {
        (name == "URL").then_some(&self.url as &dyn QuerySyntax)
    }

    fn has_exchange(&self, key: &str) -> bool {
        self.exchanges.contains(&key)
    }
}

/// One call observed by [`RecordingDeployer`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeployCall {
    Deploy { form: FormState, mode: Mode },
    Reset,
}

/// Deployer that records calls into a shared log instead of submitting anything.
#[derive(Clone, Default)]
pub struct RecordingDeployer {
    calls: Rc<RefCell<Vec<DeployCall>>>,
    fail_deploy: bool,
}

impl RecordingDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deployer whose `deploy` returns an error (after recording the call).
    pub fn failing() -> Self {
        Self {
            fail_deploy: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<DeployCall> {
        self.calls.borrow().clone()
    }

    pub fn deploy_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, DeployCall::Deploy { .. }))
            .count()
    }

    pub fn reset_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, DeployCall::Reset))
            .count()
    }
}

impl Deployer for RecordingDeployer {
    fn deploy(&mut self, form: &FormState, mode: Mode) -> Result<()> {
        self.calls.borrow_mut().push(DeployCall::Deploy {
            form: form.clone(),
            mode,
        });
        if self.fail_deploy {
            return Err(anyhow!("scripted deploy failure"));
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.calls.borrow_mut().push(DeployCall::Reset);
        Ok(())
    }
}

/// Temporary directory holding the files a CLI run reads and writes.
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp workspace")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `name` inside the workspace and return its path.
    pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}
