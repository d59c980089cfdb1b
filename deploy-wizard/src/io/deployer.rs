//! Deploy collaborator abstraction.
//!
//! The [`Deployer`] trait decouples the wizard from whatever actually submits
//! the two deployment transactions. Submission is fire-and-forget: progress is
//! reported back later as [`DeploymentUpdate`](crate::core::progress::DeploymentUpdate)
//! snapshots, never as a return value. Tests use a recording deployer that
//! only counts calls.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::core::registry::{MAX_DECIMAL_PLACES, MAX_QTY_MULTIPLIER};
use crate::core::types::{FieldId, FormState, Mode};

/// Abstraction over deployment backends.
pub trait Deployer {
    /// Dispatch a deployment of `form`. Returns once the request is handed off.
    fn deploy(&mut self, form: &FormState, mode: Mode) -> Result<()>;

    /// Discard any deployment state accumulated by previous dispatches.
    fn reset(&mut self) -> Result<()>;
}

/// Normalized deployment parameters handed to the submission service.
///
/// Numeric fields are converted to their on-chain integer forms where the
/// mode requires it, and the expiration is whole Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub mode: Mode,
    pub contract_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collateral_token_address: Option<String>,
    pub price_floor: f64,
    pub price_cap: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_decimal_places: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty_multiplier: Option<u64>,
    pub expiration_time_stamp: i64,
    pub oracle_data_source: String,
    pub oracle_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_api: Option<String>,
}

impl DeploymentRequest {
    pub fn from_form(form: &FormState, mode: Mode) -> Result<Self> {
        let expiration = form
            .get(FieldId::ExpirationTimeStamp)
            .and_then(|v| v.as_timestamp())
            .ok_or_else(|| anyhow!("missing {}", FieldId::ExpirationTimeStamp))?;

        let request = match mode {
            Mode::Guided => Self {
                mode,
                contract_name: text(form, FieldId::ContractName)?,
                collateral_token_address: Some(text(form, FieldId::CollateralTokenAddress)?),
                price_floor: number(form, FieldId::PriceFloor)?,
                price_cap: number(form, FieldId::PriceCap)?,
                price_decimal_places: Some(
                    whole(form, FieldId::PriceDecimalPlaces, MAX_DECIMAL_PLACES)? as u32,
                ),
                qty_multiplier: Some(whole(form, FieldId::QtyMultiplier, MAX_QTY_MULTIPLIER)? as u64),
                expiration_time_stamp: expiration.timestamp(),
                oracle_data_source: text(form, FieldId::OracleDataSource)?,
                oracle_query: text(form, FieldId::OracleQuery)?,
                exchange_api: None,
            },
            Mode::Simplified => Self {
                mode,
                contract_name: text(form, FieldId::ContractNameSimplified)?,
                collateral_token_address: None,
                price_floor: number(form, FieldId::PriceFloorSimplified)?,
                price_cap: number(form, FieldId::PriceCapSimplified)?,
                price_decimal_places: None,
                qty_multiplier: None,
                expiration_time_stamp: expiration.timestamp(),
                oracle_data_source: text(form, FieldId::OracleDataSource)?,
                oracle_query: text(form, FieldId::OracleQuery)?,
                exchange_api: Some(text(form, FieldId::ExchangeApi)?),
            },
        };
        Ok(request)
    }
}

fn text(form: &FormState, field: FieldId) -> Result<String> {
    let value = form.get(field).ok_or_else(|| anyhow!("missing {field}"))?;
    value
        .as_text()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow!("{field} must be text, got {value}"))
}

fn number(form: &FormState, field: FieldId) -> Result<f64> {
    form.number(field).ok_or_else(|| anyhow!("missing {field}"))
}

/// Integer in `0..=max`; callers cast to the matching unsigned width.
fn whole(form: &FormState, field: FieldId, max: f64) -> Result<f64> {
    let n = number(form, field)?;
    if n.fract() != 0.0 || n < 0.0 || n > max {
        return Err(anyhow!("{field} must be a non-negative integer, got {n}"));
    }
    Ok(n)
}

/// Deployer that hands requests to an external submission service by writing
/// them to a JSON file the service watches.
pub struct FileDeployer {
    path: PathBuf,
}

impl FileDeployer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Deployer for FileDeployer {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn deploy(&mut self, form: &FormState, mode: Mode) -> Result<()> {
        let request = DeploymentRequest::from_form(form, mode)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create request dir {}", parent.display()))?;
        }
        let mut buf = serde_json::to_string_pretty(&request).context("serialize request")?;
        buf.push('\n');
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, buf)
            .with_context(|| format!("write temp request {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("replace request {}", self.path.display()))?;
        info!(contract = %request.contract_name, "deployment request written");
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("remove request {}", self.path.display()))?;
            debug!(path = %self.path.display(), "previous deployment request removed");
        }
        Ok(())
    }
}
