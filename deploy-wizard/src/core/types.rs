//! Shared deterministic types for the wizard core.
//!
//! These types define stable contracts between the field registry, the
//! validator, the deployment tracker and the wizard shell. They carry no I/O
//! and serialize to the camelCase names used by the deployment form.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Identifier of a deployment form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldId {
    ContractName,
    ContractNameSimplified,
    CollateralTokenAddress,
    PriceFloor,
    PriceCap,
    PriceFloorSimplified,
    PriceCapSimplified,
    Price,
    PriceDecimalPlaces,
    QtyMultiplier,
    ExpirationTimeStamp,
    OracleDataSource,
    OracleQuery,
    ExchangeApi,
}

impl FieldId {
    pub const ALL: [FieldId; 14] = [
        FieldId::ContractName,
        FieldId::ContractNameSimplified,
        FieldId::CollateralTokenAddress,
        FieldId::PriceFloor,
        FieldId::PriceCap,
        FieldId::PriceFloorSimplified,
        FieldId::PriceCapSimplified,
        FieldId::Price,
        FieldId::PriceDecimalPlaces,
        FieldId::QtyMultiplier,
        FieldId::ExpirationTimeStamp,
        FieldId::OracleDataSource,
        FieldId::OracleQuery,
        FieldId::ExchangeApi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldId::ContractName => "contractName",
            FieldId::ContractNameSimplified => "contractNameSimplified",
            FieldId::CollateralTokenAddress => "collateralTokenAddress",
            FieldId::PriceFloor => "priceFloor",
            FieldId::PriceCap => "priceCap",
            FieldId::PriceFloorSimplified => "priceFloorSimplified",
            FieldId::PriceCapSimplified => "priceCapSimplified",
            FieldId::Price => "price",
            FieldId::PriceDecimalPlaces => "priceDecimalPlaces",
            FieldId::QtyMultiplier => "qtyMultiplier",
            FieldId::ExpirationTimeStamp => "expirationTimeStamp",
            FieldId::OracleDataSource => "oracleDataSource",
            FieldId::OracleQuery => "oracleQuery",
            FieldId::ExchangeApi => "exchangeApi",
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| RegistryError::UnknownField(s.to_string()))
    }
}

/// Numeric type tag carried by a field definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericKind {
    Integer,
    Decimal,
}

/// Current value of a form field.
///
/// Untagged so form files read naturally: JSON numbers become `Number`,
/// RFC 3339 strings become `Timestamp`, any other string is `Text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Timestamp(DateTime<FixedOffset>),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// True for values a `required` rule treats as missing.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Number(n) => n.is_nan(),
            FieldValue::Timestamp(_) => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Mapping from field identifier to its current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormState {
    values: BTreeMap<FieldId, FieldValue>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: FieldId) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn number(&self, field: FieldId) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_number)
    }

    pub fn text(&self, field: FieldId) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    /// Set or clear a field. Returns the previous value.
    pub fn set(&mut self, field: FieldId, value: Option<FieldValue>) -> Option<FieldValue> {
        match value {
            Some(value) => self.values.insert(field, value),
            None => self.values.remove(&field),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &FieldValue)> {
        self.values.iter().map(|(id, value)| (*id, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of validating one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationResult {
    Valid,
    Invalid { message: String },
}

impl ValidationResult {
    pub fn invalid(message: impl Into<String>) -> Self {
        ValidationResult::Invalid {
            message: message.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid { message } => Some(message.as_str()),
        }
    }
}

/// Validation profile selected for a deployment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Guided,
    Simplified,
}

/// Deployment lifecycle phase reported by the deploy collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeploymentPhase {
    Idle,
    Pending,
    ContractDeploying,
    DeploymentComplete,
    CollateralPoolDeploying,
    Fulfilled,
    Rejected,
}

impl DeploymentPhase {
    /// Phases in progression order.
    pub const ORDER: [DeploymentPhase; 7] = [
        DeploymentPhase::Idle,
        DeploymentPhase::Pending,
        DeploymentPhase::ContractDeploying,
        DeploymentPhase::DeploymentComplete,
        DeploymentPhase::CollateralPoolDeploying,
        DeploymentPhase::Rejected,
        DeploymentPhase::Fulfilled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentPhase::Idle => "idle",
            DeploymentPhase::Pending => "pending",
            DeploymentPhase::ContractDeploying => "contractDeploying",
            DeploymentPhase::DeploymentComplete => "deploymentComplete",
            DeploymentPhase::CollateralPoolDeploying => "collateralPoolDeploying",
            DeploymentPhase::Fulfilled => "fulfilled",
            DeploymentPhase::Rejected => "rejected",
        }
    }
}

/// User-visible progress step on the deploy page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressStep {
    /// Waiting on the contract deployment transaction.
    DeployingContract,
    /// Contract mined; collateral pool transaction in flight.
    DeployingCollateralPool,
    /// Terminal: fulfilled or rejected.
    Finished,
}

impl ProgressStep {
    /// 1-based step index shown to the user.
    pub fn index(self) -> u8 {
        match self {
            ProgressStep::DeployingContract => 1,
            ProgressStep::DeployingCollateralPool => 2,
            ProgressStep::Finished => 3,
        }
    }
}

/// Logical label of one of the two deployment transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TxLabel {
    ContractDeployment,
    CollateralPoolDeployment,
}

impl TxLabel {
    pub fn label(self) -> &'static str {
        match self {
            TxLabel::ContractDeployment => "Contract Deployment",
            TxLabel::CollateralPoolDeployment => "Collateral Pool Deployment",
        }
    }
}

impl Serialize for TxLabel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Known transaction hashes keyed by label. Entries are only added or replaced
/// with a newer known hash, never cleared except by [`TxHashes::clear`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TxHashes {
    hashes: BTreeMap<TxLabel, String>,
}

impl TxHashes {
    pub fn get(&self, label: TxLabel) -> Option<&str> {
        self.hashes.get(&label).map(String::as_str)
    }

    /// Record `hash` under `label` if present. Returns true when the map changed.
    pub fn merge(&mut self, label: TxLabel, hash: Option<&str>) -> bool {
        let Some(hash) = hash.filter(|h| !h.is_empty()) else {
            return false;
        };
        if self.get(label) == Some(hash) {
            return false;
        }
        self.hashes.insert(label, hash.to_string());
        true
    }

    pub fn clear(&mut self) {
        self.hashes.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (TxLabel, &str)> {
        self.hashes.iter().map(|(label, hash)| (*label, hash.as_str()))
    }
}

/// Contract reported by the deploy collaborator on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedContract {
    pub address: String,
}

/// User-facing alert fired on an edge of the observed deployment state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notification {
    DeploymentFailed {
        message: String,
    },
    ContractDeployed {
        address: String,
        explorer_url: Option<String>,
    },
}

/// Programmer or contract error in registry usage. Never a user-correctable
/// validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Field name does not exist in the form vocabulary.
    UnknownField(String),
    /// Field exists but the registry carries no definition for it.
    Unregistered(FieldId),
    /// A rule reads `source` but `source` does not declare `dependent` as an edge.
    MissingEdge { source: FieldId, dependent: FieldId },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownField(name) => write!(f, "unknown field '{name}'"),
            RegistryError::Unregistered(id) => write!(f, "field '{id}' has no registered rules"),
            RegistryError::MissingEdge { source, dependent } => write!(
                f,
                "field '{dependent}' reads '{source}' but '{source}' does not declare it as a dependent"
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_id_parses_camel_case_names() {
        for id in FieldId::ALL {
            assert_eq!(id.as_str().parse::<FieldId>(), Ok(id));
        }
        assert_eq!(
            "priceFloorX".parse::<FieldId>(),
            Err(RegistryError::UnknownField("priceFloorX".to_string()))
        );
    }

    /// Untagged values: numbers, RFC 3339 strings, then plain text.
    #[test]
    fn form_state_deserializes_mixed_values() {
        let raw = r#"{
            "priceFloor": 10,
            "contractName": "ETH/BTC",
            "expirationTimeStamp": "2026-11-01T12:00:00+00:00"
        }"#;
        let form: FormState = serde_json::from_str(raw).expect("parse");
        assert_eq!(form.number(FieldId::PriceFloor), Some(10.0));
        assert_eq!(form.text(FieldId::ContractName), Some("ETH/BTC"));
        assert!(
            form.get(FieldId::ExpirationTimeStamp)
                .and_then(FieldValue::as_timestamp)
                .is_some()
        );
    }

    /// A hash once known is never replaced by an absent value.
    #[test]
    fn tx_hashes_merge_ignores_absent_values() {
        let mut hashes = TxHashes::default();
        assert!(hashes.merge(TxLabel::ContractDeployment, Some("0xaa")));
        assert!(!hashes.merge(TxLabel::ContractDeployment, None));
        assert!(!hashes.merge(TxLabel::ContractDeployment, Some("")));
        assert!(!hashes.merge(TxLabel::ContractDeployment, Some("0xaa")));
        assert_eq!(hashes.get(TxLabel::ContractDeployment), Some("0xaa"));
    }

    #[test]
    fn tx_hashes_serialize_with_display_labels() {
        let mut hashes = TxHashes::default();
        hashes.merge(TxLabel::CollateralPoolDeployment, Some("0xbb"));
        let json = serde_json::to_string(&hashes).expect("serialize");
        assert_eq!(json, r#"{"Collateral Pool Deployment":"0xbb"}"#);
    }

    #[test]
    fn blank_values() {
        assert!(FieldValue::text("  ").is_blank());
        assert!(!FieldValue::text("x").is_blank());
        assert!(!FieldValue::Number(0.0).is_blank());
    }
}
