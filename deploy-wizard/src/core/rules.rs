//! Validation rules for form fields.
//!
//! A rule is either static (looks only at the field's own value) or reads a
//! sibling from the form snapshot. Every sibling read is reported by
//! [`Rule::reads`] so the registry can check its declared dependency edges.

use regex::Regex;
use std::sync::LazyLock;

use crate::core::expiration::ExpirationWindow;
use crate::core::types::{FieldId, FieldValue, FormState};

pub const DEFAULT_FLOOR_RATIO: f64 = 0.45;
pub const DEFAULT_CAP_RATIO: f64 = 1.55;

static ERC20_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("erc20 address regex is valid")
});

/// Query-syntax checker for one oracle data source.
pub trait QuerySyntax {
    fn is_query_valid(&self, query: &str) -> bool;
    fn sample_queries(&self) -> &[String];
}

/// Static reference data consulted by catalog-backed rules.
pub trait ReferenceCatalog {
    fn data_source(&self, name: &str) -> Option<&dyn QuerySyntax>;
    fn has_exchange(&self, key: &str) -> bool;
}

/// Tolerance band around the reference price used by simplified mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBounds {
    pub floor_ratio: f64,
    pub cap_ratio: f64,
}

impl Default for PriceBounds {
    fn default() -> Self {
        Self {
            floor_ratio: DEFAULT_FLOOR_RATIO,
            cap_ratio: DEFAULT_CAP_RATIO,
        }
    }
}

/// Everything a rule may read besides its own value.
pub struct RuleContext<'a> {
    pub form: &'a FormState,
    pub catalog: &'a dyn ReferenceCatalog,
    pub bounds: PriceBounds,
    pub window: &'a ExpirationWindow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Required { message: &'static str },
    Integer,
    Number,
    Text,
    /// Numeric value must lie in `min..=max`.
    InRange {
        min: f64,
        max: f64,
        message: &'static str,
    },
    /// Value must be `<=` the sibling.
    AtMost {
        sibling: FieldId,
        message: &'static str,
    },
    /// Value must be `>=` the sibling.
    AtLeast {
        sibling: FieldId,
        message: &'static str,
    },
    /// Value must be `>= floor_ratio * reference`.
    FloorBand { reference: FieldId },
    /// Value must be `<= cap_ratio * reference`.
    CapBand { reference: FieldId },
    Expiration,
    Erc20Address,
    KnownDataSource,
    /// Query must satisfy the syntax of the data source named by `source`.
    OracleQuery { source: FieldId },
    KnownExchange,
}

impl Rule {
    /// Sibling field this rule reads from the snapshot, if any.
    pub fn reads(&self) -> Option<FieldId> {
        match self {
            Rule::AtMost { sibling, .. } | Rule::AtLeast { sibling, .. } => Some(*sibling),
            Rule::FloorBand { reference } | Rule::CapBand { reference } => Some(*reference),
            Rule::OracleQuery { source } => Some(*source),
            _ => None,
        }
    }

    /// Check `value` against this rule. `Err` carries the user-facing message.
    ///
    /// Only `Required` fails on an absent value; other rules pass it through.
    /// Relational rules pass when the sibling is not a usable number, leaving
    /// the sibling's own rules to report it.
    pub fn check(&self, value: Option<&FieldValue>, ctx: &RuleContext<'_>) -> Result<(), String> {
        let value = match (self, value) {
            (Rule::Required { message }, None) => return Err((*message).to_string()),
            (Rule::Required { message }, Some(v)) if v.is_blank() => {
                return Err((*message).to_string());
            }
            (_, None) => return Ok(()),
            (_, Some(v)) => v,
        };

        match self {
            Rule::Required { .. } => Ok(()),
            Rule::Number => value
                .as_number()
                .map(|_| ())
                .ok_or_else(|| "Value must be a number".to_string()),
            Rule::Integer => match value.as_number() {
                Some(n) if n.fract() == 0.0 => Ok(()),
                _ => Err("Value must be an integer".to_string()),
            },
            Rule::Text => value
                .as_text()
                .map(|_| ())
                .ok_or_else(|| "Value must be text".to_string()),
            Rule::InRange { min, max, message } => match value.as_number() {
                Some(n) if n < *min || n > *max => Err((*message).to_string()),
                _ => Ok(()),
            },
            Rule::AtMost { sibling, message } => {
                match (value.as_number(), ctx.form.number(*sibling)) {
                    (Some(v), Some(other)) if v > other => Err((*message).to_string()),
                    _ => Ok(()),
                }
            }
            Rule::AtLeast { sibling, message } => {
                match (value.as_number(), ctx.form.number(*sibling)) {
                    (Some(v), Some(other)) if v < other => Err((*message).to_string()),
                    _ => Ok(()),
                }
            }
            Rule::FloorBand { reference } => {
                let ratio = ctx.bounds.floor_ratio;
                match (value.as_number(), ctx.form.number(*reference)) {
                    (Some(v), Some(price)) if v < ratio * price => Err(format!(
                        "Price floor must be larger than {}% of the current price",
                        percent(ratio)
                    )),
                    _ => Ok(()),
                }
            }
            Rule::CapBand { reference } => {
                let ratio = ctx.bounds.cap_ratio;
                match (value.as_number(), ctx.form.number(*reference)) {
                    (Some(v), Some(price)) if v > ratio * price => Err(format!(
                        "Price cap must be smaller than {}% of the current price",
                        percent(ratio)
                    )),
                    _ => Ok(()),
                }
            }
            Rule::Expiration => {
                let ts = value
                    .as_timestamp()
                    .ok_or_else(|| "Expiration must be a date and time".to_string())?;
                ctx.window.check(ts).map_err(|violation| violation.message())
            }
            Rule::Erc20Address => match value.as_text() {
                Some(addr) if ERC20_ADDRESS.is_match(addr.trim()) => Ok(()),
                _ => Err("Please enter a valid ERC20 token address".to_string()),
            },
            Rule::KnownDataSource => match value.as_text() {
                Some(name) if ctx.catalog.data_source(name).is_some() => Ok(()),
                _ => Err(format!("Unknown data source '{value}'")),
            },
            Rule::OracleQuery { source } => {
                let Some(source_name) = ctx.form.text(*source) else {
                    return Ok(());
                };
                let Some(syntax) = ctx.catalog.data_source(source_name) else {
                    return Ok(());
                };
                let query = value.as_text().unwrap_or_default();
                if syntax.is_query_valid(query) {
                    return Ok(());
                }
                let example = syntax
                    .sample_queries()
                    .first()
                    .map(String::as_str)
                    .unwrap_or_default();
                Err(format!(
                    "Invalid Query for '{source_name}' Data Source. A valid example is: {example}"
                ))
            }
            Rule::KnownExchange => match value.as_text() {
                Some(key) if ctx.catalog.has_exchange(key) => Ok(()),
                _ => Err(format!("Unknown exchange api '{value}'")),
            },
        }
    }
}

fn percent(ratio: f64) -> String {
    let pct = (ratio * 10_000.0).round() / 100.0;
    format!("{pct}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubCatalog, fixed_now};

    fn check(rule: &Rule, value: Option<FieldValue>, form: &FormState) -> Result<(), String> {
        let catalog = StubCatalog::default();
        let window = ExpirationWindow::new(fixed_now(), 60);
        let ctx = RuleContext {
            form,
            catalog: &catalog,
            bounds: PriceBounds::default(),
            window: &window,
        };
        rule.check(value.as_ref(), &ctx)
    }

    #[test]
    fn required_rejects_missing_and_blank() {
        let rule = Rule::Required {
            message: "Please enter a name",
        };
        let form = FormState::new();
        assert_eq!(
            check(&rule, None, &form),
            Err("Please enter a name".to_string())
        );
        assert!(check(&rule, Some(FieldValue::text(" ")), &form).is_err());
        assert!(check(&rule, Some(FieldValue::text("x")), &form).is_ok());
    }

    #[test]
    fn integer_rejects_fractions_and_text() {
        let form = FormState::new();
        assert!(check(&Rule::Integer, Some(FieldValue::Number(3.0)), &form).is_ok());
        assert_eq!(
            check(&Rule::Integer, Some(FieldValue::Number(3.5)), &form),
            Err("Value must be an integer".to_string())
        );
        assert!(check(&Rule::Integer, Some(FieldValue::text("3")), &form).is_err());
    }

    #[test]
    fn text_rejects_numbers() {
        let form = FormState::new();
        assert!(check(&Rule::Text, Some(FieldValue::text("ETH")), &form).is_ok());
        assert_eq!(
            check(&Rule::Text, Some(FieldValue::Number(5.0)), &form),
            Err("Value must be text".to_string())
        );
    }

    #[test]
    fn in_range_is_inclusive() {
        let rule = Rule::InRange {
            min: 0.0,
            max: 10.0,
            message: "out of range",
        };
        let form = FormState::new();
        assert!(check(&rule, Some(FieldValue::Number(0.0)), &form).is_ok());
        assert!(check(&rule, Some(FieldValue::Number(10.0)), &form).is_ok());
        assert_eq!(
            check(&rule, Some(FieldValue::Number(-1.0)), &form),
            Err("out of range".to_string())
        );
    }

    /// Relational rules skip when the sibling is missing.
    #[test]
    fn at_most_passes_without_sibling() {
        let rule = Rule::AtMost {
            sibling: FieldId::PriceCap,
            message: "too big",
        };
        let mut form = FormState::new();
        assert!(check(&rule, Some(FieldValue::Number(500.0)), &form).is_ok());
        form.set(FieldId::PriceCap, Some(FieldValue::Number(100.0)));
        assert_eq!(
            check(&rule, Some(FieldValue::Number(500.0)), &form),
            Err("too big".to_string())
        );
        assert!(check(&rule, Some(FieldValue::Number(100.0)), &form).is_ok());
    }

    #[test]
    fn band_messages_render_configured_percentages() {
        let mut form = FormState::new();
        form.set(FieldId::Price, Some(FieldValue::Number(1.0)));
        let floor = Rule::FloorBand {
            reference: FieldId::Price,
        };
        let cap = Rule::CapBand {
            reference: FieldId::Price,
        };
        assert_eq!(
            check(&floor, Some(FieldValue::Number(0.4)), &form),
            Err("Price floor must be larger than 45% of the current price".to_string())
        );
        assert_eq!(
            check(&cap, Some(FieldValue::Number(1.6)), &form),
            Err("Price cap must be smaller than 155% of the current price".to_string())
        );
        assert!(check(&floor, Some(FieldValue::Number(0.45)), &form).is_ok());
        assert!(check(&cap, Some(FieldValue::Number(1.55)), &form).is_ok());
    }

    #[test]
    fn erc20_address_syntax() {
        let form = FormState::new();
        let good = format!("0x{}", "3".repeat(40));
        assert!(check(&Rule::Erc20Address, Some(FieldValue::text(good)), &form).is_ok());
        assert!(check(&Rule::Erc20Address, Some(FieldValue::text("0x123")), &form).is_err());
    }

    /// Invalid queries quote the source's first sample query.
    #[test]
    fn oracle_query_surfaces_first_sample() {
        let mut form = FormState::new();
        form.set(FieldId::OracleDataSource, Some(FieldValue::text("URL")));
        let rule = Rule::OracleQuery {
            source: FieldId::OracleDataSource,
        };
        assert_eq!(
            check(&rule, Some(FieldValue::text("nope")), &form),
            Err("Invalid Query for 'URL' Data Source. A valid example is: json(https://example.com).price".to_string())
        );
        assert!(
            check(
                &rule,
                Some(FieldValue::text("json(https://api.kraken.com/x).a")),
                &form
            )
            .is_ok()
        );
    }

    /// Unknown data source leaves the query rule passing; the source field reports it.
    #[test]
    fn oracle_query_passes_for_unknown_source() {
        let mut form = FormState::new();
        form.set(FieldId::OracleDataSource, Some(FieldValue::text("Nope")));
        let rule = Rule::OracleQuery {
            source: FieldId::OracleDataSource,
        };
        assert!(check(&rule, Some(FieldValue::text("anything")), &form).is_ok());
        assert!(
            check(&Rule::KnownDataSource, Some(FieldValue::text("Nope")), &form).is_err()
        );
    }

    #[test]
    fn reads_reports_sibling_fields() {
        assert_eq!(Rule::Integer.reads(), None);
        assert_eq!(
            Rule::FloorBand {
                reference: FieldId::Price
            }
            .reads(),
            Some(FieldId::Price)
        );
    }
}
