//! Declarative catalog of form fields: defaults, ordered rules and the
//! dependency edges that drive revalidation.

use std::collections::BTreeMap;

use crate::core::expiration::ExpirationWindow;
use crate::core::rules::Rule;
use crate::core::types::{FieldId, FieldValue, FormState, NumericKind, RegistryError};

pub const DEFAULT_CONTRACT_NAME: &str = "ETH/BTC-Kraken_YYYY-MM-DD";
pub const DEFAULT_COLLATERAL_TOKEN: &str = "0x3333333333333333333333333333333333333333";
/// Largest decimal-places value the deployment request can carry (`u32`).
pub const MAX_DECIMAL_PLACES: f64 = u32::MAX as f64;
/// Largest qty multiplier the deployment request can carry (`u64`).
pub const MAX_QTY_MULTIPLIER: f64 = u64::MAX as f64;
pub const DEFAULT_ORACLE_QUERY: &str =
    "json(https://api.kraken.com/0/public/Ticker?pair=ETHUSD).result.XETHZUSD.c.0";

/// Initial value of a field in a fresh form.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    None,
    Fixed(FieldValue),
    /// `now + days`, resolved against the session's expiration window.
    DaysFromNow(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub id: FieldId,
    pub label: Option<&'static str>,
    pub hint: Option<&'static str>,
    pub default: DefaultValue,
    pub numeric: Option<NumericKind>,
    /// Evaluated in order; the first failure is the field's message.
    pub rules: Vec<Rule>,
    /// Fields to revalidate whenever this field changes.
    pub dependents: Vec<FieldId>,
}

impl FieldDefinition {
    pub fn new(id: FieldId) -> Self {
        Self {
            id,
            label: None,
            hint: None,
            default: DefaultValue::None,
            numeric: None,
            rules: Vec::new(),
            dependents: Vec::new(),
        }
    }

    pub fn label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    pub fn hint(mut self, hint: &'static str) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn default_value(mut self, value: FieldValue) -> Self {
        self.default = DefaultValue::Fixed(value);
        self
    }

    /// Tag the field as numeric and append the matching type rule.
    pub fn numeric(mut self, kind: NumericKind) -> Self {
        self.numeric = Some(kind);
        self.rules.push(match kind {
            NumericKind::Integer => Rule::Integer,
            NumericKind::Decimal => Rule::Number,
        });
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn required(self, message: &'static str) -> Self {
        self.rule(Rule::Required { message })
    }

    pub fn dependents(mut self, ids: &[FieldId]) -> Self {
        self.dependents.extend_from_slice(ids);
        self
    }
}

/// Immutable field registry.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: BTreeMap<FieldId, FieldDefinition>,
}

impl FieldRegistry {
    /// Build a registry, rejecting any rule that reads a sibling without a
    /// matching declared edge.
    pub fn new(definitions: Vec<FieldDefinition>) -> Result<Self, RegistryError> {
        let fields: BTreeMap<FieldId, FieldDefinition> = definitions
            .into_iter()
            .map(|def| (def.id, def))
            .collect();
        let registry = Self { fields };
        registry.check_edges()?;
        Ok(registry)
    }

    /// The deployment form as shipped.
    pub fn standard(default_expiration_days: i64) -> Result<Self, RegistryError> {
        Self::new(standard_fields(default_expiration_days))
    }

    pub fn definition(&self, field: FieldId) -> Result<&FieldDefinition, RegistryError> {
        self.fields
            .get(&field)
            .ok_or(RegistryError::Unregistered(field))
    }

    pub fn rules(&self, field: FieldId) -> Result<&[Rule], RegistryError> {
        Ok(&self.definition(field)?.rules)
    }

    pub fn dependents(&self, field: FieldId) -> Result<&[FieldId], RegistryError> {
        Ok(&self.definition(field)?.dependents)
    }

    /// Fresh form populated with every field's default.
    pub fn defaults(&self, window: &ExpirationWindow) -> FormState {
        let mut form = FormState::new();
        for def in self.fields.values() {
            let value = match &def.default {
                DefaultValue::None => None,
                DefaultValue::Fixed(value) => Some(value.clone()),
                DefaultValue::DaysFromNow(days) => {
                    Some(FieldValue::Timestamp(window.default_expiration(*days)))
                }
            };
            form.set(def.id, value);
        }
        form
    }

    fn check_edges(&self) -> Result<(), RegistryError> {
        for def in self.fields.values() {
            for rule in &def.rules {
                let Some(source) = rule.reads() else {
                    continue;
                };
                let declared = self
                    .fields
                    .get(&source)
                    .is_some_and(|src| src.dependents.contains(&def.id));
                if !declared {
                    return Err(RegistryError::MissingEdge {
                        source,
                        dependent: def.id,
                    });
                }
            }
            for dependent in &def.dependents {
                if !self.fields.contains_key(dependent) {
                    return Err(RegistryError::Unregistered(*dependent));
                }
            }
        }
        Ok(())
    }
}

fn standard_fields(default_expiration_days: i64) -> Vec<FieldDefinition> {
    use FieldId as F;

    let name_hint = r#"Name of contract should be descriptive, e.g. "ETH/BTC-20180228-Kraken""#;
    let floor_hint = "The lower bound of price exposure this contract will trade. If the oracle \
        reports a price below this value the contract will enter into settlement";
    let cap_hint = "The upper bound of price exposure this contract will trade. If the oracle \
        reports a price above this value the contract will enter into settlement";

    vec![
        FieldDefinition::new(F::ContractName)
            .label("Name")
            .hint(name_hint)
            .default_value(FieldValue::text(DEFAULT_CONTRACT_NAME))
            .required("Please enter a name for your contract")
            .rule(Rule::Text),
        FieldDefinition::new(F::ContractNameSimplified)
            .hint(name_hint)
            .default_value(FieldValue::text(DEFAULT_CONTRACT_NAME))
            .required("Please enter a name for your contract")
            .rule(Rule::Text),
        FieldDefinition::new(F::CollateralTokenAddress)
            .label("Base Token Address")
            .hint("This is the token that collateralizes the contract, it can be any valid ERC20 token")
            .default_value(FieldValue::text(DEFAULT_COLLATERAL_TOKEN))
            .required("Please enter a base token address")
            .rule(Rule::Text)
            .rule(Rule::Erc20Address),
        FieldDefinition::new(F::PriceFloor)
            .label("Price Floor")
            .hint(floor_hint)
            .default_value(FieldValue::Number(0.0))
            .required("Please enter a price floor")
            .numeric(NumericKind::Integer)
            .rule(Rule::AtMost {
                sibling: F::PriceCap,
                message: "Price floor must be less-than or equal to the price cap",
            })
            .dependents(&[F::PriceCap]),
        FieldDefinition::new(F::PriceCap)
            .label("Price Cap")
            .hint(cap_hint)
            .default_value(FieldValue::Number(150.0))
            .required("Please enter a price cap")
            .numeric(NumericKind::Integer)
            .rule(Rule::AtLeast {
                sibling: F::PriceFloor,
                message: "Price cap must be greater-than or equal to the price floor",
            })
            .dependents(&[F::PriceFloor]),
        FieldDefinition::new(F::PriceFloorSimplified)
            .hint(floor_hint)
            .default_value(FieldValue::Number(0.0))
            .required("Please enter a price floor")
            .numeric(NumericKind::Decimal)
            .rule(Rule::FloorBand { reference: F::Price })
            .rule(Rule::AtMost {
                sibling: F::PriceCapSimplified,
                message: "Price floor must be less-than or equal to the price cap",
            })
            .dependents(&[F::PriceCapSimplified]),
        FieldDefinition::new(F::PriceCapSimplified)
            .hint(cap_hint)
            .default_value(FieldValue::Number(150.0))
            .required("Please enter a price cap")
            .numeric(NumericKind::Decimal)
            .rule(Rule::CapBand { reference: F::Price })
            .rule(Rule::AtLeast {
                sibling: F::PriceFloorSimplified,
                message: "Price cap must be greater-than or equal to the price floor",
            })
            .dependents(&[F::PriceFloorSimplified]),
        // Hidden: reference price pushed by the price feed.
        FieldDefinition::new(F::Price)
            .numeric(NumericKind::Decimal)
            .dependents(&[F::PriceFloorSimplified, F::PriceCapSimplified]),
        FieldDefinition::new(F::PriceDecimalPlaces)
            .label("Price Decimal Places")
            .hint("Since all numbers must be represented as integers on the Ethereum blockchain, \
                this is how many decimal places one needs to move the decimal in order to go from \
                the oracle query price to an integer.")
            .default_value(FieldValue::Number(2.0))
            .required("Please enter the number of decimal places of the price")
            .numeric(NumericKind::Integer)
            .rule(Rule::InRange {
                min: 0.0,
                max: MAX_DECIMAL_PLACES,
                message: "Price decimal places must be a non-negative integer",
            }),
        FieldDefinition::new(F::QtyMultiplier)
            .label("Qty Multiplier")
            .hint("How many base units (wei for ethereum) each integer price movement changes \
                the value of the contract.")
            .default_value(FieldValue::Number(2.0))
            .required("Please enter a valid quantity multiplier")
            .numeric(NumericKind::Integer)
            .rule(Rule::InRange {
                min: 0.0,
                max: MAX_QTY_MULTIPLIER,
                message: "Qty multiplier must be a non-negative integer",
            }),
        FieldDefinition {
            default: DefaultValue::DaysFromNow(default_expiration_days),
            ..FieldDefinition::new(F::ExpirationTimeStamp)
                .label("Expiration Time")
                .hint("Expiration timestamp for all open positions to settle. Cannot be more \
                    than 60 days from now.")
                .required("Please enter an expiration time")
                .rule(Rule::Expiration)
        },
        FieldDefinition::new(F::OracleDataSource)
            .label("Oraclize.it data source")
            .hint("Available data sources from Oraclize.it")
            .default_value(FieldValue::text("URL"))
            .required("Please select a data source")
            .rule(Rule::Text)
            .rule(Rule::KnownDataSource)
            .dependents(&[F::OracleQuery]),
        FieldDefinition::new(F::OracleQuery)
            .label("Oraclize.it Query")
            .hint("Properly structured Oraclize.it query, please use the test query page for clarification")
            .default_value(FieldValue::text(DEFAULT_ORACLE_QUERY))
            .required("Please enter a valid query")
            .rule(Rule::Text)
            .rule(Rule::OracleQuery {
                source: F::OracleDataSource,
            }),
        FieldDefinition::new(F::ExchangeApi)
            .label("Exchange")
            .hint("Available exchange api")
            .default_value(FieldValue::text("BIN"))
            .required("Please select an exchange api")
            .rule(Rule::Text)
            .rule(Rule::KnownExchange),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixed_now;

    #[test]
    fn standard_registry_covers_every_field() {
        let registry = FieldRegistry::standard(28).expect("registry");
        for id in FieldId::ALL {
            assert!(registry.definition(id).is_ok(), "{id} missing");
        }
    }

    /// Floor and cap declare each other so either edit revalidates both.
    #[test]
    fn price_fields_declare_symmetric_edges() {
        let registry = FieldRegistry::standard(28).expect("registry");
        assert_eq!(
            registry.dependents(FieldId::PriceFloor).expect("deps"),
            &[FieldId::PriceCap]
        );
        assert_eq!(
            registry.dependents(FieldId::PriceCap).expect("deps"),
            &[FieldId::PriceFloor]
        );
        assert_eq!(
            registry.dependents(FieldId::Price).expect("deps"),
            &[FieldId::PriceFloorSimplified, FieldId::PriceCapSimplified]
        );
    }

    /// The numeric tag supplies the type rule right after `Required`.
    #[test]
    fn numeric_tag_appends_type_rule() {
        let registry = FieldRegistry::standard(28).expect("registry");
        let rules = registry.rules(FieldId::PriceDecimalPlaces).expect("rules");
        assert!(matches!(rules[0], Rule::Required { .. }));
        assert_eq!(rules[1], Rule::Integer);
        let def = registry.definition(FieldId::Price).expect("price");
        assert_eq!(def.numeric, Some(NumericKind::Decimal));
        assert_eq!(def.rules, vec![Rule::Number]);
    }

    #[test]
    fn rejects_rule_without_declared_edge() {
        let defs = vec![
            FieldDefinition::new(FieldId::PriceFloor).rule(Rule::AtMost {
                sibling: FieldId::PriceCap,
                message: "m",
            }),
            FieldDefinition::new(FieldId::PriceCap),
        ];
        let err = FieldRegistry::new(defs).expect_err("missing edge");
        assert_eq!(
            err,
            RegistryError::MissingEdge {
                source: FieldId::PriceCap,
                dependent: FieldId::PriceFloor,
            }
        );
    }

    #[test]
    fn unregistered_field_is_an_error() {
        let registry =
            FieldRegistry::new(vec![FieldDefinition::new(FieldId::ContractName)]).expect("registry");
        assert_eq!(
            registry.rules(FieldId::PriceCap),
            Err(RegistryError::Unregistered(FieldId::PriceCap))
        );
    }

    #[test]
    fn defaults_resolve_expiration_against_window() {
        let registry = FieldRegistry::standard(28).expect("registry");
        let window = ExpirationWindow::new(fixed_now(), 60);
        let form = registry.defaults(&window);
        assert_eq!(form.number(FieldId::PriceCap), Some(150.0));
        assert_eq!(form.text(FieldId::ExchangeApi), Some("BIN"));
        assert_eq!(form.get(FieldId::Price), None);
        let expiration = form
            .get(FieldId::ExpirationTimeStamp)
            .and_then(FieldValue::as_timestamp)
            .expect("expiration default");
        assert_eq!((expiration - fixed_now()).num_days(), 28);
    }
}
