//! Cross-field validation engine.
//!
//! Validation is a pure function of registry + snapshot. Editing a field
//! revalidates the field itself and every field it declares as a dependent,
//! and reports all of those results to the caller.

use std::collections::BTreeMap;

use crate::core::expiration::ExpirationWindow;
use crate::core::registry::FieldRegistry;
use crate::core::rules::{PriceBounds, ReferenceCatalog, RuleContext};
use crate::core::types::{FieldId, FieldValue, FormState, RegistryError, ValidationResult};

/// Per-field results keyed by field id.
pub type ValidationReport = BTreeMap<FieldId, ValidationResult>;

/// Results produced by a single field edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub field: FieldId,
    pub result: ValidationResult,
    /// Dependents revalidated because of this edit, in declaration order.
    pub revalidated: Vec<(FieldId, ValidationResult)>,
}

pub struct Validator<'a> {
    registry: &'a FieldRegistry,
    catalog: &'a dyn ReferenceCatalog,
    bounds: PriceBounds,
    window: ExpirationWindow,
}

impl<'a> Validator<'a> {
    pub fn new(
        registry: &'a FieldRegistry,
        catalog: &'a dyn ReferenceCatalog,
        bounds: PriceBounds,
        window: ExpirationWindow,
    ) -> Self {
        Self {
            registry,
            catalog,
            bounds,
            window,
        }
    }

    /// Validate `value` as the content of `field` against the rest of `form`.
    ///
    /// `value` takes precedence over whatever `form` holds for `field`, so a
    /// candidate edit can be checked without committing it.
    pub fn validate_field(
        &self,
        field: FieldId,
        value: Option<&FieldValue>,
        form: &FormState,
    ) -> Result<ValidationResult, RegistryError> {
        let rules = self.registry.rules(field)?;
        let ctx = RuleContext {
            form,
            catalog: self.catalog,
            bounds: self.bounds,
            window: &self.window,
        };
        for rule in rules {
            if let Err(message) = rule.check(value, &ctx) {
                return Ok(ValidationResult::Invalid { message });
            }
        }
        Ok(ValidationResult::Valid)
    }

    /// Validate each listed field using its current value in `form`.
    pub fn validate_all(
        &self,
        form: &FormState,
        fields: &[FieldId],
    ) -> Result<ValidationReport, RegistryError> {
        let mut report = ValidationReport::new();
        for field in fields {
            let result = self.validate_field(*field, form.get(*field), form)?;
            report.insert(*field, result);
        }
        Ok(report)
    }

    /// Commit `value` into `form`, then validate the field and its dependents.
    pub fn apply_edit(
        &self,
        form: &mut FormState,
        field: FieldId,
        value: Option<FieldValue>,
    ) -> Result<EditOutcome, RegistryError> {
        let dependents = self.registry.dependents(field)?;
        form.set(field, value);

        let result = self.validate_field(field, form.get(field), form)?;
        let mut revalidated = Vec::with_capacity(dependents.len());
        for dependent in dependents {
            let dep_result = self.validate_field(*dependent, form.get(*dependent), form)?;
            revalidated.push((*dependent, dep_result));
        }

        Ok(EditOutcome {
            field,
            result,
            revalidated,
        })
    }
}

/// True when every result in the report is valid.
pub fn all_valid(report: &ValidationReport) -> bool {
    report.values().all(ValidationResult::is_valid)
}

/// Invalid entries only, as `(field, message)` pairs in field order.
pub fn failures(report: &ValidationReport) -> Vec<(FieldId, &str)> {
    report
        .iter()
        .filter_map(|(field, result)| result.message().map(|msg| (*field, msg)))
        .collect()
}
