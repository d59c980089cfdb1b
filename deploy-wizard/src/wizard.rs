//! Wizard shell: step sequencing, accumulated form state and deploy dispatch.
//!
//! The shell owns the form for one deployment session. Forward navigation is
//! gated on validating the current step's fields; backward navigation never
//! validates. The final step hands the form to the [`Deployer`] and then only
//! observes what the collaborator reports back through the
//! [`DeploymentTracker`].

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::core::expiration::ExpirationWindow;
use crate::core::progress::{DeploymentTracker, DeploymentUpdate, Observation};
use crate::core::registry::FieldRegistry;
use crate::core::rules::{PriceBounds, ReferenceCatalog};
use crate::core::types::{FieldId, FieldValue, FormState, Mode, Notification};
use crate::core::validation::{EditOutcome, ValidationReport, Validator, all_valid, failures};
use crate::io::clock::Clock;
use crate::io::config::WizardConfig;
use crate::io::deployer::Deployer;

/// User-visible wizard pages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    Name,
    Pricing,
    Expiration,
    DataSource,
    Deploy,
}

impl WizardStep {
    pub const ORDER: [WizardStep; 5] = [
        WizardStep::Name,
        WizardStep::Pricing,
        WizardStep::Expiration,
        WizardStep::DataSource,
        WizardStep::Deploy,
    ];

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::Name => "Name",
            WizardStep::Pricing => "Pricing",
            WizardStep::Expiration => "Expiration",
            WizardStep::DataSource => "Data Source",
            WizardStep::Deploy => "Deploy",
        }
    }

    /// Fields gated by this step's "next" action.
    pub fn fields(self, mode: Mode) -> &'static [FieldId] {
        use FieldId as F;
        match (self, mode) {
            (WizardStep::Name, Mode::Guided) => &[F::ContractName, F::CollateralTokenAddress],
            (WizardStep::Name, Mode::Simplified) => &[F::ContractNameSimplified],
            (WizardStep::Pricing, Mode::Guided) => &[
                F::PriceFloor,
                F::PriceCap,
                F::PriceDecimalPlaces,
                F::QtyMultiplier,
            ],
            (WizardStep::Pricing, Mode::Simplified) => &[
                F::ExchangeApi,
                F::PriceFloorSimplified,
                F::PriceCapSimplified,
            ],
            (WizardStep::Expiration, _) => &[F::ExpirationTimeStamp],
            (WizardStep::DataSource, _) => &[F::OracleDataSource, F::OracleQuery],
            (WizardStep::Deploy, _) => &[],
        }
    }

    /// Every field gated by some step of `mode`, in step order.
    pub fn session_fields(mode: Mode) -> Vec<FieldId> {
        WizardStep::ORDER
            .iter()
            .flat_map(|step| step.fields(mode).iter().copied())
            .collect()
    }

    fn position(self) -> usize {
        self as usize
    }
}

/// Result of a "next" click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Moved(WizardStep),
    /// Current step has invalid fields; the report covers every field of the step.
    Blocked(ValidationReport),
}

/// Result of a "deploy" click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Sent,
    /// Some field edited after its step no longer validates; nothing was sent.
    Blocked(ValidationReport),
}

pub struct Wizard<D: Deployer> {
    registry: FieldRegistry,
    catalog: Box<dyn ReferenceCatalog>,
    clock: Box<dyn Clock>,
    bounds: PriceBounds,
    max_days: i64,
    mode: Mode,
    form: FormState,
    step: WizardStep,
    tracker: DeploymentTracker,
    deployer: D,
}

impl<D: Deployer> Wizard<D> {
    pub fn new(
        config: &WizardConfig,
        mode: Mode,
        catalog: Box<dyn ReferenceCatalog>,
        clock: Box<dyn Clock>,
        deployer: D,
    ) -> Result<Self> {
        config.validate()?;
        let registry = FieldRegistry::standard(config.expiration.default_days)
            .context("build field registry")?;
        let window = ExpirationWindow::new(clock.now(), config.expiration.max_days);
        let form = registry.defaults(&window);
        debug!(?mode, fields = form.len(), "wizard session started");
        Ok(Self {
            registry,
            catalog,
            clock,
            bounds: config.price_bounds(),
            max_days: config.expiration.max_days,
            mode,
            form,
            step: WizardStep::Name,
            tracker: DeploymentTracker::new(config.network.clone()),
            deployer,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &DeploymentTracker {
        &self.tracker
    }

    pub fn deployer(&self) -> &D {
        &self.deployer
    }

    /// Expiration window as of now; the date picker should use this too.
    pub fn expiration_window(&self) -> ExpirationWindow {
        ExpirationWindow::new(self.clock.now(), self.max_days)
    }

    fn validator(&self) -> Validator<'_> {
        Validator::new(
            &self.registry,
            self.catalog.as_ref(),
            self.bounds,
            self.expiration_window(),
        )
    }

    /// Edit one field; the outcome includes every dependent that was revalidated.
    pub fn set_field(&mut self, field: FieldId, value: Option<FieldValue>) -> Result<EditOutcome> {
        let validator = Validator::new(
            &self.registry,
            self.catalog.as_ref(),
            self.bounds,
            ExpirationWindow::new(self.clock.now(), self.max_days),
        );
        let outcome = validator.apply_edit(&mut self.form, field, value)?;
        debug!(
            %field,
            valid = outcome.result.is_valid(),
            revalidated = outcome.revalidated.len(),
            "field edited"
        );
        Ok(outcome)
    }

    /// Push a new live reference price (hidden `price` field).
    pub fn set_reference_price(&mut self, price: f64) -> Result<EditOutcome> {
        self.set_field(FieldId::Price, Some(FieldValue::Number(price)))
    }

    /// Apply every value in `values` as an edit, in field order.
    pub fn fill(&mut self, values: &FormState) -> Result<()> {
        for (field, value) in values.iter() {
            self.set_field(field, Some(value.clone()))?;
        }
        Ok(())
    }

    /// Validate the current step's fields without moving.
    pub fn validate_step(&self) -> Result<ValidationReport> {
        let report = self
            .validator()
            .validate_all(&self.form, self.step.fields(self.mode))?;
        Ok(report)
    }

    /// Validate every field any step of this mode gates on.
    pub fn validate_session(&self) -> Result<ValidationReport> {
        let fields = WizardStep::session_fields(self.mode);
        Ok(self.validator().validate_all(&self.form, &fields)?)
    }

    /// Advance when the current step validates; otherwise stay and report.
    pub fn next(&mut self) -> Result<Advance> {
        if self.step == WizardStep::Deploy {
            bail!("already at the final step; use deploy()");
        }
        let report = self.validate_step()?;
        if !all_valid(&report) {
            for (field, message) in failures(&report) {
                debug!(step = self.step.title(), %field, reason = message, "step blocked");
            }
            return Ok(Advance::Blocked(report));
        }
        self.step = WizardStep::ORDER[self.step.position() + 1];
        info!(step = self.step.title(), "advanced");
        Ok(Advance::Moved(self.step))
    }

    /// Go back one step. Never validates.
    pub fn back(&mut self) -> WizardStep {
        if let Some(prev) = self.step.position().checked_sub(1) {
            self.step = WizardStep::ORDER[prev];
            debug!(step = self.step.title(), "moved back");
        }
        self.step
    }

    /// Revalidate the whole session and hand the form to the deploy collaborator.
    pub fn deploy(&mut self) -> Result<Dispatch> {
        if self.step != WizardStep::Deploy {
            bail!("deploy is only available on the final step");
        }
        let report = self.validate_session()?;
        if !all_valid(&report) {
            for (field, message) in failures(&report) {
                debug!(%field, reason = message, "deploy blocked");
            }
            return Ok(Dispatch::Blocked(report));
        }
        info!(mode = ?self.mode, "dispatching deployment");
        self.deployer
            .deploy(&self.form, self.mode)
            .context("dispatch deployment")?;
        Ok(Dispatch::Sent)
    }

    /// Apply a status snapshot from the collaborator.
    pub fn observe(&mut self, update: &DeploymentUpdate) -> Observation {
        let observed = self.tracker.observe(update);
        if let Some(change) = observed.step_change {
            info!(
                from = change.from.index(),
                to = change.to.index(),
                phase = ?self.tracker.phase(),
                "deployment progress"
            );
        }
        for notification in &observed.notifications {
            match notification {
                Notification::DeploymentFailed { message } => {
                    warn!(error = %message, "deployment failed");
                }
                Notification::ContractDeployed { address, .. } => {
                    info!(%address, "contract deployed");
                }
            }
        }
        observed
    }

    /// Reset tracked deployment state, then re-dispatch the same form.
    ///
    /// The collaborator sees exactly one `reset` followed by one `deploy`.
    /// A transaction already sent is not withdrawn.
    pub fn retry(&mut self) -> Result<()> {
        info!(phase = ?self.tracker.phase(), "retrying deployment");
        self.tracker.reset();
        self.deployer
            .reset()
            .context("reset deployment state")?;
        self.deployer
            .deploy(&self.form, self.mode)
            .context("re-dispatch deployment")
    }

    /// Discard the session: defaults restored, back to the first step.
    pub fn reset(&mut self) {
        self.form = self.registry.defaults(&self.expiration_window());
        self.step = WizardStep::Name;
        self.tracker.reset();
        debug!("wizard reset");
    }
}
