//! Deployment progress state machine.
//!
//! Interprets phase, hash, error and result values pushed by the deploy
//! collaborator. The progress step is derived from the last observed phase and
//! never stored on its own. Notifications are edge-triggered: the tracker keeps
//! the last observed error and result and only reports a transition from
//! absent to present.

use serde::{Deserialize, Serialize};

use crate::core::explorer::Network;
use crate::core::types::{
    DeployedContract, DeploymentPhase, Notification, ProgressStep, TxHashes, TxLabel,
};

/// Map a phase to its progress step. `None` (no phase reported yet) counts as idle.
pub fn step_for_phase(phase: Option<DeploymentPhase>) -> ProgressStep {
    match phase {
        None
        | Some(DeploymentPhase::Idle)
        | Some(DeploymentPhase::Pending)
        | Some(DeploymentPhase::ContractDeploying) => ProgressStep::DeployingContract,
        Some(DeploymentPhase::DeploymentComplete)
        | Some(DeploymentPhase::CollateralPoolDeploying) => ProgressStep::DeployingCollateralPool,
        Some(DeploymentPhase::Rejected) | Some(DeploymentPhase::Fulfilled) => {
            ProgressStep::Finished
        }
    }
}

/// Full snapshot of deployment state as reported by the collaborator.
///
/// Absent hashes leave known hashes untouched; absent error/contract mean
/// "none right now" and re-arm the corresponding notification edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentUpdate {
    pub phase: Option<DeploymentPhase>,
    pub contract_tx_hash: Option<String>,
    pub collateral_pool_tx_hash: Option<String>,
    pub error: Option<String>,
    pub contract: Option<DeployedContract>,
}

/// Step transition observed on a phase update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepChange {
    pub from: ProgressStep,
    pub to: ProgressStep,
}

#[derive(Debug, Clone)]
pub struct DeploymentTracker {
    phase: Option<DeploymentPhase>,
    tx_hashes: TxHashes,
    last_error: Option<String>,
    last_contract: Option<DeployedContract>,
    network: Network,
}

impl Default for DeploymentTracker {
    fn default() -> Self {
        Self::new(Network::default())
    }
}

impl DeploymentTracker {
    pub fn new(network: Network) -> Self {
        Self {
            phase: None,
            tx_hashes: TxHashes::default(),
            last_error: None,
            last_contract: None,
            network,
        }
    }

    pub fn phase(&self) -> Option<DeploymentPhase> {
        self.phase
    }

    pub fn step(&self) -> ProgressStep {
        step_for_phase(self.phase)
    }

    pub fn tx_hashes(&self) -> &TxHashes {
        &self.tx_hashes
    }

    /// Record a new phase. Returns the step change, or `None` when the step is
    /// unchanged (including re-delivery of the same phase).
    pub fn on_phase_changed(&mut self, phase: Option<DeploymentPhase>) -> Option<StepChange> {
        let from = self.step();
        self.phase = phase;
        let to = self.step();
        (from != to).then_some(StepChange { from, to })
    }

    /// Merge reported hashes. Returns true when any entry changed.
    pub fn on_tx_hashes_changed(
        &mut self,
        contract_hash: Option<&str>,
        pool_hash: Option<&str>,
    ) -> bool {
        let contract = self
            .tx_hashes
            .merge(TxLabel::ContractDeployment, contract_hash);
        let pool = self
            .tx_hashes
            .merge(TxLabel::CollateralPoolDeployment, pool_hash);
        contract || pool
    }

    /// Fires once when an error appears where none was observed before.
    pub fn on_error_changed(&mut self, error: Option<&str>) -> Option<Notification> {
        let rising = self.last_error.is_none() && error.is_some();
        self.last_error = error.map(str::to_string);
        if !rising {
            return None;
        }
        error.map(|message| Notification::DeploymentFailed {
            message: message.to_string(),
        })
    }

    /// Fires once when a deployed contract appears where none was observed before.
    pub fn on_result_changed(
        &mut self,
        contract: Option<&DeployedContract>,
    ) -> Option<Notification> {
        let rising = self.last_contract.is_none() && contract.is_some();
        self.last_contract = contract.cloned();
        if !rising {
            return None;
        }
        contract.map(|c| Notification::ContractDeployed {
            address: c.address.clone(),
            explorer_url: self.network.address_url(&c.address),
        })
    }

    /// Apply a full snapshot: phase, then hashes, then error, then result.
    pub fn observe(&mut self, update: &DeploymentUpdate) -> Observation {
        let step_change = self.on_phase_changed(update.phase);
        let hashes_changed = self.on_tx_hashes_changed(
            update.contract_tx_hash.as_deref(),
            update.collateral_pool_tx_hash.as_deref(),
        );
        let mut notifications = Vec::new();
        notifications.extend(self.on_error_changed(update.error.as_deref()));
        notifications.extend(self.on_result_changed(update.contract.as_ref()));
        Observation {
            step_change,
            hashes_changed,
            notifications,
        }
    }

    /// Drop all locally tracked deployment state.
    pub fn reset(&mut self) {
        self.phase = None;
        self.tx_hashes.clear();
        self.last_error = None;
        self.last_contract = None;
    }
}

/// What a single [`DeploymentTracker::observe`] call changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub step_change: Option<StepChange>,
    pub hashes_changed: bool,
    pub notifications: Vec<Notification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_table_is_total() {
        use DeploymentPhase as P;
        let expected = [
            (None, 1),
            (Some(P::Idle), 1),
            (Some(P::Pending), 1),
            (Some(P::ContractDeploying), 1),
            (Some(P::DeploymentComplete), 2),
            (Some(P::CollateralPoolDeploying), 2),
            (Some(P::Rejected), 3),
            (Some(P::Fulfilled), 3),
        ];
        for (phase, step) in expected {
            assert_eq!(step_for_phase(phase).index(), step, "{phase:?}");
        }
    }

    /// Feeding phases in progression order never moves the step backwards.
    #[test]
    fn phase_progression_is_monotonic() {
        let mut tracker = DeploymentTracker::default();
        let mut last = tracker.step();
        for phase in DeploymentPhase::ORDER {
            tracker.on_phase_changed(Some(phase));
            assert!(tracker.step() >= last);
            last = tracker.step();
        }
    }

    #[test]
    fn repeated_phase_reports_no_step_change() {
        let mut tracker = DeploymentTracker::default();
        let change = tracker.on_phase_changed(Some(DeploymentPhase::DeploymentComplete));
        assert_eq!(
            change,
            Some(StepChange {
                from: ProgressStep::DeployingContract,
                to: ProgressStep::DeployingCollateralPool,
            })
        );
        assert_eq!(
            tracker.on_phase_changed(Some(DeploymentPhase::DeploymentComplete)),
            None
        );
        assert_eq!(tracker.step(), ProgressStep::DeployingCollateralPool);
    }

    #[test]
    fn error_notifies_on_rising_edge_only() {
        let mut tracker = DeploymentTracker::default();
        assert_eq!(tracker.on_error_changed(None), None);
        assert_eq!(
            tracker.on_error_changed(Some("err")),
            Some(Notification::DeploymentFailed {
                message: "err".to_string()
            })
        );
        assert_eq!(tracker.on_error_changed(Some("err")), None);
        assert_eq!(tracker.on_error_changed(Some("other")), None);
        // Cleared, then a fresh error fires again.
        assert_eq!(tracker.on_error_changed(None), None);
        assert!(tracker.on_error_changed(Some("err")).is_some());
    }

    #[test]
    fn result_notifies_on_rising_edge_only() {
        let mut tracker = DeploymentTracker::new(Network::Rinkeby);
        let contract = DeployedContract {
            address: "0x00000".to_string(),
        };
        assert_eq!(tracker.on_result_changed(None), None);
        assert_eq!(
            tracker.on_result_changed(Some(&contract)),
            Some(Notification::ContractDeployed {
                address: "0x00000".to_string(),
                explorer_url: Some("https://rinkeby.etherscan.io/address/0x00000".to_string()),
            })
        );
        assert_eq!(tracker.on_result_changed(Some(&contract)), None);
    }

    /// Hashes arriving separately both survive; absent values never erase.
    #[test]
    fn hashes_merge_across_updates() {
        let mut tracker = DeploymentTracker::default();
        assert!(tracker.on_tx_hashes_changed(Some("hashA"), None));
        assert!(tracker.on_tx_hashes_changed(None, Some("hashB")));
        assert!(!tracker.on_tx_hashes_changed(None, None));
        assert_eq!(
            tracker.tx_hashes().get(TxLabel::ContractDeployment),
            Some("hashA")
        );
        assert_eq!(
            tracker.tx_hashes().get(TxLabel::CollateralPoolDeployment),
            Some("hashB")
        );
    }

    /// A hash may arrive before the phase that produced it.
    #[test]
    fn hash_before_phase_is_kept() {
        let mut tracker = DeploymentTracker::default();
        tracker.observe(&DeploymentUpdate {
            phase: Some(DeploymentPhase::Pending),
            collateral_pool_tx_hash: Some("pool".to_string()),
            ..DeploymentUpdate::default()
        });
        tracker.observe(&DeploymentUpdate {
            phase: Some(DeploymentPhase::CollateralPoolDeploying),
            ..DeploymentUpdate::default()
        });
        assert_eq!(
            tracker.tx_hashes().get(TxLabel::CollateralPoolDeployment),
            Some("pool")
        );
    }

    #[test]
    fn pending_to_fulfilled_fires_one_success() {
        let mut tracker = DeploymentTracker::default();
        let steps: Vec<u8> = [
            DeploymentUpdate {
                phase: Some(DeploymentPhase::Pending),
                ..DeploymentUpdate::default()
            },
            DeploymentUpdate {
                phase: Some(DeploymentPhase::DeploymentComplete),
                contract_tx_hash: Some("0xc".to_string()),
                ..DeploymentUpdate::default()
            },
            DeploymentUpdate {
                phase: Some(DeploymentPhase::Fulfilled),
                contract: Some(DeployedContract {
                    address: "0xabc".to_string(),
                }),
                ..DeploymentUpdate::default()
            },
        ]
        .iter()
        .map(|update| {
            let observed = tracker.observe(update);
            let expect_success = update.phase == Some(DeploymentPhase::Fulfilled);
            assert_eq!(observed.notifications.len(), usize::from(expect_success));
            tracker.step().index()
        })
        .collect();
        assert_eq!(steps, vec![1, 2, 3]);
    }

    #[test]
    fn reset_clears_tracking_state() {
        let mut tracker = DeploymentTracker::default();
        tracker.observe(&DeploymentUpdate {
            phase: Some(DeploymentPhase::Rejected),
            contract_tx_hash: Some("0xc".to_string()),
            error: Some("boom".to_string()),
            ..DeploymentUpdate::default()
        });
        tracker.reset();
        assert_eq!(tracker.step(), ProgressStep::DeployingContract);
        assert_eq!(tracker.tx_hashes().get(TxLabel::ContractDeployment), None);
        assert!(tracker.on_error_changed(Some("boom")).is_some());
    }
}
