//! Replay recorded deployment updates through a tracker.
//!
//! Input is JSON Lines: one [`DeploymentUpdate`] snapshot per line, blank
//! lines ignored. Each snapshot is observed in order and the resulting
//! progress step, known hashes and fired notifications are recorded.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::core::explorer::Network;
use crate::core::progress::{DeploymentTracker, DeploymentUpdate, StepChange};
use crate::core::types::{DeploymentPhase, Notification, ProgressStep, TxHashes};

/// State after observing one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRecord {
    /// 1-based line number in the input.
    pub line: usize,
    pub phase: Option<DeploymentPhase>,
    pub step: ProgressStep,
    pub step_change: Option<StepChange>,
    pub tx_hashes: TxHashes,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub records: Vec<ReplayRecord>,
    pub final_phase: Option<DeploymentPhase>,
}

impl ReplayOutcome {
    /// Final step was reached through the rejected phase.
    pub fn rejected(&self) -> bool {
        self.final_phase == Some(DeploymentPhase::Rejected)
    }
}

#[instrument(skip_all, fields(path = %path.display()))]
pub fn replay_file(path: &Path, network: Network) -> Result<ReplayOutcome> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    replay_updates(BufReader::new(file), network)
        .with_context(|| format!("replay {}", path.display()))
}

pub fn replay_updates(reader: impl BufRead, network: Network) -> Result<ReplayOutcome> {
    let mut tracker = DeploymentTracker::new(network);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("read line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let update: DeploymentUpdate = serde_json::from_str(&line)
            .with_context(|| format!("parse update on line {line_no}"))?;
        let observed = tracker.observe(&update);
        debug!(
            line = line_no,
            step = tracker.step().index(),
            notifications = observed.notifications.len(),
            "update observed"
        );
        records.push(ReplayRecord {
            line: line_no,
            phase: tracker.phase(),
            step: tracker.step(),
            step_change: observed.step_change,
            tx_hashes: tracker.tx_hashes().clone(),
            notifications: observed.notifications,
        });
    }
    Ok(ReplayOutcome {
        records,
        final_phase: tracker.phase(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TxLabel;

    fn replay(input: &str) -> ReplayOutcome {
        replay_updates(input.as_bytes(), Network::Mainnet).expect("replay")
    }

    #[test]
    fn successful_deployment_reaches_finished() {
        let input = r#"{"phase":"pending"}
{"phase":"contractDeploying","contractTxHash":"0xaa"}

{"phase":"deploymentComplete","contractTxHash":"0xaa"}
{"phase":"fulfilled","collateralPoolTxHash":"0xbb","contract":{"address":"0xcc"}}
"#;
        let outcome = replay(input);
        assert_eq!(outcome.records.len(), 4);
        assert_eq!(outcome.records[3].line, 5);
        let steps: Vec<u8> = outcome.records.iter().map(|r| r.step.index()).collect();
        assert_eq!(steps, vec![1, 1, 2, 3]);

        let last = &outcome.records[3];
        assert_eq!(last.tx_hashes.get(TxLabel::ContractDeployment), Some("0xaa"));
        assert_eq!(
            last.tx_hashes.get(TxLabel::CollateralPoolDeployment),
            Some("0xbb")
        );
        assert_eq!(
            last.notifications,
            vec![Notification::ContractDeployed {
                address: "0xcc".to_string(),
                explorer_url: Some("https://etherscan.io/address/0xcc".to_string()),
            }]
        );
        assert!(!outcome.rejected());
    }

    /// A repeated error snapshot notifies once.
    #[test]
    fn rejection_notifies_once() {
        let input = r#"{"phase":"pending"}
{"phase":"rejected","error":"user denied"}
{"phase":"rejected","error":"user denied"}
"#;
        let outcome = replay(input);
        let fired: usize = outcome.records.iter().map(|r| r.notifications.len()).sum();
        assert_eq!(fired, 1);
        assert!(outcome.rejected());
        assert_eq!(outcome.records[2].step, ProgressStep::Finished);
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let err = replay_updates(
            "{\"phase\":\"pending\"}\n{\"phase\":\"exploded\"}\n".as_bytes(),
            Network::Mainnet,
        )
        .expect_err("bad phase");
        assert!(format!("{err:#}").contains("line 2"));
    }
}
