use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use arq_lab_abstract::{TestAction, TestAssertion, TestScenario};
use tracing::info;

use crate::session::Session;
use crate::trace::SessionReport;

pub fn load_scenario(path: &Path) -> Result<TestScenario> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    parse_scenario(&content)
}

pub fn parse_scenario(content: &str) -> Result<TestScenario> {
    toml::from_str(content).context("Failed to parse scenario")
}

/// Load, run and check the scenario at `path`.
pub fn run_scenario(path: &Path) -> Result<SessionReport> {
    let scenario = load_scenario(path)?;
    run(&scenario)
}

/// Replay the scenario's actions on a fresh loopback session, then check its
/// assertions. The first failing assertion aborts the run.
pub fn run(scenario: &TestScenario) -> Result<SessionReport> {
    info!("Running Scenario: {}", scenario.name);
    if !scenario.description.is_empty() {
        info!("Description: {}", scenario.description);
    }

    let mut session =
        Session::open(scenario.session_config()).context("Invalid scenario configuration")?;

    for (idx, action) in scenario.actions.iter().enumerate() {
        apply(&mut session, action)
            .with_context(|| format!("Action #{} ({:?}) failed", idx + 1, action))?;
    }

    let report = session.report();
    for assertion in &scenario.assertions {
        check(&report, assertion)?;
    }

    info!("Test Scenario Passed!");
    Ok(session.close()?)
}

fn apply(session: &mut Session, action: &TestAction) -> Result<()> {
    match action {
        TestAction::Send { text } => {
            session.send_message(text.as_str())?;
        }
        TestAction::Tick { count } => {
            for _ in 0..*count {
                session.tick()?;
            }
        }
        TestAction::DropNextPacket { seq } => session.channel_mut().drop_next_packet(*seq),
        TestAction::DropNextAck { seq } => session.channel_mut().drop_next_ack(*seq),
        TestAction::RunUntilIdle { max_ticks } => {
            session.run_until_idle(*max_ticks)?;
        }
    }
    Ok(())
}

fn check(report: &SessionReport, assertion: &TestAssertion) -> Result<()> {
    let window = &report.window;
    match assertion {
        TestAssertion::BaseIs { base } => {
            if window.base != *base {
                bail!("Assertion Failed: base is {}, expected {}", window.base, base);
            }
        }
        TestAssertion::InFlightIs { seqs } => {
            if &window.in_flight != seqs {
                bail!(
                    "Assertion Failed: in flight {:?}, expected {:?}",
                    window.in_flight,
                    seqs
                );
            }
        }
        TestAssertion::AckedOutOfOrderIs { seqs } => {
            if &window.acked_out_of_order != seqs {
                bail!(
                    "Assertion Failed: acked out of order {:?}, expected {:?}",
                    window.acked_out_of_order,
                    seqs
                );
            }
        }
        TestAssertion::SentSequenceIs { seqs } => {
            let sent = report.sent_sequence();
            if &sent != seqs {
                bail!("Assertion Failed: sent {:?}, expected {:?}", sent, seqs);
            }
        }
        TestAssertion::RetransmittedIs { seqs } => {
            let resent = report.retransmitted();
            if &resent != seqs {
                bail!(
                    "Assertion Failed: retransmitted {:?}, expected {:?}",
                    resent,
                    seqs
                );
            }
        }
        TestAssertion::TimeoutsAtLeast { count } => {
            if report.stats.timeouts < *count {
                bail!(
                    "Assertion Failed: {} timeouts, expected at least {}",
                    report.stats.timeouts,
                    count
                );
            }
        }
        TestAssertion::PacketsSentBetween { min, max } => {
            let total = report.stats.transmissions();
            if total < *min {
                return Err(anyhow!(
                    "Assertion Failed: sender transmitted {} packets, expected min {}",
                    total,
                    min
                ));
            }
            if let Some(max) = max
                && total > *max
            {
                return Err(anyhow!(
                    "Assertion Failed: sender transmitted {} packets, expected max {}",
                    total,
                    max
                ));
            }
        }
        TestAssertion::Idle => {
            if !window.in_flight.is_empty() {
                bail!(
                    "Assertion Failed: session not idle, {:?} still in flight",
                    window.in_flight
                );
            }
        }
    }
    Ok(())
}
