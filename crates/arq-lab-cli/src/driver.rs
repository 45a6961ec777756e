use std::io::Write;

use anyhow::Result;
use arq_lab_simulator::{Session, SessionEvent};

pub fn print_events(out: &mut impl Write, events: &[SessionEvent]) -> Result<()> {
    for event in events {
        writeln!(out, "{event}")?;
        if let SessionEvent::PacketSent { seq, payload } = event {
            writeln!(out, "Packet contents:")?;
            writeln!(out, "Sequence number: {seq}")?;
            writeln!(out, "Message: {payload}")?;
        }
    }
    Ok(())
}

/// Tick until nothing is queued or in flight, printing as we go.
pub fn drain(session: &mut Session, max_ticks: u64, out: &mut impl Write) -> Result<()> {
    let mut ticks = 0;
    while !session.is_idle() {
        if ticks == max_ticks {
            anyhow::bail!(
                "{} still had {:?} in flight after {} ticks",
                session.kind(),
                session.snapshot().in_flight,
                ticks
            );
        }
        writeln!(out, "Waiting for acknowledgement...")?;
        let events = session.tick()?;
        print_events(out, &events)?;
        ticks += 1;
    }
    Ok(())
}

/// Send one message and wait for the window to drain.
pub fn send_and_drain(
    session: &mut Session,
    text: impl Into<String>,
    max_ticks: u64,
    out: &mut impl Write,
) -> Result<()> {
    let events = session.send_message(text)?;
    print_events(out, &events)?;
    drain(session, max_ticks, out)
}
