//! Numbered console menu: pick a protocol, send, repeat.

use std::io::{BufRead, Write};

use anyhow::Result;
use arq_lab_abstract::{Packet, ProtocolKind, SessionConfig};
use arq_lab_simulator::{Session, SessionReport};
use tracing::warn;

use crate::driver::{drain, print_events, send_and_drain};

pub struct Menu<R, W> {
    input: R,
    out: W,
    template: SessionConfig,
    max_ticks: u64,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    /// `template` supplies channel, tick and pacing settings for every run.
    pub fn new(input: R, out: W, template: SessionConfig, max_ticks: u64) -> Self {
        Self {
            input,
            out,
            template,
            max_ticks,
        }
    }

    /// Loop until the user picks "Exit" or input ends. Returns one report
    /// per protocol run.
    pub fn run(&mut self) -> Result<Vec<SessionReport>> {
        let mut reports = Vec::new();
        loop {
            writeln!(self.out, "Select a flow control protocol:")?;
            for kind in ProtocolKind::ALL {
                writeln!(self.out, "{}. {}", kind.menu_number(), kind)?;
            }
            writeln!(self.out, "5. Exit Program")?;

            let Some(line) = self.read_line()? else {
                break;
            };
            match line.trim().parse::<u32>() {
                Ok(5) => {
                    writeln!(self.out, "Exiting Program.")?;
                    break;
                }
                Ok(choice) => match ProtocolKind::from_menu_number(choice) {
                    Some(kind) => {
                        if let Some(report) = self.run_protocol(kind)? {
                            reports.push(report);
                        }
                    }
                    None => writeln!(self.out, "Invalid choice. Please try again.")?,
                },
                Err(_) => writeln!(self.out, "Invalid choice. Please try again.")?,
            }
        }
        Ok(reports)
    }

    fn run_protocol(&mut self, kind: ProtocolKind) -> Result<Option<SessionReport>> {
        writeln!(self.out, "{kind} flow control protocol selected.")?;

        let window_size = if kind.has_configurable_window() {
            write!(self.out, "Enter the window size: ")?;
            self.out.flush()?;
            let Some(line) = self.read_line()? else {
                return Ok(None);
            };
            match line.trim().parse::<u32>() {
                Ok(size) => Some(size),
                Err(_) => {
                    writeln!(self.out, "Invalid window size '{}'.", line.trim())?;
                    return Ok(None);
                }
            }
        } else {
            None
        };

        let mut config = self.template.clone();
        config.protocol = kind;
        config.window_size = window_size;
        let mut session = match Session::open(config) {
            Ok(session) => session,
            Err(err) => {
                warn!("Rejected configuration: {err}");
                writeln!(self.out, "Invalid configuration: {err}")?;
                return Ok(None);
            }
        };

        match kind {
            ProtocolKind::StopAndWait => self.stop_and_wait(&mut session)?,
            ProtocolKind::Simple => self.simple(&mut session)?,
            ProtocolKind::GoBackN | ProtocolKind::SelectiveRepeat => self.windowed(&mut session)?,
        }
        Ok(Some(session.close()?))
    }

    fn stop_and_wait(&mut self, session: &mut Session) -> Result<()> {
        loop {
            write!(self.out, "Enter a message to send (or type 'exit' to quit): ")?;
            self.out.flush()?;
            let Some(message) = self.read_line()? else {
                return Ok(());
            };
            if message == "exit" {
                return Ok(());
            }
            send_and_drain(session, message, self.max_ticks, &mut self.out)?;
        }
    }

    fn simple(&mut self, session: &mut Session) -> Result<()> {
        loop {
            let next = session.snapshot().next_seq;
            send_and_drain(session, Packet::numbered(next).payload, self.max_ticks, &mut self.out)?;
            if !self.keep_going("Enter 'c' to continue or 'x' to exit: ")? {
                return Ok(());
            }
        }
    }

    /// Go-Back-N and Selective Repeat send a full window of generated
    /// packets per round.
    fn windowed(&mut self, session: &mut Session) -> Result<()> {
        loop {
            writeln!(self.out, "Sending packets...")?;
            let snapshot = session.snapshot();
            for offset in 0..snapshot.window_size {
                let seq = snapshot.next_seq.wrapping_add(offset);
                let events = session.send_message(Packet::numbered(seq).payload)?;
                print_events(&mut self.out, &events)?;
            }
            drain(session, self.max_ticks, &mut self.out)?;
            if !self.keep_going("Enter 'c' to send another window or 'x' to exit: ")? {
                return Ok(());
            }
        }
    }

    fn keep_going(&mut self, prompt: &str) -> Result<bool> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;
        Ok(match self.read_line()? {
            Some(answer) => answer.trim() != "x",
            None => false,
        })
    }

    /// One line without its terminator, `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
