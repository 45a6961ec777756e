//! A running protocol session.
//!
//! The session is the only owner of the window, the channel and the clock,
//! and drives them in a strictly sequential loop:
//!
//! ```text
//!  send_message ──▶ controller.accept ──▶ channel.transmit
//!                                             │
//!  tick ──▶ timers.wait_tick ──▶ channel.poll_ack (per outstanding seq)
//!                                             │
//!              controller.on_ack ◀────────────┘
//!                    │
//!        progress? restart timer : expired? controller.on_timeout ──▶ resend
//! ```
//!
//! One timer covers the whole window. It restarts whenever a polling pass
//! credits an ack and is dropped once nothing is in flight.

use std::collections::VecDeque;

use arq_lab_abstract::{Ack, ConfigError, ProtocolKind, SessionConfig};
use thiserror::Error;
use tracing::{debug, info};

use crate::channel::{Channel, LoopbackChannel};
use crate::event::SessionEvent;
use crate::timer::{TimerHandle, TimerService};
use crate::trace::{SessionReport, SessionStats, TraceEntry};
use crate::window::{AckOutcome, WindowController, WindowSnapshot, controller_for};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{0} accepts one message at a time; the previous one is not acknowledged yet")]
    Busy(ProtocolKind),

    #[error("session is closed")]
    Closed,

    #[error("session still had work after {ticks} ticks")]
    Stalled { ticks: u64 },
}

pub struct Session<C: Channel = LoopbackChannel> {
    config: SessionConfig,
    controller: Box<dyn WindowController>,
    channel: C,
    timers: TimerService,
    window_timer: Option<TimerHandle>,
    /// Messages accepted from the driver that do not fit the window yet
    pending: VecDeque<String>,
    timeline: Vec<TraceEntry>,
    stats: SessionStats,
    closed: bool,
}

impl Session<LoopbackChannel> {
    /// Open a session over the loopback channel described by `config.channel`.
    pub fn open(config: SessionConfig) -> Result<Self, ConfigError> {
        let channel = LoopbackChannel::new(config.channel.clone());
        Self::with_channel(config, channel)
    }
}

impl<C: Channel> Session<C> {
    pub fn with_channel(config: SessionConfig, channel: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let controller = controller_for(&config);
        let timers = TimerService::new(config.tick_ms, config.pacing);
        info!(
            "{} selected (window size {})",
            config.protocol,
            config.effective_window()
        );
        Ok(Self {
            config,
            controller,
            channel,
            timers,
            window_timer: None,
            pending: VecDeque::new(),
            timeline: Vec::new(),
            stats: SessionStats::default(),
            closed: false,
        })
    }

    pub fn kind(&self) -> ProtocolKind {
        self.config.protocol
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        self.controller.snapshot()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn timeline(&self) -> &[TraceEntry] {
        &self.timeline
    }

    /// Messages waiting for room in the window.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Nothing queued and nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.controller.is_idle()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Hand a message to the sender.
    ///
    /// Simple Protocol and Stop-and-Wait refuse a new message while one is
    /// unacknowledged. Go-Back-N and Selective Repeat queue messages that do
    /// not fit and send them as the window slides.
    pub fn send_message(
        &mut self,
        text: impl Into<String>,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_open()?;
        if !self.kind().has_configurable_window() && !self.controller.has_room() {
            return Err(SessionError::Busy(self.kind()));
        }
        self.pending.push_back(text.into());

        let mut events = Vec::new();
        self.fill_window(&mut events);
        self.sync_timer();
        Ok(self.record(events))
    }

    /// Advance time by one quantum, collect acks and handle an expired timer.
    pub fn tick(&mut self) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_open()?;
        let fired = self.timers.wait_tick();
        let now = self.timers.now_ms();
        let expired = self.window_timer.is_some_and(|handle| fired.contains(&handle));
        if expired {
            self.window_timer = None;
        }

        let mut events = Vec::new();
        let mut progress = false;
        for seq in self.controller.outstanding() {
            if let Some(ack) = self.channel.poll_ack(seq, now) {
                progress |= self.credit(ack, &mut events);
            }
        }

        if progress {
            self.stop_timer();
        } else if expired {
            self.retransmit(&mut events);
        } else if !self.controller.is_idle() {
            debug!("{}: waiting for acknowledgement at {} ms", self.kind(), now);
        }

        self.fill_window(&mut events);
        self.sync_timer();
        Ok(self.record(events))
    }

    /// Credit an ack directly, bypassing the channel poll. Time does not
    /// move. A credited ack is also taken out of the medium so a later
    /// packet reusing the sequence number cannot be acknowledged by it.
    pub fn deliver_ack(&mut self, seq: u32) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_open()?;
        let mut events = Vec::new();
        if self.credit(Ack { seq }, &mut events) {
            self.channel.discard_ack(seq);
            self.stop_timer();
        }
        self.fill_window(&mut events);
        self.sync_timer();
        Ok(self.record(events))
    }

    /// Tick until the session is idle, giving up after `max_ticks`.
    pub fn run_until_idle(&mut self, max_ticks: u64) -> Result<Vec<SessionEvent>, SessionError> {
        self.ensure_open()?;
        let mut events = Vec::new();
        let mut ticks = 0;
        while !self.is_idle() {
            if ticks == max_ticks {
                return Err(SessionError::Stalled { ticks });
            }
            events.extend(self.tick()?);
            ticks += 1;
        }
        Ok(events)
    }

    /// Snapshot of everything that happened so far.
    pub fn report(&self) -> SessionReport {
        SessionReport {
            config: self.config.clone(),
            duration_ms: self.timers.now_ms(),
            stats: self.stats,
            channel: self.channel.stats(),
            window: self.controller.snapshot(),
            timeline: self.timeline.clone(),
        }
    }

    /// End the session. Later calls return [`SessionError::Closed`].
    pub fn close(&mut self) -> Result<SessionReport, SessionError> {
        self.ensure_open()?;
        self.stop_timer();
        self.closed = true;
        if !self.is_idle() {
            info!(
                "{} closed with {} packet(s) in flight and {} queued",
                self.kind(),
                self.controller.outstanding().len(),
                self.pending.len()
            );
        }
        Ok(self.report())
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    /// Returns `true` when the ack was credited to an in-flight packet.
    fn credit(&mut self, ack: Ack, events: &mut Vec<SessionEvent>) -> bool {
        let seq = ack.seq;
        let outcome = self.controller.on_ack(seq);
        match outcome {
            AckOutcome::Advanced { base } => {
                self.stats.acks_received += 1;
                events.push(SessionEvent::AckReceived { seq });
                events.push(SessionEvent::WindowAdvanced { base });
            }
            AckOutcome::Buffered => {
                self.stats.acks_received += 1;
                events.push(SessionEvent::AckReceived { seq });
            }
            AckOutcome::Discarded => {
                self.stats.acks_discarded += 1;
                events.push(SessionEvent::AckDiscarded { seq });
            }
            AckOutcome::Stale => {
                debug!("{}: ignoring ack {} with nothing in flight", self.kind(), seq);
            }
        }
        outcome.is_progress()
    }

    fn retransmit(&mut self, events: &mut Vec<SessionEvent>) {
        let packets = self.controller.on_timeout();
        if packets.is_empty() {
            return;
        }
        let now = self.timers.now_ms();
        for packet in &packets {
            self.channel.transmit(packet, now);
        }
        self.stats.timeouts += 1;
        self.stats.retransmissions += packets.len() as u32;
        events.push(SessionEvent::TimeoutResend {
            seqs: packets.iter().map(|p| p.seq).collect(),
        });
    }

    fn fill_window(&mut self, events: &mut Vec<SessionEvent>) {
        let now = self.timers.now_ms();
        while !self.pending.is_empty() && self.controller.has_room() {
            let Some(text) = self.pending.pop_front() else {
                break;
            };
            let Some(packet) = self.controller.accept(text) else {
                break;
            };
            self.channel.transmit(&packet, now);
            self.stats.packets_sent += 1;
            events.push(SessionEvent::PacketSent {
                seq: packet.seq,
                payload: packet.payload,
            });
        }
    }

    fn stop_timer(&mut self) {
        if let Some(handle) = self.window_timer.take() {
            self.timers.cancel(handle);
        }
    }

    /// Arm the window timer when packets are in flight, drop it otherwise.
    fn sync_timer(&mut self) {
        if self.controller.is_idle() {
            self.stop_timer();
        } else if self.window_timer.is_none() {
            let timeout = self.config.effective_timeout_ms();
            self.window_timer = Some(self.timers.schedule_timeout(timeout));
        }
    }

    fn record(&mut self, events: Vec<SessionEvent>) -> Vec<SessionEvent> {
        let now = self.timers.now_ms();
        for event in &events {
            info!("[{}] {}", self.kind(), event);
            self.timeline.push(TraceEntry {
                time_ms: now,
                event: event.clone(),
            });
        }
        events
    }
}
