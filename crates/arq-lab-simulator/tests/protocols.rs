//! End-to-end behaviour of the four protocols through a [`Session`].
//!
//! Scripted ack orders go through `ManualChannel`; loss and latency go
//! through the seeded loopback channel.

use arq_lab_abstract::{ChannelConfig, ProtocolKind, SessionConfig};
use arq_lab_simulator::{ManualChannel, Session, SessionEvent};

fn manual(kind: ProtocolKind, window: Option<u32>) -> Session<ManualChannel> {
    Session::with_channel(SessionConfig::new(kind, window), ManualChannel::new())
        .expect("valid config")
}

fn loopback(kind: ProtocolKind, window: Option<u32>, channel: ChannelConfig) -> Session {
    let mut config = SessionConfig::new(kind, window);
    config.channel = channel;
    Session::open(config).expect("valid config")
}

fn send_all<C: arq_lab_simulator::Channel>(session: &mut Session<C>, count: u32) {
    for i in 0..count {
        session.send_message(format!("Packet {i}")).expect("send");
    }
}

// ---------------------------------------------------------------------------
// Stop-and-Wait / Simple Protocol
// ---------------------------------------------------------------------------

#[test]
fn stop_and_wait_alternates_and_keeps_one_in_flight() {
    let mut session = loopback(ProtocolKind::StopAndWait, None, ChannelConfig::default());
    for i in 0..7 {
        session.send_message(format!("msg {i}")).unwrap();
        assert!(session.snapshot().in_flight.len() <= 1);
        session.run_until_idle(10).unwrap();
    }
    let report = session.close().unwrap();
    assert_eq!(report.sent_sequence(), vec![0, 1, 0, 1, 0, 1, 0]);
    assert_eq!(report.stats.timeouts, 0);
}

#[test]
fn stop_and_wait_resends_same_bit_after_loss() {
    let mut session = loopback(ProtocolKind::StopAndWait, None, ChannelConfig::default());
    session.send_message("first").unwrap();
    session.run_until_idle(10).unwrap();

    session.channel_mut().drop_next_packet(1);
    session.send_message("second").unwrap();
    session.run_until_idle(10).unwrap();

    let report = session.close().unwrap();
    assert_eq!(report.sent_sequence(), vec![0, 1]);
    assert_eq!(report.retransmitted(), vec![1]);
    assert_eq!(report.window.base, 0);
}

#[test]
fn directly_delivered_ack_cannot_acknowledge_a_reused_bit() {
    let mut session = loopback(ProtocolKind::StopAndWait, None, ChannelConfig::default());
    session.send_message("a").unwrap();
    session.deliver_ack(0).unwrap();
    assert!(session.channel().pending_acks().is_empty());

    session.send_message("b").unwrap();
    session.run_until_idle(10).unwrap();

    // Bit 0 again, and this copy never arrives.
    session.channel_mut().drop_next_packet(0);
    session.send_message("c").unwrap();
    assert_eq!(
        session.tick().unwrap(),
        vec![SessionEvent::TimeoutResend { seqs: vec![0] }]
    );

    session.run_until_idle(10).unwrap();
    let report = session.close().unwrap();
    assert_eq!(report.retransmitted(), vec![0]);
    assert_eq!(report.window.base, 1);
}

#[test]
fn simple_protocol_counts_up_unbounded() {
    let mut session = loopback(ProtocolKind::Simple, None, ChannelConfig::default());
    for i in 0..5 {
        session.send_message(format!("Packet {i}")).unwrap();
        session.run_until_idle(10).unwrap();
    }
    assert_eq!(session.report().sent_sequence(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn lost_ack_is_retried_after_latency() {
    let channel = ChannelConfig {
        min_latency_ms: 1500,
        max_latency_ms: 1500,
        ..Default::default()
    };
    let mut session = loopback(ProtocolKind::Simple, None, channel);
    session.send_message("slow").unwrap();

    let first = session.tick().unwrap();
    assert_eq!(first, vec![SessionEvent::TimeoutResend { seqs: vec![0] }]);
    let second = session.tick().unwrap();
    assert!(second.contains(&SessionEvent::AckReceived { seq: 0 }));
    assert!(session.is_idle());
}

// ---------------------------------------------------------------------------
// Go-Back-N
// ---------------------------------------------------------------------------

#[test]
fn go_back_n_lossless_drains_without_timeouts() {
    let mut session = loopback(ProtocolKind::GoBackN, Some(3), ChannelConfig::default());
    send_all(&mut session, 8);
    session.run_until_idle(20).unwrap();
    let report = session.close().unwrap();
    assert_eq!(report.sent_sequence(), (0..8).collect::<Vec<_>>());
    assert_eq!(report.stats.timeouts, 0);
    assert_eq!(report.window.base, 8);
}

#[test]
fn go_back_n_timeout_resends_everything_from_base() {
    let mut session = loopback(ProtocolKind::GoBackN, Some(3), ChannelConfig::default());
    session.channel_mut().drop_next_packet(1);
    send_all(&mut session, 3);

    // Pass 1: base 0 acked, 1 lost, ack for 2 arrives early and is dropped.
    let events = session.tick().unwrap();
    assert!(events.contains(&SessionEvent::WindowAdvanced { base: 1 }));
    assert!(events.contains(&SessionEvent::AckDiscarded { seq: 2 }));

    // Pass 2: nothing credited, timer expired: both 1 and 2 go out again.
    let events = session.tick().unwrap();
    assert_eq!(events, vec![SessionEvent::TimeoutResend { seqs: vec![1, 2] }]);

    session.run_until_idle(5).unwrap();
    let report = session.close().unwrap();
    assert_eq!(report.retransmitted(), vec![1, 2]);
    assert_eq!(report.window.base, 3);
}

#[test]
fn go_back_n_base_is_monotonic_and_window_contiguous() {
    let channel = ChannelConfig {
        loss_rate: 0.3,
        seed: 11,
        ..Default::default()
    };
    let mut session = loopback(ProtocolKind::GoBackN, Some(4), channel);
    send_all(&mut session, 20);

    let mut last_base = 0;
    for _ in 0..500 {
        if session.is_idle() {
            break;
        }
        let before = session.snapshot().base;
        for event in session.tick().unwrap() {
            if let SessionEvent::WindowAdvanced { base } = event {
                assert_eq!(base, last_base.max(before) + 1);
                last_base = base;
            }
        }
        let snapshot = session.snapshot();
        assert!(snapshot.base >= before);
        let expected: Vec<u32> = (snapshot.base..snapshot.next_seq).collect();
        assert_eq!(snapshot.in_flight, expected);
        assert!(snapshot.in_flight.len() as u32 <= snapshot.window_size);
    }
    assert!(session.is_idle());
    assert_eq!(session.snapshot().base, 20);
}

// ---------------------------------------------------------------------------
// Selective Repeat
// ---------------------------------------------------------------------------

#[test]
fn selective_repeat_out_of_order_credit_advances_by_three() {
    let mut session = manual(ProtocolKind::SelectiveRepeat, Some(4));
    send_all(&mut session, 4);

    session.deliver_ack(2).unwrap();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.base, 0);
    assert_eq!(snapshot.in_flight, vec![0, 1, 3]);
    assert_eq!(snapshot.acked_out_of_order, vec![2]);

    session.deliver_ack(0).unwrap();
    let events = session.deliver_ack(1).unwrap();
    assert!(events.contains(&SessionEvent::WindowAdvanced { base: 3 }));
    assert!(session.snapshot().acked_out_of_order.is_empty());
}

#[test]
fn selective_repeat_timeout_resends_only_base() {
    let mut session = manual(ProtocolKind::SelectiveRepeat, Some(3));
    send_all(&mut session, 3);

    session.channel_mut().release_ack(1);
    let events = session.tick().unwrap();
    assert_eq!(events, vec![SessionEvent::AckReceived { seq: 1 }]);

    let events = session.tick().unwrap();
    assert_eq!(events, vec![SessionEvent::TimeoutResend { seqs: vec![0] }]);

    let resent: Vec<u32> = session.channel().transmissions()[3..]
        .iter()
        .map(|p| p.seq)
        .collect();
    assert_eq!(resent, vec![0]);
}

#[test]
fn selective_repeat_loss_resends_single_packet() {
    let mut session = loopback(ProtocolKind::SelectiveRepeat, Some(3), ChannelConfig::default());
    session.channel_mut().drop_next_packet(1);
    send_all(&mut session, 3);
    session.run_until_idle(10).unwrap();

    let report = session.close().unwrap();
    assert_eq!(report.retransmitted(), vec![1]);
    assert_eq!(report.stats.acks_discarded, 0);
    assert_eq!(report.window.base, 3);
}

// ---------------------------------------------------------------------------
// Shared properties
// ---------------------------------------------------------------------------

#[test]
fn window_of_three_ack_one_then_zero() {
    let mut gbn = manual(ProtocolKind::GoBackN, Some(3));
    let mut sr = manual(ProtocolKind::SelectiveRepeat, Some(3));
    send_all(&mut gbn, 3);
    send_all(&mut sr, 3);

    gbn.deliver_ack(1).unwrap();
    sr.deliver_ack(1).unwrap();
    assert_eq!(gbn.snapshot().base, 0);
    assert_eq!(sr.snapshot().base, 0);
    assert_eq!(sr.snapshot().acked_out_of_order, vec![1]);

    gbn.deliver_ack(0).unwrap();
    sr.deliver_ack(0).unwrap();
    assert_eq!(gbn.snapshot().base, 1);
    assert_eq!(gbn.snapshot().in_flight, vec![1, 2]);
    assert_eq!(sr.snapshot().base, 2);
    assert_eq!(sr.snapshot().in_flight, vec![2]);
}

#[test]
fn window_of_three_through_polling() {
    let mut gbn = manual(ProtocolKind::GoBackN, Some(3));
    send_all(&mut gbn, 3);
    gbn.channel_mut().release_ack(1);
    let events = gbn.tick().unwrap();
    assert!(events.contains(&SessionEvent::AckDiscarded { seq: 1 }));
    assert!(events.contains(&SessionEvent::TimeoutResend { seqs: vec![0, 1, 2] }));

    gbn.channel_mut().release_ack(0);
    gbn.tick().unwrap();
    assert_eq!(gbn.snapshot().base, 1);
    assert_eq!(gbn.snapshot().in_flight, vec![1, 2]);
}

#[test]
fn repeated_ack_has_no_effect() {
    for (kind, window) in [
        (ProtocolKind::Simple, None),
        (ProtocolKind::StopAndWait, None),
        (ProtocolKind::GoBackN, Some(3)),
        (ProtocolKind::SelectiveRepeat, Some(3)),
    ] {
        let mut session = manual(kind, window);
        session.send_message("only").unwrap();
        session.deliver_ack(0).unwrap();
        let before = session.snapshot();
        let events = session.deliver_ack(0).unwrap();
        assert!(events.is_empty(), "{kind}: duplicate ack produced {events:?}");
        assert_eq!(session.snapshot(), before);
    }
}

#[test]
fn every_protocol_survives_a_lossy_channel() {
    let channel = ChannelConfig {
        loss_rate: 0.25,
        min_latency_ms: 100,
        max_latency_ms: 900,
        seed: 42,
    };
    for (kind, window) in [
        (ProtocolKind::Simple, None),
        (ProtocolKind::StopAndWait, None),
        (ProtocolKind::GoBackN, Some(4)),
        (ProtocolKind::SelectiveRepeat, Some(4)),
    ] {
        let mut session = loopback(kind, window, channel.clone());
        for i in 0..12 {
            session.send_message(format!("Packet {i}")).unwrap();
            if !kind.has_configurable_window() {
                session.run_until_idle(1000).unwrap();
            }
        }
        session.run_until_idle(1000).unwrap();

        let report = session.close().unwrap();
        assert_eq!(report.sent_sequence().len(), 12, "{kind}");
        assert_eq!(report.stats.acks_received, 12, "{kind}");
        assert_eq!(report.channel.transmitted, report.stats.transmissions(), "{kind}");
        assert!(report.window.in_flight.is_empty(), "{kind}");
    }
}
