use std::time::{Duration, Instant};

const MAX_MISSED_SERVER_HEARTBEATS: u32 = 2;

/// What the reader should do after a heartbeat poll.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum HeartbeatDecision {
    /// Recent traffic in both directions; nothing to do.
    Idle,

    /// The tx side has been idle for half the heartbeat interval; send an
    /// empty heartbeat frame.
    SendHeartbeat,

    /// No inbound traffic for `MAX_MISSED_SERVER_HEARTBEATS` intervals; the
    /// connection is dead.
    Expired,
}

/// Tracks socket activity in both directions against the negotiated
/// heartbeat interval.
///
/// The reader thread polls this between socket reads (its read timeout is a
/// fraction of the interval); the writer records tx activity on every
/// successful write so heartbeats are only sent when the connection is idle.
pub(crate) struct HeartbeatMonitor {
    interval: Duration,
    enabled: bool,
    last_rx: Instant,
    last_tx: Instant,
}

impl HeartbeatMonitor {
    pub(crate) fn new(interval_secs: u16) -> HeartbeatMonitor {
        let now = Instant::now();
        HeartbeatMonitor {
            interval: Duration::from_secs(u64::from(interval_secs)),
            enabled: interval_secs > 0,
            last_rx: now,
            last_tx: now,
        }
    }

    pub(crate) fn record_rx_activity(&mut self) {
        self.record_rx_activity_at(Instant::now());
    }

    pub(crate) fn record_tx_activity(&mut self) {
        self.record_tx_activity_at(Instant::now());
    }

    pub(crate) fn poll(&self) -> HeartbeatDecision {
        self.poll_at(Instant::now())
    }

    fn record_rx_activity_at(&mut self, now: Instant) {
        self.last_rx = now;
    }

    fn record_tx_activity_at(&mut self, now: Instant) {
        self.last_tx = now;
    }

    fn poll_at(&self, now: Instant) -> HeartbeatDecision {
        if !self.enabled {
            return HeartbeatDecision::Idle;
        }
        if now.duration_since(self.last_rx)
            >= self.interval * MAX_MISSED_SERVER_HEARTBEATS
        {
            HeartbeatDecision::Expired
        } else if now.duration_since(self.last_tx) >= self.interval / 2 {
            HeartbeatDecision::SendHeartbeat
        } else {
            HeartbeatDecision::Idle
        }
    }
}
