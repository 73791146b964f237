//! Whether a compute service's heartbeat is recent enough to trust, per
//! spec.md §4.1 / `nova.servicegroup`'s db-backed driver: a service counts
//! as up if it reported within `service_down_time` seconds of now.

use chrono::{DateTime, Utc};

pub trait LivenessOracle: Send + Sync {
    fn is_up(&self, last_heartbeat: Option<DateTime<Utc>>) -> bool;
}

/// Fixed-TTL liveness check: up iff a heartbeat was seen and it's younger
/// than `down_time`. No heartbeat at all is always down.
pub struct TtlLivenessOracle {
    down_time: chrono::Duration,
}

impl TtlLivenessOracle {
    pub fn new(down_time_secs: u64) -> Self {
        Self {
            down_time: chrono::Duration::seconds(down_time_secs as i64),
        }
    }
}

impl LivenessOracle for TtlLivenessOracle {
    fn is_up(&self, last_heartbeat: Option<DateTime<Utc>>) -> bool {
        match last_heartbeat {
            Some(t) => Utc::now() - t < self.down_time,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_heartbeat_is_down() {
        let oracle = TtlLivenessOracle::new(60);
        assert!(!oracle.is_up(None));
    }

    #[test]
    fn recent_heartbeat_is_up() {
        let oracle = TtlLivenessOracle::new(60);
        assert!(oracle.is_up(Some(Utc::now())));
    }

    #[test]
    fn stale_heartbeat_is_down() {
        let oracle = TtlLivenessOracle::new(60);
        let stale = Utc::now() - chrono::Duration::seconds(120);
        assert!(!oracle.is_up(Some(stale)));
    }
}
