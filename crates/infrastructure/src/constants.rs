use std::time::Duration;

// ── Paths ──────────────────────────────────────────────────────────

pub const DEFAULT_CONFIG_PATH: &str = "/etc/vigil/config.yaml";

// ── Channel capacities ─────────────────────────────────────────────

pub const EVENT_CHANNEL_CAPACITY: usize = 10_000;
pub const ALERT_BROADCAST_CAPACITY: usize = 1_000;

// ── Timeouts ───────────────────────────────────────────────────────

pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
