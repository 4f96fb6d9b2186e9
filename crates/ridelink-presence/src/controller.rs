//! Version-reconciled ownership of the driver's `connected` flag.
//!
//! Local toggles are applied optimistically and published with a fresh
//! version. Remote updates can echo older writes after a newer toggle, so
//! they only win when they carry a higher version than the newest local
//! write, or carry no version while nothing local is in flight.

use ridelink_common::{PresenceError, PresenceOrigin};
use tracing::{debug, warn};

use crate::store::{PresenceRecord, RemoteValue};

/// The single authoritative presence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceFlag {
    pub connected: bool,
    pub origin: PresenceOrigin,
    pub version: u64,
}

/// What a remote update did to the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// The value changed.
    Applied,
    /// Accepted, but the value was already the same.
    Unchanged,
    /// Version at or below the newest local write; dropped.
    Stale,
    /// Unversioned while a local write is in flight; dropped.
    Pending,
}

impl Reconcile {
    pub fn changed(&self) -> bool {
        matches!(self, Reconcile::Applied)
    }
}

/// What a publish result did to the in-flight write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Acknowledged,
    /// The newest write failed; the optimistic value is kept and the next
    /// remote read is taken as authoritative.
    Failed,
    /// Result for a write that a newer toggle already replaced.
    Superseded,
}

#[derive(Debug)]
pub struct PresenceController {
    flag: PresenceFlag,
    /// Version of the newest local write (or adopted remote version).
    local_version: u64,
    in_flight: Option<u64>,
    drifted: bool,
}

impl PresenceController {
    pub fn new(initial: bool) -> Self {
        Self {
            flag: PresenceFlag {
                connected: initial,
                origin: PresenceOrigin::Remote,
                version: 0,
            },
            local_version: 0,
            in_flight: None,
            drifted: false,
        }
    }

    /// Flip the local intent and return the record to publish.
    pub fn toggle(&mut self) -> PresenceRecord {
        self.local_version += 1;
        let version = self.local_version;
        self.flag = PresenceFlag {
            connected: !self.flag.connected,
            origin: PresenceOrigin::Local,
            version,
        };
        self.in_flight = Some(version);
        self.drifted = false;
        debug!(connected = self.flag.connected, version, "presence toggled");
        PresenceRecord::new(self.flag.connected, version)
    }

    pub fn on_remote_update(&mut self, update: RemoteValue) -> Reconcile {
        if self.drifted {
            self.drifted = false;
            self.in_flight = None;
            debug!(?update, "reconciling presence after failed write");
            return self.apply_remote(update);
        }

        match update.version {
            Some(v) if v <= self.local_version => {
                if self.in_flight == Some(v) {
                    self.in_flight = None;
                    debug!(version = v, "presence write echoed");
                } else {
                    debug!(
                        version = v,
                        local_version = self.local_version,
                        "stale presence echo ignored"
                    );
                }
                Reconcile::Stale
            }
            Some(_) => {
                self.in_flight = None;
                self.apply_remote(update)
            }
            None if self.in_flight.is_some() => {
                debug!(
                    connected = update.connected,
                    "unversioned presence update ignored while write in flight"
                );
                Reconcile::Pending
            }
            None => self.apply_remote(update),
        }
    }

    pub fn on_publish_result(
        &mut self,
        version: u64,
        result: Result<(), PresenceError>,
    ) -> PublishOutcome {
        if self.in_flight != Some(version) {
            debug!(version, "publish result for superseded write");
            return PublishOutcome::Superseded;
        }
        self.in_flight = None;
        match result {
            Ok(()) => PublishOutcome::Acknowledged,
            Err(e) => {
                warn!(version, error = %e, "presence write failed; keeping optimistic value");
                self.drifted = true;
                PublishOutcome::Failed
            }
        }
    }

    /// A subscription error keeps the last known value.
    pub fn on_remote_error(&mut self, error: &PresenceError) {
        warn!(error = %error, connected = self.flag.connected, "presence read failed; keeping last value");
    }

    pub fn current_value(&self) -> bool {
        self.flag.connected
    }

    pub fn flag(&self) -> PresenceFlag {
        self.flag
    }

    pub fn has_write_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    fn apply_remote(&mut self, update: RemoteValue) -> Reconcile {
        if let Some(v) = update.version {
            self.local_version = self.local_version.max(v);
        }
        let changed = self.flag.connected != update.connected;
        self.flag = PresenceFlag {
            connected: update.connected,
            origin: PresenceOrigin::Remote,
            version: self.local_version,
        };
        if changed {
            debug!(connected = update.connected, "presence updated from remote");
            Reconcile::Applied
        } else {
            Reconcile::Unchanged
        }
    }
}

impl Default for PresenceController {
    fn default() -> Self {
        Self::new(false)
    }
}
