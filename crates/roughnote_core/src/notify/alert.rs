//! User-facing alert delivery.
//!
//! # Responsibility
//! - Define the platform sink contract (`request_permission`, `notify`).
//! - Gate delivery on the user's enable flag and the cached permission.
//!
//! # Invariants
//! - Nothing is posted unless notifications are enabled and permission is granted.
//! - Delivery failures are swallowed; there is no retry.

use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One alert as handed to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub require_interaction: bool,
}

/// Platform permission for posting alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Never asked.
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertError(pub String);

impl Display for AlertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "alert delivery failed: {}", self.0)
    }
}

impl Error for AlertError {}

/// Platform notification sink.
pub trait AlertSink {
    fn permission(&self) -> Permission;
    fn request_permission(&mut self) -> Permission;
    fn notify(&mut self, alert: &Alert) -> Result<(), AlertError>;
}

/// Sink that writes alerts to the log. Always granted.
#[derive(Debug, Default)]
pub struct LogAlertSink {
    posted: usize,
}

impl LogAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posted(&self) -> usize {
        self.posted
    }
}

impl AlertSink for LogAlertSink {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn notify(&mut self, alert: &Alert) -> Result<(), AlertError> {
        self.posted += 1;
        info!(
            "event=alert_posted module=notify status=ok title_len={} body_len={} require_interaction={}",
            alert.title.len(),
            alert.body.len(),
            alert.require_interaction
        );
        Ok(())
    }
}

/// Cached enable flag plus platform permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationGate {
    enabled: bool,
    permission: Permission,
}

impl NotificationGate {
    /// Builds the gate from the persisted enable flag and the sink's
    /// current permission. An enabled flag without a grant is dropped.
    pub fn new(enabled: bool, sink: &impl AlertSink) -> Self {
        let permission = sink.permission();
        Self {
            enabled: enabled && permission == Permission::Granted,
            permission,
        }
    }

    /// Asks the platform for permission and enables on a grant.
    ///
    /// A previous denial is final and the platform is not asked again.
    pub fn enable(&mut self, sink: &mut impl AlertSink) -> bool {
        if self.permission != Permission::Denied && self.permission != Permission::Granted {
            self.permission = sink.request_permission();
        }
        self.enabled = self.permission == Permission::Granted;
        info!(
            "event=notifications_toggle module=notify status=ok enabled={} permission={:?}",
            self.enabled, self.permission
        );
        self.enabled
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn allows(&self) -> bool {
        self.enabled && self.permission == Permission::Granted
    }

    /// Posts `alert` when allowed. Returns whether the sink accepted it.
    pub fn post(&self, sink: &mut impl AlertSink, alert: &Alert) -> bool {
        if !self.allows() {
            return false;
        }
        match sink.notify(alert) {
            Ok(()) => true,
            Err(err) => {
                debug!("event=alert_posted module=notify status=error error={err}");
                false
            }
        }
    }
}
