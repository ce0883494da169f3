/// What caused a reconciliation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Start,
    ConnectivityRestored,
    Foreground,
    Focus,
    UserRefresh,
}

impl Trigger {
    /// User-initiated attempts bypass the throttle.
    pub fn is_user_initiated(&self) -> bool {
        matches!(self, Trigger::UserRefresh)
    }
}

/// Zero-argument notifications from the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Foreground,
    Focus,
}

impl From<LifecycleEvent> for Trigger {
    fn from(event: LifecycleEvent) -> Self {
        match event {
            LifecycleEvent::Foreground => Trigger::Foreground,
            LifecycleEvent::Focus => Trigger::Focus,
        }
    }
}

/// How one attempt ended, reported to whoever requested it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Fetched and published.
    Synced,
    /// The remote call failed; status is `Error`.
    Failed,
    /// No connectivity; no remote call was made.
    Offline,
    /// Suppressed by the throttle; nothing changed.
    Throttled,
    /// A newer attempt started before this one resolved; result discarded.
    Superseded,
    /// The remote reported cancellation; status restored.
    Cancelled,
    /// The engine was disposed.
    Disposed,
    /// `start` was called on an engine that had already started.
    AlreadyStarted,
    /// A refresh or lifecycle event arrived before `start`; nothing ran.
    NotStarted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_user_refresh_bypasses_throttle() {
        assert!(Trigger::UserRefresh.is_user_initiated());
        for trigger in [Trigger::Start, Trigger::ConnectivityRestored, Trigger::Foreground, Trigger::Focus] {
            assert!(!trigger.is_user_initiated());
        }
    }
}
