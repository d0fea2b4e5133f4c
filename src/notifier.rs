// notifier.rs — user-facing "your data may be unanalyzable" alerts,
// de-duplicated by reason key and cooldown window.

/// Platform notification permission. Anything other than Granted suppresses
/// sending without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    Undetermined,
}

/// Boundary to the platform notification surface. The core never assumes a
/// send succeeded.
pub trait NotificationSink: Send + Sync {
    fn permission_state(&self) -> PermissionState;
    fn notify(&self, title: &str, body: &str);
}

/// At most one notification per distinct reason key per cooldown window; a
/// different reason key may fire immediately inside another key's cooldown.
pub struct NotificationThrottler {
    cooldown_secs: f64,
    last_fired: Option<(String, f64)>,
}

impl NotificationThrottler {
    pub fn new(cooldown_secs: f64) -> Self {
        NotificationThrottler { cooldown_secs, last_fired: None }
    }

    /// Returns true when the notification was handed to the sink.
    pub fn maybe_notify(
        &mut self,
        sink: &dyn NotificationSink,
        reason_key: &str,
        title: &str,
        body: &str,
        now: f64,
    ) -> bool {
        if sink.permission_state() != PermissionState::Granted {
            return false;
        }
        if let Some((ref key, fired_at)) = self.last_fired {
            if key == reason_key && now - fired_at < self.cooldown_secs {
                return false;
            }
        }
        sink.notify(title, body);
        self.last_fired = Some((reason_key.to_string(), now));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct TestSink {
        permission: PermissionState,
        delivered: Mutex<Vec<String>>,
    }

    impl TestSink {
        fn new(permission: PermissionState) -> Self {
            TestSink { permission, delivered: Mutex::new(Vec::new()) }
        }

        fn count(&self) -> usize {
            self.delivered.lock().unwrap().len()
        }
    }

    impl NotificationSink for TestSink {
        fn permission_state(&self) -> PermissionState {
            self.permission
        }

        fn notify(&self, title: &str, _body: &str) {
            self.delivered.lock().unwrap().push(title.to_string());
        }
    }

    #[test]
    fn test_same_reason_suppressed_within_cooldown() {
        let sink = TestSink::new(PermissionState::Granted);
        let mut t = NotificationThrottler::new(120.0);
        assert!(t.maybe_notify(&sink, "in_hand", "Check your mount", "…", 0.0));
        assert!(!t.maybe_notify(&sink, "in_hand", "Check your mount", "…", 10.0));
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn test_same_reason_fires_after_cooldown() {
        let sink = TestSink::new(PermissionState::Granted);
        let mut t = NotificationThrottler::new(120.0);
        assert!(t.maybe_notify(&sink, "in_hand", "Check your mount", "…", 0.0));
        assert!(t.maybe_notify(&sink, "in_hand", "Check your mount", "…", 130.0));
        assert_eq!(sink.count(), 2);
    }

    #[test]
    fn test_different_reason_fires_immediately() {
        let sink = TestSink::new(PermissionState::Granted);
        let mut t = NotificationThrottler::new(120.0);
        assert!(t.maybe_notify(&sink, "in_hand", "Check your mount", "…", 0.0));
        assert!(t.maybe_notify(&sink, "flat_not_mounted", "Mount your device", "…", 5.0));
        assert_eq!(sink.count(), 2);
    }

    #[test]
    fn test_non_granted_permission_suppresses_silently() {
        for p in [PermissionState::Denied, PermissionState::Undetermined] {
            let sink = TestSink::new(p);
            let mut t = NotificationThrottler::new(120.0);
            assert!(!t.maybe_notify(&sink, "in_hand", "Check your mount", "…", 0.0));
            assert_eq!(sink.count(), 0);
        }
    }
}
