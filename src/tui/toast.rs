//! Transient notifications for action outcomes.

use std::time::{Duration, Instant};

/// Auto-dismiss horizon.
pub const TOAST_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastVariant {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub variant: ToastVariant,
    pub created: Instant,
}

impl Toast {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, ToastVariant::Info)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, ToastVariant::Success)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, ToastVariant::Error)
    }

    fn new(message: impl Into<String>, variant: ToastVariant) -> Self {
        Self {
            message: message.into(),
            variant,
            created: Instant::now(),
        }
    }

    pub fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.created) >= TOAST_TTL
    }
}

/// Drop toasts past their horizon; called from the tick handler.
pub fn prune(toasts: &mut Vec<Toast>) {
    let now = Instant::now();
    toasts.retain(|t| !t.expired(now));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_toast_survives_prune() {
        let mut toasts = vec![Toast::info("hello")];
        prune(&mut toasts);
        assert_eq!(toasts.len(), 1);
    }

    #[test]
    fn old_toast_is_pruned() {
        let old = Instant::now()
            .checked_sub(TOAST_TTL + Duration::from_secs(1))
            .expect("clock predates process start");
        let mut toasts = vec![Toast {
            message: "stale".to_string(),
            variant: ToastVariant::Success,
            created: old,
        }];
        prune(&mut toasts);
        assert!(toasts.is_empty());
    }
}
