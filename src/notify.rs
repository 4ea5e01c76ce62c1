//! User-visible notices.
//!
//! Notices are fire-and-forget: a sink that cannot deliver a message drops
//! it. Diagnostics go to tracing, not here.

use std::sync::Mutex;

/// Sink for short messages meant for the user
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Prints notices to stdout
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        println!("{}", message);
    }
}

/// Keeps notices in memory, for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices received so far
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_notifier_keeps_order() {
        let notifier = MemoryNotifier::new();
        notifier.notify("first");
        notifier.notify("second");
        assert_eq!(notifier.messages(), vec!["first", "second"]);
    }
}
