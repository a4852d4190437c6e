// ── User-facing notifications ──
//
// Fire-and-forget messages raised by the resolver and the sync loop.
// Delivery is best effort: a notifier never blocks and never fails.

use std::fmt;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};

const NOTIFICATION_CHANNEL_SIZE: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    Success {
        title: String,
        message: String,
    },
    StockAlert {
        product_name: String,
        current_stock: i64,
        threshold: i64,
    },
    ApiError {
        operation: String,
        message: String,
    },
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Success {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn api_error(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ApiError {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { title, message } => write!(f, "{title}: {message}"),
            Self::StockAlert {
                product_name,
                current_stock,
                threshold,
            } => write!(
                f,
                "Stock alert: {product_name} at {current_stock} (threshold {threshold})"
            ),
            Self::ApiError { operation, message } => {
                write!(f, "Failed to {operation}: {message}")
            }
        }
    }
}

/// Sink for notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Fans notifications out to any number of subscribers.
///
/// Sending with no subscribers drops the message.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_SIZE);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match &notification {
            Notification::ApiError { .. } | Notification::StockAlert { .. } => {
                warn!(%notification, "notification");
            }
            Notification::Success { .. } => info!(%notification, "notification"),
        }
    }
}
