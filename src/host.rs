//! Output port for signals to the page embedding the widget.
//!
//! Messages are plain strings (`resize::<height>`, `submitted::`,
//! `viewInventory::`). Delivery is fire-and-forget; nothing waits for a reply.

use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMessage {
    Resize(u32),
    Submitted,
    ViewInventory,
}

impl HostMessage {
    pub fn parse(raw: &str) -> Option<Self> {
        let (kind, arg) = raw.split_once("::")?;
        match kind {
            "resize" => arg.parse().ok().map(HostMessage::Resize),
            "submitted" => Some(HostMessage::Submitted),
            "viewInventory" => Some(HostMessage::ViewInventory),
            _ => None,
        }
    }
}

impl fmt::Display for HostMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostMessage::Resize(height) => write!(f, "resize::{}", height),
            HostMessage::Submitted => f.write_str("submitted::"),
            HostMessage::ViewInventory => f.write_str("viewInventory::"),
        }
    }
}

pub trait HostNotifier: Send + Sync {
    fn notify(&self, message: HostMessage);
}

/// Forwards messages to whatever adapter owns the receiving end
/// (window messaging, IPC, a test).
#[derive(Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl HostNotifier for ChannelNotifier {
    fn notify(&self, message: HostMessage) {
        if self.tx.send(message.to_string()).is_err() {
            tracing::debug!("Host listener gone, dropped '{}'", message);
        }
    }
}
