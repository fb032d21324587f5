//! HelferLain widget runtime.
//!
//! The public surface mirrors the script embed API: create a
//! [`HelferLain`] registry, call [`HelferLain::init`] with options (or
//! [`HelferLain::start_auto_discovery`] for declarative embeds), then
//! pump [`HelferLain::update`] from the host loop and forward document
//! clicks and keys to it.

use std::sync::atomic::{AtomicBool, Ordering};

pub mod bootstrap;
pub mod error;
pub mod events;
pub mod registry;
pub mod session;
pub mod timer;
pub mod widget;

pub use bootstrap::{Bootstrapper, INIT_MARKER};
pub use error::WidgetError;
pub use events::{Channel, EventBus, Key, WidgetEvent, WidgetHooks};
pub use registry::HelferLain;
pub use session::{ConversationSession, Message};
pub use timer::{TimerId, TimerQueue};
pub use widget::{Phase, Widget};

static DEBUG: AtomicBool = AtomicBool::new(false);

/// Verbose event logging, toggled via [`HelferLain::enable_debug`].
pub fn debug_enabled() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

pub(crate) fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}
