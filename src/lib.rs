//! HelferLain embeddable chat widget.
//!
//! Facade crate re-exporting the widget runtime and its supporting
//! layers. Most embedders only need [`HelferLain`], [`WidgetOptions`]
//! and [`Document`].

pub use helferlain_config::{
    EmbedderConfig, Mode, Position, Theme, WidgetConfig, WidgetOptions,
};
pub use helferlain_io::{ApiClient, ApiError, BotConfig, ChatRequest, ChatResponse};
pub use helferlain_view::{ColorScheme, Document, NodeId};
pub use helferlain_widget::{
    Channel, HelferLain, Key, Phase, Widget, WidgetError, WidgetEvent, WidgetHooks,
};
