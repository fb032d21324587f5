//! Widget error taxonomy.
//!
//! Fatal-init errors abort widget creation; everything else is recovered
//! locally and surfaced through the error channel without throwing into
//! the host page.

use helferlain_io::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("botId is required")]
    MissingBotId,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("inline mode requires a target element")]
    InlineWithoutTarget,
    #[error("target element '{0}' not found")]
    TargetNotFound(String),
    #[error("bot configuration could not be loaded: {0}")]
    BotConfig(ApiError),
}
