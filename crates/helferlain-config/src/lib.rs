//! HelferLain widget configuration system
//!
//! This crate provides the widget's configuration model: hardcoded
//! defaults, caller-supplied options layered on top, and bot-branding
//! values filling whatever the caller left unset. Explicit caller values
//! always win over branding.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default public API endpoint for bot config and chat requests.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.helferlain.app/api/public";

/// Color theme requested by the embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    /// Resolve from the host document's color-scheme hint.
    Auto,
}

/// Presentation mode of the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Floating trigger button with a hidden chat window.
    #[default]
    Bubble,
    /// Chat window filling a caller-supplied host element.
    Inline,
    /// Overlay with a centered chat window.
    Modal,
}

/// Screen corner for the floating bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Auto => "auto",
        }
    }
}

impl FromStr for Theme {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "auto" => Ok(Theme::Auto),
            _ => Err(()),
        }
    }
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Bubble => "bubble",
            Mode::Inline => "inline",
            Mode::Modal => "modal",
        }
    }
}

impl FromStr for Mode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bubble" => Ok(Mode::Bubble),
            "inline" => Ok(Mode::Inline),
            "modal" => Ok(Mode::Modal),
            _ => Err(()),
        }
    }
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Position::BottomRight => "bottom-right",
            Position::BottomLeft => "bottom-left",
            Position::TopRight => "top-right",
            Position::TopLeft => "top-left",
        }
    }
}

impl FromStr for Position {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bottom-right" => Ok(Position::BottomRight),
            "bottom-left" => Ok(Position::BottomLeft),
            "top-right" => Ok(Position::TopRight),
            "top-left" => Ok(Position::TopLeft),
            _ => Err(()),
        }
    }
}

/// Resolved widget configuration, immutable after initialization.
///
/// `welcome_message`, `placeholder_text` and `primary_color` stay `None`
/// until either the caller or the fetched bot branding provides them;
/// rendering falls back to language-appropriate defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Opaque bot identity, required.
    pub bot_id: String,
    /// Base URL for the public chat API.
    pub api_endpoint: String,
    /// Deadline for the bot-config fetch during init.
    pub config_timeout_ms: u64,
    /// Deadline for a chat request.
    pub chat_timeout_ms: u64,
    pub theme: Theme,
    pub mode: Mode,
    pub position: Position,
    pub border_radius: f64,
    pub font_family: String,
    /// Extra stylesheet URL, loaded best-effort.
    pub custom_css: Option<String>,
    pub auto_open: bool,
    pub show_branding: bool,
    pub close_on_outside_click: bool,
    /// Transcript cap; oldest messages are evicted beyond this.
    pub max_messages: usize,
    /// Artificial pause before an assistant response is shown.
    pub message_delay_ms: u64,
    /// Delay before the welcome message on first open.
    pub typing_delay_ms: u64,
    pub welcome_message: Option<String>,
    pub placeholder_text: Option<String>,
    pub primary_color: Option<String>,
    pub language: String,
    /// Host element id to mount into. Required for inline mode.
    pub target: Option<String>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            bot_id: String::new(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            config_timeout_ms: 10_000,
            chat_timeout_ms: 30_000,
            theme: Theme::Light,
            mode: Mode::Bubble,
            position: Position::BottomRight,
            border_radius: 16.0,
            font_family: "-apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif"
                .to_string(),
            custom_css: None,
            auto_open: false,
            show_branding: true,
            close_on_outside_click: true,
            max_messages: 50,
            message_delay_ms: 600,
            typing_delay_ms: 400,
            welcome_message: None,
            placeholder_text: None,
            primary_color: None,
            language: "de".to_string(),
            target: None,
        }
    }
}

impl WidgetConfig {
    pub fn config_timeout(&self) -> Duration {
        Duration::from_millis(self.config_timeout_ms)
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_millis(self.chat_timeout_ms)
    }

    /// Fill branding-derived fields, but only where the caller left them
    /// unset. Explicit caller values always win.
    pub fn absorb_branding(&mut self, welcome_message: Option<&str>, primary_color: Option<&str>) {
        if self.welcome_message.is_none() {
            self.welcome_message = welcome_message.map(str::to_string);
        }
        if self.primary_color.is_none() {
            self.primary_color = primary_color.map(str::to_string);
        }
    }

    /// Clamp out-of-range values instead of failing init over them.
    pub fn sanitize(&mut self) {
        if self.max_messages == 0 {
            tracing::warn!("max_messages must be at least 1, clamping");
            self.max_messages = 1;
        }
        if self.border_radius < 0.0 {
            self.border_radius = 0.0;
        }
    }

    /// Welcome text shown on first open when branding supplied none.
    pub fn resolved_welcome(&self) -> String {
        match &self.welcome_message {
            Some(text) => text.clone(),
            None if self.language.starts_with("de") => {
                "Hallo! Wie kann ich Ihnen helfen?".to_string()
            }
            None => "Hi! How can I help you?".to_string(),
        }
    }

    /// Placeholder for the input field.
    pub fn resolved_placeholder(&self) -> String {
        match &self.placeholder_text {
            Some(text) => text.clone(),
            None if self.language.starts_with("de") => "Nachricht schreiben...".to_string(),
            None => "Type a message...".to_string(),
        }
    }
}

/// Caller-supplied options, all optional except `bot_id`. Layered over
/// [`WidgetConfig::default`] by [`WidgetOptions::resolve`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetOptions {
    pub bot_id: Option<String>,
    pub api_endpoint: Option<String>,
    pub config_timeout_ms: Option<u64>,
    pub chat_timeout_ms: Option<u64>,
    pub theme: Option<Theme>,
    pub mode: Option<Mode>,
    pub position: Option<Position>,
    pub border_radius: Option<f64>,
    pub font_family: Option<String>,
    pub custom_css: Option<String>,
    pub auto_open: Option<bool>,
    pub show_branding: Option<bool>,
    pub close_on_outside_click: Option<bool>,
    pub max_messages: Option<usize>,
    pub message_delay_ms: Option<u64>,
    pub typing_delay_ms: Option<u64>,
    pub welcome_message: Option<String>,
    pub placeholder_text: Option<String>,
    pub primary_color: Option<String>,
    pub language: Option<String>,
    pub target: Option<String>,
}

impl WidgetOptions {
    pub fn new(bot_id: impl Into<String>) -> Self {
        Self {
            bot_id: Some(bot_id.into()),
            ..Self::default()
        }
    }

    /// Derive options from a declarative embed element's `data-*`
    /// attributes. Unknown attribute values are ignored with a warning so
    /// a typo in markup never breaks the host page.
    pub fn from_attrs(attrs: &BTreeMap<String, String>) -> Self {
        let mut options = Self::default();
        options.bot_id = attrs.get("data-bot-id").cloned();
        if let Some(raw) = attrs.get("data-mode") {
            match raw.parse() {
                Ok(mode) => options.mode = Some(mode),
                Err(()) => tracing::warn!(value = %raw, "ignoring unknown data-mode"),
            }
        }
        if let Some(raw) = attrs.get("data-theme") {
            match raw.parse() {
                Ok(theme) => options.theme = Some(theme),
                Err(()) => tracing::warn!(value = %raw, "ignoring unknown data-theme"),
            }
        }
        if let Some(raw) = attrs.get("data-position") {
            match raw.parse() {
                Ok(position) => options.position = Some(position),
                Err(()) => tracing::warn!(value = %raw, "ignoring unknown data-position"),
            }
        }
        if let Some(raw) = attrs.get("data-auto-open") {
            options.auto_open = Some(raw == "true");
        }
        options
    }

    /// Fill unset fields from another options set. Used to give
    /// declaratively discovered embeds embedder-wide defaults that
    /// `data-*` attributes cannot express.
    pub fn or_defaults(mut self, defaults: &WidgetOptions) -> Self {
        macro_rules! fill {
            ($($field:ident),* $(,)?) => {
                $(if self.$field.is_none() {
                    self.$field = defaults.$field.clone();
                })*
            };
        }
        fill!(
            api_endpoint,
            config_timeout_ms,
            chat_timeout_ms,
            theme,
            mode,
            position,
            border_radius,
            font_family,
            custom_css,
            auto_open,
            show_branding,
            close_on_outside_click,
            max_messages,
            message_delay_ms,
            typing_delay_ms,
            welcome_message,
            placeholder_text,
            primary_color,
            language,
        );
        self
    }

    /// Merge these options over the hardcoded defaults.
    pub fn resolve(self) -> WidgetConfig {
        let mut config = WidgetConfig::default();
        if let Some(bot_id) = self.bot_id {
            config.bot_id = bot_id;
        }
        if let Some(api_endpoint) = self.api_endpoint {
            config.api_endpoint = api_endpoint;
        }
        if let Some(ms) = self.config_timeout_ms {
            config.config_timeout_ms = ms;
        }
        if let Some(ms) = self.chat_timeout_ms {
            config.chat_timeout_ms = ms;
        }
        if let Some(theme) = self.theme {
            config.theme = theme;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(position) = self.position {
            config.position = position;
        }
        if let Some(radius) = self.border_radius {
            config.border_radius = radius;
        }
        if let Some(font) = self.font_family {
            config.font_family = font;
        }
        if self.custom_css.is_some() {
            config.custom_css = self.custom_css;
        }
        if let Some(auto_open) = self.auto_open {
            config.auto_open = auto_open;
        }
        if let Some(show) = self.show_branding {
            config.show_branding = show;
        }
        if let Some(close) = self.close_on_outside_click {
            config.close_on_outside_click = close;
        }
        if let Some(max) = self.max_messages {
            config.max_messages = max;
        }
        if let Some(ms) = self.message_delay_ms {
            config.message_delay_ms = ms;
        }
        if let Some(ms) = self.typing_delay_ms {
            config.typing_delay_ms = ms;
        }
        if self.welcome_message.is_some() {
            config.welcome_message = self.welcome_message;
        }
        if self.placeholder_text.is_some() {
            config.placeholder_text = self.placeholder_text;
        }
        if self.primary_color.is_some() {
            config.primary_color = self.primary_color;
        }
        if let Some(language) = self.language {
            config.language = language;
        }
        if self.target.is_some() {
            config.target = self.target;
        }
        config.sanitize();
        config
    }
}

/// Embedder-side configuration loaded from `helferlain.toml`, used by the
/// demo binary. Environment variables override file values.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EmbedderConfig {
    pub api_endpoint: Option<String>,
    pub bot_id: Option<String>,
    pub theme: Option<String>,
    pub auto_open: bool,
}

impl EmbedderConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    pub fn load_or_default() -> Self {
        Self::load_from_file("helferlain.toml").unwrap_or_default()
    }

    /// Environment variables take precedence over file values.
    pub fn merge_with_env(&mut self) {
        if let Ok(endpoint) = std::env::var("HELFERLAIN_API_ENDPOINT") {
            self.api_endpoint = Some(endpoint);
        }
        if let Ok(bot_id) = std::env::var("HELFERLAIN_BOT_ID") {
            self.bot_id = Some(bot_id);
        }
        if let Ok(theme) = std::env::var("HELFERLAIN_THEME") {
            self.theme = Some(theme);
        }
        if let Ok(val) = std::env::var("HELFERLAIN_AUTO_OPEN") {
            self.auto_open = val == "1" || val.eq_ignore_ascii_case("true");
        }
    }

    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = WidgetConfig::default();
        assert_eq!(config.config_timeout_ms, 10_000);
        assert_eq!(config.chat_timeout_ms, 30_000);
        assert_eq!(config.mode, Mode::Bubble);
        assert_eq!(config.position, Position::BottomRight);
        assert!(config.max_messages >= 1);
        assert!(config.close_on_outside_click);
    }

    #[test]
    fn caller_values_win_over_branding() {
        let mut config = WidgetOptions {
            bot_id: Some("abc".into()),
            welcome_message: Some("Willkommen".into()),
            ..WidgetOptions::default()
        }
        .resolve();

        config.absorb_branding(Some("Hi from branding"), Some("#123456"));
        assert_eq!(config.welcome_message.as_deref(), Some("Willkommen"));
        assert_eq!(config.primary_color.as_deref(), Some("#123456"));
    }

    #[test]
    fn branding_fills_unset_fields() {
        let mut config = WidgetOptions::new("abc").resolve();
        config.absorb_branding(Some("Hi!"), None);
        assert_eq!(config.welcome_message.as_deref(), Some("Hi!"));
        assert_eq!(config.resolved_welcome(), "Hi!");
        assert!(config.primary_color.is_none());
    }

    #[test]
    fn max_messages_clamped_to_one() {
        let config = WidgetOptions {
            bot_id: Some("abc".into()),
            max_messages: Some(0),
            ..WidgetOptions::default()
        }
        .resolve();
        assert_eq!(config.max_messages, 1);
    }

    #[test]
    fn options_from_attrs() {
        let mut attrs = BTreeMap::new();
        attrs.insert("data-bot-id".to_string(), "xyz".to_string());
        attrs.insert("data-mode".to_string(), "inline".to_string());
        attrs.insert("data-theme".to_string(), "dark".to_string());
        attrs.insert("data-position".to_string(), "top-left".to_string());
        attrs.insert("data-auto-open".to_string(), "true".to_string());

        let options = WidgetOptions::from_attrs(&attrs);
        assert_eq!(options.bot_id.as_deref(), Some("xyz"));
        assert_eq!(options.mode, Some(Mode::Inline));
        assert_eq!(options.theme, Some(Theme::Dark));
        assert_eq!(options.position, Some(Position::TopLeft));
        assert_eq!(options.auto_open, Some(true));
    }

    #[test]
    fn auto_open_requires_true_literal() {
        let mut attrs = BTreeMap::new();
        attrs.insert("data-bot-id".to_string(), "xyz".to_string());
        attrs.insert("data-auto-open".to_string(), "1".to_string());
        let options = WidgetOptions::from_attrs(&attrs);
        assert_eq!(options.auto_open, Some(false));
    }

    #[test]
    fn unknown_attr_values_ignored() {
        let mut attrs = BTreeMap::new();
        attrs.insert("data-bot-id".to_string(), "xyz".to_string());
        attrs.insert("data-mode".to_string(), "popup".to_string());
        let options = WidgetOptions::from_attrs(&attrs);
        assert_eq!(options.mode, None);
    }

    #[test]
    fn or_defaults_fills_only_unset_fields() {
        let mut attrs = BTreeMap::new();
        attrs.insert("data-bot-id".to_string(), "xyz".to_string());
        attrs.insert("data-theme".to_string(), "dark".to_string());
        let from_markup = WidgetOptions::from_attrs(&attrs);

        let mut defaults = WidgetOptions::default();
        defaults.api_endpoint = Some("https://api.example.com".into());
        defaults.theme = Some(Theme::Light);

        let merged = from_markup.or_defaults(&defaults);
        assert_eq!(merged.api_endpoint.as_deref(), Some("https://api.example.com"));
        assert_eq!(merged.theme, Some(Theme::Dark));
        assert_eq!(merged.bot_id.as_deref(), Some("xyz"));
    }

    #[test]
    fn localized_fallbacks() {
        let de = WidgetOptions::new("a").resolve();
        assert!(de.resolved_welcome().starts_with("Hallo"));

        let en = WidgetOptions {
            bot_id: Some("a".into()),
            language: Some("en".into()),
            ..WidgetOptions::default()
        }
        .resolve();
        assert!(en.resolved_welcome().starts_with("Hi"));
        assert_eq!(en.resolved_placeholder(), "Type a message...");
    }

    #[test]
    fn embedder_config_toml_roundtrip() {
        let config = EmbedderConfig {
            api_endpoint: Some("https://api.example.com".into()),
            bot_id: Some("abc".into()),
            theme: Some("dark".into()),
            auto_open: true,
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: EmbedderConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.bot_id.as_deref(), Some("abc"));
        assert!(parsed.auto_open);
    }

    #[test]
    fn embedder_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("helferlain.toml");
        std::fs::write(&path, "bot_id = \"file-bot\"\n").unwrap();

        let config = EmbedderConfig::load_from_file(&path).unwrap();
        assert_eq!(config.bot_id.as_deref(), Some("file-bot"));
    }

    #[test]
    fn embedder_config_env_overrides() {
        unsafe {
            std::env::set_var("HELFERLAIN_BOT_ID", "env-bot");
            std::env::set_var("HELFERLAIN_AUTO_OPEN", "true");
        }

        let mut config = EmbedderConfig::default();
        config.merge_with_env();
        assert_eq!(config.bot_id.as_deref(), Some("env-bot"));
        assert!(config.auto_open);

        unsafe {
            std::env::remove_var("HELFERLAIN_BOT_ID");
            std::env::remove_var("HELFERLAIN_AUTO_OPEN");
        }
    }
}
