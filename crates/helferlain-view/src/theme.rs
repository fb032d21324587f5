//! Theme resolution and the generated widget stylesheet.
//!
//! The structural stylesheet is shared by every widget on the page and
//! injected once; per-widget values (primary color, surface colors,
//! radius, font) travel as custom properties set on each widget root, so
//! two widgets with different branding coexist under one stylesheet.

use helferlain_config::Theme;

use crate::document::ColorScheme;

/// Id attribute of the shared style element.
pub const SHARED_STYLE_ID: &str = "helferlain-widget-styles";

const DEFAULT_PRIMARY: &str = "#4f46e5";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedTheme {
    Light,
    Dark,
}

/// Resolve `auto` against the host document's color-scheme hint.
pub fn resolve_theme(theme: Theme, hint: ColorScheme) -> ResolvedTheme {
    match theme {
        Theme::Light => ResolvedTheme::Light,
        Theme::Dark => ResolvedTheme::Dark,
        Theme::Auto => match hint {
            ColorScheme::Light => ResolvedTheme::Light,
            ColorScheme::Dark => ResolvedTheme::Dark,
        },
    }
}

/// Validate a branding color; anything csscolorparser does not accept is
/// discarded so malformed branding can never corrupt the stylesheet.
pub fn normalize_color(input: &str) -> Option<String> {
    let color = csscolorparser::parse(input).ok()?;
    let [r, g, b, a] = color.to_rgba8();
    if a == 255 {
        Some(format!("#{r:02x}{g:02x}{b:02x}"))
    } else {
        Some(format!("#{r:02x}{g:02x}{b:02x}{a:02x}"))
    }
}

fn shade(hex: &str) -> String {
    match csscolorparser::parse(hex) {
        Ok(color) => {
            let [r, g, b, _] = color.to_rgba8();
            let darken = |c: u8| (c as u16 * 85 / 100) as u8;
            format!("#{:02x}{:02x}{:02x}", darken(r), darken(g), darken(b))
        }
        Err(_) => hex.to_string(),
    }
}

/// Design tokens of one widget instance.
#[derive(Debug, Clone)]
pub struct ThemeTokens {
    pub primary: String,
    pub primary_hover: String,
    pub background: String,
    pub surface: String,
    pub text: String,
    pub muted: String,
    pub border: String,
    pub bubble_text: String,
    pub radius: f64,
    pub font_family: String,
}

impl ThemeTokens {
    pub fn build(
        resolved: ResolvedTheme,
        primary: Option<&str>,
        radius: f64,
        font_family: &str,
    ) -> Self {
        let primary = primary
            .and_then(|raw| {
                let normalized = normalize_color(raw);
                if normalized.is_none() {
                    tracing::warn!(color = %raw, "ignoring invalid primary color");
                }
                normalized
            })
            .unwrap_or_else(|| DEFAULT_PRIMARY.to_string());
        let primary_hover = shade(&primary);

        let (background, surface, text, muted, border) = match resolved {
            ResolvedTheme::Light => ("#ffffff", "#f4f5f7", "#111827", "#6b7280", "#e5e7eb"),
            ResolvedTheme::Dark => ("#1f2430", "#2a3040", "#f3f4f6", "#9ca3af", "#3b4252"),
        };

        Self {
            primary,
            primary_hover,
            background: background.to_string(),
            surface: surface.to_string(),
            text: text.to_string(),
            muted: muted.to_string(),
            border: border.to_string(),
            bubble_text: "#ffffff".to_string(),
            radius: radius.max(0.0),
            font_family: font_family.to_string(),
        }
    }

    /// Inline custom-property set for the widget root's style attribute.
    pub fn custom_properties(&self) -> String {
        format!(
            "--hl-primary:{};--hl-primary-hover:{};--hl-bg:{};--hl-surface:{};\
             --hl-text:{};--hl-muted:{};--hl-border:{};--hl-bubble-text:{};\
             --hl-radius:{}px;--hl-font:{}",
            self.primary,
            self.primary_hover,
            self.background,
            self.surface,
            self.text,
            self.muted,
            self.border,
            self.bubble_text,
            self.radius,
            self.font_family
        )
    }
}

/// The shared structural stylesheet. All instance-specific values are
/// referenced through the custom properties above.
pub fn stylesheet() -> String {
    r#".helferlain-widget{font-family:var(--hl-font);color:var(--hl-text);line-height:1.45}
.helferlain-widget *{box-sizing:border-box}
.helferlain-hidden{display:none}
.helferlain-pos-bottom-right{position:fixed;right:24px;bottom:24px}
.helferlain-pos-bottom-left{position:fixed;left:24px;bottom:24px}
.helferlain-pos-top-right{position:fixed;right:24px;top:24px}
.helferlain-pos-top-left{position:fixed;left:24px;top:24px}
.helferlain-trigger{width:56px;height:56px;border-radius:50%;border:none;background:var(--hl-primary);color:var(--hl-bubble-text);cursor:pointer;box-shadow:0 4px 14px rgba(0,0,0,.25)}
.helferlain-trigger:hover{background:var(--hl-primary-hover)}
.helferlain-unread-badge{position:absolute;top:-4px;right:-4px;width:12px;height:12px;border-radius:50%;background:#ef4444}
.helferlain-overlay{position:fixed;inset:0;background:rgba(0,0,0,.55);display:flex;align-items:center;justify-content:center}
.helferlain-window{display:flex;flex-direction:column;width:360px;max-width:95vw;height:520px;max-height:85vh;background:var(--hl-bg);border:1px solid var(--hl-border);border-radius:var(--hl-radius);overflow:hidden;box-shadow:0 12px 40px rgba(0,0,0,.3)}
.helferlain-mode-inline .helferlain-window{width:100%;height:100%;box-shadow:none}
.helferlain-header{display:flex;align-items:center;gap:8px;padding:12px 16px;background:var(--hl-primary);color:var(--hl-bubble-text)}
.helferlain-logo{width:28px;height:28px;border-radius:50%}
.helferlain-title{flex:1;font-weight:600}
.helferlain-online-dot{width:8px;height:8px;border-radius:50%;background:#22c55e}
.helferlain-close{border:none;background:transparent;color:inherit;cursor:pointer;font-size:16px}
.helferlain-messages{flex:1;overflow-y:auto;padding:16px;background:var(--hl-surface);display:flex;flex-direction:column;gap:10px}
.helferlain-message{max-width:85%;padding:8px 12px;border-radius:var(--hl-radius);word-wrap:break-word}
.helferlain-user{align-self:flex-end;background:var(--hl-primary);color:var(--hl-bubble-text)}
.helferlain-assistant{align-self:flex-start;background:var(--hl-bg);border:1px solid var(--hl-border)}
.helferlain-message-error{background:#fef2f2;border-color:#fecaca;color:#b91c1c}
.helferlain-sources{margin-top:6px;font-size:12px;color:var(--hl-muted)}
.helferlain-typing{display:flex;gap:4px;padding:0 16px 10px}
.helferlain-typing-dot{width:6px;height:6px;border-radius:50%;background:var(--hl-muted);animation:helferlain-blink 1.2s infinite}
@keyframes helferlain-blink{0%,80%,100%{opacity:.25}40%{opacity:1}}
.helferlain-input-row{display:flex;gap:8px;padding:12px;border-top:1px solid var(--hl-border);background:var(--hl-bg)}
.helferlain-input{flex:1;padding:8px 12px;border:1px solid var(--hl-border);border-radius:var(--hl-radius);background:var(--hl-bg);color:var(--hl-text)}
.helferlain-send{padding:8px 14px;border:none;border-radius:var(--hl-radius);background:var(--hl-primary);color:var(--hl-bubble-text);cursor:pointer}
.helferlain-send:disabled{opacity:.5;cursor:default}
.helferlain-branding{padding:6px 12px;text-align:center;font-size:11px;color:var(--hl-muted);background:var(--hl-bg)}
.helferlain-error-note{padding:12px;border:1px solid #fecaca;border-radius:8px;background:#fef2f2;color:#b91c1c;font-size:13px}
.helferlain-anim-enter{animation:helferlain-rise .3s ease-out}
.helferlain-anim-exit{animation:helferlain-fall .3s ease-in}
@keyframes helferlain-rise{from{opacity:0;transform:translateY(12px)}to{opacity:1;transform:none}}
@keyframes helferlain-fall{from{opacity:1;transform:none}to{opacity:0;transform:translateY(12px)}}
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_follows_document_hint() {
        assert_eq!(
            resolve_theme(Theme::Auto, ColorScheme::Dark),
            ResolvedTheme::Dark
        );
        assert_eq!(
            resolve_theme(Theme::Auto, ColorScheme::Light),
            ResolvedTheme::Light
        );
        assert_eq!(
            resolve_theme(Theme::Dark, ColorScheme::Light),
            ResolvedTheme::Dark
        );
    }

    #[test]
    fn normalizes_color_notations() {
        assert_eq!(normalize_color("#FF0000"), Some("#ff0000".to_string()));
        assert_eq!(normalize_color("rgb(0,128,0)"), Some("#008000".to_string()));
        assert_eq!(normalize_color("definitely-not-a-color"), None);
    }

    #[test]
    fn invalid_primary_falls_back_to_default() {
        let tokens = ThemeTokens::build(ResolvedTheme::Light, Some("##nope"), 16.0, "sans-serif");
        assert_eq!(tokens.primary, DEFAULT_PRIMARY);
    }

    #[test]
    fn branding_primary_reaches_custom_properties() {
        let tokens = ThemeTokens::build(ResolvedTheme::Light, Some("#123456"), 8.0, "sans-serif");
        let props = tokens.custom_properties();
        assert!(props.contains("--hl-primary:#123456"));
        assert!(props.contains("--hl-radius:8px"));
    }

    #[test]
    fn dark_theme_switches_surfaces() {
        let light = ThemeTokens::build(ResolvedTheme::Light, None, 16.0, "sans-serif");
        let dark = ThemeTokens::build(ResolvedTheme::Dark, None, 16.0, "sans-serif");
        assert_ne!(light.background, dark.background);
        assert_ne!(light.text, dark.text);
    }

    #[test]
    fn stylesheet_uses_token_variables() {
        let css = stylesheet();
        assert!(css.contains("var(--hl-primary)"));
        assert!(css.contains(".helferlain-trigger"));
        assert!(css.contains(".helferlain-anim-enter"));
    }
}
