//! Minimal embedder: mounts one widget into a host document, pumps the
//! update loop, and prints the resulting transcript and markup.
//!
//! Configuration comes from `helferlain.toml` with `HELFERLAIN_*`
//! environment overrides; `HELFERLAIN_DEMO_MESSAGE` sends one chat
//! message once the widget is ready.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use helferlain_config::{EmbedderConfig, WidgetOptions};
use helferlain_view::Document;
use helferlain_widget::{HelferLain, Phase};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let embedder = EmbedderConfig::load();
    let bot_id = embedder
        .bot_id
        .clone()
        .context("no bot id; set HELFERLAIN_BOT_ID or bot_id in helferlain.toml")?;

    let mut options = WidgetOptions::new(bot_id);
    options.api_endpoint = embedder.api_endpoint.clone();
    options.auto_open = Some(embedder.auto_open);
    if let Some(theme) = embedder.theme.as_deref() {
        match theme.parse() {
            Ok(theme) => options.theme = Some(theme),
            Err(()) => tracing::warn!(value = %theme, "ignoring unknown theme"),
        }
    }

    let mut doc = Document::new();
    let mut hl = HelferLain::new();
    let id = hl.init(&mut doc, options)?;

    pump(&mut hl, &mut doc, Duration::from_secs(15));
    match hl.widget(id).map(|w| w.phase()) {
        Some(Phase::Ready) => {}
        other => bail!("widget did not become ready (phase {other:?})"),
    }

    hl.widget_mut(id)
        .map(|w| w.open(&mut doc))
        .context("widget disappeared")?;
    pump(&mut hl, &mut doc, Duration::from_secs(5));

    if let Ok(message) = std::env::var("HELFERLAIN_DEMO_MESSAGE") {
        tracing::info!(%message, "sending demo message");
        if let Some(widget) = hl.widget_mut(id) {
            widget.send_message(&mut doc, &message);
        }
        pump(&mut hl, &mut doc, Duration::from_secs(60));
    }

    if let Some(widget) = hl.widget(id) {
        println!("# Transcript ({})", widget.session().session_id());
        for message in widget.session().messages() {
            println!("  [{:?}] {}", message.role, message.content);
        }
        if let Some(shell) = widget.shell() {
            println!("\n# Markup");
            println!("{}", doc.to_html(shell.root));
        }
    }

    Ok(())
}

/// Drive the registry until its I/O and timers drain or the budget runs out.
fn pump(hl: &mut HelferLain, doc: &mut Document, budget: Duration) {
    let deadline = Instant::now() + budget;
    loop {
        hl.update(doc);
        if !hl.has_pending_io() || Instant::now() > deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(15));
    }
    hl.update(doc);
}
