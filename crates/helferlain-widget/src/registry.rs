//! Process-wide widget registry and public entry points.
//!
//! The registry is an explicit object owned by the embedder rather than
//! ambient global state: it owns every live widget, routes document
//! events to them, runs auto-discovery, and performs the bulk operations
//! of the public API. The shared stylesheet is removed only when the
//! last widget is gone.

use helferlain_config::{Theme, WidgetOptions};
use helferlain_view::theme::SHARED_STYLE_ID;
use helferlain_view::{Document, NodeId};

use crate::bootstrap::{self, Bootstrapper};
use crate::error::WidgetError;
use crate::events::{Key, WidgetHooks};
use crate::widget::{Phase, Widget};

pub struct HelferLain {
    widgets: Vec<Widget>,
    next_id: u64,
    bootstrap: Bootstrapper,
    scan_defaults: WidgetOptions,
}

impl Default for HelferLain {
    fn default() -> Self {
        Self::new()
    }
}

impl HelferLain {
    pub fn new() -> Self {
        Self {
            widgets: Vec::new(),
            next_id: 1,
            bootstrap: Bootstrapper::new(),
            scan_defaults: WidgetOptions::default(),
        }
    }

    /// Options applied underneath declaratively discovered embeds, which
    /// can only express a subset of the configuration as attributes.
    pub fn set_scan_defaults(&mut self, defaults: WidgetOptions) {
        self.scan_defaults = defaults;
    }

    /// Create a widget. Repeated init for a bot that already has a live
    /// widget warns and returns the existing instance.
    pub fn init(&mut self, doc: &mut Document, options: WidgetOptions) -> Result<u64, WidgetError> {
        self.init_with_hooks(doc, options, WidgetHooks::default())
    }

    pub fn init_with_hooks(
        &mut self,
        doc: &mut Document,
        options: WidgetOptions,
        hooks: WidgetHooks,
    ) -> Result<u64, WidgetError> {
        let bot_id = options
            .bot_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or(WidgetError::MissingBotId)?;

        if let Some(existing) = self
            .widgets
            .iter()
            .find(|w| w.bot_id() == bot_id && w.phase() != Phase::Failed)
        {
            tracing::warn!(bot = %bot_id, "widget already initialized, ignoring repeated init");
            return Ok(existing.id());
        }
        // A previous failed attempt for this bot can be replaced.
        if let Some(index) = self
            .widgets
            .iter()
            .position(|w| w.bot_id() == bot_id && w.phase() == Phase::Failed)
        {
            self.widgets[index].destroy(doc);
            self.prune(doc);
        }

        let id = self.next_id;
        self.next_id += 1;
        let widget = Widget::start(id, options.resolve(), hooks, doc)?;
        self.widgets.push(widget);
        Ok(id)
    }

    pub fn widget(&self, id: u64) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.id() == id)
    }

    pub fn widget_mut(&mut self, id: u64) -> Option<&mut Widget> {
        self.widgets.iter_mut().find(|w| w.id() == id)
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    pub fn has_pending_io(&self) -> bool {
        self.widgets.iter().any(|w| w.has_pending_io())
    }

    /// One cooperative tick: discover new embeds, drain each widget's
    /// completions and timers, drop destroyed instances.
    pub fn update(&mut self, doc: &mut Document) {
        if self.bootstrap.poll(doc) {
            self.scan(doc);
        }
        for widget in &mut self.widgets {
            widget.update(doc);
        }
        self.prune(doc);
    }

    fn prune(&mut self, doc: &mut Document) {
        let before = self.widgets.len();
        self.widgets.retain(|w| !w.is_destroyed());
        if self.widgets.len() != before && self.widgets.is_empty() {
            doc.remove_head_style(SHARED_STYLE_ID);
        }
    }

    pub fn destroy(&mut self, doc: &mut Document, id: u64) {
        if let Some(widget) = self.widget_mut(id) {
            widget.destroy(doc);
        }
        self.prune(doc);
    }

    // ----- bulk operations -----

    pub fn open_all(&mut self, doc: &mut Document) {
        for widget in &mut self.widgets {
            widget.open(doc);
        }
    }

    pub fn close_all(&mut self, doc: &mut Document) {
        for widget in &mut self.widgets {
            widget.close(doc);
        }
    }

    pub fn destroy_all(&mut self, doc: &mut Document) {
        for widget in &mut self.widgets {
            widget.destroy(doc);
        }
        self.prune(doc);
    }

    pub fn set_theme(&mut self, doc: &mut Document, theme: Theme) {
        for widget in &mut self.widgets {
            widget.set_theme(doc, theme);
        }
    }

    pub fn enable_debug(&mut self) {
        crate::set_debug(true);
        tracing::info!("debug logging enabled");
    }

    // ----- document event routing -----

    pub fn dispatch_click(&mut self, doc: &mut Document, target: NodeId) {
        for widget in &mut self.widgets {
            widget.handle_click(doc, target);
        }
    }

    pub fn dispatch_key(&mut self, doc: &mut Document, key: Key) {
        for widget in &mut self.widgets {
            widget.handle_key(doc, key);
        }
    }

    // ----- auto-discovery -----

    /// Scan now and watch for embeds inserted later.
    pub fn start_auto_discovery(&mut self, doc: &mut Document) {
        self.bootstrap.start(doc);
        self.scan(doc);
    }

    pub fn stop_auto_discovery(&mut self) {
        self.bootstrap.stop();
    }

    /// One-shot scan for unmarked `data-bot-id` elements.
    pub fn scan(&mut self, doc: &mut Document) {
        for options in bootstrap::discover(doc) {
            let options = options.or_defaults(&self.scan_defaults);
            if let Err(err) = self.init(doc, options) {
                tracing::warn!(error = %err, "declarative embed failed to initialize");
            }
        }
    }
}
