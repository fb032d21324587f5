//! The widget runtime: one instance per embedded bot.
//!
//! A widget is driven by its embedder's update loop. `init` starts the
//! bot-config fetch and returns immediately; the subtree is mounted when
//! the fetch completes, so a fatal init failure never leaves a partial
//! widget in the document. All subsequent I/O (chat sends, the custom
//! stylesheet) and all UX pacing flow through [`Widget::update`].

use std::time::{Duration, Instant};

use helferlain_config::{Mode, Theme, WidgetConfig};
use helferlain_io::{
    ApiClient, ApiError, BotConfig, ChatMetadata, ChatRequest, ChatResponse, Completion, Outcome,
    RequestId,
};
use helferlain_view::chat::{self, ChatShell, MessageView, ShellParams, SourceView};
use helferlain_view::theme::{self, SHARED_STYLE_ID, ThemeTokens};
use helferlain_view::{Document, ListenerId, ListenerKind, NodeId};

use crate::error::WidgetError;
use crate::events::{Channel, EventBus, Key, WidgetEvent, WidgetHooks};
use crate::session::{ConversationSession, Message};
use crate::timer::TimerQueue;

/// Open/close animation duration.
const ANIMATION: Duration = Duration::from_millis(300);
/// Pause before an escalation prompt is shown.
const ESCALATION_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Bot config fetch in flight; nothing mounted yet.
    Initializing,
    Ready,
    /// Fatal init failure; inert.
    Failed,
    Destroyed,
}

enum PendingAction {
    ShowWelcome,
    DeliverResponse(ChatResponse),
    FinishOpenAnimation,
    FinishCloseAnimation,
    Escalate(ChatMetadata),
}

pub struct Widget {
    id: u64,
    config: WidgetConfig,
    hooks: WidgetHooks,
    bus: EventBus,
    client: ApiClient,
    session: ConversationSession,
    timers: TimerQueue<PendingAction>,
    phase: Phase,
    shell: Option<ChatShell>,
    bot: Option<BotConfig>,
    element_id: String,
    mount_target: Option<NodeId>,
    error_note: Option<NodeId>,
    custom_css_node: Option<NodeId>,
    pending_config: Option<RequestId>,
    pending_chat: Option<RequestId>,
    pending_css: Option<RequestId>,
    click_listener: Option<ListenerId>,
    key_listener: Option<ListenerId>,
    /// Rendered node per transcript entry, kept aligned with the session.
    message_nodes: Vec<NodeId>,
    welcome_scheduled: bool,
    unread: bool,
}

impl Widget {
    /// Validate the configuration, resolve the mount target and start the
    /// bot-config fetch. Fails fast before any tree or network activity
    /// when the configuration is unusable.
    pub(crate) fn start(
        id: u64,
        config: WidgetConfig,
        hooks: WidgetHooks,
        doc: &mut Document,
    ) -> Result<Self, WidgetError> {
        if config.bot_id.trim().is_empty() {
            return Err(WidgetError::MissingBotId);
        }

        let mount_target = match &config.target {
            Some(selector) => {
                let element_id = selector.trim_start_matches('#');
                Some(
                    doc.element_by_id(element_id)
                        .ok_or_else(|| WidgetError::TargetNotFound(selector.clone()))?,
                )
            }
            None if config.mode == Mode::Inline => return Err(WidgetError::InlineWithoutTarget),
            None => None,
        };

        let mut client = ApiClient::new(
            &config.api_endpoint,
            config.config_timeout(),
            config.chat_timeout(),
        )?;
        let pending_config = Some(client.fetch_bot_config(&config.bot_id));

        let session = ConversationSession::new(config.max_messages);
        let element_id = chat::widget_element_id(&config.bot_id);
        tracing::debug!(
            bot = %config.bot_id,
            session = %session.session_id(),
            "widget initializing"
        );

        Ok(Self {
            id,
            config,
            hooks,
            bus: EventBus::new(),
            client,
            session,
            timers: TimerQueue::new(),
            phase: Phase::Initializing,
            shell: None,
            bot: None,
            element_id,
            mount_target,
            error_note: None,
            custom_css_node: None,
            pending_config,
            pending_chat: None,
            pending_css: None,
            click_listener: None,
            key_listener: None,
            message_nodes: Vec::new(),
            welcome_scheduled: false,
            unread: false,
        })
    }

    // ----- accessors -----

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bot_id(&self) -> &str {
        &self.config.bot_id
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_destroyed(&self) -> bool {
        self.phase == Phase::Destroyed
    }

    pub fn is_open(&self) -> bool {
        self.session.is_open
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading
    }

    pub fn has_unread(&self) -> bool {
        self.unread
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn shell(&self) -> Option<&ChatShell> {
        self.shell.as_ref()
    }

    pub fn bot(&self) -> Option<&BotConfig> {
        self.bot.as_ref()
    }

    /// Subscribe to this widget's typed event stream.
    pub fn subscribe(
        &mut self,
        channel: Option<Channel>,
        subscriber: impl FnMut(&WidgetEvent) + 'static,
    ) {
        self.bus.subscribe(channel, subscriber);
    }

    // ----- update loop -----

    /// Drain completed requests and due timers. Safe to call redundantly;
    /// a destroyed or failed widget ignores everything, which is also
    /// what drops late responses after `destroy`.
    pub fn update(&mut self, doc: &mut Document) {
        if matches!(self.phase, Phase::Destroyed | Phase::Failed) {
            return;
        }
        for completion in self.client.poll() {
            self.handle_completion(doc, completion);
        }
        for action in self.timers.due(Instant::now()) {
            self.apply_action(doc, action);
        }
    }

    pub fn has_pending_io(&self) -> bool {
        self.client.has_pending() || !self.timers.is_empty()
    }

    fn handle_completion(&mut self, doc: &mut Document, completion: Completion) {
        match completion.outcome {
            Outcome::BotConfig(result) => {
                if self.pending_config != Some(completion.request_id) {
                    tracing::debug!("ignoring stale bot-config completion");
                    return;
                }
                self.pending_config = None;
                match result {
                    Ok(bot) => self.finish_init(doc, bot),
                    Err(err) => self.fail_init(doc, err),
                }
            }
            Outcome::Chat(result) => {
                if self.pending_chat != Some(completion.request_id) {
                    tracing::debug!("ignoring stale chat completion");
                    return;
                }
                match result {
                    Ok(response) => {
                        // UX pacing pause, not a retry.
                        self.timers.schedule(
                            Duration::from_millis(self.config.message_delay_ms),
                            PendingAction::DeliverResponse(response),
                        );
                    }
                    Err(err) => {
                        let fallback = chat_error_text(&self.config.language);
                        self.push_message(doc, Message::assistant_error(fallback));
                        self.finish_send(doc);
                        self.report_error(doc, &err, false);
                    }
                }
            }
            Outcome::CustomCss(result) => {
                if self.pending_css != Some(completion.request_id) {
                    return;
                }
                self.pending_css = None;
                match result {
                    Ok(_) => {
                        tracing::debug!(bot = %self.config.bot_id, "custom stylesheet loaded");
                    }
                    Err(err) => {
                        // Aesthetic, not functional: the link stays, the
                        // widget keeps working.
                        tracing::warn!(error = %err, "custom stylesheet failed to load");
                        self.report_error(doc, &err, false);
                    }
                }
            }
        }
    }

    fn finish_init(&mut self, doc: &mut Document, bot: BotConfig) {
        self.config.absorb_branding(
            bot.branding.welcome_message.as_deref(),
            bot.branding.primary_color.as_deref(),
        );

        doc.ensure_head_style(SHARED_STYLE_ID, &theme::stylesheet());
        let tokens = self.tokens(doc);
        let shell = chat::build_shell(
            doc,
            &ShellParams {
                config: &self.config,
                bot_name: &bot.name,
                logo_url: bot.branding.logo_url.as_deref(),
                tokens: &tokens,
            },
        );
        let mount = self.mount_target.unwrap_or_else(|| doc.body());
        doc.append(mount, shell.root);

        self.click_listener = Some(doc.add_listener(ListenerKind::Click));
        self.key_listener = Some(doc.add_listener(ListenerKind::Key));
        self.shell = Some(shell);
        self.bot = Some(bot);
        self.phase = Phase::Ready;

        if let Some(css_url) = self.config.custom_css.clone() {
            match self.client.fetch_custom_css(&css_url) {
                Ok(request_id) => {
                    let link = doc.create(helferlain_view::NodeKind::StyleLink {
                        href: css_url.clone(),
                    });
                    doc.set_attr(link, "id", format!("helferlain-custom-css-{}", self.config.bot_id));
                    let head = doc.head();
                    doc.append(head, link);
                    self.custom_css_node = Some(link);
                    self.pending_css = Some(request_id);
                }
                Err(err) => tracing::warn!(error = %err, "custom stylesheet URL rejected"),
            }
        }

        tracing::info!(bot = %self.config.bot_id, "widget ready");
        let detail = serde_json::json!({
            "botId": self.config.bot_id,
            "sessionId": self.session.session_id(),
        });
        self.fire(doc, Channel::Initialized, detail);

        if self.config.auto_open {
            self.open(doc);
        }
    }

    fn fail_init(&mut self, doc: &mut Document, err: ApiError) {
        self.phase = Phase::Failed;
        // Nothing was mounted; an explicitly supplied target gets a short
        // inline note instead of a functioning chat window.
        if let Some(target) = self.mount_target {
            let note = chat::build_error_note(doc, init_error_text(&self.config.language));
            doc.append(target, note);
            self.error_note = Some(note);
        }
        let err = WidgetError::BotConfig(err);
        self.report_error(doc, &err, true);
    }

    fn apply_action(&mut self, doc: &mut Document, action: PendingAction) {
        match action {
            PendingAction::ShowWelcome => {
                if self.session.is_empty() {
                    let welcome = self.config.resolved_welcome();
                    self.push_message(doc, Message::assistant(welcome));
                }
            }
            PendingAction::DeliverResponse(response) => self.deliver_response(doc, response),
            PendingAction::FinishOpenAnimation => {
                let container = self.visible_container();
                if let Some(container) = container {
                    doc.remove_class(container, "helferlain-anim-enter");
                }
            }
            PendingAction::FinishCloseAnimation => {
                if let Some(container) = self.visible_container() {
                    doc.remove_class(container, "helferlain-anim-exit");
                    if self.config.mode != Mode::Inline {
                        doc.add_class(container, "helferlain-hidden");
                    }
                }
            }
            PendingAction::Escalate(metadata) => self.escalate(doc, metadata),
        }
    }

    fn deliver_response(&mut self, doc: &mut Document, response: ChatResponse) {
        let message =
            Message::assistant(response.response.clone()).with_sources(response.sources.clone());
        self.push_message(doc, message);
        self.fire(
            doc,
            Channel::Response,
            serde_json::json!({
                "response": response.response,
                "sources": response.sources.len(),
            }),
        );
        if let Some(metadata) = response.metadata {
            if metadata.wants_escalation() {
                self.timers
                    .schedule(ESCALATION_DELAY, PendingAction::Escalate(metadata));
            }
        }
        self.finish_send(doc);
    }

    fn escalate(&mut self, doc: &mut Document, metadata: ChatMetadata) {
        let german = self.config.language.starts_with("de");
        let prompt_text = if metadata.show_email_modal {
            metadata.email_prompt.clone().unwrap_or_else(|| {
                if german {
                    "Wie lautet Ihre E-Mail-Adresse?".to_string()
                } else {
                    "What is your email address?".to_string()
                }
            })
        } else {
            let persons: Vec<String> = metadata
                .contact_persons
                .iter()
                .map(|p| format!("{} ({})", p.name, p.role))
                .collect();
            if german {
                format!("Ansprechpartner: {}", persons.join(", "))
            } else {
                format!("Contact persons: {}", persons.join(", "))
            }
        };

        let answer = doc.prompt(&prompt_text);
        tracing::debug!(answered = answer.is_some(), "escalation prompt resolved");
        if let Some(hook) = self.hooks.on_escalation.as_mut() {
            hook(&serde_json::json!({
                "prompt": prompt_text,
                "value": answer,
            }));
        }
    }

    // ----- open / close -----

    pub fn open(&mut self, doc: &mut Document) {
        if self.phase != Phase::Ready {
            tracing::warn!(phase = ?self.phase, "open() ignored");
            return;
        }
        if self.session.is_open {
            return;
        }
        self.session.is_open = true;
        self.unread = false;

        let shell = match self.shell.clone() {
            Some(shell) => shell,
            None => return,
        };
        if let Some(badge) = shell.badge {
            doc.add_class(badge, "helferlain-hidden");
        }
        if let Some(container) = self.visible_container() {
            doc.remove_class(container, "helferlain-hidden");
            doc.remove_class(container, "helferlain-anim-exit");
            doc.add_class(container, "helferlain-anim-enter");
            self.timers.schedule(ANIMATION, PendingAction::FinishOpenAnimation);
        }
        if self.session.is_empty() && !self.welcome_scheduled {
            self.welcome_scheduled = true;
            self.timers.schedule(
                Duration::from_millis(self.config.typing_delay_ms),
                PendingAction::ShowWelcome,
            );
        }
        doc.set_focus(Some(shell.input));
        self.fire(doc, Channel::Open, serde_json::Value::Null);
    }

    pub fn close(&mut self, doc: &mut Document) {
        if self.phase != Phase::Ready || !self.session.is_open {
            return;
        }
        self.session.is_open = false;

        if let Some(container) = self.visible_container() {
            doc.remove_class(container, "helferlain-anim-enter");
            doc.add_class(container, "helferlain-anim-exit");
            self.timers.schedule(ANIMATION, PendingAction::FinishCloseAnimation);
        }
        if let Some(shell) = &self.shell {
            if doc.focused() == Some(shell.input) {
                doc.set_focus(None);
            }
        }
        self.fire(doc, Channel::Close, serde_json::Value::Null);
    }

    pub fn toggle(&mut self, doc: &mut Document) {
        if self.session.is_open {
            self.close(doc);
        } else {
            self.open(doc);
        }
    }

    /// The element shown/hidden by open and close: the overlay in modal
    /// mode, otherwise the chat window.
    fn visible_container(&self) -> Option<NodeId> {
        self.shell
            .as_ref()
            .map(|shell| shell.overlay.unwrap_or(shell.window))
    }

    // ----- chat -----

    /// Submit a message. A submission while a request is in flight is
    /// dropped, not queued; an empty submission is ignored.
    pub fn send_message(&mut self, doc: &mut Document, text: &str) {
        if self.phase != Phase::Ready {
            tracing::warn!(phase = ?self.phase, "send_message() ignored");
            return;
        }
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if self.session.is_loading {
            tracing::debug!("dropping submission while a request is in flight");
            return;
        }

        self.session.is_loading = true;
        if let Some(shell) = &self.shell {
            doc.set_attr(shell.send_button, "disabled", "true");
            doc.set_input_disabled(shell.input, true);
        }

        // Optimistic append before the network round-trip.
        self.push_message(doc, Message::user(text));
        self.fire(
            doc,
            Channel::Message,
            serde_json::json!({"content": text}),
        );
        self.show_typing(doc);

        let request = ChatRequest {
            message: text.to_string(),
            conversation_id: self.session.session_id().to_string(),
        };
        self.pending_chat = Some(self.client.send_chat(&self.config.bot_id, &request));
    }

    /// Read, clear and submit the input field.
    pub fn submit_input(&mut self, doc: &mut Document) {
        let Some(shell) = self.shell.clone() else {
            return;
        };
        let value = doc.input_value(shell.input).unwrap_or_default().to_string();
        if value.trim().is_empty() {
            return;
        }
        doc.set_input_value(shell.input, "");
        self.send_message(doc, &value);
    }

    fn finish_send(&mut self, doc: &mut Document) {
        self.hide_typing(doc);
        self.session.is_loading = false;
        self.pending_chat = None;
        if let Some(shell) = &self.shell {
            doc.remove_attr(shell.send_button, "disabled");
            doc.set_input_disabled(shell.input, false);
            if self.session.is_open {
                doc.set_focus(Some(shell.input));
            }
        }
    }

    fn push_message(&mut self, doc: &mut Document, message: Message) {
        let Some(shell) = self.shell.clone() else {
            return;
        };
        let sources: Vec<SourceView> = message
            .sources
            .iter()
            .map(|s| SourceView {
                title: &s.title,
                url: s.url.as_deref(),
            })
            .collect();
        let node = chat::append_message_node(
            doc,
            shell.messages,
            &MessageView {
                role: message.role,
                content: &message.content,
                sources,
                is_error: message.is_error,
            },
        );
        self.message_nodes.push(node);

        let is_assistant = message.role == helferlain_view::MessageRole::Assistant;
        if self.session.push(message) {
            // FIFO trim: drop the oldest rendered node with its entry.
            let evicted = self.message_nodes.remove(0);
            doc.remove(evicted);
        }

        if is_assistant && !self.session.is_open {
            self.unread = true;
            if let Some(badge) = shell.badge {
                doc.remove_class(badge, "helferlain-hidden");
            }
        }
    }

    fn show_typing(&mut self, doc: &mut Document) {
        if self.session.is_typing {
            return;
        }
        self.session.is_typing = true;
        if let Some(shell) = &self.shell {
            doc.remove_class(shell.typing, "helferlain-hidden");
        }
    }

    fn hide_typing(&mut self, doc: &mut Document) {
        if !self.session.is_typing {
            return;
        }
        self.session.is_typing = false;
        if let Some(shell) = &self.shell {
            doc.add_class(shell.typing, "helferlain-hidden");
        }
    }

    // ----- document event routing -----

    pub fn handle_click(&mut self, doc: &mut Document, target: NodeId) {
        if self.phase != Phase::Ready {
            return;
        }
        let Some(listener) = self.click_listener else {
            return;
        };
        if !doc.has_listener(listener) {
            return;
        }
        let Some(shell) = self.shell.clone() else {
            return;
        };

        if shell.trigger == Some(target) {
            self.toggle(doc);
            return;
        }
        if shell.close_button == Some(target) || shell.overlay == Some(target) {
            self.close(doc);
            return;
        }
        if shell.send_button == target {
            if doc.attr(shell.send_button, "disabled").is_none() {
                self.submit_input(doc);
            }
            return;
        }
        if shell.input == target {
            doc.set_focus(Some(shell.input));
            return;
        }
        if self.session.is_open
            && self.config.close_on_outside_click
            && !doc.contains(shell.root, target)
        {
            self.close(doc);
        }
    }

    pub fn handle_key(&mut self, doc: &mut Document, key: Key) {
        if self.phase != Phase::Ready {
            return;
        }
        let Some(listener) = self.key_listener else {
            return;
        };
        if !doc.has_listener(listener) {
            return;
        }
        match key {
            Key::Enter => {
                let focused_input = self
                    .shell
                    .as_ref()
                    .map(|shell| doc.focused() == Some(shell.input))
                    .unwrap_or(false);
                if focused_input {
                    self.submit_input(doc);
                }
            }
            Key::Escape => {
                if self.session.is_open && self.config.mode != Mode::Inline {
                    self.close(doc);
                }
            }
            Key::Other => {}
        }
    }

    // ----- theme -----

    /// Re-resolve the design tokens, e.g. after a registry-wide theme
    /// switch.
    pub fn set_theme(&mut self, doc: &mut Document, theme: Theme) {
        self.config.theme = theme;
        if let Some(shell) = &self.shell {
            let tokens = self.tokens(doc);
            doc.set_attr(shell.root, "style", tokens.custom_properties());
        }
    }

    fn tokens(&self, doc: &Document) -> ThemeTokens {
        ThemeTokens::build(
            theme::resolve_theme(self.config.theme, doc.color_scheme()),
            self.config.primary_color.as_deref(),
            self.config.border_radius,
            &self.config.font_family,
        )
    }

    // ----- teardown -----

    /// Detach the subtree and listeners and go inert. In-flight requests
    /// are not cancelled; their completions are dropped because a
    /// destroyed widget no longer polls.
    pub fn destroy(&mut self, doc: &mut Document) {
        if self.phase == Phase::Destroyed {
            tracing::warn!("destroy() on destroyed widget ignored");
            return;
        }
        if let Some(shell) = &self.shell {
            doc.remove(shell.root);
        }
        if let Some(note) = self.error_note.take() {
            doc.remove(note);
        }
        if let Some(link) = self.custom_css_node.take() {
            doc.remove(link);
        }
        if let Some(listener) = self.click_listener.take() {
            doc.remove_listener(listener);
        }
        if let Some(listener) = self.key_listener.take() {
            doc.remove_listener(listener);
        }
        self.timers.clear();
        self.shell = None;
        self.phase = Phase::Destroyed;
        tracing::info!(bot = %self.config.bot_id, "widget destroyed");
        self.fire(doc, Channel::Destroyed, serde_json::Value::Null);
    }

    // ----- error & event funnels -----

    /// Single funnel for every failure: structured log, error channel,
    /// `on_error` hook. The widget never throws into the host page.
    fn report_error(&mut self, doc: &mut Document, err: &dyn std::fmt::Display, fatal: bool) {
        if fatal {
            tracing::error!(bot = %self.config.bot_id, error = %err, "widget error");
        } else {
            tracing::warn!(bot = %self.config.bot_id, error = %err, "widget error");
        }
        self.fire(
            doc,
            Channel::Error,
            serde_json::json!({
                "error": err.to_string(),
                "fatal": fatal,
            }),
        );
    }

    fn fire(&mut self, doc: &mut Document, channel: Channel, data: serde_json::Value) {
        if crate::debug_enabled() {
            tracing::debug!(widget = %self.element_id, channel = ?channel, "event");
        }
        let event = WidgetEvent {
            channel,
            widget: self.element_id.clone(),
            data: data.clone(),
        };
        self.bus.emit(doc, &event);
        if let Some(hook) = self.hooks.hook_for(channel) {
            hook(&data);
        }
    }
}

/// Fixed user-facing text for a failed chat request; the raw error never
/// reaches the transcript.
fn chat_error_text(language: &str) -> &'static str {
    if language.starts_with("de") {
        "Entschuldigung, es ist ein Fehler aufgetreten. Bitte versuchen Sie es erneut."
    } else {
        "Sorry, something went wrong. Please try again."
    }
}

fn init_error_text(language: &str) -> &'static str {
    if language.starts_with("de") {
        "Der Chat ist derzeit nicht verfügbar."
    } else {
        "Chat is currently unavailable."
    }
}
