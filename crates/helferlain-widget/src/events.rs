//! Typed lifecycle event system.
//!
//! Every lifecycle transition is dispatched twice: to in-process
//! subscribers on the [`EventBus`], and bridged onto the host document's
//! native event log under the `helferlain:` namespace. Caller hooks in
//! [`WidgetHooks`] are invoked by the widget alongside the bus.

use helferlain_view::Document;
use serde_json::Value;

/// Named event channels of the widget lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Initialized,
    Open,
    Close,
    Message,
    Response,
    Error,
    Destroyed,
}

impl Channel {
    /// Name of the bridged custom event on the host document.
    pub fn dom_name(self) -> &'static str {
        match self {
            Channel::Initialized => "helferlain:initialized",
            Channel::Open => "helferlain:open",
            Channel::Close => "helferlain:close",
            Channel::Message => "helferlain:message",
            Channel::Response => "helferlain:response",
            Channel::Error => "helferlain:error",
            Channel::Destroyed => "helferlain:destroyed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WidgetEvent {
    pub channel: Channel,
    /// Element id of the emitting widget.
    pub widget: String,
    pub data: Value,
}

type Subscriber = Box<dyn FnMut(&WidgetEvent)>;

/// In-process subscription side of the event system.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(Option<Channel>, Subscriber)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one channel, or to all with `None`.
    pub fn subscribe(
        &mut self,
        channel: Option<Channel>,
        subscriber: impl FnMut(&WidgetEvent) + 'static,
    ) {
        self.subscribers.push((channel, Box::new(subscriber)));
    }

    /// Deliver to subscribers and re-emit on the host document.
    pub fn emit(&mut self, doc: &mut Document, event: &WidgetEvent) {
        for (filter, subscriber) in &mut self.subscribers {
            if filter.is_none() || *filter == Some(event.channel) {
                subscriber(event);
            }
        }
        doc.dispatch_custom_event(
            event.channel.dom_name(),
            serde_json::json!({
                "widget": event.widget,
                "data": event.data,
            }),
        );
    }
}

/// Document-level key events routed to widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Other,
}

pub type Hook = Box<dyn FnMut(&Value)>;

/// Caller-supplied lifecycle callbacks. These mirror the event channels;
/// they live outside [`helferlain_config::WidgetConfig`] because config
/// stays plain data.
#[derive(Default)]
pub struct WidgetHooks {
    pub on_initialized: Option<Hook>,
    pub on_open: Option<Hook>,
    pub on_close: Option<Hook>,
    pub on_message: Option<Hook>,
    pub on_response: Option<Hook>,
    pub on_error: Option<Hook>,
    pub on_destroyed: Option<Hook>,
    /// Outcome of an email/contact escalation prompt.
    pub on_escalation: Option<Hook>,
}

impl WidgetHooks {
    pub fn hook_for(&mut self, channel: Channel) -> Option<&mut Hook> {
        match channel {
            Channel::Initialized => self.on_initialized.as_mut(),
            Channel::Open => self.on_open.as_mut(),
            Channel::Close => self.on_close.as_mut(),
            Channel::Message => self.on_message.as_mut(),
            Channel::Response => self.on_response.as_mut(),
            Channel::Error => self.on_error.as_mut(),
            Channel::Destroyed => self.on_destroyed.as_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emit_reaches_matching_subscribers_and_document() {
        let mut doc = Document::new();
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen_open = seen.clone();
        bus.subscribe(Some(Channel::Open), move |event| {
            seen_open.borrow_mut().push(event.channel);
        });
        let seen_all = seen.clone();
        bus.subscribe(None, move |event| {
            seen_all.borrow_mut().push(event.channel);
        });

        bus.emit(
            &mut doc,
            &WidgetEvent {
                channel: Channel::Open,
                widget: "helferlain-widget-abc".into(),
                data: Value::Null,
            },
        );
        bus.emit(
            &mut doc,
            &WidgetEvent {
                channel: Channel::Close,
                widget: "helferlain-widget-abc".into(),
                data: Value::Null,
            },
        );

        assert_eq!(
            *seen.borrow(),
            vec![Channel::Open, Channel::Open, Channel::Close]
        );
        assert_eq!(doc.events_named("helferlain:open"), 1);
        assert_eq!(doc.events_named("helferlain:close"), 1);
    }

    #[test]
    fn bridged_event_carries_widget_detail() {
        let mut doc = Document::new();
        let mut bus = EventBus::new();
        bus.emit(
            &mut doc,
            &WidgetEvent {
                channel: Channel::Initialized,
                widget: "helferlain-widget-xyz".into(),
                data: serde_json::json!({"sessionId": "s1"}),
            },
        );

        let event = &doc.events()[0];
        assert_eq!(event.name, "helferlain:initialized");
        assert_eq!(event.detail["widget"], "helferlain-widget-xyz");
        assert_eq!(event.detail["data"]["sessionId"], "s1");
    }
}
