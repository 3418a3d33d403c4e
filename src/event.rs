use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use serde::Serialize;

use crate::error::NavError;
use crate::transition::{TransitionContext, Trigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    BeforeLeave,
    AfterLeave,
    BeforeEnter,
    AfterEnter,
    LeaveCancelled,
    EnterCancelled,
    SamePage,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        Self::BeforeLeave,
        Self::AfterLeave,
        Self::BeforeEnter,
        Self::AfterEnter,
        Self::LeaveCancelled,
        Self::EnterCancelled,
        Self::SamePage,
        Self::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeLeave => "beforeLeave",
            Self::AfterLeave => "afterLeave",
            Self::BeforeEnter => "beforeEnter",
            Self::AfterEnter => "afterEnter",
            Self::LeaveCancelled => "leaveCancelled",
            Self::EnterCancelled => "enterCancelled",
            Self::SamePage => "samePage",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub enum LifecycleEvent<N> {
    BeforeLeave(TransitionContext<N>),
    AfterLeave(TransitionContext<N>),
    BeforeEnter(TransitionContext<N>),
    AfterEnter(TransitionContext<N>),
    LeaveCancelled(TransitionContext<N>),
    EnterCancelled(TransitionContext<N>),
    SamePage(TransitionContext<N>),
    Error {
        context: Option<TransitionContext<N>>,
        cause: Rc<NavError>,
    },
}

impl<N> LifecycleEvent<N> {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::BeforeLeave(_) => EventKind::BeforeLeave,
            Self::AfterLeave(_) => EventKind::AfterLeave,
            Self::BeforeEnter(_) => EventKind::BeforeEnter,
            Self::AfterEnter(_) => EventKind::AfterEnter,
            Self::LeaveCancelled(_) => EventKind::LeaveCancelled,
            Self::EnterCancelled(_) => EventKind::EnterCancelled,
            Self::SamePage(_) => EventKind::SamePage,
            Self::Error { .. } => EventKind::Error,
        }
    }

    pub fn context(&self) -> Option<&TransitionContext<N>> {
        match self {
            Self::BeforeLeave(ctx)
            | Self::AfterLeave(ctx)
            | Self::BeforeEnter(ctx)
            | Self::AfterEnter(ctx)
            | Self::LeaveCancelled(ctx)
            | Self::EnterCancelled(ctx)
            | Self::SamePage(ctx) => Some(ctx),
            Self::Error { context, .. } => context.as_ref(),
        }
    }

    pub fn cause(&self) -> Option<&NavError> {
        match self {
            Self::Error { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }

    /// Node-free summary for logs and JSON output.
    pub fn record(&self) -> EventRecord {
        let ctx = self.context();
        EventRecord {
            kind: self.kind(),
            address: ctx
                .and_then(|ctx| ctx.address.as_ref())
                .map(|address| address.to_string()),
            trigger: ctx.map(|ctx| match ctx.trigger {
                Trigger::Element(_) => "element",
                Trigger::PopState => "popstate",
                Trigger::Load => "load",
                Trigger::Api => "api",
            }),
            leave_cancelled: ctx.is_some_and(|ctx| ctx.leave_cancelled),
            error: self.cause().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub leave_cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<N> = Rc<dyn Fn(&LifecycleEvent<N>)>;

/// Synchronous publish/subscribe keyed by [`EventKind`].
///
/// Handlers run in subscription order. A panicking handler is logged and
/// skipped; delivery continues with the next one.
pub struct EventChannel<N> {
    handlers: RefCell<HashMap<EventKind, Vec<(SubscriptionId, Handler<N>)>>>,
    next_id: Cell<u64>,
}

impl<N> Default for EventChannel<N> {
    fn default() -> Self {
        Self {
            handlers: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        }
    }
}

impl<N> EventChannel<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&LifecycleEvent<N>) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(self.next_id.get().saturating_add(1));
        self.handlers
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push((id, Rc::new(handler)));
        id
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        for list in handlers.values_mut() {
            if let Some(index) = list.iter().position(|(candidate, _)| *candidate == id) {
                list.remove(index);
                return true;
            }
        }
        false
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.borrow().get(&kind).map_or(0, Vec::len)
    }

    /// Returns how many handlers completed without panicking.
    pub fn emit(&self, event: LifecycleEvent<N>) -> usize {
        let kind = event.kind();
        // Snapshot so handlers may subscribe or unsubscribe while we dispatch.
        let snapshot: Vec<Handler<N>> = match self.handlers.borrow().get(&kind) {
            Some(list) => list.iter().map(|(_, handler)| Rc::clone(handler)).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for handler in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::warn!(event = kind.as_str(), "event handler panicked"),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use url::Url;

    use super::{EventChannel, EventKind, LifecycleEvent};
    use crate::error::NavError;
    use crate::transition::{TransitionContext, Trigger};

    fn before_leave() -> LifecycleEvent<u32> {
        LifecycleEvent::BeforeLeave(
            TransitionContext::new(Trigger::Api)
                .with_from(1)
                .with_address(Url::parse("https://example.com/b").expect("url should parse")),
        )
    }

    #[test]
    fn delivers_in_subscription_order() {
        let channel = EventChannel::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let seen = Rc::clone(&seen);
            channel.on(EventKind::BeforeLeave, move |_| seen.borrow_mut().push(label));
        }

        assert_eq!(channel.emit(before_leave()), 3);
        assert_eq!(*seen.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn panicking_handler_does_not_block_later_handlers() {
        let channel = EventChannel::<u32>::new();
        let seen = Rc::new(RefCell::new(0));
        channel.on(EventKind::BeforeLeave, |_| panic!("listener bug"));
        let counter = Rc::clone(&seen);
        channel.on(EventKind::BeforeLeave, move |_| *counter.borrow_mut() += 1);

        assert_eq!(channel.emit(before_leave()), 1);
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn events_without_subscribers_are_dropped() {
        let channel = EventChannel::<u32>::new();
        channel.on(EventKind::AfterEnter, |_| {});
        assert_eq!(channel.emit(before_leave()), 0);
        assert_eq!(channel.subscriber_count(EventKind::BeforeLeave), 0);
    }

    #[test]
    fn off_removes_only_that_subscription() {
        let channel = EventChannel::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&seen);
        let first = channel.on(EventKind::BeforeLeave, move |_| a.borrow_mut().push("a"));
        let b = Rc::clone(&seen);
        channel.on(EventKind::BeforeLeave, move |_| b.borrow_mut().push("b"));

        assert!(channel.off(first));
        assert!(!channel.off(first));
        channel.emit(before_leave());
        assert_eq!(*seen.borrow(), vec!["b"]);
    }

    #[test]
    fn record_summarizes_payload() {
        let record = before_leave().record();
        assert_eq!(record.kind, EventKind::BeforeLeave);
        assert_eq!(record.address.as_deref(), Some("https://example.com/b"));
        assert_eq!(record.trigger, Some("api"));

        let error: LifecycleEvent<u32> = LifecycleEvent::Error {
            context: None,
            cause: Rc::new(NavError::unknown_transition("slide")),
        };
        let json = serde_json::to_string(&error.record()).expect("record should serialize");
        assert_eq!(json, r#"{"kind":"error","error":"unknown transition: slide"}"#);
    }
}
