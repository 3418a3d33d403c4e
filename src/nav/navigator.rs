use std::cell::RefCell;
use std::rc::Rc;

use futures_util::FutureExt;
use futures_util::future::{self, AbortHandle, AbortRegistration, LocalBoxFuture, Shared};
use url::Url;

use super::generation::GenerationTracker;
use super::request::{NavOutcome, NavigationRequest, NavigationStatus, NavigatorOptions};
use crate::cache::{DocumentCache, cache_key};
use crate::config::MarkerConfig;
use crate::dom::Host;
use crate::error::{DocumentSource, HookPhase, NavError, NavResult};
use crate::event::{EventChannel, EventKind, LifecycleEvent, SubscriptionId};
use crate::input::{ClickDisposition, ClickEvent, classify_click};
use crate::transition::{
    DEFAULT_TRANSITION, Hook, HookError, ResolvedTransition, TransitionContext,
    TransitionRegistry, Trigger,
};
use crate::transport::{FetchError, Fetcher};

#[derive(Clone)]
struct LeaveOutcome {
    document: Result<Option<Rc<str>>, FetchError>,
    left: Result<(), HookError>,
}

type LeaveJoin = Shared<LocalBoxFuture<'static, LeaveOutcome>>;

/// The fetch+leave pair still in flight. Kept while a merged navigation waits
/// on it, so a repeated request for the same address can merge again.
#[derive(Clone)]
struct PendingLeave<N> {
    address: Url,
    from: N,
    transition: String,
    abort: AbortHandle,
    join: LeaveJoin,
}

struct MachineState<N> {
    status: NavigationStatus,
    generations: GenerationTracker,
    pending: Option<PendingLeave<N>>,
    incoming: Option<N>,
    last_completed: Option<Url>,
}

struct EnterPlan<N> {
    root: N,
    from: Option<N>,
    address: Url,
    markup: Rc<str>,
    transition: ResolvedTransition<N>,
    trigger: Trigger<N>,
    leave_cancelled: bool,
}

struct Inner<H: Host> {
    host: Rc<H>,
    registry: TransitionRegistry<H::Node>,
    cache: Rc<DocumentCache>,
    events: EventChannel<H::Node>,
    markers: MarkerConfig,
    root_selector: String,
    page_selector: String,
    state: RefCell<MachineState<H::Node>>,
}

/// Soft-navigation controller for one document.
///
/// Each instance owns its status, cache and subscribers; any number of
/// navigators can coexist. Cloning yields another handle to the same
/// controller, so click handlers can start a navigation while another one is
/// still awaiting.
pub struct Navigator<H: Host> {
    inner: Rc<Inner<H>>,
}

impl<H: Host> Clone for Navigator<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<H: Host> Navigator<H> {
    /// Fails when the live document lacks the page container or content node.
    pub fn new(
        host: Rc<H>,
        fetcher: Rc<dyn Fetcher>,
        options: NavigatorOptions<H::Node>,
    ) -> NavResult<Self> {
        let NavigatorOptions {
            transitions,
            markers,
            credentials,
        } = options;

        let inner = Inner {
            cache: Rc::new(DocumentCache::new(fetcher, credentials)),
            events: EventChannel::new(),
            root_selector: markers.root_selector(),
            page_selector: markers.page_selector(),
            markers,
            registry: transitions,
            state: RefCell::new(MachineState {
                status: NavigationStatus::Idle,
                generations: GenerationTracker::default(),
                pending: None,
                incoming: None,
                last_completed: None,
            }),
            host,
        };

        let root = inner.live_root()?;
        inner.active_page(&root)?;
        inner
            .cache
            .seed(&inner.host.location(), inner.host.serialize_document());

        Ok(Self {
            inner: Rc::new(inner),
        })
    }

    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&LifecycleEvent<H::Node>) + 'static,
    ) -> SubscriptionId {
        self.inner.events.on(kind, handler)
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.inner.events.off(id)
    }

    pub fn host(&self) -> &Rc<H> {
        &self.inner.host
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.inner.cache
    }

    pub fn last_completed(&self) -> Option<Url> {
        self.inner.state.borrow().last_completed.clone()
    }

    pub(crate) fn status(&self) -> NavigationStatus {
        self.inner.state.borrow().status
    }

    /// Programmatic navigation with the `default` transition.
    pub async fn go(&self, address: &str) -> NavOutcome {
        self.navigate(NavigationRequest::new(address)).await
    }

    /// Navigation for a history pop: the session already shows the target.
    pub async fn pop_state(&self) -> NavOutcome {
        let address = self.inner.host.location().to_string();
        self.navigate(NavigationRequest::pop_state(address)).await
    }

    /// Runs one navigation; failures are emitted as `error` events.
    pub async fn navigate(&self, request: NavigationRequest<H::Node>) -> NavOutcome {
        let trigger = request.trigger.clone();
        let address = self.inner.resolve_address(&request.address).ok();
        match self.run(request).await {
            Ok(outcome) => outcome,
            Err(cause) => {
                let mut context = TransitionContext::new(trigger);
                context.address = address;
                self.inner.report(Some(context), cause);
                NavOutcome::Failed
            }
        }
    }

    /// Runs the `default` enter hook for the page that was loaded without
    /// a navigation.
    pub async fn enter_initial(&self) -> NavOutcome {
        match self.run_initial().await {
            Ok(outcome) => outcome,
            Err(cause) => {
                self.inner.report(None, cause);
                NavOutcome::Failed
            }
        }
    }

    /// Classifies a click and, for navigable links, prevents the default
    /// action. Same-page links emit `samePage`; the caller awaits
    /// [`Navigator::navigate`] for [`ClickDisposition::Navigate`].
    pub fn dispatch_click(&self, event: &mut ClickEvent<H::Node>) -> ClickDisposition<H::Node> {
        let inner = &self.inner;
        let disposition = classify_click(
            inner.host.as_ref(),
            &inner.host.location(),
            &inner.markers,
            event,
        );
        match &disposition {
            ClickDisposition::Ignored(reason) => {
                tracing::trace!(?reason, "click ignored");
            }
            ClickDisposition::SamePage { address, link } => {
                event.prevent_default();
                let context = TransitionContext::new(Trigger::Element(link.clone()))
                    .with_address(address.clone());
                inner.events.emit(LifecycleEvent::SamePage(context));
            }
            ClickDisposition::Navigate(_) => event.prevent_default(),
        }
        disposition
    }

    pub async fn click(&self, event: &mut ClickEvent<H::Node>) -> Option<NavOutcome> {
        match self.dispatch_click(event) {
            ClickDisposition::Navigate(request) => Some(self.navigate(request).await),
            _ => None,
        }
    }

    async fn run(&self, request: NavigationRequest<H::Node>) -> NavResult<NavOutcome> {
        let inner = &self.inner;
        let root = inner.live_root()?;
        let from = inner.active_page(&root)?;
        let transition = inner.registry.resolve(&request.transition)?;
        let address = inner.resolve_address(&request.address)?;

        let (generation, merge) = self.interrupt(&address, &from, &request.trigger);
        if let Some(pending) = merge {
            return self
                .merge_into_leave(generation, pending, request, transition, root)
                .await;
        }

        let context = TransitionContext::new(request.trigger.clone())
            .with_from(from.clone())
            .with_address(address.clone());
        let (abort, registration) = AbortHandle::new_pair();
        let join = inner
            .leave_join(
                address.clone(),
                registration,
                Rc::clone(&transition.leave),
                context.clone(),
            )
            .shared();
        {
            let mut state = inner.state.borrow_mut();
            state.status = NavigationStatus::Leaving;
            state.incoming = None;
            state.pending = Some(PendingLeave {
                address: address.clone(),
                from: from.clone(),
                transition: transition.name.clone(),
                abort,
                join: join.clone(),
            });
        }
        tracing::debug!(generation, address = %address, transition = %transition.name, "leaving");
        inner
            .events
            .emit(LifecycleEvent::BeforeLeave(context.clone()));
        if !request.is_pop_state {
            inner.host.push_history(&address);
        }

        let outcome = join.await;
        if !inner.is_current(generation) {
            tracing::debug!(generation, address = %address, "leave superseded");
            return Ok(NavOutcome::Cancelled);
        }
        inner.state.borrow_mut().pending = None;

        let markup = match outcome.document {
            Ok(Some(markup)) => markup,
            Ok(None) => {
                inner.settle(generation);
                return Ok(NavOutcome::Cancelled);
            }
            Err(source) => {
                inner.settle(generation);
                return Err(NavError::transport(address.as_str(), source));
            }
        };
        if let Err(source) = outcome.left {
            inner.settle(generation);
            return Err(NavError::hook(&transition.name, HookPhase::Leave, source));
        }

        inner.events.emit(LifecycleEvent::AfterLeave(context));
        self.enter(
            generation,
            EnterPlan {
                root,
                from: Some(from),
                address,
                markup,
                transition,
                trigger: request.trigger,
                leave_cancelled: false,
            },
        )
        .await
    }

    /// Applies the interruption policy for a new request and takes a fresh
    /// generation. Returns the pending leave when the request targets the
    /// address that leave is already heading to.
    fn interrupt(
        &self,
        address: &Url,
        from: &H::Node,
        trigger: &Trigger<H::Node>,
    ) -> (u64, Option<PendingLeave<H::Node>>) {
        let inner = &self.inner;
        let (previous, generation, merge, incoming) = {
            let mut state = inner.state.borrow_mut();
            let previous = state.status;
            let merge = match state.pending.take() {
                Some(pending) if cache_key(&pending.address) == cache_key(address) => {
                    state.pending = Some(pending.clone());
                    Some(pending)
                }
                Some(pending) => {
                    pending.abort.abort();
                    None
                }
                None => None,
            };
            let generation = state.generations.advance();
            (previous, generation, merge, state.incoming.clone())
        };

        let mut context = TransitionContext::new(trigger.clone())
            .with_from(from.clone())
            .with_address(address.clone());
        match previous {
            NavigationStatus::Idle => {}
            NavigationStatus::Leaving => {
                tracing::debug!(generation, address = %address, merge = merge.is_some(), "leave cancelled");
                inner.events.emit(LifecycleEvent::LeaveCancelled(context));
            }
            NavigationStatus::Entering => {
                tracing::debug!(generation, address = %address, "enter cancelled");
                context.to = incoming;
                inner.events.emit(LifecycleEvent::EnterCancelled(context));
            }
        }
        (generation, merge)
    }

    /// Second request for the destination already being left toward: reuse
    /// the in-flight fetch+leave and run only the enter phase.
    async fn merge_into_leave(
        &self,
        generation: u64,
        pending: PendingLeave<H::Node>,
        request: NavigationRequest<H::Node>,
        transition: ResolvedTransition<H::Node>,
        root: H::Node,
    ) -> NavResult<NavOutcome> {
        let inner = &self.inner;
        inner.state.borrow_mut().status = NavigationStatus::Entering;
        tracing::debug!(generation, address = %pending.address, "merging into pending leave");

        if !request.is_pop_state
            && cache_key(&inner.host.location()) != cache_key(&pending.address)
        {
            inner.host.push_history(&pending.address);
        }

        let outcome = pending.join.await;
        if !inner.is_current(generation) {
            return Ok(NavOutcome::Cancelled);
        }
        inner.state.borrow_mut().pending = None;

        let markup = match outcome.document {
            Ok(Some(markup)) => markup,
            Ok(None) => {
                inner.settle(generation);
                return Ok(NavOutcome::Cancelled);
            }
            Err(source) => {
                inner.settle(generation);
                return Err(NavError::transport(pending.address.as_str(), source));
            }
        };
        if let Err(source) = outcome.left {
            inner.settle(generation);
            return Err(NavError::hook(
                &pending.transition,
                HookPhase::Leave,
                source,
            ));
        }

        self.enter(
            generation,
            EnterPlan {
                root,
                from: Some(pending.from),
                address: pending.address,
                markup,
                transition,
                trigger: request.trigger,
                leave_cancelled: true,
            },
        )
        .await
    }

    async fn enter(&self, generation: u64, plan: EnterPlan<H::Node>) -> NavResult<NavOutcome> {
        let inner = &self.inner;
        let host = inner.host.as_ref();
        inner.state.borrow_mut().status = NavigationStatus::Entering;

        let document = host.parse_document(&plan.markup);
        let source = DocumentSource::Incoming {
            address: plan.address.to_string(),
        };
        let Some(incoming_root) = host.query(&inner.root_selector, Some(&document)) else {
            inner.settle(generation);
            return Err(NavError::missing_container(&inner.root_selector, source));
        };
        let Some(to) = host.query(&inner.page_selector, Some(&incoming_root)) else {
            inner.settle(generation);
            return Err(NavError::missing_container(&inner.page_selector, source));
        };

        if let Some(title) = host.query("title", Some(&document)) {
            let text = host.text_content(&title);
            let text = text.trim();
            if !text.is_empty() {
                host.set_title(text);
            }
        }

        host.append_child(&plan.root, to.clone());
        inner.state.borrow_mut().incoming = Some(to.clone());

        let mut context = TransitionContext::new(plan.trigger)
            .with_to(to)
            .with_address(plan.address.clone())
            .with_leave_cancelled(plan.leave_cancelled);
        context.from = plan.from;

        tracing::debug!(generation, address = %plan.address, "entering");
        inner
            .events
            .emit(LifecycleEvent::BeforeEnter(context.clone()));
        let entered = (plan.transition.enter)(context.clone()).await;
        if !inner.is_current(generation) {
            tracing::debug!(generation, address = %plan.address, "enter superseded");
            return Ok(NavOutcome::Cancelled);
        }
        if let Err(source) = entered {
            inner.settle(generation);
            return Err(NavError::hook(
                &plan.transition.name,
                HookPhase::Enter,
                source,
            ));
        }

        inner.events.emit(LifecycleEvent::AfterEnter(context));
        {
            let mut state = inner.state.borrow_mut();
            state.status = NavigationStatus::Idle;
            state.incoming = None;
            state.last_completed = Some(plan.address);
        }
        Ok(NavOutcome::Completed)
    }

    async fn run_initial(&self) -> NavResult<NavOutcome> {
        let inner = &self.inner;
        let root = inner.live_root()?;
        let page = inner.active_page(&root)?;
        let transition = inner.registry.resolve(DEFAULT_TRANSITION)?;

        let generation = {
            let mut state = inner.state.borrow_mut();
            state.status = NavigationStatus::Entering;
            state.incoming = Some(page.clone());
            state.generations.advance()
        };
        let context = TransitionContext::new(Trigger::Load)
            .with_to(page)
            .with_address(inner.host.location());

        let entered = (transition.enter)(context).await;
        if !inner.is_current(generation) {
            return Ok(NavOutcome::Cancelled);
        }
        inner.settle(generation);
        entered
            .map(|()| NavOutcome::Completed)
            .map_err(|source| NavError::hook(DEFAULT_TRANSITION, HookPhase::Enter, source))
    }
}

impl<H: Host> Inner<H> {
    fn live_root(&self) -> NavResult<H::Node> {
        self.host
            .query(&self.root_selector, None)
            .ok_or_else(|| NavError::missing_container(&self.root_selector, DocumentSource::Live))
    }

    /// The most recently attached content node inside the container.
    fn active_page(&self, root: &H::Node) -> NavResult<H::Node> {
        self.host
            .query_all(&self.page_selector, Some(root))
            .pop()
            .ok_or_else(|| NavError::missing_container(&self.page_selector, DocumentSource::Live))
    }

    fn resolve_address(&self, address: &str) -> NavResult<Url> {
        self.host
            .location()
            .join(address)
            .map_err(|source| NavError::invalid_address(address, source))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.borrow().generations.is_current(generation)
    }

    /// Returns to idle, unless a newer navigation already owns the state.
    fn settle(&self, generation: u64) {
        let mut state = self.state.borrow_mut();
        if state.generations.is_current(generation) {
            state.status = NavigationStatus::Idle;
            state.pending = None;
            state.incoming = None;
        }
    }

    fn leave_join(
        &self,
        address: Url,
        registration: AbortRegistration,
        leave: Hook<H::Node>,
        context: TransitionContext<H::Node>,
    ) -> LocalBoxFuture<'static, LeaveOutcome> {
        let cache = Rc::clone(&self.cache);
        async move {
            let (document, left) =
                future::join(cache.get(&address, registration), leave(context)).await;
            LeaveOutcome { document, left }
        }
        .boxed_local()
    }

    fn report(&self, context: Option<TransitionContext<H::Node>>, cause: NavError) {
        tracing::warn!(category = ?cause.category(), "navigation failed: {cause}");
        self.events.emit(LifecycleEvent::Error {
            context,
            cause: Rc::new(cause),
        });
    }
}
