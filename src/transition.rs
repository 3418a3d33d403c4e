use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use url::Url;

use crate::error::{HookPhase, NavError, NavResult};

pub const DEFAULT_TRANSITION: &str = "default";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HookError(String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// What caused a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger<N> {
    Element(N),
    PopState,
    Load,
    /// Programmatic call through [`crate::nav::Navigator::go`].
    Api,
}

/// Per-phase record handed to hooks and event listeners.
#[derive(Debug, Clone)]
pub struct TransitionContext<N> {
    pub from: Option<N>,
    pub to: Option<N>,
    pub address: Option<Url>,
    pub trigger: Trigger<N>,
    pub leave_cancelled: bool,
}

impl<N> TransitionContext<N> {
    pub fn new(trigger: Trigger<N>) -> Self {
        Self {
            from: None,
            to: None,
            address: None,
            trigger,
            leave_cancelled: false,
        }
    }

    pub fn with_from(mut self, from: N) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: N) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_address(mut self, address: Url) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_leave_cancelled(mut self, leave_cancelled: bool) -> Self {
        self.leave_cancelled = leave_cancelled;
        self
    }
}

pub type HookFuture = LocalBoxFuture<'static, Result<(), HookError>>;
pub type Hook<N> = Rc<dyn Fn(TransitionContext<N>) -> HookFuture>;

fn boxed_hook<N, F, Fut>(hook: F) -> Hook<N>
where
    F: Fn(TransitionContext<N>) -> Fut + 'static,
    Fut: Future<Output = Result<(), HookError>> + 'static,
{
    Rc::new(move |ctx| hook(ctx).boxed_local())
}

/// An enter/leave pair. Either half may be absent until resolution time,
/// where a missing half is reported as an error.
pub struct TransitionSpec<N> {
    enter: Option<Hook<N>>,
    leave: Option<Hook<N>>,
}

impl<N> Default for TransitionSpec<N> {
    fn default() -> Self {
        Self {
            enter: None,
            leave: None,
        }
    }
}

impl<N: 'static> TransitionSpec<N> {
    pub fn new<E, EF, L, LF>(enter: E, leave: L) -> Self
    where
        E: Fn(TransitionContext<N>) -> EF + 'static,
        EF: Future<Output = Result<(), HookError>> + 'static,
        L: Fn(TransitionContext<N>) -> LF + 'static,
        LF: Future<Output = Result<(), HookError>> + 'static,
    {
        Self::default().with_enter(enter).with_leave(leave)
    }

    pub fn with_enter<E, EF>(mut self, enter: E) -> Self
    where
        E: Fn(TransitionContext<N>) -> EF + 'static,
        EF: Future<Output = Result<(), HookError>> + 'static,
    {
        self.enter = Some(boxed_hook(enter));
        self
    }

    pub fn with_leave<L, LF>(mut self, leave: L) -> Self
    where
        L: Fn(TransitionContext<N>) -> LF + 'static,
        LF: Future<Output = Result<(), HookError>> + 'static,
    {
        self.leave = Some(boxed_hook(leave));
        self
    }

    /// Both hooks resolve immediately.
    pub fn instant() -> Self {
        Self::new(
            |_| async { Ok::<(), HookError>(()) },
            |_| async { Ok::<(), HookError>(()) },
        )
    }
}

pub struct ResolvedTransition<N> {
    pub name: String,
    pub enter: Hook<N>,
    pub leave: Hook<N>,
}

impl<N> Clone for ResolvedTransition<N> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            enter: Rc::clone(&self.enter),
            leave: Rc::clone(&self.leave),
        }
    }
}

/// Name → transition table; always holds a `default` entry.
pub struct TransitionRegistry<N> {
    entries: HashMap<String, TransitionSpec<N>>,
}

impl<N> TransitionRegistry<N> {
    pub fn new(default: TransitionSpec<N>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(DEFAULT_TRANSITION.to_string(), default);
        Self { entries }
    }

    pub fn with(mut self, name: impl Into<String>, spec: TransitionSpec<N>) -> Self {
        self.insert(name, spec);
        self
    }

    /// Registers `spec` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, spec: TransitionSpec<N>) {
        self.entries.insert(name.into(), spec);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> NavResult<ResolvedTransition<N>> {
        let spec = self
            .entries
            .get(name)
            .ok_or_else(|| NavError::unknown_transition(name))?;
        let leave = spec
            .leave
            .clone()
            .ok_or_else(|| NavError::missing_hook(name, HookPhase::Leave))?;
        let enter = spec
            .enter
            .clone()
            .ok_or_else(|| NavError::missing_hook(name, HookPhase::Enter))?;
        Ok(ResolvedTransition {
            name: name.to_string(),
            enter,
            leave,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::{
        DEFAULT_TRANSITION, HookError, TransitionContext, TransitionRegistry, TransitionSpec,
        Trigger,
    };
    use crate::error::{ErrorCategory, NavError};

    #[tokio::test]
    async fn resolves_registered_hooks() {
        let entered = Rc::new(Cell::new(0));
        let counter = Rc::clone(&entered);
        let registry = TransitionRegistry::<u32>::new(TransitionSpec::instant()).with(
            "fade",
            TransitionSpec::new(
                move |_| {
                    counter.set(counter.get() + 1);
                    async { Ok::<(), HookError>(()) }
                },
                |_| async { Err::<(), HookError>(HookError::new("boom")) },
            ),
        );

        let fade = registry.resolve("fade").expect("fade should resolve");
        assert_eq!(fade.name, "fade");
        (fade.enter)(TransitionContext::new(Trigger::Load))
            .await
            .expect("enter should succeed");
        assert_eq!(entered.get(), 1);
        let err = (fade.leave)(TransitionContext::new(Trigger::Api))
            .await
            .expect_err("leave should fail");
        assert_eq!(err, HookError::new("boom"));

        assert!(registry.resolve(DEFAULT_TRANSITION).is_ok());
    }

    #[test]
    fn unknown_name_is_a_resolution_error() {
        let registry = TransitionRegistry::<u32>::new(TransitionSpec::instant());
        let err = registry.resolve("slide").err().expect("slide is not registered");
        assert!(matches!(err, NavError::UnknownTransition(ref name) if name == "slide"));
        assert_eq!(err.category(), ErrorCategory::TransitionResolution);
    }

    #[test]
    fn half_registered_transition_fails_resolution() {
        let registry = TransitionRegistry::<u32>::new(TransitionSpec::instant()).with(
            "enter-only",
            TransitionSpec::default().with_enter(|_| async { Ok::<(), HookError>(()) }),
        );
        let err = registry
            .resolve("enter-only")
            .err()
            .expect("leave hook is missing");
        assert_eq!(err.to_string(), "leave missing from transition: enter-only");
    }
}
