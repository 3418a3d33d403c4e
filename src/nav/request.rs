use crate::config::{Config, MarkerConfig};
use crate::transition::{DEFAULT_TRANSITION, TransitionRegistry, Trigger};
use crate::transport::Credentials;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NavigationStatus {
    Idle,
    Leaving,
    Entering,
}

/// How a single navigation ended, from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Completed,
    /// Superseded by a later navigation, or its fetch was aborted.
    Cancelled,
    /// Reported through the `error` event.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest<N> {
    pub address: String,
    pub is_pop_state: bool,
    pub transition: String,
    pub trigger: Trigger<N>,
}

impl<N> NavigationRequest<N> {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            is_pop_state: false,
            transition: DEFAULT_TRANSITION.to_string(),
            trigger: Trigger::Api,
        }
    }

    pub fn pop_state(address: impl Into<String>) -> Self {
        Self {
            is_pop_state: true,
            trigger: Trigger::PopState,
            ..Self::new(address)
        }
    }

    pub fn with_transition(mut self, transition: impl Into<String>) -> Self {
        self.transition = transition.into();
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger<N>) -> Self {
        self.trigger = trigger;
        self
    }
}

pub struct NavigatorOptions<N> {
    pub transitions: TransitionRegistry<N>,
    pub markers: MarkerConfig,
    pub credentials: Credentials,
}

impl<N> NavigatorOptions<N> {
    pub fn new(transitions: TransitionRegistry<N>) -> Self {
        Self {
            transitions,
            markers: MarkerConfig::default(),
            credentials: Credentials::default(),
        }
    }

    pub fn from_config(transitions: TransitionRegistry<N>, config: &Config) -> Self {
        Self {
            transitions,
            markers: config.markers.clone(),
            credentials: config.fetch.credentials,
        }
    }
}
