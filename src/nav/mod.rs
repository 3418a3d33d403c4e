//! The navigation state machine: idle → leaving → entering → idle, with
//! interruption of in-flight navigations.

mod generation;
mod navigator;
mod request;


pub use navigator::Navigator;
pub use request::{NavOutcome, NavigationRequest, NavigatorOptions};
