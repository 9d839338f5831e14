//! Clinical alert rules evaluated over a patient's recent history.
//!
//! [`AlertEvaluator`] reads a trailing window of records from the shared
//! [`DataStore`](vitals_store::DataStore) and raises [`Alert`](vitals_core::Alert)s.
//! The [`presentation`] module decorates raised alerts for display.

pub mod evaluator;
pub mod presentation;
pub mod rules;

pub use evaluator::{AlertEvaluator, DEFAULT_WINDOW};
pub use presentation::{format_message, Poll, PrioritizedAlert, RepeatSchedule};
