//! Request intake and the approval state machine.
//!
//! `pending -> approved | declined`, both terminal. Everything here talks
//! to storage through [`crate::store::Store`] only.

pub mod approval;
pub mod errors;
pub mod intake;
pub mod summary;

pub use approval::{Decision, RequestSnapshot, decide, fetch_for_review};
pub use errors::{IntakeError, ValidationError, WorkflowError};
pub use intake::{Submission, submit};
