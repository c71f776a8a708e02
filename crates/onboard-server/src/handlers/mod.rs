//! Route handlers, grouped by caller.

pub mod documents;
pub mod hr;
pub mod me;
pub mod registration;
pub mod templates;
