//! Core types, workflows and trait definitions for the onboarding service.
//!
//! This crate is free of HTTP and database dependencies. The status
//! derivation engine in [`status`] is pure; the [`workflow`] functions drive
//! state transitions through the [`store::OnboardingStore`],
//! [`files::FileStorage`] and [`notify::Notifier`] abstractions.

// Trait futures spell out their `Send` bounds explicitly.
#![allow(async_fn_in_trait)]

pub mod actor;
pub mod application;
pub mod document;
pub mod error;
pub mod files;
pub mod notify;
pub mod person;
pub mod status;
pub mod store;
pub mod token;
pub mod workflow;

pub use error::{Error, ErrorKind, Result};
