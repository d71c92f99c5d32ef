//! fitplan — onboarding-to-plan-generation service.
//!
//! A user answers five onboarding questions, an LLM turns the answers into
//! a daily fitness plan, and the outcome is persisted so the user lands in
//! the main application from then on.

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod onboarding;
pub mod routing;
pub mod store;
