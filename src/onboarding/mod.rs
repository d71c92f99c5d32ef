//! Onboarding — the five-step wizard and the plan generation it ends in.
//!
//! The wizard accumulates a `UserProfile` one answer at a time. Its terminal
//! transition hands the profile to the `PlanOrchestrator`, which asks the
//! `PlanGenerator` for a `FitnessPlan` and records completion whether or not
//! a plan came back.

pub mod generator;
pub mod model;
pub mod orchestrator;
pub mod progress;
pub mod prompts;
pub mod state;

pub use generator::{LlmPlanGenerator, PlanGenerator};
pub use model::{BirthDate, FitnessPlan, Gender, Goal, Macros, UserProfile, WorkoutFrequency};
pub use orchestrator::{GenerationOutcome, PlanOrchestrator};
pub use progress::{ProgressSnapshot, ProgressTicker};
pub use state::{OnboardingStep, StepOutcome, Wizard};
