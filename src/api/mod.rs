//! HTTP surface — lets a client drive sign-in, the onboarding wizard and
//! plan retrieval over JSON.

pub mod routes;
pub mod session;

pub use routes::{AppState, api_routes};
pub use session::{SessionRegistry, StepAnswer, WizardSnapshot};
