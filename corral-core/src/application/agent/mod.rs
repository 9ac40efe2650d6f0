//! The loop controller and its per-session budget tracking.

mod errors;
mod governor;
mod input;
mod models;
mod runner;


pub use errors::AgentError;
pub use governor::{BudgetKind, BudgetLimits, BudgetUsage, SafetyGovernor};
pub use input::{ScriptedInput, UserInput};
pub use models::{AgentOptions, SessionOutcome, TerminationReason};
pub use runner::Agent;
