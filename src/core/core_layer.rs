// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "audit/mod.rs"]
pub mod audit;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "submission/mod.rs"]
pub mod submission;
