// Core moderation module - rule engine, external classifier and the hybrid
// pipeline that combines them.

pub mod ai_classifier;
pub mod moderation_models;
pub mod moderation_service;
pub mod rule_engine;

pub use ai_classifier::*;
pub use moderation_models::*;
pub use moderation_service::*;
pub use rule_engine::*;
