pub mod submission_gate;

pub use submission_gate::*;
