//! Live adapters for real external interactions.

pub mod clock;
pub mod github;
pub mod id_gen;
pub mod settings;
pub mod webhook;
