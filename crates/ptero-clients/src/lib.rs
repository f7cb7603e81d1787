//! Outbound HTTP clients for the services this workflow core coordinates
//! with: the Petri-net engine, the shell-command executor ("fork"), and
//! webhook subscribers.

pub mod config;
pub mod fork;
pub mod petri;
pub mod webhook;

pub use config::ClientsConfig;
pub use fork::ForkClient;
pub use petri::PetriClient;
pub use webhook::WebhookClient;
