//! Application wiring: assembles the gateway's components into one
//! `Services` handle shared across ingress handlers and background tasks.

mod services;

pub use services::Services;
