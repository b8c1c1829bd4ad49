// HTTP transport and tracing setup for the registration engine.

pub mod client;
pub mod telemetry;

pub use client::HttpLeagueApi;
pub use telemetry::init_tracing;
