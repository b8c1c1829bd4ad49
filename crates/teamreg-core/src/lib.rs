// Library root: re-exports all modules so integration tests and the HTTP
// client crate can access the registration engine's public API.

pub mod api;
pub mod config;
pub mod error;
pub mod form;
pub mod invitation;
pub mod outcome;
pub mod photo;
pub mod roster;
pub mod session;
pub mod submission;
pub mod team;
pub mod validation;

pub use error::RegistrationError;
pub use form::{FormMode, RegistrationForm, Submitted};
