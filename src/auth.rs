//! Auth-domain models: client credentials, scope sets, token secrets, and the credential record.

pub mod client;
pub mod scope;
pub mod token;

pub use client::*;
pub use scope::*;
pub use token::{record::*, secret::*};
