//! Token secrets and the lock-protected credential record.

pub mod record;
pub mod secret;
