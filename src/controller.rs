/// Scheduled reminder sweep, gated by a shared secret
pub mod cron;
/// Lead capture and completion endpoints
pub mod leads;
