pub mod behavior;
pub mod fingerprint;
pub mod user_agent;
