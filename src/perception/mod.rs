pub mod accessibility;
pub mod bounds;
pub mod fingerprint;
pub mod pipeline;
pub mod ranking;
pub mod types;
