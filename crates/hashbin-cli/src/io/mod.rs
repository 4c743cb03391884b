pub mod export;
pub mod keys;
pub mod targets;
