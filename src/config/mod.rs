/// Database configuration and connection management
pub mod database;

/// Program configuration loading from config.toml
pub mod program;

/// Idempotent database seeding from the program configuration
pub mod seed;
