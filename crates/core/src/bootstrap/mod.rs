//! Start-up provisioning of the administrative account

pub mod seeder;

pub use seeder::{AdminCredentials, BootstrapSeeder, SeedOutcome};
