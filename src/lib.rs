// Library exports for obesity-dash

pub mod error;
pub mod dataset;
pub mod labels;
pub mod palette;
pub mod chart;
pub mod stats;
pub mod theme;
pub mod context;

// Chart derivation and reactivity
pub mod derive;
pub mod binding;

// Outer surfaces
pub mod render;
pub mod server;
pub mod config;

pub use error::{Error, Result, Warning};
