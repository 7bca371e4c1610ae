pub mod config;
pub mod flat;
pub mod instrument;
pub mod nested;
