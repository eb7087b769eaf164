// Fiches - core/mod.rs
//
// Core business logic layer.
// Dependencies: standard library, serde, chrono.
// Must NOT depend on: ui, platform, app, or any I/O crate directly.

pub mod accumulator;
pub mod debounce;
pub mod filter;
pub mod model;
pub mod persisted;
pub mod planner;
pub mod wire;
