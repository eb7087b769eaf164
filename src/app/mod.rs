// Fiches - app/mod.rs
//
// Application layer: orchestration of filter state, fetches and persistence.
// Dependencies: core layer, util.
// Must NOT depend on: ui, platform specifics.

pub mod backend;
pub mod browser;
pub mod fetch;
pub mod memory_backend;
pub mod persistence;
pub mod store;
