// Fiches - lib.rs
//
// Library entry point, exposing the filter/search/pagination engine for the
// `fiches` binary and for integration tests.

pub mod app;
pub mod core;
pub mod platform;
pub mod ui;
pub mod util;
