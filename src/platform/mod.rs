// Fiches - platform/mod.rs
//
// Platform layer: directories, configuration and network I/O.
// Dependencies: standard library, directories, toml, ureq; core and app
// for the types the HTTP backend produces.
// Must NOT depend on: ui.

pub mod config;
pub mod http;
