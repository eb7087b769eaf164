// Fiches - ui/mod.rs
//
// UI layer: presentation only.
// Dependencies: app (browser state), core (read-only models).
// Must NOT depend on: platform, direct I/O.

pub mod listing;
