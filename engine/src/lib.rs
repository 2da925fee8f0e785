// MLM compensation engine
// Placement tree, commission cascade and the ledgers backing them

#![allow(clippy::type_complexity)]
#![allow(clippy::uninlined_format_args)]

extern crate log;

pub mod config;
pub mod core;
pub mod engine;

pub use engine::Engine;
