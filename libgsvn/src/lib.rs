#![deny(rust_2018_idioms)]

#[macro_use]
mod macros;

pub mod adapters;
pub mod apply;
pub mod authors;
pub mod cache;
pub mod config;
pub mod delta;
pub mod error;
pub mod fetch;
pub mod io;
pub mod model;
pub mod path;
pub mod protocol;
pub mod push;
pub mod serialize;
pub mod sexpr;
pub mod transport;
