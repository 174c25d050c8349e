//! Generated Rust code for the dashboard fixture, compiled as a normal
//! crate so the tests can exercise real builders.
#![allow(dead_code, clippy::all)]

include!(concat!(env!("OUT_DIR"), "/generated.rs"));
