//! Helpers for GraphQL APIs over a document store: type synthesis from field
//! definitions and document schemas, query shaping (selection, populate,
//! pagination) and the operational glue around them.

pub mod attrs;
pub mod compose;
pub mod config;
pub mod connect;
pub mod convert;
pub mod email;
pub mod error;
pub mod fields;
pub mod ir;
pub mod lower;
pub mod pagination;
pub mod path_de;
pub mod populate;
pub mod request;
pub mod scalars;
pub mod sdl;
pub mod selection;
pub mod store;
pub mod synth;
pub mod telemetry;
pub mod walker;

pub use error::{Error, Result};
