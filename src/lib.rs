//! Generate typed models and fluent builders for Rust, Python and
//! TypeScript from a language-neutral schema.
//!
//! The pipeline: [`schema`] documents are lowered by [`lower`] into the
//! [`ir`] model, [`builders`] derives one builder per struct, [`veneers`]
//! reshapes those builders, and the [`jennies`] render every target.
pub mod builders;
pub mod cli;
pub mod encoder;
pub mod error;
pub mod ir;
pub mod jennies;
pub mod lower;
pub mod naming;
pub mod path_de;
pub mod runtime;
pub mod schema;
pub mod veneers;

pub use encoder::{Encoder, EncoderConfig};
pub use error::{GenError, Result};
pub use jennies::{generate, Files, GenerateConfig};
pub use naming::Target;
