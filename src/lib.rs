//! Decomposes scenario data files into a YAML manifest plus one side-car
//! file per code-bearing record, and composes them back.

pub mod cli;
pub mod codec;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod record;

pub use error::{Error, Result};
