//! Field-copy code generator.
//!
//! Conversion functions between structs are declared as methods of an annotated trait. Each
//! method's directive lines are parsed into a [MethodSpec](directive::MethodSpec), every
//! destination field is matched against the source struct into an
//! [AssignmentPlan](plan::AssignmentPlan), and plans are rendered as Rust functions.

#[macro_use]
extern crate derive_more;
#[macro_use]
extern crate derive_new;
#[macro_use]
extern crate quote;

pub mod catalog;
pub mod diagnostic;
pub mod directive;
pub mod error;
pub mod generator;
pub mod plan;

pub use error::{Error, Result};
