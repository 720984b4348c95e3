//! Cascade resolution and box-tree structural normalization for paged
//! document output: parse a document and its stylesheets, resolve each
//! box's style, then repair the tree until it satisfies the CSS structural
//! rules a paginator can rely on.

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate cssparser;
#[macro_use]
extern crate log;

pub mod box_tree;
pub mod cascade;
pub mod context;
pub mod css;
pub mod dom;
pub mod errors;
mod misc;
pub mod normalize;
pub mod style;
pub mod value;

pub use crate::box_tree::builder::{generate_box_tree, GenerateResult};
pub use app_units::Au;
