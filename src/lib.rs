#![allow(clippy::bool_assert_comparison)]

mod bound;
mod config;
mod error;
mod evolve;
mod field;
mod iter;
mod read;
mod rule;
mod world;
mod write;

pub use bound::Bounds;
pub use ca_formats;
pub use config::Config;
pub use error::Error;
pub use field::{field_bounds, make_center};
pub use read::{Format, Metadata, Pattern};
pub use rule::Rule;
pub use world::{World, MAX_LEVEL, MAX_STEP};
