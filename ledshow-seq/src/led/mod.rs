//! LED timeline: pattern table and the periodic GPIO writer.

pub mod pattern;
pub mod writer;

pub use pattern::Pattern;
