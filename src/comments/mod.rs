//! Comment Extraction
//!
//! Everything between raw comment tokens and the documentation text a node
//! carries: ordered indexes, category regions, the per-file database and
//! field segmentation.
//!
//! @module comments

pub mod comment;
pub mod database;
pub mod parser;
pub mod range_map;
pub mod sorted;

pub use comment::{Comment, Component, DocString, ParamDoc, Reference};
pub use database::CommentsDatabase;
pub use range_map::RangeMap;
pub use sorted::Sorted;
