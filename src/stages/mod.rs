//! File-system curation stages.
//!
//! Each stage walks one directory of the dataset, rewrites or removes files,
//! and returns a small summary. Stages share no state; they only see the
//! files the previous stage left behind.

pub mod captions;
pub mod copy;
pub mod manifest;
pub mod prune;
pub mod tags;
pub mod whitespace;
