//! HTML → OTSL building blocks.
//!
//! - [`normalize`]: reshape table HTML and record captions
//! - [`structurer`]: external structure recogniser seam
//! - [`bridge`]: Python script driving the default recogniser
//! - [`postprocess`]: clean and caption the emitted sequences

pub mod bridge;
pub mod normalize;
pub mod postprocess;
pub mod structurer;
