//! Image processing pipeline components.
//!
//! - **path**: Path predicates shared by the scanner
//! - **discovery**: Expand directory specs into image files
//! - **tracker**: Dependency registration and change detection
//! - **planner**: Resolve target format and dimensions per image
//! - **decode**: Load and decode images from disk
//! - **encode**: Resize and serialize to the target format
//! - **executor**: Per-file stage operations
//! - **stage**: Barrier-separated concurrent stages
//! - **processor**: Orchestrates a full build pass

pub mod decode;
pub mod discovery;
pub mod encode;
pub mod executor;
pub mod path;
pub mod planner;
pub mod processor;
pub mod stage;
pub mod tracker;

// Re-exports for convenient access
pub use decode::ImageDecoder;
pub use discovery::{SourceEntry, SourceExpander};
pub use encode::ImageEncoder;
pub use executor::TransformExecutor;
pub use planner::{FormatOption, TargetSize, TransformOptions, TransformPlan, TransformPlanner};
pub use processor::{Emission, ImagePipeline};
pub use stage::barrier;
pub use tracker::{DependencyTracker, WatchState};
