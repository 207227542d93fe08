//! Scene timing and video compilation pipeline.
//!
//! This crate provides:
//! - Script parsing into scenes
//! - Scene timing allocation against the voiceover length
//! - Image-to-scene alignment with borrow/repeat fallbacks
//! - The compilation orchestrator with scratch-directory lifecycle
//! - Environment-driven configuration and structured logging

pub mod align;
pub mod compiler;
pub mod config;
pub mod error;
pub mod inputs;
pub mod logging;
pub mod script;
pub mod timing;

pub use align::{align, materialize, plan_alignment, AlignmentPlan, PlannedSegment};
pub use compiler::{CompilationRequest, VideoCompiler};
pub use config::CompilerConfig;
pub use error::{CompileError, CompileResult};
pub use logging::CompilationLogger;
pub use script::{parse_script, render_script};
pub use timing::{compute_timings, SceneTimeline, TimingPolicy};
