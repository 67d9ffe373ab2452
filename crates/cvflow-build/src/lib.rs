//! cvflow Docker Image Build functionality
//!
//! This crate provides Docker image build capabilities for cvflow,
//! including build context resolution and archiving, image building,
//! and interpretation of the engine's build status stream.

pub mod builder;
pub mod context;
pub mod error;
pub mod progress;
pub mod resolver;
pub mod status;

pub use builder::{BuildRequest, ImageBuilder, compose_build_args};
pub use context::ContextBuilder;
pub use error::{BuildError, BuildResult};
pub use progress::{format_bytes, interpret_build_output, render_status};
pub use resolver::BuildResolver;
pub use status::{Progress, StatusRecord};
