#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Core of pagekit.
//!
//! A `ModeConfig` collected once at process start feeds the pipeline builder,
//! which assembles a declarative `BuildGraph` from the transformation-chain
//! registry and the mode policy. The `Compiler` executes that graph into an
//! immutable `ArtifactSet`; in development the `BuildService` keeps the
//! compiler resident and republishes snapshots as sources change.

pub mod artifacts;
pub mod bundler;
pub mod codes;
pub mod compiler;
pub mod config;
pub mod css;
pub mod dev;
pub mod env;
pub mod error;
pub mod pipeline;
pub mod version;

pub use artifacts::{Artifact, ArtifactSet, ChunkArtifact};
pub use bundler::Compiler;
pub use config::{Mode, ModeConfig, DEFAULT_PORT};
pub use dev::{BuildService, RebuildEvent};
pub use error::{CompileError, ConfigError};
pub use pipeline::{build, BuildGraph};
pub use version::VERSION;
