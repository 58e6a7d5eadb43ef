//! Pipeline composition: registry, mode policy, and the builder that turns
//! a `ModeConfig` into a `BuildGraph`.

pub mod builder;
pub mod graph;
pub mod policy;
pub mod registry;

pub use builder::{build, define_constants, APP_ENTRY, HOT_RELOAD_PATH, HTML_TEMPLATE};
pub use graph::{
    BuildGraph, CacheGroup, ChunkSelection, DevServerOptions, Entry, EntryModule, Minimizer,
    OptimizationPolicy, OutputNaming, PluginSpec, ResolveOptions, SplitChunks, VIRTUAL_PREFIX,
};
pub use policy::{Compressor, ModePolicy, StyleHandling};
pub use registry::{chain_for, Classification, FileCategory, Stage, TransformChain, TransformRule};
