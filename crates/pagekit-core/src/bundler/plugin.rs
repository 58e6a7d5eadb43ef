//! Plugin system for the compiler.
//!
//! Every `PluginSpec` in a build graph is instantiated as a [`Plugin`]. Hooks
//! run in the order the graph lists the plugins.
//!
//! ## Example
//!
//! ```ignore
//! use pagekit_core::bundler::{HookResult, Plugin, PluginContext};
//!
//! struct Banner;
//!
//! impl Plugin for Banner {
//!     fn name(&self) -> &'static str { "banner" }
//!
//!     fn render_chunk(&self, code: &str, _chunk: &ChunkInfo, _ctx: &PluginContext)
//!         -> HookResult<Option<String>> {
//!         Ok(Some(format!("/* built by pagekit */\n{code}")))
//!     }
//! }
//! ```

use crate::artifacts::ArtifactSet;
use crate::codes;
use crate::config::Mode;
use crate::error::CompileError;
use crate::pipeline::OutputNaming;
use std::path::PathBuf;

/// Result type for plugin hooks.
pub type HookResult<T> = Result<T, PluginError>;

/// Error from a plugin.
#[derive(Debug)]
pub struct PluginError {
    /// Plugin name that caused the error.
    pub plugin: &'static str,
    /// Hook that failed.
    pub hook: &'static str,
    /// Error code, for failures with a more specific code than a generic plugin error.
    pub code: &'static str,
    pub message: String,
}

impl PluginError {
    #[must_use]
    pub fn new(plugin: &'static str, hook: &'static str, message: impl Into<String>) -> Self {
        Self {
            plugin,
            hook,
            code: codes::TRANSFORM_PLUGIN_FAILED,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = code;
        self
    }
}

impl std::fmt::Display for PluginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.plugin, self.hook, self.message)
    }
}

impl std::error::Error for PluginError {}

impl From<PluginError> for CompileError {
    fn from(err: PluginError) -> Self {
        CompileError::transform(err.code, err.to_string())
    }
}

/// Context passed to plugin hooks.
#[derive(Debug, Clone)]
pub struct PluginContext {
    /// Project root.
    pub root: PathBuf,
    pub mode: Mode,
    pub output: OutputNaming,
}

/// Chunk information passed to `render_chunk`.
#[derive(Debug, Clone)]
pub struct ChunkInfo {
    pub name: String,
    /// Whether the chunk runs entry modules.
    pub is_entry: bool,
    /// Module ids in this chunk.
    pub modules: Vec<String>,
}

/// The main plugin trait.
///
/// All hooks have default implementations that do nothing, so a plugin only
/// implements the hooks it cares about.
pub trait Plugin: Send + Sync {
    /// Plugin name for debugging and error messages.
    fn name(&self) -> &'static str;

    /// Provide the source of a module by id.
    ///
    /// Return `Some(code)` to handle the module, or `None` to let the next
    /// plugin or the file system handle it.
    fn load(&self, _id: &str, _ctx: &PluginContext) -> HookResult<Option<String>> {
        Ok(None)
    }

    /// Transform the script code of a module after its transformation chain.
    ///
    /// Multiple plugins can transform the same module in sequence.
    fn transform(
        &self,
        _code: &str,
        _id: &str,
        _ctx: &PluginContext,
    ) -> HookResult<Option<String>> {
        Ok(None)
    }

    /// Transform a rendered chunk before minification.
    fn render_chunk(
        &self,
        _code: &str,
        _chunk: &ChunkInfo,
        _ctx: &PluginContext,
    ) -> HookResult<Option<String>> {
        Ok(None)
    }

    /// Add or rewrite output files once every chunk is final.
    fn generate_bundle(&self, _bundle: &mut ArtifactSet, _ctx: &PluginContext) -> HookResult<()> {
        Ok(())
    }
}

/// A container for managing multiple plugins.
pub struct PluginContainer {
    plugins: Vec<Box<dyn Plugin>>,
    ctx: PluginContext,
}

impl PluginContainer {
    #[must_use]
    pub fn new(ctx: PluginContext) -> Self {
        Self {
            plugins: Vec::new(),
            ctx,
        }
    }

    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// Names of the registered plugins, in hook order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Try to load a module through plugins.
    /// Returns None if no plugin handled the load.
    pub fn load(&self, id: &str) -> HookResult<Option<String>> {
        for plugin in &self.plugins {
            if let Some(code) = plugin.load(id, &self.ctx)? {
                return Ok(Some(code));
            }
        }
        Ok(None)
    }

    /// Transform code through all plugins.
    /// Each plugin's output is passed to the next plugin.
    pub fn transform(&self, code: &str, id: &str) -> HookResult<String> {
        let mut current = code.to_string();
        for plugin in &self.plugins {
            if let Some(transformed) = plugin.transform(&current, id, &self.ctx)? {
                current = transformed;
            }
        }
        Ok(current)
    }

    /// Transform a chunk through all plugins.
    pub fn render_chunk(&self, code: &str, chunk: &ChunkInfo) -> HookResult<String> {
        let mut current = code.to_string();
        for plugin in &self.plugins {
            if let Some(transformed) = plugin.render_chunk(&current, chunk, &self.ctx)? {
                current = transformed;
            }
        }
        Ok(current)
    }

    /// Call `generate_bundle` on all plugins.
    pub fn generate_bundle(&self, bundle: &mut ArtifactSet) -> HookResult<()> {
        for plugin in &self.plugins {
            plugin.generate_bundle(bundle, &self.ctx)?;
        }
        Ok(())
    }
}
