//! Built-in plugins and their instantiation from a build graph.

pub mod analyzer;
pub mod compress;
pub mod define;
pub mod hot;
pub mod html;

pub use analyzer::BundleAnalyzerPlugin;
pub use compress::CompressPlugin;
pub use define::DefinePlugin;
pub use hot::{HotReloadPlugin, PolyfillPlugin};
pub use html::HtmlTemplatePlugin;

use super::emit::EmitOptions;
use super::plugin::{PluginContainer, PluginContext};
use crate::env::{json_string, process_env_replacements};
use crate::pipeline::{BuildGraph, EntryModule, PluginSpec};
use std::collections::BTreeMap;

/// Instantiate the plugins `graph` declares, in declaration order.
///
/// `StyleExtract` and `Minify` are carried out by the compiler itself and
/// `ModuleReplacement` only switches the emitted runtime, so none of them
/// contributes a plugin object.
#[must_use]
pub fn from_graph(
    graph: &BuildGraph,
    env: &BTreeMap<String, String>,
) -> (PluginContainer, EmitOptions) {
    let mut container = PluginContainer::new(PluginContext {
        root: graph.root.clone(),
        mode: graph.mode,
        output: graph.output.clone(),
    });
    let mut emit = EmitOptions::default();

    let needs_polyfill = graph
        .entries
        .iter()
        .any(|entry| entry.modules.contains(&EntryModule::Polyfill));
    if needs_polyfill {
        container.add(Box::new(PolyfillPlugin));
    }

    // Explicit constants win over environment-derived replacements.
    let defined: Vec<&String> = graph
        .plugins
        .iter()
        .filter_map(|spec| match spec {
            PluginSpec::Define { constants } => Some(constants.keys()),
            _ => None,
        })
        .flatten()
        .collect();

    for spec in &graph.plugins {
        match spec {
            PluginSpec::ModuleReplacement => emit.module_replacement = true,
            PluginSpec::HotReload { path } => {
                container.add(Box::new(HotReloadPlugin::new(path.clone())));
            }
            PluginSpec::HtmlTemplate { template, filename } => {
                container.add(Box::new(HtmlTemplatePlugin::new(
                    template.clone(),
                    filename.clone(),
                )));
            }
            PluginSpec::DotEnv { .. } => {
                let mut replacements = process_env_replacements(env);
                // Dependencies pick their build by NODE_ENV; the mode decides it.
                replacements.insert(
                    "process.env.NODE_ENV".to_string(),
                    json_string(graph.mode.as_str()),
                );
                replacements.retain(|key, _| !defined.contains(&key));
                container.add(Box::new(DefinePlugin::new("dotenv", replacements)));
            }
            PluginSpec::Define { constants } => {
                container.add(Box::new(DefinePlugin::new("define", constants.clone())));
            }
            PluginSpec::BundleAnalyzer {
                report_filename,
                stats_filename,
            } => {
                container.add(Box::new(BundleAnalyzerPlugin::new(
                    report_filename.clone(),
                    stats_filename.clone(),
                )));
            }
            PluginSpec::Compress {
                algorithm,
                min_ratio_percent,
            } => {
                container.add(Box::new(CompressPlugin::new(*algorithm, *min_ratio_percent)));
            }
            PluginSpec::StyleExtract { .. } | PluginSpec::Minify => {}
        }
    }

    (container, emit)
}
