//! Pipeline builder: `ModeConfig` in, `BuildGraph` out.

use super::graph::{
    BuildGraph, CacheGroup, ChunkSelection, DevServerOptions, Entry, EntryModule, Minimizer,
    OptimizationPolicy, OutputNaming, PluginSpec, ResolveOptions, SplitChunks,
};
use super::policy::{ModePolicy, StyleHandling};
use super::registry;
use crate::config::ModeConfig;
use crate::env::json_string;
use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Application entry, relative to the project root.
pub const APP_ENTRY: &str = "src/index.tsx";

/// Entry document template, relative to the project root.
pub const HTML_TEMPLATE: &str = "public/index.html";

/// Path of the live-reload channel.
pub const HOT_RELOAD_PATH: &str = "/__hmr";

/// Release identifier baked into bundles as `VERSION`.
pub const RELEASE_VERSION: &str = "5fa3b9";

/// Assemble the build graph for `config`.
///
/// Pure: the same config always yields the same graph. Fails when the port
/// required by the define constants is missing in production or when the
/// rule table is inconsistent.
pub fn build(config: &ModeConfig) -> Result<BuildGraph, ConfigError> {
    let policy = ModePolicy::for_mode(config.mode);
    let port = config.required_port()?;

    let rules = registry::rules_for(config.mode)?;
    registry::validate(&rules)?;

    let entries = vec![Entry {
        name: "main".to_string(),
        modules: entry_modules(policy),
    }];
    if entries.iter().any(|e| e.modules.is_empty()) {
        return Err(ConfigError::NoEntry);
    }

    if config.mode.is_production() {
        tracing::warn!("PRODUCTION is defined as false in production builds");
    }

    let output = OutputNaming::default();
    let plugins = plugins(config, policy, &output, port);

    Ok(BuildGraph {
        mode: config.mode,
        root: config.root.clone(),
        entries,
        output,
        rules,
        plugins,
        optimization: optimization(policy),
        source_maps: policy.source_maps,
        resolve: resolve_options(),
        dev_server: DevServerOptions {
            static_dir: PathBuf::from("dist"),
            port: config.listen_port(),
            hot: policy.live_reload,
            history_api_fallback: true,
        },
    })
}

fn entry_modules(policy: &ModePolicy) -> Vec<EntryModule> {
    let mut modules = Vec::new();
    if policy.live_reload {
        modules.push(EntryModule::Polyfill);
        modules.push(EntryModule::HotClient { reload: true });
    }
    modules.push(EntryModule::App {
        path: PathBuf::from(APP_ENTRY),
    });
    modules
}

/// Compile-time constants shared by both modes.
#[must_use]
pub fn define_constants(port: u16) -> BTreeMap<String, String> {
    let mut constants = BTreeMap::new();
    // False in both modes, production included.
    constants.insert("PRODUCTION".to_string(), "false".to_string());
    constants.insert("VERSION".to_string(), json_string(RELEASE_VERSION));
    constants.insert("BROWSER_SUPPORTS_HTML5".to_string(), "true".to_string());
    constants.insert("TWO".to_string(), "1+1".to_string());
    constants.insert("typeof window".to_string(), json_string("object"));
    constants.insert("process.env.PORT".to_string(), json_string(&port.to_string()));
    constants
}

fn plugins(
    config: &ModeConfig,
    policy: &ModePolicy,
    output: &OutputNaming,
    port: u16,
) -> Vec<PluginSpec> {
    let mut plugins = Vec::new();

    if policy.module_replacement {
        plugins.push(PluginSpec::ModuleReplacement);
    }
    if policy.live_reload {
        plugins.push(PluginSpec::HotReload {
            path: HOT_RELOAD_PATH.to_string(),
        });
    }

    plugins.push(PluginSpec::HtmlTemplate {
        template: PathBuf::from(HTML_TEMPLATE),
        filename: "index.html".to_string(),
    });
    if policy.style_handling == StyleHandling::Extract {
        plugins.push(PluginSpec::StyleExtract {
            filename: output.style_filename.clone(),
        });
    }
    plugins.push(PluginSpec::DotEnv {
        safe: true,
        allow_empty_values: true,
        system_vars: true,
    });
    plugins.push(PluginSpec::Define {
        constants: define_constants(port),
    });

    if policy.analyzer_enabled(config) {
        plugins.push(PluginSpec::BundleAnalyzer {
            report_filename: "bundle-report.html".to_string(),
            stats_filename: "stats.json".to_string(),
        });
    }
    if policy.minimize {
        plugins.push(PluginSpec::Minify);
    }
    for &algorithm in policy.compressors {
        plugins.push(PluginSpec::Compress {
            algorithm,
            min_ratio_percent: 80,
        });
    }

    plugins
}

fn optimization(policy: &ModePolicy) -> OptimizationPolicy {
    let mut minimizers = vec![Minimizer::Script, Minimizer::CssOptimize];
    if policy.minimize {
        minimizers.push(Minimizer::CssMinimize);
    }

    OptimizationPolicy {
        split_chunks: SplitChunks {
            chunks: ChunkSelection::All,
            cache_groups: vec![CacheGroup {
                name: "vendor".to_string(),
                chunks: ChunkSelection::Initial,
                min_chunks: 2,
            }],
        },
        minimize: policy.minimize,
        minimizers,
    }
}

fn resolve_options() -> ResolveOptions {
    let mut alias = BTreeMap::new();
    alias.insert("~".to_string(), PathBuf::from("src"));
    ResolveOptions {
        extensions: [".ts", ".tsx", ".js", ".jsx", ".scss"]
            .into_iter()
            .map(String::from)
            .collect(),
        alias,
    }
}
