//! Virtual entry modules: runtime polyfills and the live-reload client.
//!
//! The hot client connects to the live-reload channel, reloads the page when
//! a rebuild succeeds and shows an error overlay when it fails.

use crate::bundler::plugin::{HookResult, Plugin, PluginContext};
use crate::env::json_string;
use crate::pipeline::VIRTUAL_PREFIX;

/// Provides `pagekit:hot-client?reload=<bool>`.
pub struct HotReloadPlugin {
    /// Path of the WebSocket endpoint.
    path: String,
}

impl HotReloadPlugin {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    fn is_hot_client(id: &str) -> Option<bool> {
        let rest = id.strip_prefix(VIRTUAL_PREFIX)?.strip_prefix("hot-client")?;
        match rest.strip_prefix('?') {
            None if rest.is_empty() => Some(false),
            None => None,
            Some(query) => Some(
                query
                    .split('&')
                    .any(|pair| pair == "reload=true" || pair == "reload"),
            ),
        }
    }
}

impl Plugin for HotReloadPlugin {
    fn name(&self) -> &'static str {
        "hot-reload"
    }

    fn load(&self, id: &str, _ctx: &PluginContext) -> HookResult<Option<String>> {
        Ok(Self::is_hot_client(id).map(|reload| hot_client_source(&self.path, reload)))
    }
}

/// Provides `pagekit:polyfill`.
pub struct PolyfillPlugin;

impl Plugin for PolyfillPlugin {
    fn name(&self) -> &'static str {
        "polyfill"
    }

    fn load(&self, id: &str, _ctx: &PluginContext) -> HookResult<Option<String>> {
        let polyfill = format!("{VIRTUAL_PREFIX}polyfill");
        Ok((id == polyfill).then(|| POLYFILL_SOURCE.to_string()))
    }
}

const POLYFILL_SOURCE: &str = r#"if (typeof globalThis === "undefined") {
  self.globalThis = self;
}
if (!Object.assign) {
  Object.assign = function (target) {
    for (var i = 1; i < arguments.length; i++) {
      var source = arguments[i];
      if (source != null) {
        for (var key in source) {
          if (Object.prototype.hasOwnProperty.call(source, key)) target[key] = source[key];
        }
      }
    }
    return target;
  };
}
if (!Array.prototype.includes) {
  Array.prototype.includes = function (value) {
    return this.indexOf(value) !== -1;
  };
}
"#;

/// Source of the live-reload client.
#[must_use]
pub fn hot_client_source(path: &str, reload: bool) -> String {
    format!(
        r#"var HOT_PATH = {path};
var HOT_RELOAD = {reload};
var overlay = null;
function hideOverlay() {{
  if (overlay) {{
    overlay.remove();
    overlay = null;
  }}
}}
function showOverlay(errors) {{
  hideOverlay();
  overlay = document.createElement("div");
  overlay.setAttribute("data-pagekit-overlay", "");
  overlay.style.cssText = "position:fixed;inset:0;z-index:2147483647;background:rgba(0,0,0,0.85);color:#ff6b6b;font:14px/1.5 monospace;padding:24px;overflow:auto;white-space:pre-wrap";
  overlay.textContent = "Failed to compile\n\n" + errors.join("\n\n");
  document.body.appendChild(overlay);
}}
function connect() {{
  var protocol = location.protocol === "https:" ? "wss://" : "ws://";
  var socket = new WebSocket(protocol + location.host + HOT_PATH);
  socket.onmessage = function (event) {{
    var message = JSON.parse(event.data);
    if (message.type === "built" && message.valid) {{
      hideOverlay();
      if (HOT_RELOAD) {{
        __pagekit.dispose();
        location.reload();
      }}
    }} else if (message.type === "failed") {{
      showOverlay(message.errors || []);
    }}
  }};
  socket.onclose = function () {{
    setTimeout(connect, 1000);
  }};
}}
connect();
"#,
        path = json_string(path),
    )
}
