//! Clipboard gateway
//!
//! Scoped read/clear access to the shared system clipboard. The pipeline
//! clears it before opening the target app and reads it after the tap.
//!
//! Backends:
//! - wayland - wl-paste / wl-copy (wl-clipboard)
//! - x11 - xclip

pub mod wayland;
pub mod x11;

use crate::config::{ClipboardBackend, ClipboardConfig};
use crate::error::ClipboardError;
use std::sync::Arc;

/// Trait for clipboard access implementations
#[async_trait::async_trait]
pub trait ClipboardGateway: Send + Sync {
    /// Replace the clipboard contents with nothing
    async fn clear(&self) -> Result<(), ClipboardError>;

    /// Read the clipboard as text. An empty clipboard reads as "".
    async fn read(&self) -> Result<String, ClipboardError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Pick a backend, resolving `auto` from the session environment
pub fn resolve_backend(backend: ClipboardBackend) -> ClipboardBackend {
    match backend {
        ClipboardBackend::Auto => {
            if std::env::var_os("WAYLAND_DISPLAY").is_some() {
                ClipboardBackend::Wayland
            } else {
                ClipboardBackend::X11
            }
        }
        other => other,
    }
}

/// Factory function that returns the configured clipboard gateway
pub fn create_gateway(config: &ClipboardConfig) -> Arc<dyn ClipboardGateway> {
    match resolve_backend(config.backend) {
        ClipboardBackend::X11 => Arc::new(x11::X11Clipboard::new()),
        _ => Arc::new(wayland::WaylandClipboard::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_backend_is_kept() {
        assert_eq!(resolve_backend(ClipboardBackend::X11), ClipboardBackend::X11);
        assert_eq!(
            resolve_backend(ClipboardBackend::Wayland),
            ClipboardBackend::Wayland
        );
    }

    #[test]
    fn test_auto_resolves_to_concrete_backend() {
        assert_ne!(resolve_backend(ClipboardBackend::Auto), ClipboardBackend::Auto);
    }

    #[test]
    fn test_factory_names() {
        let config = ClipboardConfig {
            backend: ClipboardBackend::X11,
        };
        assert_eq!(create_gateway(&config).name(), "clipboard (xclip)");

        let config = ClipboardConfig {
            backend: ClipboardBackend::Wayland,
        };
        assert_eq!(create_gateway(&config).name(), "clipboard (wl-clipboard)");
    }
}
