//! Configuration types for spawning a program under a pty.
//!
//! [`PtyConfig`] controls how the child is started and [`WindowSize`]
//! carries terminal geometry.

use std::collections::HashMap;
use std::ffi::OsString;

/// Configuration for spawning a child in a new pty.
///
/// # Example
///
/// ```
/// use cmdplay_pty::PtyConfig;
///
/// let config = PtyConfig::builder()
///     .env("TERM", "xterm-256color")
///     .window_size(120, 40)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Variables set on top of the inherited environment.
    pub env: HashMap<OsString, OsString>,

    /// Window size applied to the pty before the child starts.
    pub window_size: WindowSize,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            env: HashMap::new(),
            window_size: WindowSize::default(),
        }
    }
}

impl PtyConfig {
    /// Create a new builder for `PtyConfig`.
    #[must_use]
    pub fn builder() -> PtyConfigBuilder {
        PtyConfigBuilder::default()
    }

    /// The environment the child will see: the parent's variables with
    /// [`env`](Self::env) layered on top.
    #[must_use]
    pub fn effective_env(&self) -> HashMap<OsString, OsString> {
        let mut env: HashMap<OsString, OsString> = std::env::vars_os().collect();
        env.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }
}

/// Builder for [`PtyConfig`].
#[derive(Debug, Clone, Default)]
pub struct PtyConfigBuilder {
    config: PtyConfig,
}

impl PtyConfigBuilder {
    /// Set an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.config.env.insert(key.into(), value.into());
        self
    }

    /// Set the initial window size.
    #[must_use]
    pub const fn window_size(mut self, cols: u16, rows: u16) -> Self {
        self.config.window_size = WindowSize::new(cols, rows);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> PtyConfig {
        self.config
    }
}

/// Terminal window geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    /// Number of columns (characters per line).
    pub cols: u16,
    /// Number of rows (lines).
    pub rows: u16,
    /// Pixel width, 0 when unknown.
    pub xpixel: u16,
    /// Pixel height, 0 when unknown.
    pub ypixel: u16,
}

impl WindowSize {
    /// Create a window size without pixel dimensions.
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            xpixel: 0,
            ypixel: 0,
        }
    }

    /// Create a window size with pixel dimensions.
    #[must_use]
    pub const fn with_pixels(cols: u16, rows: u16, xpixel: u16, ypixel: u16) -> Self {
        Self {
            cols,
            rows,
            xpixel,
            ypixel,
        }
    }

    /// A zero-sized window is what a detached or unconfigured terminal
    /// reports; applying it would squash the shell to nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = PtyConfig::builder()
            .env("FOO", "bar")
            .window_size(120, 40)
            .build();

        assert_eq!(config.window_size, WindowSize::new(120, 40));
        assert!(config.env.contains_key(&OsString::from("FOO")));
    }

    #[test]
    fn effective_env_layers_overrides() {
        let config = PtyConfig::builder().env("TERM", "cmdplay-test").build();

        let env = config.effective_env();
        assert_eq!(env.get(&OsString::from("TERM")), Some(&OsString::from("cmdplay-test")));
        if let Some(path) = std::env::var_os("PATH") {
            assert_eq!(env.get(&OsString::from("PATH")), Some(&path));
        }
    }

    #[test]
    fn window_size_empty() {
        assert!(WindowSize::new(0, 24).is_empty());
        assert!(WindowSize::new(80, 0).is_empty());
        assert!(!WindowSize::default().is_empty());
    }

    #[test]
    fn window_size_with_pixels() {
        let size = WindowSize::with_pixels(100, 30, 800, 600);
        assert_eq!((size.xpixel, size.ypixel), (800, 600));
    }
}
