use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::renderer::pool;

const MAX_RENDER_THREADS: usize = 32;

static LOG_GL_STATE_CHANGES: AtomicBool = AtomicBool::new(false);
static SMOOTH_LIGHTING: AtomicBool = AtomicBool::new(true);

/// Whether attribute binding calls are traced.
pub fn log_gl_state_changes() -> bool {
    LOG_GL_STATE_CHANGES.load(Ordering::Relaxed)
}

/// Whether quads whose material allows it get smooth (AO) lighting.
pub fn smooth_lighting() -> bool {
    SMOOTH_LIGHTING.load(Ordering::Relaxed)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default)]
    pub log_gl_state_changes: bool,
    #[serde(default = "default_smooth_lighting")]
    pub smooth_lighting: bool,
    /// Worker threads for batched entity-block rendering; 0 picks from the
    /// available parallelism.
    #[serde(default)]
    pub render_threads: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            log_gl_state_changes: false,
            smooth_lighting: default_smooth_lighting(),
            render_threads: 0,
        }
    }
}

impl RenderSettings {
    pub fn sanitize(mut self) -> Self {
        self.render_threads = self.render_threads.min(MAX_RENDER_THREADS);
        self
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let parsed = toml::from_str::<Self>(&contents).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to deserialize render settings: {e}"),
            )
        })?;
        Ok(parsed.sanitize())
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let settings = self.clone().sanitize();
        let serialized = toml::to_string_pretty(&settings).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to serialize render settings: {e}"),
            )
        })?;
        fs::write(path, serialized)
    }

    pub fn load_or_create(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let settings = Self::default();
                if let Err(save_err) = settings.save(path) {
                    warn!(
                        "Failed to create default render settings at {}: {save_err}",
                        path.display()
                    );
                }
                settings
            }
            Err(err) => {
                warn!(
                    "Failed to load render settings from {}: {err}; using defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Publishes the flags process-wide. Cached render contexts are dropped
    /// when the lighting model changes.
    pub fn apply(&self) {
        LOG_GL_STATE_CHANGES.store(self.log_gl_state_changes, Ordering::Relaxed);
        let previous = SMOOTH_LIGHTING.swap(self.smooth_lighting, Ordering::Relaxed);
        if previous != self.smooth_lighting {
            debug!(
                "Smooth lighting changed to {}; reloading render contexts",
                self.smooth_lighting
            );
            pool::reload();
        }
    }

    pub fn worker_threads(&self) -> usize {
        if self.render_threads > 0 {
            return self.render_threads;
        }
        let available = std::thread::available_parallelism()
            .map(|parallelism| parallelism.get())
            .unwrap_or(4);
        available.saturating_sub(1).clamp(2, 8)
    }
}

fn default_smooth_lighting() -> bool {
    true
}
