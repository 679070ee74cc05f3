// ============================================================
// Layer 2 — ServeUseCase
// ============================================================
// Brings the prediction service up:
//
//   Step 1: Load and validate every bundle   (Layer 6 → Layer 5)
//   Step 2: Bind the listener                (tokio)
//   Step 3: Serve until Ctrl-C               (axum, Layer 1)
//
// Lifecycle of the service:
//
//   Unloaded ──start──▶ Loading ──ok──▶ Ready   (terminal)
//                          │
//                          └──err──▶ Failed     (terminal)
//
// There is no way back to Loading; a new bundle set means a
// new process. The listener is only bound once Ready.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::api::build_router;
use crate::infra::artifact_store::ArtifactStore;
use crate::ml::registry::ModelRegistry;

#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub artifacts_dir: String,
    /// Bundles to load; empty means every bundle in the store
    pub bundles:       Vec<String>,
    pub listen_addr:   String,
    /// Decimal places of returned prices
    pub decimals:      u32,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: "artifacts".to_string(),
            bundles:       Vec::new(),
            listen_addr:   "127.0.0.1:8000".to_string(),
            decimals:      2,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ServiceState {
    Unloaded,
    Loading,
    Ready(Arc<ModelRegistry>),
    Failed(String),
}

impl ServiceState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unloaded  => "unloaded",
            Self::Loading   => "loading",
            Self::Ready(_)  => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

/// Owns the service lifecycle. `start` may be called once.
#[derive(Debug)]
pub struct PredictionService {
    state: ServiceState,
}

impl Default for PredictionService {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionService {
    pub fn new() -> Self {
        Self { state: ServiceState::Unloaded }
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn registry(&self) -> Option<Arc<ModelRegistry>> {
        match &self.state {
            ServiceState::Ready(registry) => Some(Arc::clone(registry)),
            _ => None,
        }
    }

    /// Load `bundles` (or all of them) and move to Ready or Failed.
    pub fn start(&mut self, store: &ArtifactStore, bundles: &[String]) -> Result<Arc<ModelRegistry>> {
        if !matches!(self.state, ServiceState::Unloaded) {
            bail!("service cannot start from state '{}'", self.state.name());
        }

        self.state = ServiceState::Loading;
        tracing::info!("Loading bundles from '{}'", store.root().display());

        match ModelRegistry::load(store, bundles) {
            Ok(registry) => {
                let registry = Arc::new(registry);
                tracing::info!("Service ready with bundle(s): {}", registry.ids().join(", "));
                self.state = ServiceState::Ready(Arc::clone(&registry));
                Ok(registry)
            }
            Err(e) => {
                tracing::error!("Service failed to load: {}", e);
                self.state = ServiceState::Failed(e.to_string());
                Err(e).context("Cannot load prediction bundles")
            }
        }
    }
}

// ─── ServeUseCase ─────────────────────────────────────────────────────────────
pub struct ServeUseCase {
    config: ServeConfig,
}

impl ServeUseCase {
    pub fn new(config: ServeConfig) -> Self {
        Self { config }
    }

    /// Blocks until the server shuts down.
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Load everything before touching the network ───────────────
        let store    = ArtifactStore::new(&cfg.artifacts_dir);
        let mut service = PredictionService::new();
        let registry = service.start(&store, &cfg.bundles)?;
        let app      = build_router(registry, cfg.decimals);

        // ── Steps 2–3: Bind and serve ─────────────────────────────────────────
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("Cannot start the async runtime")?;

        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
                .await
                .with_context(|| format!("Cannot bind '{}'", cfg.listen_addr))?;
            tracing::info!("Prediction service listening on {}", cfg.listen_addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")
        })?;

        tracing::info!("Prediction service stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
