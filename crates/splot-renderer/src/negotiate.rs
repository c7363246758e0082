// Backend tier negotiation: try an ordered list of strategies exactly once.

use std::sync::Arc;

use splot_core::{BackendTier, RenderError, RenderResult};

/// One way of acquiring a graphics context at a given tier.
pub trait TierStrategy {
    type Output;

    fn tier(&self) -> BackendTier;
    fn acquire(&self) -> RenderResult<Self::Output>;
}

/// Result of negotiation. `output` is `Some` exactly when `tier` is not Unavailable.
pub struct Negotiation<T> {
    pub tier: BackendTier,
    pub output: Option<T>,
    /// Every failed attempt, in order.
    pub failures: Vec<(BackendTier, RenderError)>,
}

impl<T> Negotiation<T> {
    /// Human-readable summary of why no tier was usable.
    pub fn failure_summary(&self) -> String {
        if self.failures.is_empty() {
            return "no backend tier was attempted".to_string();
        }
        self.failures
            .iter()
            .map(|(tier, err)| format!("{tier}: {err}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Try each strategy in order, skipping the primary tier when `force_legacy` is set.
pub fn negotiate<T>(
    strategies: &[&dyn TierStrategy<Output = T>],
    force_legacy: bool,
) -> Negotiation<T> {
    let mut failures = Vec::new();
    for strategy in strategies {
        let tier = strategy.tier();
        if force_legacy && tier == BackendTier::Primary {
            log::info!("Skipping primary backend tier (forced legacy)");
            continue;
        }
        match strategy.acquire() {
            Ok(output) => {
                log::info!("Selected {tier} backend tier");
                return Negotiation {
                    tier,
                    output: Some(output),
                    failures,
                };
            }
            Err(e) => {
                log::warn!("Backend tier {tier} unavailable: {e}");
                failures.push((tier, e));
            }
        }
    }
    Negotiation {
        tier: BackendTier::Unavailable,
        output: None,
        failures,
    }
}

// ──────────────────────────────────────────────
// wgpu strategies
// ──────────────────────────────────────────────

/// Device and queue shared by every GPU object of one renderer.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub tier: BackendTier,
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let info = self.adapter.get_info();
        f.debug_struct("GpuContext")
            .field("adapter", &info.name)
            .field("backend", &info.backend)
            .field("tier", &self.tier)
            .finish()
    }
}

/// Native backends with a WebGPU-compliant adapter: per-instance attribute stepping.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryTier;

/// Any adapter at downlevel (WebGL2-class) limits: instancing emulated by
/// replicating attributes per vertex.
#[derive(Debug, Clone, Copy)]
pub struct LegacyTier {
    pub backends: wgpu::Backends,
}

impl Default for LegacyTier {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
        }
    }
}

impl TierStrategy for PrimaryTier {
    type Output = GpuContext;

    fn tier(&self) -> BackendTier {
        BackendTier::Primary
    }

    fn acquire(&self) -> RenderResult<GpuContext> {
        request_context(wgpu::Backends::PRIMARY, BackendTier::Primary)
    }
}

impl TierStrategy for LegacyTier {
    type Output = GpuContext;

    fn tier(&self) -> BackendTier {
        BackendTier::Legacy
    }

    fn acquire(&self) -> RenderResult<GpuContext> {
        request_context(self.backends, BackendTier::Legacy)
    }
}

fn request_context(backends: wgpu::Backends, tier: BackendTier) -> RenderResult<GpuContext> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    });

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .ok_or_else(|| RenderError::Unavailable(format!("no adapter for {backends:?}")))?;

    let info = adapter.get_info();
    let required_limits = match tier {
        BackendTier::Primary => {
            if !adapter.get_downlevel_capabilities().is_webgpu_compliant() {
                return Err(RenderError::Unavailable(format!(
                    "adapter {} is not WebGPU compliant",
                    info.name
                )));
            }
            wgpu::Limits::default().using_resolution(adapter.limits())
        }
        _ => wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits()),
    };

    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("splot_device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            memory_hints: Default::default(),
        },
        None,
    ))
    .map_err(|e| RenderError::Unavailable(format!("device request failed on {}: {e}", info.name)))?;

    log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

    Ok(GpuContext {
        instance,
        adapter,
        device: Arc::new(device),
        queue: Arc::new(queue),
        tier,
    })
}

/// Try the primary tier, then the legacy tier.
pub fn negotiate_gpu(force_legacy: bool) -> Negotiation<GpuContext> {
    let primary = PrimaryTier;
    let legacy = LegacyTier::default();
    let strategies: [&dyn TierStrategy<Output = GpuContext>; 2] = [&primary, &legacy];
    negotiate(&strategies, force_legacy)
}
