use serde::Serialize;

use crate::traffic::{Frame, PointerState, Theme, TrafficSurface, Viewport};

/// Frame clock used for headless runs.
pub const HEADLESS_FPS: f64 = 60.0;

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub viewport: Viewport,
    pub ticks: u32,
    pub pointer: Option<(f64, f64)>,
    pub seed: Option<u64>,
    pub theme: Theme,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            viewport: Viewport::new(1280.0, 720.0),
            ticks: 600,
            pointer: None,
            seed: None,
            theme: Theme::Light,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SpeedSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub schema_version: u8,
    pub width: f64,
    pub height: f64,
    pub theme: Theme,
    pub seed: Option<u64>,
    pub ticks: u32,
    pub lanes: usize,
    pub vehicles: usize,
    pub wraps: usize,
    /// Sum over ticks of vehicles braking in that tick.
    pub braking_vehicle_frames: usize,
    /// Speeds after the final tick; `None` with no vehicles.
    pub final_speed: Option<SpeedSummary>,
    pub final_frame_commands: usize,
}

#[derive(Debug)]
pub struct SimulationRun {
    pub report: SimulationReport,
    pub frame: Frame,
}

/// Run the surface for `opts.ticks` frames on a synthetic 60 fps clock.
pub fn run_simulation(opts: &SimulationOptions) -> SimulationRun {
    let mut surface = match opts.seed {
        Some(seed) => TrafficSurface::with_seed(opts.viewport, seed),
        None => TrafficSurface::new(opts.viewport),
    };
    let pointer = opts
        .pointer
        .map(|(x, y)| PointerState::at(x, y))
        .unwrap_or_default();

    let mut wraps = 0;
    let mut braking_vehicle_frames = 0;
    for tick in 0..opts.ticks {
        let elapsed_ms = f64::from(tick) * 1000.0 / HEADLESS_FPS;
        let stats = surface.step(&pointer, elapsed_ms);
        wraps += stats.wrapped;
        braking_vehicle_frames += stats.braking;
    }

    let frame = surface.render(opts.theme);
    let report = SimulationReport {
        schema_version: 1,
        width: opts.viewport.width,
        height: opts.viewport.height,
        theme: opts.theme,
        seed: opts.seed,
        ticks: opts.ticks,
        lanes: surface.lane_count(),
        vehicles: surface.vehicles().len(),
        wraps,
        braking_vehicle_frames,
        final_speed: speed_summary(&surface),
        final_frame_commands: frame.commands.len(),
    };
    SimulationRun { report, frame }
}

fn speed_summary(surface: &TrafficSurface) -> Option<SpeedSummary> {
    let speeds: Vec<f64> = surface.vehicles().iter().map(|v| v.speed).collect();
    if speeds.is_empty() {
        return None;
    }
    let n = speeds.len() as f64;
    Some(SpeedSummary {
        mean: speeds.iter().sum::<f64>() / n,
        min: speeds.iter().copied().fold(f64::INFINITY, f64::min),
        max: speeds.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}
