//! Lane traffic backdrop: vehicles cruising across the viewport and braking
//! when the pointer comes close.
//!
//! The simulation is split into two free functions so the tick stays a plain
//! function of its inputs:
//!
//! * [`step_vehicles`]: `(vehicles, pointer, viewport, elapsed) -> vehicles'`
//! * [`render`]: `(vehicles, viewport, theme) -> Frame`
//!
//! [`TrafficSurface`] owns the vehicle set and its RNG and wires the two
//! together. Nothing here touches a real display; hosts consume [`Frame`]s.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const LANE_HEIGHT: f64 = 65.0;
pub const VEHICLE_WIDTH: f64 = 45.0;
pub const VEHICLE_HEIGHT: f64 = 20.0;
pub const CORNER_RADIUS: f64 = 4.0;

/// Idle cruising speed, in pixels per frame.
pub const CRUISE_SPEED: f64 = 1.8;
/// Width of the random band added on top of [`CRUISE_SPEED`] at spawn.
pub const SPEED_SPREAD: f64 = 1.2;
pub const IDLE_AMPLITUDE: f64 = 0.3;
pub const ACCELERATION: f64 = 0.04;
pub const BRAKE_DECAY: f64 = 0.95;
/// Pointer distance (to the vehicle centre) below which vehicles brake.
pub const PROXIMITY_THRESHOLD: f64 = 150.0;

/// Largest width or height a viewport may have, in CSS pixels.
pub const MAX_DIMENSION: f64 = 8192.0;

const WIDE_VIEWPORT: f64 = 1000.0;
const HUE_BASE: f64 = 210.0;
const HUE_SPREAD: f64 = 30.0;
const LANE_DASH: [f64; 2] = [20.0, 40.0];

// ---------------------------------------------------------------------------
// Context types
// ---------------------------------------------------------------------------

/// Colour tint of the page the backdrop is drawn under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

/// Surface dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Negative, NaN and infinite dimensions collapse to zero; anything past
    /// [`MAX_DIMENSION`] is cut down to it.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: clamp_dimension(width),
            height: clamp_dimension(height),
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }

    pub fn lane_count(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (self.height.min(MAX_DIMENSION) / LANE_HEIGHT).ceil() as usize
    }

    /// Upper bound on vehicles per lane.
    pub fn density(&self) -> usize {
        if self.width > WIDE_VIEWPORT {
            3
        } else {
            2
        }
    }
}

fn clamp_dimension(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, MAX_DIMENSION)
    } else {
        0.0
    }
}

/// Last known pointer position. Inactive until the first move is observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerState {
    pub x: f64,
    pub y: f64,
    pub active: bool,
}

impl Default for PointerState {
    fn default() -> Self {
        Self {
            x: -2000.0,
            y: -2000.0,
            active: false,
        }
    }
}

impl PointerState {
    pub fn at(x: f64, y: f64) -> Self {
        Self { x, y, active: true }
    }
}

// ---------------------------------------------------------------------------
// Colours and draw commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "space", rename_all = "lowercase")]
pub enum Color {
    Rgba { r: u8, g: u8, b: u8, a: f64 },
    Hsla { h: f64, s: f64, l: f64, a: f64 },
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
        Color::Rgba { r, g, b, a }
    }
}

/// Renders as a CSS colour string, ready for a canvas `fillStyle`.
impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Rgba { r, g, b, a } => write!(f, "rgba({r}, {g}, {b}, {a})"),
            Color::Hsla { h, s, l, a } => write!(f, "hsla({h:.1}, {s}%, {l}%, {a})"),
        }
    }
}

pub const BRAKING_COLOR: Color = Color::rgba(239, 68, 68, 0.7);
const BRAKING_GLOW: Color = Color::rgba(239, 68, 68, 0.5);
const CRUISING_GLOW: Color = Color::rgba(59, 130, 246, 0.2);
const BRAKE_LIGHT: Color = Color::rgba(255, 0, 0, 0.8);

/// One primitive of a frame, in painter's order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear {
        width: f64,
        height: f64,
    },
    DashedLine {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        dash: [f64; 2],
        color: Color,
    },
    RoundRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radius: f64,
        fill: Color,
        glow_blur: f64,
        glow_color: Color,
    },
    FillRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Color,
    },
}

/// Everything drawn by one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
    pub commands: Vec<DrawCommand>,
}

impl Frame {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Vehicle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub x: f64,
    pub y: f64,
    pub lane: usize,
    pub speed: f64,
    pub braking: bool,
    /// Hue of the cruising colour, fixed for the vehicle's lifetime.
    pub hue: f64,
}

impl Vehicle {
    pub fn spawn<R: Rng + ?Sized>(lane: usize, width: f64, rng: &mut R) -> Self {
        Self {
            x: rng.gen_range(0.0..width),
            y: lane_top(lane) + (LANE_HEIGHT - VEHICLE_HEIGHT) / 2.0,
            lane,
            speed: base_speed(rng),
            braking: false,
            hue: HUE_BASE + rng.gen_range(0.0..HUE_SPREAD),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + VEHICLE_WIDTH / 2.0, self.y + VEHICLE_HEIGHT / 2.0)
    }

    pub fn base_color(&self) -> Color {
        Color::Hsla {
            h: self.hue,
            s: 80.0,
            l: 60.0,
            a: 0.4,
        }
    }

    pub fn color(&self) -> Color {
        if self.braking {
            BRAKING_COLOR
        } else {
            self.base_color()
        }
    }

    /// Speed this lane drifts towards when nothing is in the way.
    pub fn target_speed(&self, elapsed_ms: f64) -> f64 {
        CRUISE_SPEED + (elapsed_ms * 0.001 + self.lane as f64).sin() * IDLE_AMPLITUDE
    }

    /// Advance one frame. Returns `true` when the vehicle wrapped around.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        width: f64,
        pointer: &PointerState,
        elapsed_ms: f64,
        rng: &mut R,
    ) -> bool {
        let (cx, cy) = self.center();
        let dist = (pointer.x - cx).hypot(pointer.y - cy);

        if pointer.active && dist < PROXIMITY_THRESHOLD {
            self.speed *= BRAKE_DECAY;
            self.braking = true;
        } else {
            let target = self.target_speed(elapsed_ms);
            if self.speed < target {
                self.speed += ACCELERATION;
            } else {
                self.speed = target;
            }
            self.braking = false;
        }

        self.x += self.speed;
        if self.x > width {
            self.x = -VEHICLE_WIDTH;
            self.speed = base_speed(rng);
            return true;
        }
        false
    }
}

fn lane_top(lane: usize) -> f64 {
    lane as f64 * LANE_HEIGHT
}

fn base_speed<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    CRUISE_SPEED + rng.gen_range(0.0..SPEED_SPREAD)
}

// ---------------------------------------------------------------------------
// Tick functions
// ---------------------------------------------------------------------------

/// Per-tick counters, used by the headless runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepStats {
    pub wrapped: usize,
    pub braking: usize,
}

/// Fresh vehicle set for `viewport`: between one and `density()` vehicles per lane.
pub fn populate<R: Rng + ?Sized>(viewport: Viewport, rng: &mut R) -> Vec<Vehicle> {
    let mut vehicles = Vec::new();
    if viewport.is_empty() {
        return vehicles;
    }
    let density = viewport.density();
    for lane in 0..viewport.lane_count() {
        let count = 1 + rng.gen_range(0..density);
        for _ in 0..count {
            vehicles.push(Vehicle::spawn(lane, viewport.width, rng));
        }
    }
    vehicles
}

/// Update every vehicle for one frame. A zero-area viewport is a no-op.
pub fn step_vehicles<R: Rng + ?Sized>(
    vehicles: &mut [Vehicle],
    pointer: &PointerState,
    viewport: Viewport,
    elapsed_ms: f64,
    rng: &mut R,
) -> StepStats {
    let mut stats = StepStats::default();
    if viewport.is_empty() {
        return stats;
    }
    for vehicle in vehicles.iter_mut() {
        if vehicle.step(viewport.width, pointer, elapsed_ms, rng) {
            stats.wrapped += 1;
        }
        if vehicle.braking {
            stats.braking += 1;
        }
    }
    stats
}

/// Draw commands for the current state. A zero-area viewport yields an empty frame.
pub fn render(vehicles: &[Vehicle], viewport: Viewport, theme: Theme) -> Frame {
    let mut frame = Frame {
        width: viewport.width,
        height: viewport.height,
        commands: Vec::new(),
    };
    if viewport.is_empty() {
        return frame;
    }

    frame.commands.push(DrawCommand::Clear {
        width: viewport.width,
        height: viewport.height,
    });

    let separator = match theme {
        Theme::Dark => Color::rgba(255, 255, 255, 0.04),
        Theme::Light => Color::rgba(0, 0, 0, 0.02),
    };
    for i in 0..=viewport.lane_count() {
        let y = lane_top(i);
        frame.commands.push(DrawCommand::DashedLine {
            x1: 0.0,
            y1: y,
            x2: viewport.width,
            y2: y,
            dash: LANE_DASH,
            color: separator,
        });
    }

    for v in vehicles {
        push_vehicle(&mut frame.commands, v, theme);
    }
    frame
}

fn push_vehicle(commands: &mut Vec<DrawCommand>, v: &Vehicle, theme: Theme) {
    let (glow_blur, glow_color) = if v.braking {
        (15.0, BRAKING_GLOW)
    } else {
        (5.0, CRUISING_GLOW)
    };
    commands.push(DrawCommand::RoundRect {
        x: v.x,
        y: v.y,
        width: VEHICLE_WIDTH,
        height: VEHICLE_HEIGHT,
        radius: CORNER_RADIUS,
        fill: v.color(),
        glow_blur,
        glow_color,
    });

    let lights = if v.braking {
        [
            (v.x, v.y + 2.0, 3.0, 4.0),
            (v.x, v.y + VEHICLE_HEIGHT - 6.0, 3.0, 4.0),
        ]
    } else {
        [
            (v.x + VEHICLE_WIDTH - 4.0, v.y + 2.0, 4.0, 3.0),
            (v.x + VEHICLE_WIDTH - 4.0, v.y + VEHICLE_HEIGHT - 5.0, 4.0, 3.0),
        ]
    };
    let fill = match (v.braking, theme) {
        (true, _) => BRAKE_LIGHT,
        (false, Theme::Dark) => Color::rgba(255, 255, 255, 0.6),
        (false, Theme::Light) => Color::rgba(255, 255, 255, 0.3),
    };
    for (x, y, width, height) in lights {
        commands.push(DrawCommand::FillRect {
            x,
            y,
            width,
            height,
            fill,
        });
    }
}

// ---------------------------------------------------------------------------
// TrafficSurface
// ---------------------------------------------------------------------------

/// The animated backdrop: viewport, vehicle set and the RNG that feeds spawns.
#[derive(Debug, Clone)]
pub struct TrafficSurface {
    viewport: Viewport,
    vehicles: Vec<Vehicle>,
    rng: StdRng,
}

impl TrafficSurface {
    pub fn new(viewport: Viewport) -> Self {
        Self::from_rng(viewport, StdRng::from_entropy())
    }

    /// Deterministic surface, for tests and reproducible headless runs.
    pub fn with_seed(viewport: Viewport, seed: u64) -> Self {
        Self::from_rng(viewport, StdRng::seed_from_u64(seed))
    }

    fn from_rng(viewport: Viewport, mut rng: StdRng) -> Self {
        let vehicles = populate(viewport, &mut rng);
        Self {
            viewport,
            vehicles,
            rng,
        }
    }

    /// Discard every vehicle and repopulate for the new viewport.
    pub fn reset(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.vehicles = populate(viewport, &mut self.rng);
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn lane_count(&self) -> usize {
        self.viewport.lane_count()
    }

    pub fn step(&mut self, pointer: &PointerState, elapsed_ms: f64) -> StepStats {
        step_vehicles(
            &mut self.vehicles,
            pointer,
            self.viewport,
            elapsed_ms,
            &mut self.rng,
        )
    }

    pub fn render(&self, theme: Theme) -> Frame {
        render(&self.vehicles, self.viewport, theme)
    }

    /// Update then draw.
    pub fn tick(&mut self, pointer: &PointerState, elapsed_ms: f64, theme: Theme) -> Frame {
        self.step(pointer, elapsed_ms);
        self.render(theme)
    }
}
