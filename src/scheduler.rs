//! Redraw loop for the traffic surface.
//!
//! [`FrameScheduler::start`] moves a [`TrafficSurface`] into a tokio task that
//! ticks it at a fixed cadence. Pointer, resize and theme inputs are queued
//! and applied at the start of the next frame; one frame of staleness is
//! expected. The newest frame is published on a `watch` channel.
//!
//! Stopping (or dropping the scheduler) ends the loop; `stop` hands the
//! surface back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::traffic::{Frame, PointerState, Theme, TrafficSurface, Viewport};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    pub fps: u32,
    pub theme: Theme,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            theme: Theme::Light,
        }
    }
}

impl SchedulerConfig {
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

#[derive(Debug)]
enum Input {
    Pointer(PointerState),
    Resize(Viewport),
    Theme(Theme),
}

pub struct FrameScheduler {
    inputs: mpsc::UnboundedSender<Input>,
    frames: watch::Receiver<Frame>,
    rendered: Arc<AtomicU64>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<TrafficSurface>>,
}

impl FrameScheduler {
    /// Spawn the loop. Must be called from within a tokio runtime.
    pub fn start(surface: TrafficSurface, config: SchedulerConfig) -> Self {
        let (inputs, inputs_rx) = mpsc::unbounded_channel();
        let (frames_tx, frames) = watch::channel(Frame::default());
        let (stop_tx, stop_rx) = oneshot::channel();
        let rendered = Arc::new(AtomicU64::new(0));

        info!(
            fps = config.fps,
            theme = %config.theme,
            lanes = surface.lane_count(),
            vehicles = surface.vehicles().len(),
            "traffic loop starting"
        );
        let task = tokio::spawn(run(
            surface,
            config,
            inputs_rx,
            frames_tx,
            Arc::clone(&rendered),
            stop_rx,
        ));

        Self {
            inputs,
            frames,
            rendered,
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }

    pub fn pointer_moved(&self, x: f64, y: f64) {
        self.post(Input::Pointer(PointerState::at(x, y)));
    }

    /// The next frame discards every vehicle and repopulates for `viewport`.
    pub fn resized(&self, viewport: Viewport) {
        self.post(Input::Resize(viewport));
    }

    pub fn set_theme(&self, theme: Theme) {
        self.post(Input::Theme(theme));
    }

    fn post(&self, input: Input) {
        if self.inputs.send(input).is_err() {
            debug!("traffic loop already stopped, input dropped");
        }
    }

    pub fn latest_frame(&self) -> Frame {
        self.frames.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Frame> {
        self.frames.clone()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.rendered.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// End the loop and take the surface back. `None` if the task panicked.
    pub async fn stop(mut self) -> Option<TrafficSurface> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        let task = self.task.take()?;
        task.await.ok()
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        // the loop also exits on its own once stop_tx is dropped
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn run(
    mut surface: TrafficSurface,
    config: SchedulerConfig,
    mut inputs: mpsc::UnboundedReceiver<Input>,
    frames: watch::Sender<Frame>,
    rendered: Arc<AtomicU64>,
    mut stop_rx: oneshot::Receiver<()>,
) -> TrafficSurface {
    let mut ticker = tokio::time::interval(config.frame_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let started = Instant::now();
    let mut pointer = PointerState::default();
    let mut theme = config.theme;

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                while let Ok(input) = inputs.try_recv() {
                    match input {
                        Input::Pointer(p) => pointer = p,
                        Input::Resize(viewport) => surface.reset(viewport),
                        Input::Theme(t) => theme = t,
                    }
                }
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                let frame = surface.tick(&pointer, elapsed_ms, theme);
                rendered.fetch_add(1, Ordering::Relaxed);
                frames.send_replace(frame);
            }
        }
    }

    debug!(
        frames = rendered.load(Ordering::Relaxed),
        "traffic loop stopped"
    );
    surface
}
