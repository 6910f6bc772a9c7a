//! Traffic backdrop simulation and research-assistant chat widget for a
//! transport researcher's portfolio.
//!
//! The two widgets are independent:
//!
//! * [`traffic`] + [`scheduler`]: lanes of vehicles cruising across the
//!   viewport and braking near the pointer, emitted as [`traffic::Frame`]s of
//!   draw commands.
//! * [`chat`] + [`providers`]: a single-flight transcript in front of a
//!   text-generation API, answering as a fixed [`persona`].
//!
//! [`headless`], [`web`] and [`terminal`] are the hosts used by the binary.

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod headless;
pub mod persona;
pub mod profile;
pub mod providers;
pub mod scheduler;
pub mod terminal;
pub mod traffic;
pub mod web;

pub use chat::{ChatEvent, ChatWidget, ReplySource, Speaker, SubmitOutcome, Turn};
pub use config::FolioConfig;
pub use error::{FolioError, GenerateError};
pub use providers::{GeminiGenerator, Generator};
pub use scheduler::{FrameScheduler, SchedulerConfig};
pub use traffic::{DrawCommand, Frame, PointerState, Theme, TrafficSurface, Vehicle, Viewport};
