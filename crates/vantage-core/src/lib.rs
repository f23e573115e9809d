//! Vantage Core - Viewport-driven adaptive media loading
//!
//! This crate decides, per media slot on a long scrolling page, when an
//! image or video should be fetched, played, paused or released:
//! - Debounced lazy loading on viewport intersection
//! - Autoplay and pause by visibility
//! - Distance-based eviction of off-screen media
//! - Connection-aware preload strategy with data-saver support
//! - Infinite feed paging for the surrounding list
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Vantage Core                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │  Visibility  │  │   Network    │  │    Load      │           │
//! │  │   Tracker    │  │   Monitor    │  │  Scheduler   │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐       ┌──────────────┐       │
//! │                    │  Viewport   │──────▶│ Slot Machine │       │
//! │                    │ Controller  │◀──────│ (pure steps) │       │
//! │                    └──────┬──────┘       └──────────────┘       │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │    Media    │                              │
//! │                    │   Element   │                              │
//! │                    └─────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod machine;
pub mod controller;
pub mod geometry;
pub mod feed;
#[cfg(feature = "driver")]
pub mod driver;

pub use error::{Error, Result};
pub use types::*;
pub use config::{ObserverOptions, ViewportConfig};
pub use machine::{Effect, MediaEvent, SlotMachine, Step};
pub use controller::{
    Capabilities, LoadScheduler, MediaElement, MediaViewportController, NetworkMonitor,
    TimerToken, VisibilityTracker,
};
pub use geometry::{ElementRect, Viewport};
pub use feed::{FeedStatus, InfiniteFeed};
#[cfg(feature = "driver")]
pub use driver::{spawn_slot, SlotCommand, SlotHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library initialization
pub fn init() {
    tracing::info!(version = VERSION, "Vantage Core initialized");
}
