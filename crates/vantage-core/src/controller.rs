//! Media Viewport Controller - one per mounted media slot
//!
//! Coordinates:
//! - Visibility tracker registration
//! - Connection quality detection
//! - Load debounce timer ownership
//! - Media element load/play/pause/release
//!
//! Platform primitives are injected as trait objects so hosts (a browser
//! binding, a native UI, the CLI simulator) supply their own.

use crate::{
    config::{ObserverOptions, ViewportConfig},
    machine::{Effect, MediaEvent, SlotMachine},
    types::*,
    Result,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Visibility-tracking primitive of the hosting environment
pub trait VisibilityTracker: Send {
    /// Start reporting intersection changes at the given trigger points
    fn observe(&mut self, options: &ObserverOptions);

    /// Stop reporting
    fn disconnect(&mut self);
}

/// Read-only source of platform network information
pub trait NetworkMonitor: Send {
    fn conditions(&self) -> NetworkConditions;
}

/// The image or video element rendered for a slot.
///
/// All calls are fire-and-forget; outcomes come back through the
/// controller's `on_*` callbacks.
pub trait MediaElement: Send {
    /// Mount the source with a preload strategy
    fn attach(&mut self, media: &MediaDescriptor, strategy: LoadStrategy);

    fn play(&mut self);

    fn pause(&mut self);

    /// Pause and detach the source
    fn release(&mut self);
}

/// Handle identifying one scheduled load timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(pub u64);

/// Cancellable one-shot timers for the load debounce.
///
/// When a timer elapses the host calls
/// [`MediaViewportController::on_load_timer_fired`] with its token.
pub trait LoadScheduler: Send {
    fn schedule(&mut self, delay: Duration) -> TimerToken;

    fn cancel(&mut self, token: TimerToken);
}

/// Platform primitives handed to a controller at construction
pub struct Capabilities {
    pub tracker: Box<dyn VisibilityTracker>,
    pub network: Box<dyn NetworkMonitor>,
    pub element: Box<dyn MediaElement>,
    pub scheduler: Box<dyn LoadScheduler>,
}

/// Decides load, play, pause and release for one media slot
pub struct MediaViewportController {
    /// Unique slot ID
    id: SlotId,
    /// Media shown in this slot
    media: MediaDescriptor,
    /// Slot configuration
    config: ViewportConfig,
    /// Current state
    machine: SlotMachine,
    tracker: Box<dyn VisibilityTracker>,
    network: Box<dyn NetworkMonitor>,
    element: Box<dyn MediaElement>,
    scheduler: Box<dyn LoadScheduler>,
    /// Outstanding load timer
    pending_timer: Option<TimerToken>,
}

impl MediaViewportController {
    /// Mount a controller and register it with the visibility tracker
    pub fn new(
        media: MediaDescriptor,
        config: ViewportConfig,
        capabilities: Capabilities,
    ) -> Result<Self> {
        config.validate()?;

        let Capabilities {
            mut tracker,
            network,
            element,
            scheduler,
        } = capabilities;

        let quality = ConnectionQuality::derive(&network.conditions(), config.respect_data_saver);
        tracker.observe(&config.observer_options());

        let id = SlotId::new();
        info!(
            slot = %id,
            kind = %media.kind,
            url = %media.url,
            quality = %quality,
            "Media slot mounted"
        );

        Ok(Self {
            id,
            media,
            config,
            machine: SlotMachine::new(quality),
            tracker,
            network,
            element,
            scheduler,
            pending_timer: None,
        })
    }

    /// Get slot ID
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Get media descriptor
    pub fn media(&self) -> &MediaDescriptor {
        &self.media
    }

    /// Get configuration
    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Get current state
    pub fn state(&self) -> &ControllerState {
        self.machine.state()
    }

    /// Get collapsed lifecycle phase
    pub fn phase(&self) -> MediaPhase {
        self.machine.phase()
    }

    pub fn preferred_load_strategy(&self) -> LoadStrategy {
        self.state().preferred_load_strategy()
    }

    pub fn should_render_thumbnail(&self) -> bool {
        self.state().should_render_thumbnail()
    }

    /// Visibility tracker callback
    pub fn on_visibility_changed(&mut self, observation: ViewportObservation) {
        debug!(
            slot = %self.id,
            ratio = observation.intersection_ratio,
            intersecting = observation.is_intersecting,
            distance = observation.distance_from_viewport(),
            "Visibility changed"
        );
        self.dispatch(MediaEvent::Visibility(observation));
    }

    /// Scheduler callback; tokens other than the outstanding one are ignored
    pub fn on_load_timer_fired(&mut self, token: TimerToken) {
        if self.pending_timer != Some(token) {
            debug!(slot = %self.id, token = token.0, "Ignoring stale load timer");
            return;
        }
        self.pending_timer = None;
        self.dispatch(MediaEvent::LoadTimerFired);
    }

    pub fn on_media_ready(&mut self) {
        self.dispatch(MediaEvent::MediaReady);
    }

    /// Buffered fraction of the media, 0..=1
    pub fn on_progress(&mut self, buffered_fraction: f64) {
        self.dispatch(MediaEvent::Progress(buffered_fraction));
    }

    pub fn on_playback_started(&mut self) {
        self.dispatch(MediaEvent::PlaybackStarted);
    }

    pub fn on_playback_paused(&mut self) {
        self.dispatch(MediaEvent::PlaybackPaused);
    }

    pub fn on_playback_ended(&mut self) {
        self.dispatch(MediaEvent::PlaybackEnded);
    }

    pub fn on_media_error(&mut self, kind: MediaErrorKind) {
        warn!(slot = %self.id, error = %kind, "Media error");
        self.dispatch(MediaEvent::MediaError(kind));
    }

    /// The platform refused a play attempt
    pub fn on_play_rejected(&mut self) {
        warn!(slot = %self.id, "Playback rejected by platform");
        self.dispatch(MediaEvent::PlayRejected);
    }

    /// Explicit user play
    pub fn request_play(&mut self) {
        self.dispatch(MediaEvent::PlayRequested);
    }

    /// Explicit user pause
    pub fn request_pause(&mut self) {
        self.dispatch(MediaEvent::PauseRequested);
    }

    /// Play/pause button: pauses running or requested playback, plays otherwise
    pub fn toggle_play(&mut self) {
        if self.state().is_playing || self.machine.play_pending() {
            self.request_pause();
        } else {
            self.request_play();
        }
    }

    /// Re-read the network monitor after a platform network-change event
    pub fn on_network_changed(&mut self) {
        let quality =
            ConnectionQuality::derive(&self.network.conditions(), self.config.respect_data_saver);
        if quality != self.state().connection_quality {
            info!(slot = %self.id, from = %self.state().connection_quality, to = %quality, "Connection quality changed");
        }
        self.dispatch(MediaEvent::NetworkChanged(quality));
    }

    /// Unmount: cancel the timer, release media and stop observing.
    ///
    /// Also runs on drop; calling it twice is harmless.
    pub fn destroy(&mut self) {
        if self.machine.is_destroyed() {
            return;
        }
        self.dispatch(MediaEvent::Destroyed);
        self.tracker.disconnect();
        debug!(slot = %self.id, "Media slot destroyed");
    }

    fn dispatch(&mut self, event: MediaEvent) {
        let before = self.machine.phase();
        let step = std::mem::take(&mut self.machine).apply(&self.config, self.media.kind, event);
        self.machine = step.machine;

        for effect in step.effects {
            self.run(effect);
        }

        let after = self.machine.phase();
        if before != after {
            debug!(slot = %self.id, from = %before, to = %after, "Phase transition");
        }
    }

    fn run(&mut self, effect: Effect) {
        match effect {
            Effect::ScheduleLoad { delay } => {
                if let Some(previous) = self.pending_timer.take() {
                    self.scheduler.cancel(previous);
                }
                let token = self.scheduler.schedule(delay);
                self.pending_timer = Some(token);
                debug!(slot = %self.id, delay_ms = delay.as_millis() as u64, "Load scheduled");
            }
            Effect::CancelLoad => {
                if let Some(token) = self.pending_timer.take() {
                    self.scheduler.cancel(token);
                    debug!(slot = %self.id, "Pending load cancelled");
                }
            }
            Effect::Attach { strategy } => {
                info!(slot = %self.id, strategy = %strategy, "Loading media");
                self.element.attach(&self.media, strategy);
            }
            Effect::Play => {
                debug!(slot = %self.id, "Requesting playback");
                self.element.play();
            }
            Effect::Pause => {
                self.element.pause();
            }
            Effect::Release => {
                info!(slot = %self.id, "Releasing media");
                self.element.release();
            }
        }
    }
}

impl Drop for MediaViewportController {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for MediaViewportController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaViewportController")
            .field("id", &self.id)
            .field("media", &self.media)
            .field("phase", &self.machine.phase())
            .field("pending_timer", &self.pending_timer)
            .finish()
    }
}

/// Buffered fraction from a media element's last buffered range end and
/// its duration. `None` until the duration is known.
pub fn buffered_fraction(buffered_end: f64, duration: f64) -> Option<f64> {
    if duration > 0.0 && duration.is_finite() {
        Some((buffered_end / duration).clamp(0.0, 1.0))
    } else {
        None
    }
}
