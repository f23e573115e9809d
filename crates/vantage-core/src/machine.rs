//! Slot state machine
//!
//! [`SlotMachine`] is a value type. Every input is a [`MediaEvent`] and every
//! transition yields a new machine plus the [`Effect`]s the host must carry
//! out. Nothing here touches a timer or a media element.
//!
//! ```text
//! Idle ──visible──▶ Scheduled ──timer──▶ Loading ──ready──▶ Ready ──play──▶ Playing
//!  ▲                    │                                     │               │
//!  └──── not visible ───┘◀───────────── evicted ──────────────┴───────────────┘
//! ```

use crate::config::ViewportConfig;
use crate::types::*;
use std::time::Duration;

/// Debounce before loading on a slow connection
pub const SLOW_LOAD_DELAY: Duration = Duration::from_millis(500);

/// Debounce before loading on medium and fast connections
pub const DEFAULT_LOAD_DELAY: Duration = Duration::from_millis(100);

/// Load debounce for a connection quality
pub fn load_delay(quality: ConnectionQuality) -> Duration {
    match quality {
        ConnectionQuality::Slow => SLOW_LOAD_DELAY,
        ConnectionQuality::Medium | ConnectionQuality::Fast => DEFAULT_LOAD_DELAY,
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    /// Visibility tracker reported a change
    Visibility(ViewportObservation),
    /// The pending load debounce elapsed
    LoadTimerFired,
    /// Media can play
    MediaReady,
    /// Buffered fraction of the media, 0..=1
    Progress(f64),
    PlaybackStarted,
    PlaybackPaused,
    PlaybackEnded,
    MediaError(MediaErrorKind),
    /// The platform refused a play attempt
    PlayRejected,
    /// Explicit play from the user
    PlayRequested,
    /// Explicit pause from the user
    PauseRequested,
    NetworkChanged(ConnectionQuality),
    /// The hosting view unmounted
    Destroyed,
}

/// Side effects requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Start the load debounce timer
    ScheduleLoad { delay: Duration },
    /// Cancel the pending load debounce timer
    CancelLoad,
    /// Mount the media source with the given preload strategy
    Attach { strategy: LoadStrategy },
    /// Start playback (fire-and-forget)
    Play,
    Pause,
    /// Pause and detach the source to free memory and bandwidth
    Release,
}

/// Result of applying one event
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub machine: SlotMachine,
    pub effects: Vec<Effect>,
}

/// Complete state of one media slot
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlotMachine {
    state: ControllerState,
    load_pending: bool,
    /// `Play` was sent and the platform has not answered yet
    play_pending: bool,
    last_ratio: f64,
    destroyed: bool,
}

impl SlotMachine {
    /// Fresh machine for a newly mounted slot
    pub fn new(connection_quality: ConnectionQuality) -> Self {
        Self {
            state: ControllerState::new(connection_quality),
            ..Default::default()
        }
    }

    /// Observable state
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Whether a load debounce timer is outstanding
    pub fn load_pending(&self) -> bool {
        self.load_pending
    }

    /// Whether a play attempt is awaiting confirmation
    pub fn play_pending(&self) -> bool {
        self.play_pending
    }

    /// Intersection ratio from the most recent observation
    pub fn last_ratio(&self) -> f64 {
        self.last_ratio
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Collapsed lifecycle phase
    pub fn phase(&self) -> MediaPhase {
        let s = &self.state;
        if s.is_playing {
            MediaPhase::Playing
        } else if s.should_load && s.is_loaded {
            MediaPhase::Ready
        } else if s.should_load {
            MediaPhase::Loading
        } else if self.load_pending {
            MediaPhase::Scheduled
        } else {
            MediaPhase::Idle
        }
    }

    /// Apply one event, returning the next machine and its effects
    pub fn apply(self, config: &ViewportConfig, kind: MediaKind, event: MediaEvent) -> Step {
        let mut machine = self;
        let mut effects = Vec::new();

        if machine.destroyed {
            return Step { machine, effects };
        }

        match event {
            MediaEvent::Visibility(observation) => {
                machine.on_visibility(config, kind, &observation, &mut effects);
            }
            MediaEvent::LoadTimerFired => {
                if machine.load_pending {
                    machine.load_pending = false;
                    machine.state.should_load = true;
                    machine.state.error = None;
                    effects.push(Effect::Attach {
                        strategy: machine.state.preferred_load_strategy(),
                    });
                }
            }
            MediaEvent::MediaReady => {
                // A ready signal from a source that was already released is stale
                if machine.state.should_load {
                    machine.state.is_loaded = true;
                    machine.state.loading_progress = 100.0;
                    machine.state.error = None;

                    let wants_play = machine.last_ratio >= config.play_threshold
                        || machine.state.has_user_interacted;
                    if kind.is_playable() && machine.state.is_in_view && wants_play {
                        machine.start_playback(&mut effects);
                    }
                }
            }
            MediaEvent::Progress(fraction) => {
                if machine.state.should_load && !machine.state.is_loaded {
                    machine.state.loading_progress = (fraction.clamp(0.0, 1.0) * 100.0).min(100.0);
                }
            }
            MediaEvent::PlaybackStarted => {
                machine.play_pending = false;
                // Confirmations arriving after the slot scrolled away are refused
                if kind.is_playable() && machine.state.can_play() && machine.state.is_in_view {
                    machine.state.is_playing = true;
                    machine.state.error = None;
                } else {
                    effects.push(Effect::Pause);
                }
            }
            MediaEvent::PlaybackPaused | MediaEvent::PlaybackEnded => {
                machine.state.is_playing = false;
            }
            MediaEvent::MediaError(error) => {
                machine.state.error = Some(error);
                machine.state.is_loaded = false;
                machine.state.is_playing = false;
                machine.play_pending = false;
            }
            MediaEvent::PlayRejected => {
                machine.state.error = Some(MediaErrorKind::AutoplayBlocked);
                machine.state.is_playing = false;
                machine.play_pending = false;
            }
            MediaEvent::PlayRequested => {
                machine.state.has_user_interacted = true;
                if kind.is_playable() {
                    machine.on_play_requested(&mut effects);
                }
            }
            MediaEvent::PauseRequested => {
                if machine.state.is_playing || machine.play_pending {
                    machine.state.is_playing = false;
                    machine.play_pending = false;
                    effects.push(Effect::Pause);
                }
            }
            MediaEvent::NetworkChanged(quality) => {
                machine.state.connection_quality = quality;
            }
            MediaEvent::Destroyed => {
                if machine.load_pending {
                    machine.load_pending = false;
                    effects.push(Effect::CancelLoad);
                }
                if machine.state.should_load {
                    effects.push(Effect::Release);
                }
                machine.state = ControllerState::new(machine.state.connection_quality);
                machine.play_pending = false;
                machine.destroyed = true;
            }
        }

        Step { machine, effects }
    }

    fn on_visibility(
        &mut self,
        config: &ViewportConfig,
        kind: MediaKind,
        observation: &ViewportObservation,
        effects: &mut Vec<Effect>,
    ) {
        let ratio = observation.intersection_ratio;
        let intersecting = observation.is_intersecting;

        self.state.is_in_view = intersecting;
        self.last_ratio = ratio;

        // Load decision. At most one debounce timer is outstanding, and a
        // pending one is dropped as soon as the slot stops qualifying.
        if self.qualifies_for_load(config, observation) {
            if !self.load_pending {
                self.load_pending = true;
                effects.push(Effect::ScheduleLoad {
                    delay: load_delay(self.state.connection_quality),
                });
            }
        } else if self.load_pending {
            self.load_pending = false;
            effects.push(Effect::CancelLoad);
        }

        // A failed source is retried on the next qualifying observation
        if intersecting && self.load_failed() && self.ratio_qualifies(config, ratio) {
            self.reattach(effects);
        }

        let evict = !intersecting
            && self.state.should_load
            && observation.distance_from_viewport() > config.unload_distance;

        // Play decision
        if kind.is_playable() && self.state.can_play() {
            if intersecting && ratio >= config.play_threshold {
                self.start_playback(effects);
            } else if !intersecting && self.state.is_playing && !evict {
                self.state.is_playing = false;
                effects.push(Effect::Pause);
            }
        }

        // Eviction decision
        if evict {
            self.state.should_load = false;
            self.state.is_loaded = false;
            self.state.is_playing = false;
            self.state.loading_progress = 0.0;
            self.play_pending = false;
            effects.push(Effect::Release);
        }
    }

    /// Emit `Play` unless playback is running or already requested
    fn start_playback(&mut self, effects: &mut Vec<Effect>) {
        if !self.state.is_playing && !self.play_pending {
            self.play_pending = true;
            effects.push(Effect::Play);
        }
    }

    /// Source was requested but failed before becoming ready
    fn load_failed(&self) -> bool {
        self.state.should_load
            && !self.state.is_loaded
            && matches!(
                self.state.error,
                Some(MediaErrorKind::MediaLoadFailed | MediaErrorKind::Unknown)
            )
    }

    /// Drop the failed source and mount it again
    fn reattach(&mut self, effects: &mut Vec<Effect>) {
        self.state.is_playing = false;
        self.state.loading_progress = 0.0;
        self.state.error = None;
        self.play_pending = false;
        effects.push(Effect::Release);
        effects.push(Effect::Attach {
            strategy: self.state.preferred_load_strategy(),
        });
    }

    fn on_play_requested(&mut self, effects: &mut Vec<Effect>) {
        if self.state.can_play() {
            self.start_playback(effects);
        } else if self.load_failed() {
            self.reattach(effects);
        } else if !self.state.should_load {
            // A user gesture skips the debounce and the network policy
            if self.load_pending {
                self.load_pending = false;
                effects.push(Effect::CancelLoad);
            }
            self.state.should_load = true;
            self.state.error = None;
            effects.push(Effect::Attach {
                strategy: self.state.preferred_load_strategy(),
            });
        }
    }

    fn qualifies_for_load(&self, config: &ViewportConfig, observation: &ViewportObservation) -> bool {
        !self.state.should_load
            && observation.is_intersecting
            && self.ratio_qualifies(config, observation.intersection_ratio)
    }

    fn ratio_qualifies(&self, config: &ViewportConfig, ratio: f64) -> bool {
        ratio >= config.loading_threshold
            && (config.prefetch_enabled
                || self.state.connection_quality == ConnectionQuality::Fast
                || ratio >= config.play_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: f64 = 800.0;

    fn visible(ratio: f64) -> MediaEvent {
        MediaEvent::Visibility(ViewportObservation::new(ratio, true, 100.0, 400.0, VIEWPORT))
    }

    fn below(distance: f64) -> MediaEvent {
        let top = VIEWPORT + distance;
        MediaEvent::Visibility(ViewportObservation::new(0.0, false, top, top + 300.0, VIEWPORT))
    }

    fn config() -> ViewportConfig {
        ViewportConfig {
            loading_threshold: 0.1,
            play_threshold: 0.3,
            unload_distance: 200.0,
            ..Default::default()
        }
    }

    fn run(machine: SlotMachine, events: &[MediaEvent]) -> (SlotMachine, Vec<Effect>) {
        let config = config();
        let mut effects = Vec::new();
        let mut machine = machine;
        for event in events {
            let step = machine.apply(&config, MediaKind::Video, *event);
            machine = step.machine;
            effects.extend(step.effects);
        }
        (machine, effects)
    }

    fn loaded(quality: ConnectionQuality) -> SlotMachine {
        run(
            SlotMachine::new(quality),
            &[visible(0.15), MediaEvent::LoadTimerFired, MediaEvent::MediaReady],
        )
        .0
    }

    #[test]
    fn test_visible_schedules_load() {
        let (machine, effects) = run(SlotMachine::new(ConnectionQuality::Fast), &[visible(0.15)]);
        assert_eq!(effects, vec![Effect::ScheduleLoad { delay: DEFAULT_LOAD_DELAY }]);
        assert!(machine.state().is_in_view);
        assert!(!machine.state().should_load);
        assert_eq!(machine.phase(), MediaPhase::Scheduled);
    }

    #[test]
    fn test_slow_connection_uses_longer_debounce() {
        let (_, effects) = run(SlotMachine::new(ConnectionQuality::Slow), &[visible(0.5)]);
        assert_eq!(effects, vec![Effect::ScheduleLoad { delay: SLOW_LOAD_DELAY }]);
    }

    #[test]
    fn test_timer_does_not_stack() {
        let (_, effects) = run(
            SlotMachine::new(ConnectionQuality::Fast),
            &[visible(0.15), visible(0.2), visible(0.6)],
        );
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn test_below_loading_threshold_never_loads() {
        let (machine, effects) = run(
            SlotMachine::new(ConnectionQuality::Fast),
            &[visible(0.05), visible(0.09), MediaEvent::LoadTimerFired],
        );
        assert!(effects.is_empty());
        assert!(!machine.state().should_load);
    }

    #[test]
    fn test_leaving_view_cancels_pending_load() {
        let (machine, effects) = run(
            SlotMachine::new(ConnectionQuality::Fast),
            &[visible(0.15), below(50.0), MediaEvent::LoadTimerFired],
        );
        assert_eq!(
            effects,
            vec![Effect::ScheduleLoad { delay: DEFAULT_LOAD_DELAY }, Effect::CancelLoad]
        );
        assert!(!machine.state().should_load);
        assert_eq!(machine.phase(), MediaPhase::Idle);
    }

    #[test]
    fn test_timer_fired_attaches_with_strategy() {
        let (machine, effects) = run(
            SlotMachine::new(ConnectionQuality::Medium),
            &[visible(0.15), MediaEvent::LoadTimerFired],
        );
        assert_eq!(
            effects.last(),
            Some(&Effect::Attach { strategy: LoadStrategy::MetadataOnly })
        );
        assert!(machine.state().should_load);
        assert_eq!(machine.phase(), MediaPhase::Loading);
    }

    #[test]
    fn test_no_prefetch_slow_waits_for_play_threshold() {
        let config = ViewportConfig {
            prefetch_enabled: false,
            ..config()
        };
        let machine = SlotMachine::new(ConnectionQuality::Slow);

        let step = machine.apply(&config, MediaKind::Video, visible(0.2));
        assert!(step.effects.is_empty());

        let step = step.machine.apply(&config, MediaKind::Video, visible(0.35));
        assert_eq!(step.effects, vec![Effect::ScheduleLoad { delay: SLOW_LOAD_DELAY }]);
    }

    #[test]
    fn test_pending_load_cancelled_when_ratio_stops_qualifying() {
        let config = ViewportConfig {
            prefetch_enabled: false,
            ..config()
        };
        let mut machine = SlotMachine::new(ConnectionQuality::Medium);
        let mut effects = Vec::new();
        for event in [visible(0.4), visible(0.2)] {
            let step = machine.apply(&config, MediaKind::Video, event);
            machine = step.machine;
            effects.extend(step.effects);
        }
        assert_eq!(effects.last(), Some(&Effect::CancelLoad));
        assert!(!machine.load_pending());
    }

    #[test]
    fn test_ready_then_visible_plays() {
        let machine = loaded(ConnectionQuality::Fast);
        assert_eq!(machine.phase(), MediaPhase::Ready);
        assert_eq!(machine.state().loading_progress, 100.0);

        let (machine, effects) = run(machine, &[visible(0.4)]);
        assert_eq!(effects, vec![Effect::Play]);

        let (machine, _) = run(machine, &[MediaEvent::PlaybackStarted]);
        assert!(machine.state().is_playing);
        assert_eq!(machine.phase(), MediaPhase::Playing);
    }

    #[test]
    fn test_ready_while_sufficiently_visible_autoplays() {
        let (_, effects) = run(
            SlotMachine::new(ConnectionQuality::Fast),
            &[visible(0.5), MediaEvent::LoadTimerFired, MediaEvent::MediaReady],
        );
        assert_eq!(effects.last(), Some(&Effect::Play));
    }

    #[test]
    fn test_leaving_view_pauses_without_evicting() {
        let (machine, _) = run(
            loaded(ConnectionQuality::Fast),
            &[visible(0.4), MediaEvent::PlaybackStarted],
        );
        let (machine, effects) = run(machine, &[below(50.0)]);
        assert_eq!(effects, vec![Effect::Pause]);
        assert!(!machine.state().is_playing);
        assert!(machine.state().should_load);
        assert!(machine.state().is_loaded);
    }

    #[test]
    fn test_far_away_evicts() {
        let (machine, _) = run(
            loaded(ConnectionQuality::Fast),
            &[visible(0.4), MediaEvent::PlaybackStarted],
        );
        let (machine, effects) = run(machine, &[below(300.0)]);
        assert_eq!(effects, vec![Effect::Release]);

        let state = machine.state();
        assert!(!state.should_load && !state.is_loaded && !state.is_playing);
        assert_eq!(state.loading_progress, 0.0);

        // Repeated far-away observations are no-ops
        let (again, effects) = run(machine.clone(), &[below(600.0), below(900.0)]);
        assert!(effects.is_empty());
        assert_eq!(again.state(), machine.state());
    }

    #[test]
    fn test_stale_ready_after_eviction_ignored() {
        let (machine, _) = run(
            SlotMachine::new(ConnectionQuality::Fast),
            &[visible(0.15), MediaEvent::LoadTimerFired, below(500.0), MediaEvent::MediaReady],
        );
        assert!(!machine.state().is_loaded);
    }

    #[test]
    fn test_playback_started_before_ready_is_refused() {
        let (machine, effects) = run(
            SlotMachine::new(ConnectionQuality::Fast),
            &[visible(0.15), MediaEvent::LoadTimerFired, MediaEvent::PlaybackStarted],
        );
        assert!(!machine.state().is_playing);
        assert_eq!(effects.last(), Some(&Effect::Pause));
    }

    #[test]
    fn test_play_rejected_records_error() {
        let (machine, _) = run(
            loaded(ConnectionQuality::Fast),
            &[visible(0.4), MediaEvent::PlayRejected],
        );
        assert_eq!(machine.state().error, Some(MediaErrorKind::AutoplayBlocked));
        assert!(!machine.state().is_playing);

        // The next qualifying observation tries again
        let (machine, effects) = run(machine, &[visible(0.5)]);
        assert_eq!(effects, vec![Effect::Play]);

        let (machine, _) = run(machine, &[MediaEvent::PlaybackStarted]);
        assert_eq!(machine.state().error, None);
    }

    #[test]
    fn test_media_error() {
        let (machine, _) = run(
            loaded(ConnectionQuality::Fast),
            &[MediaEvent::MediaError(MediaErrorKind::MediaLoadFailed)],
        );
        assert_eq!(machine.state().error, Some(MediaErrorKind::MediaLoadFailed));
        assert!(!machine.state().is_loaded);
        assert!(machine.state().should_load);
    }

    #[test]
    fn test_request_play_before_ready_defers() {
        let (machine, effects) = run(
            SlotMachine::new(ConnectionQuality::Fast),
            &[visible(0.15), MediaEvent::LoadTimerFired, MediaEvent::PlayRequested],
        );
        assert!(machine.state().has_user_interacted);
        assert!(!machine.state().is_playing);
        assert!(!effects.contains(&Effect::Play));

        // Ready while in view resumes the user's request even below play threshold
        let (_, effects) = run(machine, &[MediaEvent::MediaReady]);
        assert_eq!(effects, vec![Effect::Play]);
    }

    #[test]
    fn test_failed_load_retried_on_user_play() {
        let (machine, _) = run(
            SlotMachine::new(ConnectionQuality::Fast),
            &[
                visible(0.4),
                MediaEvent::LoadTimerFired,
                MediaEvent::MediaError(MediaErrorKind::MediaLoadFailed),
            ],
        );
        assert_eq!(machine.phase(), MediaPhase::Loading);

        let (machine, effects) = run(machine, &[MediaEvent::PlayRequested]);
        assert_eq!(
            effects,
            vec![Effect::Release, Effect::Attach { strategy: LoadStrategy::Full }]
        );
        assert_eq!(machine.state().error, None);
        assert!(machine.state().should_load);

        let (machine, effects) = run(machine, &[MediaEvent::MediaReady]);
        assert_eq!(effects, vec![Effect::Play]);
        assert!(machine.play_pending());
    }

    #[test]
    fn test_failed_load_retried_on_qualifying_visibility() {
        let (machine, _) = run(
            SlotMachine::new(ConnectionQuality::Fast),
            &[
                visible(0.4),
                MediaEvent::LoadTimerFired,
                MediaEvent::MediaError(MediaErrorKind::Unknown),
            ],
        );

        // Below the loading threshold nothing is retried
        let (machine, effects) = run(machine, &[visible(0.05)]);
        assert!(effects.is_empty());

        let (machine, effects) = run(machine, &[visible(0.9)]);
        assert_eq!(
            effects,
            vec![Effect::Release, Effect::Attach { strategy: LoadStrategy::Full }]
        );

        // The retry is in flight; further observations wait for its outcome
        let (_, effects) = run(machine, &[visible(0.95)]);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_play_sent_once_until_confirmed() {
        let (machine, effects) = run(
            loaded(ConnectionQuality::Fast),
            &[visible(0.4), visible(0.5), visible(0.8), MediaEvent::PlayRequested],
        );
        assert_eq!(effects, vec![Effect::Play]);
        assert!(machine.play_pending());

        let (machine, effects) = run(machine, &[MediaEvent::PlaybackStarted, visible(0.9)]);
        assert!(effects.is_empty());
        assert!(!machine.play_pending());
        assert!(machine.state().is_playing);
    }

    #[test]
    fn test_playback_confirmed_after_leaving_view_is_paused() {
        let (machine, effects) = run(
            SlotMachine::new(ConnectionQuality::Fast),
            &[
                visible(0.4),
                MediaEvent::LoadTimerFired,
                MediaEvent::MediaReady,
                visible(0.5),
                below(50.0),
                MediaEvent::PlaybackStarted,
            ],
        );
        assert_eq!(
            effects,
            vec![
                Effect::ScheduleLoad { delay: DEFAULT_LOAD_DELAY },
                Effect::Attach { strategy: LoadStrategy::Full },
                Effect::Play,
                Effect::Pause,
            ]
        );
        assert!(!machine.state().is_in_view);
        assert!(!machine.state().is_playing);
        assert!(!machine.play_pending());

        // Coming back into view asks again
        let (_, effects) = run(machine, &[visible(0.6)]);
        assert_eq!(effects, vec![Effect::Play]);
    }

    #[test]
    fn test_pause_while_play_pending() {
        let (machine, _) = run(loaded(ConnectionQuality::Fast), &[visible(0.4)]);
        let (machine, effects) = run(machine, &[MediaEvent::PauseRequested]);
        assert_eq!(effects, vec![Effect::Pause]);
        assert!(!machine.play_pending());
    }

    #[test]
    fn test_request_play_while_idle_attaches_immediately() {
        let (machine, effects) = run(
            SlotMachine::new(ConnectionQuality::Slow),
            &[visible(0.15), MediaEvent::PlayRequested],
        );
        assert_eq!(
            effects,
            vec![
                Effect::ScheduleLoad { delay: SLOW_LOAD_DELAY },
                Effect::CancelLoad,
                Effect::Attach { strategy: LoadStrategy::None },
            ]
        );
        assert!(machine.state().should_load);
        assert!(!machine.load_pending());
    }

    #[test]
    fn test_request_pause() {
        let (machine, _) = run(
            loaded(ConnectionQuality::Fast),
            &[visible(0.4), MediaEvent::PlaybackStarted],
        );
        let (machine, effects) = run(machine, &[MediaEvent::PauseRequested]);
        assert_eq!(effects, vec![Effect::Pause]);
        assert!(!machine.state().is_playing);

        let (_, effects) = run(machine, &[MediaEvent::PauseRequested]);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_progress() {
        let (machine, _) = run(
            SlotMachine::new(ConnectionQuality::Fast),
            &[visible(0.15), MediaEvent::LoadTimerFired, MediaEvent::Progress(0.42)],
        );
        assert!((machine.state().loading_progress - 42.0).abs() < 1e-9);

        let (machine, _) = run(machine, &[MediaEvent::Progress(3.0)]);
        assert_eq!(machine.state().loading_progress, 100.0);
    }

    #[test]
    fn test_images_never_play() {
        let config = config();
        let mut machine = SlotMachine::new(ConnectionQuality::Fast);
        let mut effects = Vec::new();
        for event in [
            visible(0.9),
            MediaEvent::LoadTimerFired,
            MediaEvent::MediaReady,
            visible(1.0),
            MediaEvent::PlayRequested,
        ] {
            let step = machine.apply(&config, MediaKind::Image, event);
            machine = step.machine;
            effects.extend(step.effects);
        }
        assert!(!effects.contains(&Effect::Play));
        assert_eq!(machine.phase(), MediaPhase::Ready);
    }

    #[test]
    fn test_destroy_cancels_and_releases() {
        let (machine, effects) = run(
            SlotMachine::new(ConnectionQuality::Fast),
            &[visible(0.15), MediaEvent::Destroyed],
        );
        assert_eq!(effects.last(), Some(&Effect::CancelLoad));
        assert!(machine.is_destroyed());

        let (machine, effects) = run(loaded(ConnectionQuality::Fast), &[MediaEvent::Destroyed]);
        assert_eq!(effects, vec![Effect::Release]);
        assert_eq!(machine.phase(), MediaPhase::Idle);

        // Destroyed machines ignore further input
        let (machine, effects) = run(machine, &[visible(1.0), MediaEvent::LoadTimerFired]);
        assert!(effects.is_empty());
        assert!(!machine.state().should_load);
    }

    #[test]
    fn test_network_change_affects_next_debounce() {
        let (machine, effects) = run(
            SlotMachine::new(ConnectionQuality::Fast),
            &[MediaEvent::NetworkChanged(ConnectionQuality::Slow), visible(0.4)],
        );
        assert_eq!(effects, vec![Effect::ScheduleLoad { delay: SLOW_LOAD_DELAY }]);
        assert_eq!(machine.state().preferred_load_strategy(), LoadStrategy::None);
    }
}
