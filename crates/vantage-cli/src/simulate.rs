//! Deterministic scroll simulation
//!
//! Replays a [`Trace`] against one controller per slot on a virtual clock.
//! The simulated host answers the controller the way a browser would:
//! timers fire after their delay, attached sources become ready after the
//! trace's latency, and play attempts either start or are rejected.

use crate::trace::{StepAction, Trace};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};
use vantage_core::{
    Capabilities, ElementRect, InfiniteFeed, LoadScheduler, LoadStrategy, MediaDescriptor,
    MediaElement, MediaErrorKind, MediaPhase, MediaViewportController, NetworkConditions,
    NetworkMonitor, ObserverOptions, TimerToken, Viewport, ViewportConfig, VisibilityTracker,
};

/// One change of a slot's observable state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineRow {
    pub at_ms: u64,
    pub slot: String,
    pub phase: MediaPhase,
    pub in_view: bool,
    pub should_load: bool,
    pub loaded: bool,
    pub playing: bool,
    pub progress: f64,
    pub error: Option<MediaErrorKind>,
    pub thumbnail: bool,
}

/// Per-slot counters over the whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlotSummary {
    pub slot: String,
    pub loads: u32,
    pub releases: u32,
    pub plays: u32,
    pub rejected_plays: u32,
    pub final_phase: Option<MediaPhase>,
}

/// Result of a simulation
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub config: ViewportConfig,
    pub timeline: Vec<TimelineRow>,
    pub slots: Vec<SlotSummary>,
    /// Most slots holding loaded media at the same instant
    pub peak_loaded: usize,
    pub duration_ms: u64,
}

/// Requests the controller made of its host
#[derive(Debug, Clone, Copy, PartialEq)]
enum Request {
    Schedule(TimerToken, Duration),
    Attach(LoadStrategy),
    Play,
    Release,
}

#[derive(Debug, Default)]
struct HostState {
    next_token: u64,
    requests: Vec<Request>,
}

/// Simulated platform for one slot
#[derive(Debug, Clone, Default)]
struct SimHost(Arc<Mutex<HostState>>);

impl SimHost {
    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn drain(&self) -> Vec<Request> {
        std::mem::take(&mut self.lock().requests)
    }
}

impl VisibilityTracker for SimHost {
    fn observe(&mut self, options: &ObserverOptions) {
        debug!(thresholds = ?options.thresholds, margin = %options.root_margin_css(), "Observing slot");
    }

    fn disconnect(&mut self) {}
}

impl MediaElement for SimHost {
    fn attach(&mut self, _media: &MediaDescriptor, strategy: LoadStrategy) {
        self.lock().requests.push(Request::Attach(strategy));
    }

    fn play(&mut self) {
        self.lock().requests.push(Request::Play);
    }

    fn pause(&mut self) {}

    fn release(&mut self) {
        self.lock().requests.push(Request::Release);
    }
}

impl LoadScheduler for SimHost {
    fn schedule(&mut self, delay: Duration) -> TimerToken {
        let mut state = self.lock();
        state.next_token += 1;
        let token = TimerToken(state.next_token);
        state.requests.push(Request::Schedule(token, delay));
        token
    }

    // Cancelled tokens are still delivered; the controller drops stale ones
    fn cancel(&mut self, _token: TimerToken) {}
}

#[derive(Debug, Clone)]
struct SharedNetwork(Arc<Mutex<NetworkConditions>>);

impl NetworkMonitor for SharedNetwork {
    fn conditions(&self) -> NetworkConditions {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, Copy)]
enum SimEvent {
    Step(usize),
    FeedPage,
    TimerFired { slot: usize, token: TimerToken },
    Progress { slot: usize, generation: u64 },
    MediaReady { slot: usize, generation: u64 },
    PlayOutcome { slot: usize, generation: u64 },
}

#[derive(Debug)]
struct Scheduled {
    at_ms: u64,
    seq: u64,
    event: SimEvent,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.at_ms, self.seq) == (other.at_ms, other.seq)
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    // Reversed so the max-heap pops the earliest event first
    fn cmp(&self, other: &Self) -> Ordering {
        (other.at_ms, other.seq).cmp(&(self.at_ms, self.seq))
    }
}

struct MountedSlot {
    index: usize,
    rect: ElementRect,
    host: SimHost,
    controller: MediaViewportController,
    /// Bumped on release so late callbacks from a detached source are dropped
    generation: u64,
    last_row: Option<TimelineRow>,
}

/// Virtual-clock replay of one trace
pub struct Simulation {
    trace: Trace,
    config: ViewportConfig,
    network: Arc<Mutex<NetworkConditions>>,
    viewport: Viewport,
    clock_ms: u64,
    seq: u64,
    queue: BinaryHeap<Scheduled>,
    feed: Option<InfiniteFeed<usize>>,
    mounted: Vec<MountedSlot>,
    by_name: HashMap<String, usize>,
    summaries: Vec<SlotSummary>,
    timeline: Vec<TimelineRow>,
    peak_loaded: usize,
}

impl Simulation {
    pub fn new(trace: Trace) -> anyhow::Result<Self> {
        let config = trace.resolve_config()?;
        let viewport = Viewport::new(trace.viewport_height, config.viewport_margin);
        let feed = trace
            .page_size
            .map(|size| InfiniteFeed::with_page_size((0..trace.slots.len()).collect(), size));
        let by_name = trace
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (slot.name.clone(), i))
            .collect();
        let summaries = trace
            .slots
            .iter()
            .map(|slot| SlotSummary {
                slot: slot.name.clone(),
                ..Default::default()
            })
            .collect();

        Ok(Self {
            network: Arc::new(Mutex::new(trace.network)),
            trace,
            config,
            viewport,
            clock_ms: 0,
            seq: 0,
            queue: BinaryHeap::new(),
            feed,
            mounted: Vec::new(),
            by_name,
            summaries,
            timeline: Vec::new(),
            peak_loaded: 0,
        })
    }

    /// Run the trace to completion
    pub fn run(mut self) -> anyhow::Result<Report> {
        let step_times: Vec<u64> = self.trace.steps.iter().map(|step| step.at_ms).collect();
        for (i, at) in step_times.into_iter().enumerate() {
            self.push(at, SimEvent::Step(i));
        }

        match self.feed.as_mut() {
            Some(feed) => {
                if feed.begin_load() {
                    let at = self.trace.page_delay_ms;
                    self.push(at, SimEvent::FeedPage);
                }
            }
            None => {
                for index in 0..self.trace.slots.len() {
                    self.mount(index)?;
                }
                self.record();
            }
        }

        while let Some(Scheduled { at_ms, event, .. }) = self.queue.pop() {
            self.clock_ms = at_ms;
            self.handle(event)?;
            self.record();
        }

        for slot in &self.mounted {
            self.summaries[slot.index].final_phase = Some(slot.controller.phase());
        }

        info!(
            slots = self.mounted.len(),
            rows = self.timeline.len(),
            peak_loaded = self.peak_loaded,
            "Simulation finished"
        );

        Ok(Report {
            config: self.config,
            timeline: self.timeline,
            slots: self.summaries,
            peak_loaded: self.peak_loaded,
            duration_ms: self.clock_ms,
        })
    }

    fn push(&mut self, at_ms: u64, event: SimEvent) {
        self.seq += 1;
        self.queue.push(Scheduled {
            at_ms,
            seq: self.seq,
            event,
        });
    }

    fn handle(&mut self, event: SimEvent) -> anyhow::Result<()> {
        match event {
            SimEvent::Step(i) => {
                let action = self.trace.steps[i].action.clone();
                self.apply_step(action)?;
            }
            SimEvent::FeedPage => self.reveal_page()?,
            SimEvent::TimerFired { slot, token } => {
                if let Some(mounted) = self.slot_mut(slot) {
                    mounted.controller.on_load_timer_fired(token);
                }
                self.flush(slot);
            }
            SimEvent::Progress { slot, generation } => {
                if let Some(mounted) = self.live_slot(slot, generation) {
                    mounted.controller.on_progress(0.5);
                }
                self.flush(slot);
            }
            SimEvent::MediaReady { slot, generation } => {
                if let Some(mounted) = self.live_slot(slot, generation) {
                    mounted.controller.on_media_ready();
                }
                self.flush(slot);
            }
            SimEvent::PlayOutcome { slot, generation } => {
                let blocked = self.trace.autoplay_blocked;
                let mut rejected = false;
                if let Some(mounted) = self.live_slot(slot, generation) {
                    if blocked && !mounted.controller.state().has_user_interacted {
                        mounted.controller.on_play_rejected();
                        rejected = true;
                    } else {
                        mounted.controller.on_playback_started();
                    }
                }
                if rejected {
                    self.summaries[slot].rejected_plays += 1;
                }
                self.flush(slot);
            }
        }
        Ok(())
    }

    fn apply_step(&mut self, action: StepAction) -> anyhow::Result<()> {
        match action {
            StepAction::Scroll { scroll_top } => {
                self.viewport = self.viewport.scrolled_to(scroll_top);
                debug!(at_ms = self.clock_ms, scroll_top, "Scroll");
                self.observe_all();
                self.maybe_request_page();
            }
            StepAction::Play { slot } => {
                let index = self.index_of(&slot)?;
                if let Some(mounted) = self.slot_mut(index) {
                    mounted.controller.request_play();
                }
                self.flush(index);
            }
            StepAction::Pause { slot } => {
                let index = self.index_of(&slot)?;
                if let Some(mounted) = self.slot_mut(index) {
                    mounted.controller.request_pause();
                }
                self.flush(index);
            }
            StepAction::Network { conditions } => {
                *self.network.lock().unwrap_or_else(|p| p.into_inner()) = conditions;
                let indices: Vec<usize> = self.mounted.iter().map(|m| m.index).collect();
                for index in indices {
                    if let Some(mounted) = self.slot_mut(index) {
                        mounted.controller.on_network_changed();
                    }
                }
            }
            StepAction::Error { slot } => {
                let index = self.index_of(&slot)?;
                if let Some(mounted) = self.slot_mut(index) {
                    mounted.controller.on_media_error(MediaErrorKind::MediaLoadFailed);
                }
                self.flush(index);
            }
        }
        Ok(())
    }

    fn reveal_page(&mut self) -> anyhow::Result<()> {
        let revealed: Vec<usize> = match self.feed.as_mut() {
            Some(feed) => feed.complete_load().to_vec(),
            None => return Ok(()),
        };
        info!(at_ms = self.clock_ms, count = revealed.len(), "Revealing page");
        for index in revealed {
            self.mount(index)?;
        }
        self.maybe_request_page();
        Ok(())
    }

    fn maybe_request_page(&mut self) {
        let document_height = self
            .mounted
            .iter()
            .map(|m| m.rect.bottom())
            .fold(0.0, f64::max);
        let scroll_top = self.viewport.scroll_top;
        let height = self.viewport.height;

        let requested = match self.feed.as_mut() {
            Some(feed) => {
                feed.should_load_more(scroll_top, height, document_height) && feed.begin_load()
            }
            None => false,
        };
        if requested {
            let at = self.clock_ms + self.trace.page_delay_ms;
            self.push(at, SimEvent::FeedPage);
        }
    }

    fn mount(&mut self, index: usize) -> anyhow::Result<()> {
        let slot = &self.trace.slots[index];
        let host = SimHost::default();
        let controller = MediaViewportController::new(
            slot.media.clone(),
            self.config.clone(),
            Capabilities {
                tracker: Box::new(host.clone()),
                network: Box::new(SharedNetwork(self.network.clone())),
                element: Box::new(host.clone()),
                scheduler: Box::new(host.clone()),
            },
        )?;

        self.mounted.push(MountedSlot {
            index,
            rect: slot.rect(),
            host,
            controller,
            generation: 0,
            last_row: None,
        });

        // Trackers report once when observation starts
        let observation = self.viewport.observe(&slot.rect());
        if let Some(mounted) = self.slot_mut(index) {
            mounted.controller.on_visibility_changed(observation);
        }
        self.flush(index);
        Ok(())
    }

    fn observe_all(&mut self) {
        let viewport = self.viewport;
        let indices: Vec<usize> = self.mounted.iter().map(|m| m.index).collect();
        for index in indices {
            if let Some(mounted) = self.slot_mut(index) {
                let observation = viewport.observe(&mounted.rect);
                mounted.controller.on_visibility_changed(observation);
            }
            self.flush(index);
        }
    }

    /// Turn the host requests of one slot into future events
    fn flush(&mut self, index: usize) {
        let Some(position) = self.mounted.iter().position(|m| m.index == index) else {
            return;
        };
        let requests = self.mounted[position].host.drain();
        let latency = self.trace.ready_latency_ms;

        for request in requests {
            let generation = self.mounted[position].generation;
            match request {
                Request::Schedule(token, delay) => {
                    let at = self.clock_ms + delay.as_millis() as u64;
                    self.push(at, SimEvent::TimerFired { slot: index, token });
                }
                Request::Attach(strategy) => {
                    debug!(slot = index, strategy = %strategy, "Source attached");
                    self.summaries[index].loads += 1;
                    let now = self.clock_ms;
                    self.push(now + latency / 2, SimEvent::Progress { slot: index, generation });
                    self.push(now + latency, SimEvent::MediaReady { slot: index, generation });
                }
                Request::Play => {
                    self.summaries[index].plays += 1;
                    let now = self.clock_ms;
                    self.push(now, SimEvent::PlayOutcome { slot: index, generation });
                }
                Request::Release => {
                    self.summaries[index].releases += 1;
                    self.mounted[position].generation += 1;
                }
            }
        }
    }

    /// Append a timeline row for every slot whose state changed
    fn record(&mut self) {
        let at_ms = self.clock_ms;
        for mounted in &mut self.mounted {
            let state = mounted.controller.state();
            let row = TimelineRow {
                at_ms,
                slot: self.trace.slots[mounted.index].name.clone(),
                phase: mounted.controller.phase(),
                in_view: state.is_in_view,
                should_load: state.should_load,
                loaded: state.is_loaded,
                playing: state.is_playing,
                progress: state.loading_progress,
                error: state.error,
                thumbnail: state.should_render_thumbnail(),
            };

            let changed = match &mounted.last_row {
                Some(last) => TimelineRow { at_ms, ..last.clone() } != row,
                None => true,
            };
            if changed {
                self.timeline.push(row.clone());
                mounted.last_row = Some(row);
            }
        }

        let loaded = self
            .mounted
            .iter()
            .filter(|m| m.controller.state().should_load)
            .count();
        self.peak_loaded = self.peak_loaded.max(loaded);
    }

    fn index_of(&self, name: &str) -> anyhow::Result<usize> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("unknown slot '{name}'"))
    }

    fn slot_mut(&mut self, index: usize) -> Option<&mut MountedSlot> {
        self.mounted.iter_mut().find(|m| m.index == index)
    }

    fn live_slot(&mut self, index: usize, generation: u64) -> Option<&mut MountedSlot> {
        self.slot_mut(index).filter(|m| m.generation == generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(extra: &str, steps: &str) -> Trace {
        let raw = format!(
            r#"{{
                "config": {{"loading_threshold": 0.1, "play_threshold": 0.3, "unload_distance": 200, "viewport_margin": 0}},
                "network": {{"effective_type": "4g"}},
                {extra}
                "slots": [
                    {{"name": "lobby", "media": {{"url": "https://cdn.example.com/lobby.mp4", "kind": "video"}}, "top": 1000, "height": 400}},
                    {{"name": "pool", "media": {{"url": "https://cdn.example.com/pool.jpg", "kind": "image"}}, "top": 4000, "height": 400}}
                ],
                "steps": {steps}
            }}"#
        );
        Trace::parse(&raw).unwrap()
    }

    fn summary<'a>(report: &'a Report, name: &str) -> &'a SlotSummary {
        report.slots.iter().find(|s| s.slot == name).unwrap()
    }

    #[test]
    fn test_scroll_in_plays_and_scroll_away_evicts() {
        let report = Simulation::new(trace(
            "",
            r#"[
                {"at_ms": 0, "type": "scroll", "scroll_top": 0},
                {"at_ms": 100, "type": "scroll", "scroll_top": 700},
                {"at_ms": 1000, "type": "scroll", "scroll_top": 2200}
            ]"#,
        ))
        .unwrap()
        .run()
        .unwrap();

        let lobby = summary(&report, "lobby");
        assert_eq!(lobby.loads, 1);
        assert_eq!(lobby.plays, 1);
        assert_eq!(lobby.releases, 1);
        assert_eq!(lobby.final_phase, Some(MediaPhase::Idle));

        assert!(report
            .timeline
            .iter()
            .any(|row| row.slot == "lobby" && row.phase == MediaPhase::Playing));
        assert_eq!(summary(&report, "pool").loads, 0);
        assert_eq!(report.peak_loaded, 1);
    }

    #[test]
    fn test_autoplay_blocked_until_user_plays() {
        let report = Simulation::new(trace(
            r#""autoplay_blocked": true,"#,
            r#"[
                {"at_ms": 0, "type": "scroll", "scroll_top": 900},
                {"at_ms": 2000, "type": "play", "slot": "lobby"}
            ]"#,
        ))
        .unwrap()
        .run()
        .unwrap();

        let lobby = summary(&report, "lobby");
        assert_eq!(lobby.rejected_plays, 1);
        assert_eq!(lobby.plays, 2);
        assert_eq!(lobby.final_phase, Some(MediaPhase::Playing));
        assert!(report
            .timeline
            .iter()
            .any(|row| row.error == Some(MediaErrorKind::AutoplayBlocked)));
    }

    #[test]
    fn test_feed_reveals_pages() {
        let report = Simulation::new(trace(
            r#""page_size": 1, "page_delay_ms": 500,"#,
            r#"[
                {"at_ms": 600, "type": "scroll", "scroll_top": 600},
                {"at_ms": 3000, "type": "scroll", "scroll_top": 3700}
            ]"#,
        ))
        .unwrap()
        .run()
        .unwrap();

        assert_eq!(summary(&report, "pool").loads, 1);
        assert!(report.timeline.iter().any(|row| row.slot == "pool"));
    }
}
