//! Tokio slot driver
//!
//! Runs a [`MediaViewportController`] in its own task and publishes its state.

use crate::{
    config::ViewportConfig,
    controller::{
        Capabilities, LoadScheduler, MediaElement, MediaViewportController, NetworkMonitor,
        TimerToken, VisibilityTracker,
    },
    types::*,
    Error, Result,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Commands accepted by a running slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotCommand {
    Visibility(ViewportObservation),
    MediaReady,
    Progress(f64),
    PlaybackStarted,
    PlaybackPaused,
    PlaybackEnded,
    MediaError(MediaErrorKind),
    PlayRejected,
    RequestPlay,
    RequestPause,
    TogglePlay,
    NetworkChanged,
}

const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Default)]
struct Deadline {
    next_token: u64,
    armed: Option<(TimerToken, Instant)>,
}

/// [`LoadScheduler`] backed by a deadline the driver loop sleeps on
#[derive(Debug, Clone, Default)]
struct DeadlineScheduler {
    inner: Arc<Mutex<Deadline>>,
}

impl DeadlineScheduler {
    fn lock(&self) -> MutexGuard<'_, Deadline> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn armed(&self) -> Option<(TimerToken, Instant)> {
        self.lock().armed
    }

    fn disarm(&self, token: TimerToken) {
        let mut deadline = self.lock();
        if matches!(deadline.armed, Some((armed, _)) if armed == token) {
            deadline.armed = None;
        }
    }
}

impl LoadScheduler for DeadlineScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerToken {
        let mut deadline = self.lock();
        deadline.next_token += 1;
        let token = TimerToken(deadline.next_token);
        deadline.armed = Some((token, Instant::now() + delay));
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        self.disarm(token);
    }
}

/// Handle to a running media slot
#[derive(Debug)]
pub struct SlotHandle {
    id: SlotId,
    commands: mpsc::Sender<SlotCommand>,
    state: watch::Receiver<ControllerState>,
    task: JoinHandle<()>,
}

impl SlotHandle {
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Current state snapshot
    pub fn state(&self) -> ControllerState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.state.clone()
    }

    /// Deliver a host callback to the slot
    pub async fn send(&self, command: SlotCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::SlotClosed(self.id.to_string()))
    }

    pub async fn observe(&self, observation: ViewportObservation) -> Result<()> {
        self.send(SlotCommand::Visibility(observation)).await
    }

    /// Unmount the slot and wait for its task to finish
    pub async fn shutdown(self) -> Result<()> {
        let SlotHandle { id, commands, task, .. } = self;
        drop(commands);
        task.await
            .map_err(|e| Error::Internal(format!("slot {id} task failed: {e}")))
    }
}

/// Mount a media slot on the current tokio runtime
pub fn spawn_slot(
    media: MediaDescriptor,
    config: ViewportConfig,
    tracker: Box<dyn VisibilityTracker>,
    network: Box<dyn NetworkMonitor>,
    element: Box<dyn MediaElement>,
) -> Result<SlotHandle> {
    let scheduler = DeadlineScheduler::default();
    let controller = MediaViewportController::new(
        media,
        config,
        Capabilities {
            tracker,
            network,
            element,
            scheduler: Box::new(scheduler.clone()),
        },
    )?;

    let id = controller.id();
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (state_tx, state_rx) = watch::channel(controller.state().clone());

    let task = tokio::spawn(run_slot(controller, scheduler, command_rx, state_tx));

    Ok(SlotHandle {
        id,
        commands: command_tx,
        state: state_rx,
        task,
    })
}

#[instrument(skip_all, fields(slot = %controller.id()))]
async fn run_slot(
    mut controller: MediaViewportController,
    scheduler: DeadlineScheduler,
    mut commands: mpsc::Receiver<SlotCommand>,
    state_tx: watch::Sender<ControllerState>,
) {
    loop {
        let armed = scheduler.armed();

        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => apply_command(&mut controller, command),
                None => break,
            },
            token = wait_for(armed) => {
                scheduler.disarm(token);
                controller.on_load_timer_fired(token);
            }
        }

        publish(&state_tx, controller.state());
    }

    controller.destroy();
    publish(&state_tx, controller.state());
    debug!("Slot driver stopped");
}

async fn wait_for(armed: Option<(TimerToken, Instant)>) -> TimerToken {
    match armed {
        Some((token, at)) => {
            tokio::time::sleep_until(at).await;
            token
        }
        None => std::future::pending().await,
    }
}

fn apply_command(controller: &mut MediaViewportController, command: SlotCommand) {
    match command {
        SlotCommand::Visibility(observation) => controller.on_visibility_changed(observation),
        SlotCommand::MediaReady => controller.on_media_ready(),
        SlotCommand::Progress(fraction) => controller.on_progress(fraction),
        SlotCommand::PlaybackStarted => controller.on_playback_started(),
        SlotCommand::PlaybackPaused => controller.on_playback_paused(),
        SlotCommand::PlaybackEnded => controller.on_playback_ended(),
        SlotCommand::MediaError(kind) => controller.on_media_error(kind),
        SlotCommand::PlayRejected => controller.on_play_rejected(),
        SlotCommand::RequestPlay => controller.request_play(),
        SlotCommand::RequestPause => controller.request_pause(),
        SlotCommand::TogglePlay => controller.toggle_play(),
        SlotCommand::NetworkChanged => controller.on_network_changed(),
    }
}

fn publish(state_tx: &watch::Sender<ControllerState>, state: &ControllerState) {
    state_tx.send_if_modified(|current| {
        if current != state {
            *current = state.clone();
            true
        } else {
            false
        }
    });
}
