//! Async driver running a [`MapSession`] on a tokio task.
//!
//! The task owns the session. Commands arrive over an mpsc channel, timers
//! are a single `sleep_until` on the session's next deadline, and every new
//! plan is published on a watch channel.
//!
//! ```text
//!  SessionHandle ──SessionCommand──▶ ┌──────────────┐ ──RenderPlan──▶ watch
//!                                    │  MapSession  │
//!  CancellationToken ──────────────▶ └──────────────┘
//! ```

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant as TokioInstant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::expansion::ExpansionEvent;
use crate::geo::{Coordinate, Viewport};
use crate::listing::GeoPoint;
use crate::render::RenderPlan;
use crate::strategy::RenderStrategy;
use crate::telemetry::MetricsSnapshot;

use super::map_session::MapSession;

/// Command channel capacity.
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Events delivered to a running session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    SetListings(Vec<GeoPoint>),
    SetUserLocation(Option<Coordinate>),
    ForceStrategy(Option<RenderStrategy>),
    /// Intermediate viewport while panning; debounced.
    ViewportChanged(Viewport),
    /// Final viewport of a gesture; rendered immediately.
    ViewportSettled(Viewport),
    ClusterTapped(String),
    ContractRequested,
    /// The renderer started the current animation at `at`; its deadline
    /// is measured from there.
    AnimationStarted { at: std::time::Instant },
    /// The renderer finished the current animation.
    AnimationFinished,
    /// Disposes the session and ends the task.
    Dispose,
}

/// Errors from a [`SessionHandle`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("map session has shut down")]
    Closed,

    #[error("map session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Handle to a session running on a tokio task.
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    plans: watch::Receiver<Option<RenderPlan>>,
    cancellation: CancellationToken,
    task: JoinHandle<Option<MetricsSnapshot>>,
}

impl SessionHandle {
    /// Sends a command to the session.
    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// A receiver observing every published plan.
    pub fn plans(&self) -> watch::Receiver<Option<RenderPlan>> {
        self.plans.clone()
    }

    /// The most recently published plan.
    pub fn latest(&self) -> Option<RenderPlan> {
        self.plans.borrow().clone()
    }

    /// Whether the session task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancels the session; it disposes itself and the task ends.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Waits for the task to end, returning the session's final metrics.
    pub async fn join(self) -> Result<Option<MetricsSnapshot>, SessionError> {
        Ok(self.task.await?)
    }

    /// Cancels the session and waits for it to end.
    pub async fn shutdown(self) -> Result<Option<MetricsSnapshot>, SessionError> {
        self.cancel();
        self.join().await
    }
}

/// Spawns `session` onto the current tokio runtime.
///
/// The task ends when `cancellation` fires, a [`SessionCommand::Dispose`]
/// arrives, or every command sender is dropped. In each case the session is
/// disposed before the task returns.
pub fn spawn_session(session: MapSession, cancellation: CancellationToken) -> SessionHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (plan_tx, plan_rx) = watch::channel(None);
    let task = tokio::spawn(run_session(session, command_rx, plan_tx, cancellation.clone()));

    SessionHandle {
        commands: command_tx,
        plans: plan_rx,
        cancellation,
        task,
    }
}

async fn run_session(
    mut session: MapSession,
    mut commands: mpsc::Receiver<SessionCommand>,
    plans: watch::Sender<Option<RenderPlan>>,
    cancellation: CancellationToken,
) -> Option<MetricsSnapshot> {
    info!("Map session driver starting");

    loop {
        let deadline = session.next_deadline();
        let mut publish = false;

        tokio::select! {
            biased;

            _ = cancellation.cancelled() => {
                info!("Map session driver cancelled");
                break;
            }

            command = commands.recv() => match command {
                Some(SessionCommand::Dispose) | None => {
                    debug!("Map session driver received dispose");
                    break;
                }
                Some(command) => {
                    publish = apply(&mut session, command, now());
                }
            },

            _ = sleep_until(deadline) => {}
        }

        if let Some(plan) = session.poll(now()) {
            plans.send_replace(Some(plan.clone()));
        } else if publish {
            plans.send_replace(session.plan().cloned());
        }
    }

    let snapshot = session.on_session_dispose();
    info!("Map session driver stopped");
    snapshot
}

/// Applies a command; returns whether the plan changed.
fn apply(session: &mut MapSession, command: SessionCommand, now: std::time::Instant) -> bool {
    match command {
        SessionCommand::SetListings(listings) => {
            session.set_listings(listings);
            false
        }
        SessionCommand::SetUserLocation(location) => {
            session.set_user_location(location);
            false
        }
        SessionCommand::ForceStrategy(strategy) => {
            session.force_strategy(strategy);
            false
        }
        SessionCommand::ViewportChanged(viewport) => {
            session.on_viewport_changed(viewport, now);
            false
        }
        SessionCommand::ViewportSettled(viewport) => {
            session.on_viewport_settled(viewport, now).is_some()
        }
        SessionCommand::ClusterTapped(cluster_id) => session.on_cluster_tapped(&cluster_id, now),
        SessionCommand::ContractRequested => session.on_contract_requested(now),
        SessionCommand::AnimationStarted { at } => {
            session.on_animation_event(ExpansionEvent::AnimationStarted { at })
        }
        SessionCommand::AnimationFinished => {
            session.on_animation_event(ExpansionEvent::AnimationFinished)
        }
        SessionCommand::Dispose => false,
    }
}

/// Current time on tokio's clock, so a paused test clock drives the session.
fn now() -> std::time::Instant {
    TokioInstant::now().into_std()
}

async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(TokioInstant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
