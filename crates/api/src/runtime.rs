//! Game runtime
//!
//! All mutable game state lives in one [`GameCore`] behind a single mutex.
//! A detection loop grabs frames and spawns pose inference without awaiting
//! it, a timer loop drives the round countdown, and a command loop applies
//! start/stop/restart requests. Each pipeline activation bumps a generation
//! counter; inference results from an older generation are dropped.

use std::sync::Arc;
use std::time::Instant;

use camera_capture::{CameraError, FrameSampler, FrameSource, VideoFrame};
use face_tracker::FaceTracker;
use pose_landmarks::{LandmarkError, LandmarkProvider, Pose};
use target_game::{Bounds, GameSession, SessionError, TickOutcome};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::metrics;
use crate::snapshot::{round_message, ErrorReport, GameSnapshot};

/// Errors returned to command callers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Camera unavailable: {0}")]
    Camera(#[from] CameraError),

    #[error("Game runtime has shut down")]
    Closed,
}

/// Current time on the runtime clock
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Frame captured for an inference that has not completed yet
pub struct PendingInference {
    pub generation: u64,
    pub frame: VideoFrame,
}

/// Aggregate game state
pub struct GameCore {
    camera: Box<dyn FrameSource>,
    tracker: FaceTracker,
    session: GameSession,
    running: bool,
    generation: u64,
    /// Generation of the outstanding inference, if any
    in_flight: Option<u64>,
    inference_every: u64,
    ticks: u64,
    last_error: Option<ErrorReport>,
}

impl GameCore {
    pub fn new(config: &AppConfig, camera: Box<dyn FrameSource>) -> Result<Self, ApiError> {
        let (width, height) = (config.camera.width, config.camera.height);
        let tracker = FaceTracker::new(config.tracker.clone(), width, height)?;
        let bounds = Bounds::new(width, height);
        let session = match config.runtime.seed {
            Some(seed) => GameSession::seeded(config.game.clone(), bounds, seed)?,
            None => GameSession::new(config.game.clone(), bounds)?,
        };
        Ok(Self {
            camera,
            tracker,
            session,
            running: false,
            generation: 0,
            in_flight: None,
            inference_every: config.runtime.inference_every.max(1),
            ticks: 0,
            last_error: None,
        })
    }

    /// Bring the pipeline up if needed, then start a round
    pub fn start(&mut self, now: Instant) -> Result<(), RuntimeError> {
        if !self.running {
            self.activate()?;
        }
        let scale = self.tracker.current().head.scale;
        self.session.start(self.running, scale, now)?;
        Ok(())
    }

    /// Begin a fresh round on a live pipeline
    pub fn restart(&mut self, now: Instant) -> Result<(), RuntimeError> {
        let scale = self.tracker.current().head.scale;
        self.session.restart(self.running, scale, now)?;
        self.tracker.on_round_restart();
        Ok(())
    }

    /// Tear the pipeline down and return to idle
    pub fn stop(&mut self) {
        if self.running {
            info!("Stopping detection pipeline (generation {})", self.generation);
        }
        self.deactivate();
    }

    fn activate(&mut self) -> Result<(), CameraError> {
        if let Err(e) = self.camera.open() {
            warn!("Camera open failed: {}", e);
            self.last_error = Some(ErrorReport::from(&e));
            return Err(e);
        }
        self.running = true;
        self.generation += 1;
        self.ticks = 0;
        self.last_error = None;
        metrics::set_tracking_active(true);
        info!("Detection pipeline started (generation {})", self.generation);
        Ok(())
    }

    fn deactivate(&mut self) {
        self.camera.close();
        if self.running {
            self.generation += 1;
        }
        self.running = false;
        self.session.stop();
        metrics::set_tracking_active(false);
    }

    /// Fatal pipeline failure: go idle and keep the report for the user
    fn fail(&mut self, report: ErrorReport) {
        warn!("Detection pipeline failed: {}", report.message);
        self.last_error = Some(report);
        self.deactivate();
    }

    /// One detection tick. Returns a frame to run inference on when this tick
    /// is an inference tick and no inference is outstanding.
    pub fn on_detection_tick(&mut self) -> Option<PendingInference> {
        if !self.running {
            return None;
        }
        self.ticks += 1;
        if self.ticks % self.inference_every != 0 || self.in_flight.is_some() {
            return None;
        }
        match self.camera.grab() {
            Ok(frame) => {
                self.in_flight = Some(self.generation);
                Some(PendingInference {
                    generation: self.generation,
                    frame,
                })
            }
            Err(e) => {
                self.fail(ErrorReport::from(&e));
                None
            }
        }
    }

    /// Apply a finished inference. Returns false if the result was discarded.
    pub fn apply_inference(
        &mut self,
        generation: u64,
        frame: &VideoFrame,
        result: Result<Vec<Pose>, LandmarkError>,
        now: Instant,
    ) -> bool {
        // Stale or not, the outstanding call is done
        if self.in_flight == Some(generation) {
            self.in_flight = None;
        }
        if generation != self.generation || !self.running {
            debug!(
                "Discarding inference from generation {} (current {})",
                generation, self.generation
            );
            metrics::record_stale_result();
            return false;
        }

        let poses = match result {
            Ok(poses) => poses,
            Err(e) => {
                metrics::record_inference_failure(e.category());
                self.fail(ErrorReport::from(&e));
                return false;
            }
        };
        // Single-subject game: extra poses are ignored
        if let Some(pose) = poses.first() {
            let analysis = self.tracker.process(pose, Some(frame as &dyn FrameSampler));
            self.session.on_detection(pose, analysis.head.scale, now);
        }
        true
    }

    pub fn on_timer_tick(&mut self, now: Instant) -> TickOutcome {
        if !self.running {
            return TickOutcome::Inactive;
        }
        self.session.on_timer_tick(now)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let session = self.session.snapshot();
        GameSnapshot {
            face: self.tracker.current(),
            message: round_message(&session),
            session,
            tracking_active: self.running,
            frames_processed: self.tracker.frames_processed(),
            last_error: self.last_error.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }
}

/// Inbound user commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Start,
    Stop,
    Restart,
}

impl CommandKind {
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Start => "start",
            CommandKind::Stop => "stop",
            CommandKind::Restart => "restart",
        }
    }
}

type Reply = oneshot::Sender<Result<GameSnapshot, RuntimeError>>;

struct Command {
    kind: CommandKind,
    reply: Reply,
}

/// Cloneable client side of the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<GameSnapshot>,
}

impl RuntimeHandle {
    pub async fn start(&self) -> Result<GameSnapshot, RuntimeError> {
        self.send(CommandKind::Start).await
    }

    pub async fn stop(&self) -> Result<GameSnapshot, RuntimeError> {
        self.send(CommandKind::Stop).await
    }

    pub async fn restart(&self) -> Result<GameSnapshot, RuntimeError> {
        self.send(CommandKind::Restart).await
    }

    async fn send(&self, kind: CommandKind) -> Result<GameSnapshot, RuntimeError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command { kind, reply })
            .await
            .map_err(|_| RuntimeError::Closed)?;
        response.await.map_err(|_| RuntimeError::Closed)?
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> GameSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GameSnapshot> {
        self.snapshots.clone()
    }
}

/// Background tasks owned by a running runtime
pub struct RuntimeTasks {
    handles: Vec<JoinHandle<()>>,
}

impl RuntimeTasks {
    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

/// Spawns and wires the runtime loops
pub struct GameRuntime;

impl GameRuntime {
    pub fn spawn<P: LandmarkProvider>(
        core: GameCore,
        provider: Arc<P>,
        config: &AppConfig,
    ) -> (RuntimeHandle, RuntimeTasks) {
        let (snapshot_tx, snapshot_rx) = watch::channel(core.snapshot());
        let snapshots = Arc::new(snapshot_tx);
        let core = Arc::new(Mutex::new(core));
        let (command_tx, command_rx) = mpsc::channel(config.runtime.command_buffer.max(1));

        info!(
            "Game runtime using {} (detection every {} ms, inference every {} ticks)",
            provider.name(),
            config.runtime.detection_interval_ms,
            config.runtime.inference_every
        );

        let handles = vec![
            tokio::spawn(detection_loop(
                Arc::clone(&core),
                provider,
                Arc::clone(&snapshots),
                config.runtime.detection_interval(),
            )),
            tokio::spawn(timer_loop(
                Arc::clone(&core),
                Arc::clone(&snapshots),
                config.game.timer_interval(),
            )),
            tokio::spawn(command_loop(core, snapshots, command_rx)),
        ];

        (
            RuntimeHandle {
                commands: command_tx,
                snapshots: snapshot_rx,
            },
            RuntimeTasks { handles },
        )
    }
}

async fn detection_loop<P: LandmarkProvider>(
    core: Arc<Mutex<GameCore>>,
    provider: Arc<P>,
    snapshots: Arc<watch::Sender<GameSnapshot>>,
    period: std::time::Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let pending = {
            let mut core = core.lock().await;
            let was_running = core.is_running();
            let pending = core.on_detection_tick();
            if was_running && !core.is_running() {
                snapshots.send_replace(core.snapshot());
            }
            pending
        };
        let Some(pending) = pending else {
            continue;
        };

        let core = Arc::clone(&core);
        let provider = Arc::clone(&provider);
        let snapshots = Arc::clone(&snapshots);
        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let result = provider.estimate_poses(&pending.frame).await;
            metrics::record_inference(started.elapsed());

            let mut core = core.lock().await;
            if core.apply_inference(pending.generation, &pending.frame, result, now()) {
                snapshots.send_replace(core.snapshot());
            } else if !core.is_running() {
                snapshots.send_replace(core.snapshot());
            }
        });
    }
}

async fn timer_loop(
    core: Arc<Mutex<GameCore>>,
    snapshots: Arc<watch::Sender<GameSnapshot>>,
    period: std::time::Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let mut core = core.lock().await;
        if let TickOutcome::Lost { score } = core.on_timer_tick(now()) {
            debug!("Timer expired with score {}", score);
        }
        snapshots.send_replace(core.snapshot());
    }
}

async fn command_loop(
    core: Arc<Mutex<GameCore>>,
    snapshots: Arc<watch::Sender<GameSnapshot>>,
    mut commands: mpsc::Receiver<Command>,
) {
    while let Some(Command { kind, reply }) = commands.recv().await {
        let mut core = core.lock().await;
        let result = match kind {
            CommandKind::Start => core.start(now()),
            CommandKind::Restart => core.restart(now()),
            CommandKind::Stop => {
                core.stop();
                Ok(())
            }
        };
        metrics::record_command(kind.name(), result.is_ok());
        if let Err(e) = &result {
            info!("Command {} rejected: {}", kind.name(), e);
        }
        let snapshot = core.snapshot();
        snapshots.send_replace(snapshot.clone());
        // Caller may have gone away
        let _ = reply.send(result.map(|()| snapshot));
    }
    debug!("Command channel closed");
}
