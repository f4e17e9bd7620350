//! Sync orchestrator — owns the engine lifecycle and the periodic tick.
//!
//! The engine sits behind a `tokio::sync::Mutex` held for the full length
//! of every cycle, so a tick can never begin while a previous tick's
//! commit or send is still resolving, and producer calls (`enqueue`,
//! `register_ack`) serialize with cycles instead of racing them. The tick
//! itself is a plain `tokio::time::interval` with `Delay` missed-tick
//! behavior; a slow cycle pushes the next tick out rather than bursting.

use crate::engine::{CycleOutcome, EngineLifecycle, EngineSnapshot, SyncEngine};
use crate::error::{SyncError, SyncResult};
use crate::outbound::AckOutcome;
use crate::presence::PresenceStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uplink_types::{Ack, MessageId, ObjectKey, Packet, PacketId};

/// Events emitted for UI/observability.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A packet was transmitted (initial send or resend).
    PacketSent { packet_id: PacketId, resend: bool },
    /// The outstanding packet was acknowledged.
    PacketAcknowledged { packet_id: PacketId },
    /// The presence belief changed.
    PresenceChanged(PresenceStatus),
    /// An acknowledgement arrived that matched nothing actionable.
    AckAnomaly(AckOutcome),
    /// The store rejected a packet; the batch stayed queued.
    CommitFailed { error: String },
    /// The transport rejected a transmission; the packet will be retried.
    SendFailed { error: String },
}

/// Cloneable handle exposing the engine's public operations.
#[derive(Clone)]
pub struct SyncHandle {
    engine: Arc<Mutex<SyncEngine>>,
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncHandle {
    /// Queues a change-event for delivery. Works in any lifecycle state;
    /// messages queued before `start()` go out once the engine runs.
    pub async fn enqueue(&self, payload: impl Into<String>, object: ObjectKey) -> MessageId {
        self.engine.lock().await.enqueue(payload, object)
    }

    /// Registers an acknowledgement from the peer and reports how it was
    /// classified. Anomalies are emitted on the event stream, never fatal.
    pub async fn register_ack(&self, ack: Ack) -> AckOutcome {
        let (outcome, presence_changed) = {
            let mut engine = self.engine.lock().await;
            let before = engine.presence();
            let outcome = engine.register_ack(&ack);
            (outcome, engine.presence() != before)
        };

        match outcome {
            AckOutcome::Acknowledged(packet_id) => {
                let _ = self
                    .event_tx
                    .send(SyncEvent::PacketAcknowledged { packet_id })
                    .await;
            }
            anomaly => {
                let _ = self.event_tx.send(SyncEvent::AckAnomaly(anomaly)).await;
            }
        }
        if presence_changed {
            let _ = self
                .event_tx
                .send(SyncEvent::PresenceChanged(PresenceStatus::Online))
                .await;
        }
        outcome
    }

    /// Applies a presence transition from an external presence source.
    pub async fn update_presence(&self, status: PresenceStatus) {
        let changed = self.engine.lock().await.update_presence(status);
        if changed {
            let _ = self.event_tx.send(SyncEvent::PresenceChanged(status)).await;
        }
    }

    /// Engages or clears the diagnostic ack override.
    pub async fn override_acks(&self, enabled: bool) {
        self.engine.lock().await.override_acks(enabled);
    }

    /// Consumer side: applies a received packet through the configured
    /// sink and returns the acknowledgement to ship back.
    pub async fn receive(&self, packet: &Packet) -> SyncResult<Ack> {
        let engine = self.engine.lock().await;
        engine.receive(packet).await
    }

    /// Returns a point-in-time snapshot of the engine state.
    pub async fn status(&self) -> EngineSnapshot {
        self.engine.lock().await.snapshot()
    }
}

/// Drives the engine at a fixed period and owns its lifecycle.
pub struct SyncOrchestrator {
    engine: Arc<Mutex<SyncEngine>>,
    sync_rate: Duration,
    event_tx: mpsc::Sender<SyncEvent>,
    shutdown: Option<watch::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyncOrchestrator {
    /// Wraps an engine and returns the orchestrator plus the event stream.
    pub fn new(engine: SyncEngine) -> (Self, mpsc::Receiver<SyncEvent>) {
        let sync_rate = engine.config().sync_rate;
        let (event_tx, event_rx) = mpsc::channel(64);

        let orchestrator = Self {
            engine: Arc::new(Mutex::new(engine)),
            sync_rate,
            event_tx,
            shutdown: None,
            task: None,
        };
        (orchestrator, event_rx)
    }

    /// Returns a cloneable handle for producers and the inbound side.
    pub fn handle(&self) -> SyncHandle {
        SyncHandle {
            engine: Arc::clone(&self.engine),
            event_tx: self.event_tx.clone(),
        }
    }

    /// Whether the tick loop is currently running.
    pub async fn is_running(&self) -> bool {
        self.engine.lock().await.lifecycle() == EngineLifecycle::Running
    }

    /// Starts the periodic tick. Idempotent while running; refuses to
    /// start (lifecycle unchanged) when the config is invalid or a
    /// required collaborator is missing.
    pub async fn start(&mut self) -> SyncResult<()> {
        {
            let mut engine = self.engine.lock().await;
            if engine.lifecycle() == EngineLifecycle::Running {
                debug!("sync engine already running");
                return Ok(());
            }
            engine.ensure_ready()?;
            engine.set_lifecycle(EngineLifecycle::Running);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        self.shutdown = Some(shutdown_tx);
        self.task = Some(tokio::spawn(Self::run_tick_loop(
            Arc::clone(&self.engine),
            self.sync_rate,
            self.event_tx.clone(),
            shutdown_rx,
        )));

        info!("sync engine started, ticking every {:?}", self.sync_rate);
        Ok(())
    }

    /// Cancels future ticks and marks the engine stopped. A cycle already
    /// in flight completes under the engine lock; its mutations land
    /// safely but no further tick fires.
    pub async fn stop(&mut self) {
        {
            let mut engine = self.engine.lock().await;
            if engine.lifecycle() != EngineLifecycle::Running {
                debug!("sync engine not running, nothing to stop");
                return;
            }
            engine.set_lifecycle(EngineLifecycle::Stopped);
        }

        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!("sync engine stopped");
    }

    async fn run_tick_loop(
        engine: Arc<Mutex<SyncEngine>>,
        sync_rate: Duration,
        event_tx: mpsc::Sender<SyncEvent>,
        mut shutdown_rx: watch::Receiver<()>,
    ) {
        let mut ticker = tokio::time::interval(sync_rate);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Breaks on shutdown signal or the orchestrator dropping.
                _ = shutdown_rx.changed() => break,

                _ = ticker.tick() => {
                    let result = {
                        let mut engine = engine.lock().await;
                        if engine.lifecycle() != EngineLifecycle::Running {
                            break;
                        }
                        engine.run_cycle().await
                    };

                    match result {
                        Ok(CycleOutcome::Sent(packet_id)) => {
                            let _ = event_tx
                                .send(SyncEvent::PacketSent { packet_id, resend: false })
                                .await;
                        }
                        Ok(CycleOutcome::Resent(packet_id)) => {
                            let _ = event_tx
                                .send(SyncEvent::PacketSent { packet_id, resend: true })
                                .await;
                        }
                        Ok(CycleOutcome::PeerOffline) => {
                            let _ = event_tx
                                .send(SyncEvent::PresenceChanged(PresenceStatus::Offline))
                                .await;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!("sync cycle failed: {e}");
                            let event = match &e {
                                SyncError::Commit(msg) => {
                                    SyncEvent::CommitFailed { error: msg.clone() }
                                }
                                _ => SyncEvent::SendFailed { error: e.to_string() },
                            };
                            let _ = event_tx.send(event).await;
                        }
                    }
                }
            }
        }
    }
}
