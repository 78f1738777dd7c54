//! The driver that owns the live session.
//!
//! Ticks and controls from every source (frame interval, terminal UI,
//! control socket) are funnelled into one task and applied in arrival order.
//! Every new session is published on a watch channel.

use crate::clock::FrameClock;
use crate::session::{Event, Session};
use crate::view::available_controls;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use spark_ipc::{BlockSnapshot, Control, SessionSnapshot, SessionStatus};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

const MESSAGE_BUFFER: usize = 64;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{control} is not available while {status}")]
pub struct ControlRejected {
    pub control: Control,
    pub status: SessionStatus,
}

pub enum Message {
    Dispatch {
        control: Control,
        reply: Option<oneshot::Sender<Result<(), ControlRejected>>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

pub struct App {
    session: Session,
    started_at: Option<DateTime<Local>>,
    clock: FrameClock,
    tick_interval: Duration,
    messages: mpsc::Receiver<Message>,
    updates: watch::Sender<Session>,
}

/// Cloneable access to a running [`App`].
#[derive(Clone)]
pub struct AppHandle {
    messages: mpsc::Sender<Message>,
    updates: watch::Receiver<Session>,
}

impl App {
    pub fn new(session: Session, tick_interval: Duration) -> (Self, AppHandle) {
        let (messages_tx, messages_rx) = mpsc::channel(MESSAGE_BUFFER);
        let (updates_tx, updates_rx) = watch::channel(session.clone());
        let app = Self {
            session,
            started_at: None,
            clock: FrameClock::new(),
            tick_interval,
            messages: messages_rx,
            updates: updates_tx,
        };
        let handle = AppHandle {
            messages: messages_tx,
            updates: updates_rx,
        };
        (app, handle)
    }

    #[cfg(test)]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs until every handle has been dropped.
    pub async fn run(mut self) {
        let mut interval = time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                instant = interval.tick() => {
                    if let Some(delta_ms) = self.clock.delta(instant.into_std()) {
                        self.apply(Event::Tick { delta_ms });
                    }
                }
                message = self.messages.recv() => match message {
                    Some(message) => self.handle(message),
                    None => break,
                },
            }
        }
        debug!("All handles dropped, stopping session driver");
    }

    fn handle(&mut self, message: Message) {
        match message {
            Message::Dispatch { control, reply } => {
                let result = self.dispatch(control);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            Message::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    /// Applies `control` if the current status offers it.
    pub fn dispatch(&mut self, control: Control) -> Result<(), ControlRejected> {
        let status = self.session.status();
        if !available_controls(status).contains(&control) {
            warn!("Rejected {} while {}", control, status);
            return Err(ControlRejected { control, status });
        }
        info!("Control: {}", control);
        match control {
            Control::Start => self.started_at = Some(Local::now()),
            Control::Reset => self.started_at = None,
            Control::Pause | Control::Resume => {}
        }
        self.apply(Event::Control(control));
        Ok(())
    }

    fn apply(&mut self, event: Event) {
        let previous = self.session.clone();
        self.session = previous.clone().reduce(event);
        if self.session == previous {
            return;
        }

        if self.session.current_index() > previous.current_index() {
            if let Some(block) = previous.current_block() {
                info!("Block {:?} done", block.title());
            }
        }
        if self.session.status() == SessionStatus::Ended
            && previous.status() != SessionStatus::Ended
        {
            info!("Session ended");
        }
        self.updates.send_replace(self.session.clone());
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.session.status(),
            current_index: self.session.current_index(),
            started_at: self.started_at,
            blocks: self
                .session
                .blocks()
                .iter()
                .map(|block| BlockSnapshot {
                    title: block.title().to_string(),
                    status: block.status(),
                    elapsed_ms: block.elapsed_ms(),
                    total_ms: block.total_ms(),
                })
                .collect(),
        }
    }
}

impl AppHandle {
    /// The latest published session.
    pub fn session(&self) -> Session {
        self.updates.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.updates.clone()
    }

    pub async fn dispatch(&self, control: Control) -> Result<Result<(), ControlRejected>> {
        let (reply, response) = oneshot::channel();
        self.messages
            .send(Message::Dispatch {
                control,
                reply: Some(reply),
            })
            .await
            .map_err(|_| anyhow!("Session driver stopped"))?;
        Ok(response.await?)
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply, response) = oneshot::channel();
        self.messages
            .send(Message::Snapshot { reply })
            .await
            .map_err(|_| anyhow!("Session driver stopped"))?;
        Ok(response.await?)
    }

    /// Fire-and-forget dispatch from a non-async thread.
    pub fn blocking_dispatch(&self, control: Control) -> Result<()> {
        self.messages
            .blocking_send(Message::Dispatch {
                control,
                reply: None,
            })
            .map_err(|_| anyhow!("Session driver stopped"))
    }
}
