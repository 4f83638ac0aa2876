//! The gameplay loop, reduced to what customization needs to integrate with:
//! a live hammer model and a swing counter that announces its new value on
//! every change.

pub mod model;

pub use model::{HammerModel, ModelPart};

use log::debug;
use tokio::sync::broadcast;

const EVENT_BUFFER: usize = 64;

/// Gameplay events, published as they happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// A nail went in; carries the new running total.
    NailsHammered(u64),
}

/// Owns the live hammer and the nail counter.
pub struct GameSession {
    hammer: HammerModel,
    nails_hammered: u64,
    events: broadcast::Sender<GameEvent>,
}

impl GameSession {
    pub fn new(hammer: HammerModel) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            hammer,
            nails_hammered: 0,
            events,
        }
    }

    /// One hammer strike. Returns the new total and publishes it; with no
    /// subscribers the event just goes nowhere.
    pub fn strike(&mut self) -> u64 {
        self.nails_hammered += 1;
        debug!("nail hammered, total {}", self.nails_hammered);
        let _ = self
            .events
            .send(GameEvent::NailsHammered(self.nails_hammered));
        self.nails_hammered
    }

    pub fn nails_hammered(&self) -> u64 {
        self.nails_hammered
    }

    /// Subscribes to gameplay events. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    pub fn hammer(&self) -> &HammerModel {
        &self.hammer
    }

    pub fn hammer_mut(&mut self) -> &mut HammerModel {
        &mut self.hammer
    }
}
