//! Game events and the sinks that receive them.
//!
//! Events are fire-and-forget notifications for UI and analytics. The
//! simulation never reads them back, so a sink may drop them freely.

use std::sync::mpsc;

use serde::{Deserialize, Serialize};

/// Currency a gain was paid in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    /// Soft currency.
    Scrap,
    /// Prestige currency.
    Blueprints,
}

/// Where a resource gain came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GainSource {
    /// Building production.
    Production,
    /// Damage dealt to the current enemy.
    Damage,
    /// Wave completion bonus.
    WaveClear,
    /// Scrap-find special effect.
    ScrapFind,
    /// Offline batch.
    Offline,
    /// Guaranteed final boss drop.
    FinalBoss,
    /// Prestige reset.
    Prestige,
}

/// Notification emitted by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A wave was cleared.
    WaveCleared {
        /// Wave that was cleared.
        wave: u32,
        /// Completion scrap paid.
        reward: u64,
        /// It was a boss wave.
        was_boss: bool,
    },
    /// The timer ran out; the wave will be retried.
    WaveFailed {
        /// Wave that failed.
        wave: u32,
    },
    /// A new enemy appeared.
    EnemySpawned {
        /// Wave number.
        wave: u32,
        /// Display name.
        name: String,
        /// Starting health.
        max_health: f64,
        /// Timer for the wave.
        timer: f64,
    },
    /// A timed building upgrade started.
    UpgradeStarted {
        /// Building id.
        building: String,
        /// Scrap paid.
        cost: u64,
        /// Seconds of work needed.
        duration_seconds: f64,
    },
    /// A building reached a new level.
    BuildingUpgraded {
        /// Building id.
        building: String,
        /// New level.
        level: u32,
    },
    /// A building became available.
    BuildingUnlocked {
        /// Building id.
        building: String,
    },
    /// A building moved to a higher evolution tier.
    BuildingEvolved {
        /// Building id.
        building: String,
        /// Previous tier.
        from_tier: u32,
        /// New tier.
        to_tier: u32,
    },
    /// Currency was added to the player.
    ResourceGained {
        /// Currency.
        resource: Resource,
        /// Amount added.
        amount: u64,
        /// Origin.
        source: GainSource,
    },
    /// The player prestiged.
    PrestigeTriggered {
        /// Prestige count after the reset.
        prestige_count: u32,
        /// Blueprints awarded.
        blueprints_earned: u64,
        /// Wave the reset was triggered from.
        from_wave: u32,
    },
    /// A wave clear dropped a timed boost.
    LuckyDrop {
        /// Boost multiplier.
        multiplier: f64,
        /// Boost duration.
        duration_ms: i64,
    },
    /// A tap triggered a burst.
    BurstAttack {
        /// Damage dealt by the tap.
        damage: f64,
        /// Burst multiplier.
        multiplier: f64,
    },
    /// A boost was granted.
    BoostApplied {
        /// Boost id.
        id: String,
        /// Multiplier.
        multiplier: f64,
        /// Duration.
        duration_ms: i64,
    },
    /// A boost ran out.
    BoostExpired {
        /// Boost id.
        id: String,
    },
    /// Builders were added to the pool.
    BuildersGranted {
        /// Builders added.
        added: u32,
        /// Builders dropped at the pool cap.
        dropped: u32,
    },
    /// A synergy's requirements started holding.
    SynergyActivated {
        /// Synergy id.
        id: String,
    },
    /// A synergy's requirements stopped holding.
    SynergyDeactivated {
        /// Synergy id.
        id: String,
    },
}

/// Receiver of [`GameEvent`]s.
pub trait EventSink {
    /// Deliver one event.
    fn emit(&mut self, event: GameEvent);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: GameEvent) {}
}

impl EventSink for Vec<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        self.push(event);
    }
}

impl EventSink for mpsc::Sender<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        // A closed channel means nobody is listening any more.
        let _ = self.send(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: GameEvent) {
        (**self).emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_collects() {
        let mut sink = Vec::new();
        sink.emit(GameEvent::WaveFailed { wave: 3 });
        assert_eq!(sink, vec![GameEvent::WaveFailed { wave: 3 }]);
    }

    #[test]
    fn test_channel_sink() {
        let (mut tx, rx) = mpsc::channel();
        tx.emit(GameEvent::BoostExpired { id: "boost-1".into() });
        assert_eq!(rx.recv().ok(), Some(GameEvent::BoostExpired { id: "boost-1".into() }));

        drop(rx);
        // Sending into a closed channel is silently ignored.
        tx.emit(GameEvent::WaveFailed { wave: 1 });
    }

    #[test]
    fn test_null_sink_accepts_anything() {
        let mut sink = NullSink;
        sink.emit(GameEvent::WaveFailed { wave: 1 });
    }
}
