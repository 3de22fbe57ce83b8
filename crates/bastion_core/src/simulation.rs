//! The game aggregate and its tick loop.
//!
//! [`Game`] owns the balance configuration, the catalog, the snapshot state
//! and the seeded RNG. Hosts drive it with [`Game::tick`] on a fixed
//! wall-clock interval and call the action methods in between; events go
//! to whatever [`EventSink`] the caller passes in.
//!
//! # Determinism
//!
//! - All randomness comes from one `ChaCha8Rng` seeded at creation.
//! - The RNG stream position is saved in the snapshot, so a restored game
//!   continues the exact same stream.
//! - Buildings are stored in a `BTreeMap` and always visited in id order.
//! - Same seed + same ticks and actions => same [`Game::state_hash`].
//!
//! # Tick order
//!
//! 1. Upgrade timers
//! 2. Production
//! 3. Special effects (scrap-find)
//! 4. Boost decay
//! 5. Wave timer countdown
//! 6. Automatic damage
//! 7. Wave outcome (clear / fail)
//!
//! # Example
//!
//! ```
//! use bastion_core::events::NullSink;
//! use bastion_core::simulation::Game;
//!
//! let mut game = Game::standard(42);
//! game.assign_builder("scrap_collector", &mut NullSink).unwrap();
//! let report = game.tick(100, &mut NullSink);
//! assert_eq!(report.tick, 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::actions::PlayerAction;
use crate::boosts::{combined_multiplier, decay_boosts, BoostInstance, BoostScope};
use crate::builders::{check_consistency, AddBuildersOutcome, BuilderCounts, BuilderPool};
use crate::buildings::{upgrade_cost_for, upgrade_duration, BuildingInstance, TierChange};
use crate::combat::{
    auto_damage_per_second, calculate_tap_damage, check_outcome, strike, tier_multiplier,
    total_burst_chance, CombatModifiers, CombatOutcome, CombatState, TapResult,
};
use crate::config::BalanceConfig;
use crate::data::Catalog;
use crate::error::{ActionError, Result};
use crate::events::{EventSink, GainSource, GameEvent, Resource};
use crate::prestige::{
    self, calculate_blueprints_earned, calculate_bonuses, can_prestige, PrestigeBonuses,
    PrestigeOutcome, UpgradePurchase,
};
use crate::production::{
    calculate_offline_production, production_rates, tick_production, OfflineProduction,
    ProductionModifiers,
};
use crate::special_effects::{burst_boost_bonus, critical_weakness_chance, roll_wave_extend, tick_scrap_find};
use crate::state::{GameSnapshot, MigrationReport, PlayerState};
use crate::synergy::{active_synergies, calculate_synergy_bonuses, SynergyBonuses};
use crate::waves::{calculate_wave_reward, completion_payout, spawn_enemy_for_wave, timer_for_enemy};

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Tick number after this step (unchanged for a skipped tick).
    pub tick: u64,
    /// Milliseconds simulated; 0 when skipped.
    pub delta_ms: i64,
    /// Scrap from production.
    pub scrap_produced: u64,
    /// Scrap from automatic damage.
    pub scrap_from_damage: u64,
    /// Scrap from scrap-find.
    pub scrap_found: u64,
    /// Completion scrap from a cleared wave.
    pub wave_reward: u64,
    /// Automatic damage dealt.
    pub damage_dealt: f64,
    /// How the wave stood before being resolved.
    pub outcome: CombatOutcome,
}

impl TickReport {
    fn skipped(tick: u64) -> Self {
        Self {
            tick,
            delta_ms: 0,
            scrap_produced: 0,
            scrap_from_damage: 0,
            scrap_found: 0,
            wave_reward: 0,
            damage_dealt: 0.0,
            outcome: CombatOutcome::Continue,
        }
    }

    /// Total scrap gained this tick.
    #[must_use]
    pub fn scrap_gained(&self) -> u64 {
        self.scrap_produced
            .saturating_add(self.scrap_from_damage)
            .saturating_add(self.scrap_found)
            .saturating_add(self.wave_reward)
    }
}

/// Enemy as shown to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnemyView {
    /// Display name.
    pub name: String,
    /// Health left.
    pub current_health: f64,
    /// Health at spawn.
    pub max_health: f64,
    /// Boss wave.
    pub is_boss: bool,
}

/// Derived values for the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameView {
    /// Ticks processed.
    pub tick: u64,
    /// Current wave.
    pub wave: u32,
    /// Highest wave reached.
    pub highest_wave: u32,
    /// Scrap owned.
    pub scrap: u64,
    /// Blueprints owned.
    pub blueprints: u64,
    /// Prestige resets.
    pub prestige_count: u32,
    /// Builder ledger.
    pub builders: BuilderCounts,
    /// Scrap per second by production building.
    pub production_per_second: BTreeMap<String, f64>,
    /// Sum of `production_per_second`.
    pub total_production_per_second: f64,
    /// Current enemy.
    pub enemy: Option<EnemyView>,
    /// Seconds left on the wave.
    pub wave_timer: f64,
    /// Wave timer at spawn.
    pub wave_timer_max: f64,
    /// Active synergy ids.
    pub active_synergies: Vec<String>,
    /// Combined boost from boosts that apply everywhere.
    pub boost_multiplier: f64,
    /// Combined boost applied to production.
    pub production_boost: f64,
    /// Combined boost applied to damage and rewards.
    pub combat_boost: f64,
    /// Capped burst chance per tap.
    pub burst_chance: f64,
    /// Automatic damage per second.
    pub damage_per_second: f64,
    /// Blueprints a prestige would award now.
    pub blueprints_on_prestige: u64,
    /// Prestige is allowed.
    pub can_prestige: bool,
    /// Ticking suspended.
    pub paused: bool,
}

/// The simulation aggregate.
#[derive(Debug, Clone)]
pub struct Game {
    config: BalanceConfig,
    catalog: Catalog,
    state: GameSnapshot,
    rng: ChaCha8Rng,
    active_synergies: BTreeSet<String>,
}

impl Game {
    /// Start a new game.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn new(config: BalanceConfig, catalog: Catalog, seed: u64) -> Result<Self> {
        config.validate()?;
        let state = GameSnapshot::new(&catalog, &config, seed);
        Ok(Self::assemble(config, catalog, state))
    }

    /// Start a new game with the default balance and standard catalog.
    #[must_use]
    pub fn standard(seed: u64) -> Self {
        let config = BalanceConfig::default();
        let catalog = Catalog::standard();
        let state = GameSnapshot::new(&catalog, &config, seed);
        Self::assemble(config, catalog, state)
    }

    /// Restore a game from a snapshot, migrating it to the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn from_snapshot(
        config: BalanceConfig,
        catalog: Catalog,
        mut snapshot: GameSnapshot,
    ) -> Result<(Self, MigrationReport)> {
        config.validate()?;
        let report = snapshot.migrate(&catalog, &config);
        Ok((Self::assemble(config, catalog, snapshot), report))
    }

    fn assemble(config: BalanceConfig, catalog: Catalog, state: GameSnapshot) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(state.seed);
        rng.set_word_pos(u128::from(state.rng_word_pos));
        let mut game = Self {
            config,
            catalog,
            state,
            rng,
            active_synergies: BTreeSet::new(),
        };
        game.active_synergies = game.current_synergy_ids();
        if game.state.combat.current_enemy.is_none() {
            game.start_wave(&mut crate::events::NullSink);
        }
        game
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Balance configuration.
    #[must_use]
    pub fn config(&self) -> &BalanceConfig {
        &self.config
    }

    /// Game data.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Player progress.
    #[must_use]
    pub fn player(&self) -> &PlayerState {
        &self.state.player
    }

    /// All buildings by id.
    #[must_use]
    pub fn buildings(&self) -> &BTreeMap<String, BuildingInstance> {
        &self.state.buildings
    }

    /// One building.
    #[must_use]
    pub fn building(&self, id: &str) -> Option<&BuildingInstance> {
        self.state.buildings.get(id)
    }

    /// Combat state.
    #[must_use]
    pub fn combat(&self) -> &CombatState {
        &self.state.combat
    }

    /// Ticks processed.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.state.tick
    }

    /// Check whether ticking is suspended.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    /// A copy of the full state, ready to persist.
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        let mut snapshot = self.state.clone();
        snapshot.rng_word_pos = u64::try_from(self.rng.get_word_pos()).unwrap_or(u64::MAX);
        snapshot
    }

    // ========================================================================
    // Modifiers
    // ========================================================================

    fn prestige_bonuses(&self) -> PrestigeBonuses {
        calculate_bonuses(&self.state.player.prestige_upgrades, &self.catalog)
    }

    fn synergy_bonuses(&self) -> SynergyBonuses {
        calculate_synergy_bonuses(&active_synergies(&self.catalog, &self.state.buildings))
    }

    fn boost(&self, scope: BoostScope) -> f64 {
        combined_multiplier(
            &self.state.player.active_boosts,
            scope,
            self.config.boosts.max_combined_multiplier,
        )
    }

    fn production_modifiers(&self, prestige: &PrestigeBonuses, synergy: &SynergyBonuses) -> ProductionModifiers {
        ProductionModifiers {
            wave: self.state.player.current_wave,
            prestige: prestige.production,
            boost: self.boost(BoostScope::Production),
            synergy_production: synergy.production,
            synergy_efficiency: synergy.efficiency,
        }
    }

    fn combat_modifiers(&self, prestige: &PrestigeBonuses, synergy: &SynergyBonuses) -> CombatModifiers {
        let buildings = &self.state.buildings;
        CombatModifiers {
            prestige_tap_power: prestige.tap_power,
            prestige_auto_damage: prestige.auto_damage,
            prestige_burst_chance: prestige.burst_chance,
            prestige_burst_damage: prestige.burst_damage,
            tier_multiplier: tier_multiplier(buildings, &self.catalog, &self.config.combat),
            boost: self.boost(BoostScope::Combat),
            synergy_damage: synergy.damage,
            synergy_efficiency: synergy.efficiency,
            burst_boost: burst_boost_bonus(buildings, &self.catalog, &self.config.effects),
            critical_chance: critical_weakness_chance(buildings, &self.catalog, &self.config.effects),
            critical_multiplier: self.config.effects.critical_weakness.multiplier,
        }
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance the simulation by `delta_ms`.
    ///
    /// Non-positive deltas and paused games are skipped without any state
    /// change.
    pub fn tick(&mut self, delta_ms: i64, sink: &mut impl EventSink) -> TickReport {
        if delta_ms <= 0 || self.state.paused {
            return TickReport::skipped(self.state.tick);
        }
        let delta_seconds = delta_ms as f64 / 1000.0;
        self.state.tick += 1;
        self.state.elapsed_ms = self.state.elapsed_ms.saturating_add(delta_ms.unsigned_abs());

        let mut report = TickReport::skipped(self.state.tick);
        report.delta_ms = delta_ms;

        let prestige = self.prestige_bonuses();
        let synergy = self.synergy_bonuses();

        // 1. Upgrade timers
        let seconds_per_level = self.config.production.upgrade_seconds_per_level;
        for (id, building) in &mut self.state.buildings {
            if building.advance_upgrade(delta_seconds, synergy.upgrade_speed, seconds_per_level) {
                sink.emit(GameEvent::BuildingUpgraded {
                    building: id.clone(),
                    level: building.level,
                });
            }
        }

        // 2. Production
        let modifiers = self.production_modifiers(&prestige, &synergy);
        let production = tick_production(
            &mut self.state.buildings,
            &self.catalog,
            &self.config,
            &modifiers,
            delta_ms,
        );
        report.scrap_produced = production.produced;
        self.gain_scrap(production.produced, GainSource::Production, sink);

        // 3. Special effects
        let finds = tick_scrap_find(
            &mut self.state.buildings,
            &self.catalog,
            &self.config.effects,
            self.state.combat.wave_reward,
            prestige.scrap_gain,
            delta_seconds,
        );
        for find in finds {
            report.scrap_found = report.scrap_found.saturating_add(find.amount);
            self.gain_scrap(find.amount, GainSource::ScrapFind, sink);
        }

        // 4. Boost decay
        for expired in decay_boosts(&mut self.state.player.active_boosts, delta_ms) {
            sink.emit(GameEvent::BoostExpired { id: expired.id });
        }

        // 5. Wave timer
        self.state.combat.count_down(delta_seconds);

        // 6. Automatic damage
        if self.state.combat.live_enemy().is_some() {
            let modifiers = self.combat_modifiers(&prestige, &synergy);
            let dps = auto_damage_per_second(&self.state.buildings, &self.catalog, &self.config, &modifiers);
            let (dealt, scrap) = strike(
                &mut self.state.combat,
                dps * delta_seconds,
                self.config.combat.scrap_from_damage_fraction,
            );
            report.damage_dealt = dealt;
            report.scrap_from_damage = scrap;
            self.gain_scrap(scrap, GainSource::Damage, sink);
        }

        // 7. Wave outcome
        report.outcome = check_outcome(&self.state.combat);
        match report.outcome {
            CombatOutcome::EnemyDefeated => report.wave_reward = self.complete_wave(sink),
            CombatOutcome::TimerExpired => self.fail_wave(sink),
            CombatOutcome::Continue => {}
        }

        self.refresh_synergies(sink);

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.state.tick, state_hash = hash, "Simulation state hash");
        }
        self.debug_validate();

        report
    }

    fn gain_scrap(&mut self, amount: u64, source: GainSource, sink: &mut impl EventSink) {
        if amount == 0 {
            return;
        }
        self.state.player.add_scrap(amount);
        sink.emit(GameEvent::ResourceGained {
            resource: Resource::Scrap,
            amount,
            source,
        });
    }

    fn gain_blueprints(&mut self, amount: u64, source: GainSource, sink: &mut impl EventSink) {
        if amount == 0 {
            return;
        }
        self.state.player.add_blueprints(amount);
        sink.emit(GameEvent::ResourceGained {
            resource: Resource::Blueprints,
            amount,
            source,
        });
    }

    /// Spawn the enemy for the current wave with a fresh timer.
    fn start_wave(&mut self, sink: &mut impl EventSink) {
        let wave = self.state.player.current_wave;
        let Some(enemy) = spawn_enemy_for_wave(&self.catalog, &self.config.waves, wave) else {
            tracing::warn!(wave, "No enemy defined for wave");
            self.state.combat.end_wave();
            return;
        };

        let extend = roll_wave_extend(&self.state.buildings, &self.catalog, &self.config, &mut self.rng);
        let timer = timer_for_enemy(&enemy, &self.catalog, &self.config.waves, extend);
        let reward = calculate_wave_reward(
            wave,
            enemy.reward,
            self.prestige_bonuses().scrap_gain,
            self.boost(BoostScope::Combat),
            &self.config.waves,
        );

        sink.emit(GameEvent::EnemySpawned {
            wave,
            name: enemy.name.clone(),
            max_health: enemy.max_health,
            timer,
        });
        self.state.combat.begin_wave(enemy, timer, reward);
    }

    /// Pay out a cleared wave and move to the next one.
    fn complete_wave(&mut self, sink: &mut impl EventSink) -> u64 {
        let Some(enemy) = self.state.combat.current_enemy.clone() else {
            return 0;
        };
        let wave = self.state.player.current_wave;
        let synergy = self.synergy_bonuses();

        let payout = completion_payout(
            self.state.combat.wave_reward,
            self.config.combat.scrap_from_damage_fraction,
            synergy.kill_scrap,
        );
        self.gain_scrap(payout, GainSource::WaveClear, sink);
        sink.emit(GameEvent::WaveCleared {
            wave,
            reward: payout,
            was_boss: enemy.is_boss,
        });

        if enemy.is_final_boss {
            let drop = self.catalog.final_boss(wave).map_or(0, |boss| boss.drop_blueprints);
            self.gain_blueprints(drop, GainSource::FinalBoss, sink);
        } else {
            self.roll_lucky_drop(sink);
        }

        let player = &mut self.state.player;
        player.current_wave = player.current_wave.saturating_add(1);
        player.highest_wave = player.highest_wave.max(player.current_wave);
        let next_wave = player.current_wave;
        tracing::info!(wave, next_wave, payout, "Wave cleared");

        for (id, building) in &mut self.state.buildings {
            let Some(definition) = self.catalog.building(&building.type_id) else {
                continue;
            };
            match building.sync_with_wave(definition, next_wave) {
                TierChange::None => {}
                TierChange::Unlocked => sink.emit(GameEvent::BuildingUnlocked { building: id.clone() }),
                TierChange::Evolved { from, to } => sink.emit(GameEvent::BuildingEvolved {
                    building: id.clone(),
                    from_tier: from,
                    to_tier: to,
                }),
            }
        }

        self.start_wave(sink);
        payout
    }

    /// Retry the current wave with a fresh enemy and timer.
    fn fail_wave(&mut self, sink: &mut impl EventSink) {
        let wave = self.state.player.current_wave;
        tracing::info!(wave, "Wave failed");
        sink.emit(GameEvent::WaveFailed { wave });
        self.start_wave(sink);
    }

    fn roll_lucky_drop(&mut self, sink: &mut impl EventSink) {
        let waves = &self.config.waves;
        let (chance, multiplier, duration_ms) = (
            waves.lucky_drop_chance,
            waves.lucky_drop_multiplier,
            waves.lucky_drop_duration_ms,
        );
        if chance <= 0.0 || self.rng.gen::<f64>() >= chance {
            return;
        }
        let id = self.push_boost("lucky", multiplier, duration_ms, BoostScope::All);
        tracing::debug!(boost = %id, "Lucky drop");
        sink.emit(GameEvent::LuckyDrop {
            multiplier,
            duration_ms,
        });
    }

    fn push_boost(&mut self, prefix: &str, multiplier: f64, duration_ms: i64, scope: BoostScope) -> String {
        let player = &mut self.state.player;
        player.boosts_granted += 1;
        let id = format!("{prefix}-{}", player.boosts_granted);
        player.active_boosts.push(BoostInstance {
            id: id.clone(),
            remaining_duration_ms: duration_ms,
            multiplier,
            scope,
        });
        id
    }

    fn current_synergy_ids(&self) -> BTreeSet<String> {
        active_synergies(&self.catalog, &self.state.buildings)
            .into_iter()
            .map(|s| s.id.clone())
            .collect()
    }

    fn refresh_synergies(&mut self, sink: &mut impl EventSink) {
        let current = self.current_synergy_ids();
        for id in current.difference(&self.active_synergies) {
            sink.emit(GameEvent::SynergyActivated { id: id.clone() });
        }
        for id in self.active_synergies.difference(&current) {
            sink.emit(GameEvent::SynergyDeactivated { id: id.clone() });
        }
        self.active_synergies = current;
    }

    // ========================================================================
    // Player actions
    // ========================================================================

    fn pool(&mut self) -> BuilderPool<'_> {
        BuilderPool::new(
            &mut self.state.player.builders,
            &mut self.state.buildings,
            &self.catalog,
        )
    }

    /// Put an idle builder on a building.
    pub fn assign_builder(&mut self, building: &str, sink: &mut impl EventSink) -> std::result::Result<(), ActionError> {
        self.pool().assign(building)?;
        self.after_action(sink);
        Ok(())
    }

    /// Take a builder off a building.
    pub fn unassign_builder(&mut self, building: &str, sink: &mut impl EventSink) -> std::result::Result<(), ActionError> {
        self.pool().unassign(building)?;
        self.after_action(sink);
        Ok(())
    }

    /// Move a builder between buildings; nothing changes on failure.
    pub fn reassign_builder(
        &mut self,
        from: &str,
        to: &str,
        sink: &mut impl EventSink,
    ) -> std::result::Result<(), ActionError> {
        self.pool().reassign(from, to)?;
        self.after_action(sink);
        Ok(())
    }

    /// Pay scrap and start upgrading a building; returns the price.
    pub fn upgrade_building(&mut self, building: &str, sink: &mut impl EventSink) -> std::result::Result<u64, ActionError> {
        let unknown = || ActionError::UnknownBuilding(building.to_string());
        let instance = self.state.buildings.get(building).ok_or_else(unknown)?;
        let definition = self.catalog.building(&instance.type_id).ok_or_else(unknown)?;
        if !instance.is_unlocked {
            return Err(ActionError::BuildingLocked(building.to_string()));
        }
        if instance.is_upgrading() {
            return Err(ActionError::UpgradeInProgress(building.to_string()));
        }
        let cost = upgrade_cost_for(definition, instance).ok_or_else(unknown)?;
        let available = self.state.player.scrap;
        if available < cost {
            return Err(ActionError::InsufficientScrap {
                required: cost,
                available,
            });
        }

        let duration = upgrade_duration(instance.level, self.config.production.upgrade_seconds_per_level);
        self.state.player.scrap -= cost;
        let Some(instance) = self.state.buildings.get_mut(building) else {
            return Err(unknown());
        };
        if duration <= 0.0 {
            instance.level += 1;
            sink.emit(GameEvent::BuildingUpgraded {
                building: building.to_string(),
                level: instance.level,
            });
        } else {
            instance.upgrade_progress = Some(0.0);
            sink.emit(GameEvent::UpgradeStarted {
                building: building.to_string(),
                cost,
                duration_seconds: duration,
            });
        }
        self.after_action(sink);
        Ok(cost)
    }

    /// Tap the current enemy.
    pub fn tap(&mut self, weak_point: bool, sink: &mut impl EventSink) -> std::result::Result<TapResult, ActionError> {
        if self.state.paused {
            return Err(ActionError::Paused);
        }
        if self.state.combat.live_enemy().is_none() {
            return Err(ActionError::CombatInactive);
        }

        let modifiers = self.combat_modifiers(&self.prestige_bonuses(), &self.synergy_bonuses());
        let tap = calculate_tap_damage(
            &self.state.combat,
            &modifiers,
            &self.config.combat,
            weak_point,
            &mut self.rng,
        );
        let (_, scrap) = strike(
            &mut self.state.combat,
            tap.damage,
            self.config.combat.scrap_from_damage_fraction,
        );
        if tap.is_burst() {
            sink.emit(GameEvent::BurstAttack {
                damage: tap.damage,
                multiplier: tap.burst_multiplier,
            });
        }
        self.gain_scrap(scrap, GainSource::Damage, sink);
        // A killing blow resolves now so the next tap hits the next enemy.
        if check_outcome(&self.state.combat) == CombatOutcome::EnemyDefeated {
            self.complete_wave(sink);
        }
        self.after_action(sink);
        Ok(tap)
    }

    /// Buy one level of a prestige upgrade.
    pub fn purchase_upgrade(&mut self, upgrade: &str, sink: &mut impl EventSink) -> std::result::Result<UpgradePurchase, ActionError> {
        let purchase = prestige::purchase_upgrade(&mut self.state.player, &self.catalog, upgrade)?;
        tracing::debug!(upgrade, level = purchase.level, cost = purchase.cost, "Purchased upgrade");
        self.after_action(sink);
        Ok(purchase)
    }

    /// Reset the run for blueprints.
    pub fn execute_prestige(&mut self, sink: &mut impl EventSink) -> std::result::Result<PrestigeOutcome, ActionError> {
        let outcome = prestige::execute_prestige(
            &mut self.state.player,
            &mut self.state.buildings,
            &self.catalog,
            &self.config,
        )?;
        tracing::info!(
            prestige_count = outcome.prestige_count,
            blueprints = outcome.blueprints_earned,
            from_wave = outcome.from_wave,
            "Prestige"
        );

        sink.emit(GameEvent::PrestigeTriggered {
            prestige_count: outcome.prestige_count,
            blueprints_earned: outcome.blueprints_earned,
            from_wave: outcome.from_wave,
        });
        if outcome.blueprints_earned > 0 {
            sink.emit(GameEvent::ResourceGained {
                resource: Resource::Blueprints,
                amount: outcome.blueprints_earned,
                source: GainSource::Prestige,
            });
        }

        self.state.combat = CombatState::new(&self.config.combat);
        self.start_wave(sink);
        self.after_action(sink);
        Ok(outcome)
    }

    /// Buy a builder with blueprints; returns the price.
    pub fn purchase_builder(&mut self, sink: &mut impl EventSink) -> std::result::Result<u64, ActionError> {
        let cost = prestige::purchase_builder(&mut self.state.player, &self.config.builders)?;
        sink.emit(GameEvent::BuildersGranted { added: 1, dropped: 0 });
        self.after_action(sink);
        Ok(cost)
    }

    /// Purchase grant: add builders up to the pool cap.
    pub fn grant_builders(&mut self, count: u32, sink: &mut impl EventSink) -> std::result::Result<AddBuildersOutcome, ActionError> {
        if count == 0 {
            return Err(ActionError::InvalidGrant("builder grant of zero".to_string()));
        }
        let outcome = self.pool().add_builders(count);
        if outcome.dropped > 0 {
            tracing::warn!(dropped = outcome.dropped, "Builder grant exceeded pool cap");
        }
        sink.emit(GameEvent::BuildersGranted {
            added: outcome.added,
            dropped: outcome.dropped,
        });
        self.after_action(sink);
        Ok(outcome)
    }

    /// Purchase grant: a timed multiplier on everything.
    pub fn apply_boost(&mut self, multiplier: f64, duration_ms: i64, sink: &mut impl EventSink) -> std::result::Result<String, ActionError> {
        self.apply_scoped_boost(multiplier, duration_ms, BoostScope::All, sink)
    }

    /// Purchase grant: a timed multiplier limited to `scope`.
    pub fn apply_scoped_boost(
        &mut self,
        multiplier: f64,
        duration_ms: i64,
        scope: BoostScope,
        sink: &mut impl EventSink,
    ) -> std::result::Result<String, ActionError> {
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(ActionError::InvalidGrant(format!("boost multiplier {multiplier}")));
        }
        if duration_ms <= 0 {
            return Err(ActionError::InvalidGrant(format!("boost duration {duration_ms}ms")));
        }
        let id = self.push_boost("boost", multiplier, duration_ms, scope);
        sink.emit(GameEvent::BoostApplied {
            id: id.clone(),
            multiplier,
            duration_ms,
        });
        Ok(id)
    }

    /// Suspend ticking. Accumulated progress is untouched.
    pub fn pause(&mut self) {
        self.state.paused = true;
    }

    /// Resume ticking.
    pub fn resume(&mut self) {
        self.state.paused = false;
    }

    /// Apply any [`PlayerAction`].
    pub fn apply_action(&mut self, action: &PlayerAction, sink: &mut impl EventSink) -> std::result::Result<(), ActionError> {
        match action {
            PlayerAction::AssignBuilder { building } => self.assign_builder(building, sink),
            PlayerAction::UnassignBuilder { building } => self.unassign_builder(building, sink),
            PlayerAction::ReassignBuilder { from, to } => self.reassign_builder(from, to, sink),
            PlayerAction::UpgradeBuilding { building } => self.upgrade_building(building, sink).map(drop),
            PlayerAction::Tap { weak_point } => self.tap(*weak_point, sink).map(drop),
            PlayerAction::PurchaseUpgrade { upgrade } => self.purchase_upgrade(upgrade, sink).map(drop),
            PlayerAction::ExecutePrestige => self.execute_prestige(sink).map(drop),
            PlayerAction::PurchaseBuilder => self.purchase_builder(sink).map(drop),
            PlayerAction::GrantBuilders { count } => self.grant_builders(*count, sink).map(drop),
            PlayerAction::ApplyBoost {
                multiplier,
                duration_ms,
                scope,
            } => self
                .apply_scoped_boost(*multiplier, *duration_ms, *scope, sink)
                .map(drop),
            PlayerAction::Pause => {
                self.pause();
                Ok(())
            }
            PlayerAction::Resume => {
                self.resume();
                Ok(())
            }
        }
    }

    fn after_action(&mut self, sink: &mut impl EventSink) {
        self.refresh_synergies(sink);
        self.debug_validate();
    }

    // ========================================================================
    // Offline progress
    // ========================================================================

    /// Credit production for time spent away, as one batch.
    ///
    /// Boosts are not applied to offline production; they do run down by
    /// the elapsed time.
    pub fn apply_offline_progress(&mut self, elapsed_seconds: f64, sink: &mut impl EventSink) -> OfflineProduction {
        let prestige = self.prestige_bonuses();
        let synergy = self.synergy_bonuses();
        let modifiers = ProductionModifiers {
            boost: 1.0,
            ..self.production_modifiers(&prestige, &synergy)
        };
        let per_second: f64 = production_rates(&self.state.buildings, &self.catalog, &self.config, &modifiers)
            .values()
            .sum();
        let offline = calculate_offline_production(
            per_second,
            elapsed_seconds,
            &self.config.production,
            prestige.offline_efficiency,
        );
        self.gain_scrap(offline.scrap, GainSource::Offline, sink);

        let elapsed_ms = (elapsed_seconds.max(0.0) * 1000.0).min(i64::MAX as f64) as i64;
        for expired in decay_boosts(&mut self.state.player.active_boosts, elapsed_ms) {
            sink.emit(GameEvent::BoostExpired { id: expired.id });
        }
        tracing::info!(
            seconds = offline.seconds_credited,
            scrap = offline.scrap,
            "Applied offline progress"
        );
        offline
    }

    // ========================================================================
    // Derived values
    // ========================================================================

    /// Derived values for the UI.
    #[must_use]
    pub fn view(&self) -> GameView {
        let prestige = self.prestige_bonuses();
        let synergy = self.synergy_bonuses();
        let production = production_rates(
            &self.state.buildings,
            &self.catalog,
            &self.config,
            &self.production_modifiers(&prestige, &synergy),
        );
        let combat_modifiers = self.combat_modifiers(&prestige, &synergy);
        let combat = &self.state.combat;
        let player = &self.state.player;

        GameView {
            tick: self.state.tick,
            wave: player.current_wave,
            highest_wave: player.highest_wave,
            scrap: player.scrap,
            blueprints: player.blueprints,
            prestige_count: player.prestige_count,
            builders: player.builders,
            total_production_per_second: production.values().sum(),
            production_per_second: production,
            enemy: combat.current_enemy.as_ref().map(|e| EnemyView {
                name: e.name.clone(),
                current_health: e.current_health,
                max_health: e.max_health,
                is_boss: e.is_boss,
            }),
            wave_timer: combat.wave_timer,
            wave_timer_max: combat.wave_timer_max,
            active_synergies: self.active_synergies.iter().cloned().collect(),
            boost_multiplier: self.boost(BoostScope::All),
            production_boost: self.boost(BoostScope::Production),
            combat_boost: self.boost(BoostScope::Combat),
            burst_chance: total_burst_chance(combat, &combat_modifiers, &self.config.combat),
            damage_per_second: auto_damage_per_second(
                &self.state.buildings,
                &self.catalog,
                &self.config,
                &combat_modifiers,
            ),
            blueprints_on_prestige: calculate_blueprints_earned(player.current_wave, &self.config.prestige),
            can_prestige: can_prestige(player.current_wave, &self.config.prestige),
            paused: self.state.paused,
        }
    }

    /// Check every state invariant; returns the violations found.
    #[must_use]
    pub fn validate_invariants(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let player = &self.state.player;

        if !check_consistency(&player.builders, &self.state.buildings, &self.catalog) {
            problems.push(format!(
                "builder ledger inconsistent: total {}, available {}",
                player.builders.total, player.builders.available
            ));
        }
        let combat = &self.state.combat;
        if combat.wave_timer < 0.0 || combat.wave_timer > combat.wave_timer_max {
            problems.push(format!(
                "wave timer {} outside [0, {}]",
                combat.wave_timer, combat.wave_timer_max
            ));
        }
        if combat.wave_timer_max > self.config.waves.timer_ceiling {
            problems.push(format!("wave timer max {} above ceiling", combat.wave_timer_max));
        }
        let cap = self.config.boosts.max_combined_multiplier.max(1.0);
        for scope in [BoostScope::Production, BoostScope::Combat] {
            let boost = self.boost(scope);
            if boost > cap {
                problems.push(format!("{scope:?} boost {boost} above cap"));
            }
        }
        for (id, building) in &self.state.buildings {
            if building.level == 0 || building.evolution_tier == 0 {
                problems.push(format!("building '{id}' has level or tier 0"));
            }
        }
        if player.highest_wave < player.current_wave {
            problems.push("highest wave below current wave".to_string());
        }
        problems
    }

    fn debug_validate(&self) {
        #[cfg(feature = "debug-validation")]
        {
            let problems = self.validate_invariants();
            if !problems.is_empty() {
                tracing::error!(tick = self.state.tick, ?problems, "Invariant violation");
                debug_assert!(problems.is_empty(), "invariants violated: {problems:?}");
            }
        }
    }

    // ========================================================================
    // Hashing and serialization
    // ========================================================================

    /// Hash of the full state, RNG position included.
    ///
    /// Two games with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        if let Ok(bytes) = self.snapshot().serialize() {
            bytes.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Serialize the full state with bincode.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        self.snapshot().serialize()
    }

    /// Restore a game from [`Game::serialize`] output.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes or the configuration are invalid.
    pub fn deserialize(config: BalanceConfig, catalog: Catalog, data: &[u8]) -> Result<Self> {
        let snapshot = GameSnapshot::deserialize(data)?;
        Self::from_snapshot(config, catalog, snapshot).map(|(game, _)| game)
    }
}
