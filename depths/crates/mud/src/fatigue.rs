//! Per-actor attack quota with a cooldown window.
//!
//! An actor starts with a level-derived quota. Each successful action spends
//! one; spending the last one starts the fatigue window, during which every
//! gated action is refused. Once the window has passed, the next query drops
//! the record and the actor is back at a full quota.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActorId {
    Player(String),
    Npc(u64),
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorId::Player(name) => write!(f, "player:{}", name),
            ActorId::Npc(id) => write!(f, "npc:{}", id),
        }
    }
}

/// Attacks allowed per window at `level`.
pub fn quota_for_level(level: u32) -> u32 {
    2 + level.saturating_sub(1) / 5
}

#[derive(Debug, Clone)]
struct FatigueRecord {
    /// `None` while the actor is only tracking quota.
    fatigue_end: Option<Instant>,
    attacks_remaining: u32,
}

impl FatigueRecord {
    fn expired(&self, now: Instant) -> bool {
        self.fatigue_end.is_some_and(|end| now >= end)
    }
}

#[derive(Debug)]
pub struct FatigueLimiter {
    cooldown: Duration,
    records: Mutex<HashMap<ActorId, FatigueRecord>>,
}

impl FatigueLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ActorId, FatigueRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn attacks_remaining(&self, actor: &ActorId, level: u32) -> u32 {
        self.attacks_remaining_at(actor, level, Instant::now())
    }

    /// Read-only: never creates or removes a record.
    pub fn attacks_remaining_at(&self, actor: &ActorId, level: u32, now: Instant) -> u32 {
        match self.lock().get(actor) {
            Some(record) if record.expired(now) => quota_for_level(level),
            Some(record) => record.attacks_remaining,
            None => quota_for_level(level),
        }
    }

    pub fn is_fatigued(&self, actor: &ActorId) -> bool {
        self.is_fatigued_at(actor, Instant::now())
    }

    /// Clears an expired record as a side effect.
    pub fn is_fatigued_at(&self, actor: &ActorId, now: Instant) -> bool {
        let mut records = self.lock();
        let Some(record) = records.get(actor) else {
            return false;
        };
        match record.fatigue_end {
            None => false,
            Some(end) if now >= end => {
                records.remove(actor);
                tracing::debug!(%actor, "fatigue expired");
                false
            }
            Some(_) => true,
        }
    }

    pub fn use_action(&self, actor: &ActorId, level: u32) -> bool {
        self.use_action_at(actor, level, Instant::now())
    }

    /// The only mutating entry point. The check and the decrement happen
    /// under one lock.
    pub fn use_action_at(&self, actor: &ActorId, level: u32, now: Instant) -> bool {
        let mut records = self.lock();

        if records.get(actor).is_some_and(|r| r.expired(now)) {
            records.remove(actor);
        }

        let record = records.entry(actor.clone()).or_insert_with(|| FatigueRecord {
            fatigue_end: None,
            attacks_remaining: quota_for_level(level),
        });

        if record.fatigue_end.is_some() || record.attacks_remaining == 0 {
            return false;
        }

        record.attacks_remaining -= 1;
        if record.attacks_remaining == 0 {
            record.fatigue_end = Some(now + self.cooldown);
            tracing::debug!(%actor, cooldown_secs = self.cooldown.as_secs_f64(), "actor fatigued");
        }
        true
    }

    pub fn remaining_fatigue_seconds(&self, actor: &ActorId) -> f64 {
        self.remaining_fatigue_seconds_at(actor, Instant::now())
    }

    pub fn remaining_fatigue_seconds_at(&self, actor: &ActorId, now: Instant) -> f64 {
        self.lock()
            .get(actor)
            .and_then(|r| r.fatigue_end)
            .map(|end| end.saturating_duration_since(now).as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Drop an actor's record, e.g. when an NPC dies.
    pub fn forget(&self, actor: &ActorId) {
        self.lock().remove(actor);
    }

    pub fn tracked_actors(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> ActorId {
        ActorId::Player("Ayla".into())
    }

    fn limiter() -> FatigueLimiter {
        FatigueLimiter::new(Duration::from_secs(15))
    }

    #[test]
    fn quota_grows_every_five_levels() {
        assert_eq!(quota_for_level(1), 2);
        assert_eq!(quota_for_level(5), 2);
        assert_eq!(quota_for_level(6), 3);
        assert_eq!(quota_for_level(11), 4);
        assert_eq!(quota_for_level(0), 2);
    }

    #[test]
    fn reading_quota_creates_no_record() {
        let limiter = limiter();
        assert_eq!(limiter.attacks_remaining(&player(), 11), 4);
        assert_eq!(limiter.tracked_actors(), 0);
        assert!(!limiter.is_fatigued(&player()));
    }

    #[test]
    fn level_one_gets_two_attacks_then_fatigue() {
        let limiter = limiter();
        let t0 = Instant::now();
        let actor = player();

        assert!(limiter.use_action_at(&actor, 1, t0));
        assert!(!limiter.is_fatigued_at(&actor, t0));
        assert_eq!(limiter.attacks_remaining_at(&actor, 1, t0), 1);

        assert!(limiter.use_action_at(&actor, 1, t0));
        assert!(!limiter.use_action_at(&actor, 1, t0));
        assert!(limiter.is_fatigued_at(&actor, t0));
        assert!((limiter.remaining_fatigue_seconds_at(&actor, t0) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn quota_resets_after_cooldown() {
        let limiter = limiter();
        let t0 = Instant::now();
        let actor = player();
        limiter.use_action_at(&actor, 1, t0);
        limiter.use_action_at(&actor, 1, t0);

        let later = t0 + Duration::from_secs(16);
        assert_eq!(limiter.remaining_fatigue_seconds_at(&actor, later), 0.0);
        assert!(!limiter.is_fatigued_at(&actor, later));
        assert_eq!(limiter.tracked_actors(), 0);
        assert_eq!(limiter.attacks_remaining_at(&actor, 1, later), 2);

        assert!(limiter.use_action_at(&actor, 1, later));
        assert!(limiter.use_action_at(&actor, 1, later));
        assert!(!limiter.use_action_at(&actor, 1, later));
    }

    #[test]
    fn expired_record_is_replaced_on_use() {
        let limiter = limiter();
        let t0 = Instant::now();
        let actor = player();
        limiter.use_action_at(&actor, 1, t0);
        limiter.use_action_at(&actor, 1, t0);

        // No intermediate is_fatigued call clears the record.
        assert!(limiter.use_action_at(&actor, 1, t0 + Duration::from_secs(15)));
    }

    #[test]
    fn npcs_share_the_same_quota_rules() {
        let limiter = limiter();
        let now = Instant::now();
        let wolf = ActorId::Npc(7);
        assert!(limiter.use_action_at(&wolf, 1, now));
        assert!(limiter.use_action_at(&wolf, 1, now));
        assert!(!limiter.use_action_at(&wolf, 1, now));
        assert!(limiter.is_fatigued_at(&wolf, now));

        limiter.forget(&wolf);
        assert_eq!(limiter.tracked_actors(), 0);
        assert!(!limiter.is_fatigued_at(&wolf, now));
    }

    #[test]
    fn actors_are_independent() {
        let limiter = limiter();
        let t0 = Instant::now();
        let rat = ActorId::Npc(3);
        limiter.use_action_at(&player(), 1, t0);
        limiter.use_action_at(&player(), 1, t0);
        assert!(limiter.is_fatigued_at(&player(), t0));
        assert!(!limiter.is_fatigued_at(&rat, t0));
        assert!(limiter.use_action_at(&rat, 1, t0));
    }
}
