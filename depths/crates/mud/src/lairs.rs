//! Lair respawn. A lair below its population arms a timer; when the timer
//! runs out the missing NPCs are spawned.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::context::WorldContext;

#[derive(Debug, Default)]
pub struct LairKeeper {
    /// (room id, mob id) -> when to respawn.
    timers: HashMap<(String, String), Instant>,
}

impl LairKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// One pass over every lair. Returns the number of NPCs spawned.
    pub fn tick_at(&mut self, ctx: &WorldContext, now: Instant) -> usize {
        let mut spawned = 0;

        for room in ctx.world.rooms() {
            for lair in &room.lairs {
                let key = (room.id.clone(), lair.mob_id.clone());
                let present = room.contents().count_npcs(&lair.mob_id);
                if present >= lair.max_mobs {
                    self.timers.remove(&key);
                    continue;
                }

                let due = *self
                    .timers
                    .entry(key.clone())
                    .or_insert_with(|| now + Duration::from_secs(lair.respawn_time));
                if now < due {
                    continue;
                }
                self.timers.remove(&key);

                let Some(def) = ctx.catalog.npc(&lair.mob_id) else {
                    tracing::warn!(room = %room.id, mob = %lair.mob_id, "lair references unknown npc");
                    continue;
                };
                for _ in present..lair.max_mobs {
                    match ctx.world.spawn_npc_from_lair(&room.id, def) {
                        Ok(_) => spawned += 1,
                        Err(e) => tracing::warn!(room = %room.id, "lair spawn failed: {}", e),
                    }
                }
                ctx.notify_room(&room.id, None, &format!("A {} appears.", def.name));
            }
        }

        if spawned > 0 {
            tracing::debug!(spawned, "lairs repopulated");
        }
        spawned
    }

    /// Tick every `interval` until shutdown.
    pub async fn run(
        mut self,
        ctx: Arc<WorldContext>,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick_at(&ctx, Instant::now());
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("lair keeper stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::context;
    use crate::world::NpcHit;

    fn rats(ctx: &WorldContext) -> usize {
        ctx.world.room("cellar").unwrap().snapshot().count_npcs("rat")
    }

    fn kill_one_rat(ctx: &WorldContext) {
        let id = ctx.world.room("cellar").unwrap().snapshot().npcs[0].instance_id;
        assert!(matches!(ctx.world.damage_npc("cellar", id, 100).unwrap(), NpcHit::Killed(_)));
    }

    #[test]
    fn full_lair_arms_nothing() {
        let (ctx, _rx) = context();
        let mut keeper = LairKeeper::new();
        assert_eq!(keeper.tick_at(&ctx, Instant::now()), 0);
        assert_eq!(keeper.pending(), 0);
        assert_eq!(rats(&ctx), 2);
    }

    #[test]
    fn missing_mobs_respawn_after_delay() {
        let (ctx, _rx) = context();
        let mut keeper = LairKeeper::new();
        let t0 = Instant::now();

        kill_one_rat(&ctx);
        kill_one_rat(&ctx);
        assert_eq!(rats(&ctx), 0);

        assert_eq!(keeper.tick_at(&ctx, t0), 0);
        assert_eq!(keeper.pending(), 1);
        assert_eq!(keeper.tick_at(&ctx, t0 + Duration::from_secs(29)), 0);

        assert_eq!(keeper.tick_at(&ctx, t0 + Duration::from_secs(30)), 2);
        assert_eq!(rats(&ctx), 2);
        assert_eq!(keeper.pending(), 0);
    }

    #[test]
    fn timer_clears_if_lair_refills_otherwise() {
        let (ctx, _rx) = context();
        let mut keeper = LairKeeper::new();
        let t0 = Instant::now();

        kill_one_rat(&ctx);
        keeper.tick_at(&ctx, t0);
        assert_eq!(keeper.pending(), 1);

        let def = ctx.catalog.npc("rat").unwrap();
        ctx.world.spawn_npc_from_lair("cellar", def).unwrap();
        keeper.tick_at(&ctx, t0 + Duration::from_secs(1));
        assert_eq!(keeper.pending(), 0);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (ctx, _rx) = context();
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(LairKeeper::new().run(ctx, Duration::from_millis(10), rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
