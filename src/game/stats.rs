//! Statistics & Ranking
//!
//! Per-player counters accumulated during the match and the final ranking.
//! Statistics are derived data: nothing here feeds back into the simulation.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::game::entity::PlayerId;
use crate::game::world::World;

/// Final per-player statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatistics {
    pub tag: PlayerId,
    /// 1-based final rank
    pub rank: u32,
    pub last_frame_alive: u32,
    /// Initialization handshake latency in milliseconds
    pub init_response_time: u64,
    /// Mean turn latency in milliseconds, over answered turns
    pub average_frame_response_time: f64,
    /// Ships ever owned, initial fleet included
    pub total_ship_count: u32,
    pub damage_dealt: u64,
    pub final_ship_count: u32,
    pub final_ship_health: u64,
}

/// Match-level statistics returned by a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStatistics {
    pub player_statistics: Vec<PlayerStatistics>,
    /// Replay file written for this match, if any
    pub output_filename: Option<String>,
    pub timeout_tags: BTreeSet<PlayerId>,
    pub timeout_log_filenames: Vec<String>,
}

impl GameStatistics {
    /// Player ranked first, if any.
    pub fn winner(&self) -> Option<PlayerId> {
        self.player_statistics.iter().find(|p| p.rank == 1).map(|p| p.tag)
    }
}

// =============================================================================
// RANKING
// =============================================================================

/// Everything the ranking looks at for one player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankingKey {
    pub player: PlayerId,
    pub alive: bool,
    pub last_frame_alive: u32,
    pub ship_count: u32,
    pub total_health: u64,
}

/// Strict total order over players; `Less` means `a` ranks ahead of `b`.
///
/// Alive beats eliminated, then later elimination, then more ships, then more
/// total ship health, then the lower player id.
pub fn compare_rankings(a: &RankingKey, b: &RankingKey) -> Ordering {
    b.alive
        .cmp(&a.alive)
        .then_with(|| b.last_frame_alive.cmp(&a.last_frame_alive))
        .then_with(|| b.ship_count.cmp(&a.ship_count))
        .then_with(|| b.total_health.cmp(&a.total_health))
        .then_with(|| a.player.cmp(&b.player))
}

/// Sort players into final order and assign 1-based ranks.
pub fn rank_players(keys: &[RankingKey]) -> Vec<(PlayerId, u32)> {
    let mut sorted = keys.to_vec();
    sorted.sort_by(compare_rankings);
    sorted
        .iter()
        .enumerate()
        .map(|(i, key)| (key.player, i as u32 + 1))
        .collect()
}

// =============================================================================
// TRACKER
// =============================================================================

#[derive(Clone, Debug, Default)]
struct PlayerCounters {
    last_frame_alive: u32,
    init_response: Duration,
    frame_response_total: Duration,
    answered_frames: u32,
    total_ship_count: u32,
    damage_dealt: u64,
    /// Fleet size and health when the player left the alive set
    final_fleet: Option<(u32, u64)>,
}

/// Accumulates per-player counters over a match.
#[derive(Clone, Debug, Default)]
pub struct StatsTracker {
    players: BTreeMap<PlayerId, PlayerCounters>,
}

impl StatsTracker {
    /// Start tracking every player of `world`, counting their initial fleets.
    pub fn new(world: &World) -> Self {
        let players = world
            .players()
            .map(|p| {
                let counters = PlayerCounters {
                    total_ship_count: world.ship_count(p),
                    ..Default::default()
                };
                (p, counters)
            })
            .collect();
        Self { players }
    }

    fn counters(&mut self, player: PlayerId) -> &mut PlayerCounters {
        self.players.entry(player).or_default()
    }

    pub fn mark_alive(&mut self, player: PlayerId, turn: u32) {
        self.counters(player).last_frame_alive = turn;
    }

    /// Freeze `player`'s fleet as it stands in `world`. Later calls are
    /// ignored, so the first elimination wins.
    pub fn mark_eliminated(&mut self, player: PlayerId, world: &World) {
        let counters = self.counters(player);
        if counters.final_fleet.is_none() {
            counters.final_fleet = Some((world.ship_count(player), world.total_ship_health(player)));
        }
    }

    pub fn record_init_response(&mut self, player: PlayerId, elapsed: Duration) {
        self.counters(player).init_response = elapsed;
    }

    pub fn record_frame_response(&mut self, player: PlayerId, elapsed: Duration) {
        let counters = self.counters(player);
        counters.frame_response_total += elapsed;
        counters.answered_frames += 1;
    }

    pub fn record_spawn(&mut self, player: PlayerId) {
        self.counters(player).total_ship_count += 1;
    }

    pub fn record_damage(&mut self, player: PlayerId, amount: u64) {
        self.counters(player).damage_dealt += amount;
    }

    /// Final ranked statistics. Alive players are measured against `world`;
    /// eliminated players keep the fleet frozen at their elimination.
    pub fn finish(&self, world: &World, alive: &BTreeSet<PlayerId>) -> Vec<PlayerStatistics> {
        let keys: Vec<RankingKey> = self
            .players
            .iter()
            .map(|(&player, counters)| {
                let is_alive = alive.contains(&player);
                let (ship_count, total_health) = match counters.final_fleet {
                    Some(fleet) if !is_alive => fleet,
                    _ => (world.ship_count(player), world.total_ship_health(player)),
                };
                RankingKey {
                    player,
                    alive: is_alive,
                    last_frame_alive: counters.last_frame_alive,
                    ship_count,
                    total_health,
                }
            })
            .collect();
        let ranks: BTreeMap<PlayerId, u32> = rank_players(&keys).into_iter().collect();

        keys.iter()
            .map(|key| {
                let counters = &self.players[&key.player];
                let average = if counters.answered_frames == 0 {
                    0.0
                } else {
                    counters.frame_response_total.as_secs_f64() * 1000.0 / counters.answered_frames as f64
                };
                PlayerStatistics {
                    tag: key.player,
                    rank: ranks.get(&key.player).copied().unwrap_or(0),
                    last_frame_alive: counters.last_frame_alive,
                    init_response_time: counters.init_response.as_millis() as u64,
                    average_frame_response_time: average,
                    total_ship_count: counters.total_ship_count,
                    damage_dealt: counters.damage_dealt,
                    final_ship_count: key.ship_count,
                    final_ship_health: key.total_health,
                }
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::from_int;
    use crate::core::vec2::FixedVec2;
    use proptest::prelude::*;

    fn key(player: u8, alive: bool, last: u32, ships: u32, health: u64) -> RankingKey {
        RankingKey {
            player: PlayerId(player),
            alive,
            last_frame_alive: last,
            ship_count: ships,
            total_health: health,
        }
    }

    #[test]
    fn test_alive_beats_eliminated() {
        let ranks = rank_players(&[key(0, false, 50, 9, 2000), key(1, true, 50, 1, 10)]);
        assert_eq!(ranks, vec![(PlayerId(1), 1), (PlayerId(0), 2)]);
    }

    #[test]
    fn test_later_elimination_ranks_higher() {
        let ranks = rank_players(&[key(0, false, 10, 5, 500), key(1, false, 20, 0, 0)]);
        assert_eq!(ranks[0].0, PlayerId(1));
    }

    #[test]
    fn test_tie_breaks() {
        let ranks = rank_players(&[
            key(0, true, 30, 3, 300),
            key(1, true, 30, 3, 400),
            key(2, true, 30, 4, 10),
            key(3, true, 30, 3, 300),
        ]);
        let order: Vec<_> = ranks.iter().map(|(p, _)| p.0).collect();
        assert_eq!(order, vec![2, 1, 0, 3]);
        assert_eq!(ranks.iter().map(|(_, r)| *r).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_tracker_average_response() {
        let mut world = World::new(from_int(50), from_int(50), 2);
        world.spawn_ship(PlayerId(0), FixedVec2::from_ints(5, 5), 255);
        world.spawn_ship(PlayerId(1), FixedVec2::from_ints(45, 45), 255);

        let mut tracker = StatsTracker::new(&world);
        tracker.record_frame_response(PlayerId(0), Duration::from_millis(10));
        tracker.record_frame_response(PlayerId(0), Duration::from_millis(30));
        tracker.record_spawn(PlayerId(1));
        tracker.record_damage(PlayerId(1), 64);
        tracker.mark_alive(PlayerId(0), 3);
        tracker.mark_alive(PlayerId(1), 3);

        let alive: BTreeSet<_> = [PlayerId(0), PlayerId(1)].into_iter().collect();
        let stats = tracker.finish(&world, &alive);

        assert_eq!(stats[0].average_frame_response_time, 20.0);
        assert_eq!(stats[1].average_frame_response_time, 0.0);
        assert_eq!(stats[1].total_ship_count, 2);
        assert_eq!(stats[1].damage_dealt, 64);
        assert_eq!(stats[0].rank, 1);
    }

    #[test]
    fn test_eliminated_fleet_is_frozen() {
        let mut world = World::new(from_int(50), from_int(50), 2);
        world.spawn_ship(PlayerId(0), FixedVec2::from_ints(5, 5), 255);
        let doomed = world.spawn_ship(PlayerId(1), FixedVec2::from_ints(40, 40), 255);
        world.spawn_ship(PlayerId(1), FixedVec2::from_ints(45, 45), 255);

        let mut tracker = StatsTracker::new(&world);
        tracker.mark_eliminated(PlayerId(1), &world);
        world.ships.remove(&doomed);
        // A second elimination does not overwrite the snapshot
        tracker.mark_eliminated(PlayerId(1), &world);

        let alive = BTreeSet::from([PlayerId(0)]);
        let stats = tracker.finish(&world, &alive);
        assert_eq!(stats[1].final_ship_count, 2);
        assert_eq!(stats[1].final_ship_health, 510);
        assert_eq!(stats[0].final_ship_count, 1);
    }

    fn arb_key() -> impl Strategy<Value = RankingKey> {
        (0u8..8, any::<bool>(), 0u32..5, 0u32..4, 0u64..4)
            .prop_map(|(p, alive, last, ships, health)| key(p, alive, last, ships, health))
    }

    proptest! {
        #[test]
        fn prop_ranking_is_total_order(a in arb_key(), b in arb_key(), c in arb_key()) {
            // Antisymmetric, and Equal only for identical keys
            prop_assert_eq!(compare_rankings(&a, &b), compare_rankings(&b, &a).reverse());
            if compare_rankings(&a, &b) == Ordering::Equal {
                prop_assert_eq!(a, b);
            }
            // Transitive
            if compare_rankings(&a, &b) == Ordering::Less && compare_rankings(&b, &c) == Ordering::Less {
                prop_assert_eq!(compare_rankings(&a, &c), Ordering::Less);
            }
        }

        #[test]
        fn prop_ranks_are_a_permutation(keys in prop::collection::vec(arb_key(), 1..8)) {
            let ranks = rank_players(&keys);
            let mut seen: Vec<u32> = ranks.iter().map(|(_, r)| *r).collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (1..=keys.len() as u32).collect::<Vec<_>>());
        }
    }
}
