//! A flat rectangular world with patrolling threats and regrowing food.

use std::collections::BTreeMap;

use ai_core::{Departure, DepartureKind, DeterministicRng, SplitMix64, Vec3, WorldMut, WorldView};

use crate::config::WorldConfig;

pub type FoodId = u32;

const CATCH_DISTANCE: f32 = 0.5;
const ARRIVE_DISTANCE: f32 = 0.05;
const THREAT_STEP: f32 = 0.08;
const SPAWN_ATTEMPTS: usize = 8;
/// Fallback spawn candidates per axis, center first.
const FALLBACK_FRACTIONS: [f32; 5] = [0.5, 0.25, 0.75, 0.1, 0.9];
/// Wander targets may lie this far outside the bounds; agents that walk out are unloaded.
const ROAM_MARGIN: f32 = 2.0;

#[derive(Debug, Clone)]
struct Threat {
    position: Vec3,
    patrol: [Vec3; 2],
    heading: usize,
}

#[derive(Debug, Clone)]
struct Food {
    position: Vec3,
    regrows_at: Option<u64>,
}

pub struct GridWorld {
    width: f32,
    depth: f32,
    threat_radius: f32,
    food_regrow_ticks: u64,
    agents: BTreeMap<u64, Vec3>,
    threats: Vec<Threat>,
    food: BTreeMap<FoodId, Food>,
    /// Finished harvests waiting for their forager to notice.
    meals: BTreeMap<u64, Vec<FoodId>>,
    departures: Vec<Departure<u64>>,
    next_id: u64,
    lethal: bool,
}

impl GridWorld {
    /// World without threats or food.
    pub fn empty(config: &WorldConfig, next_id: u64) -> Self {
        Self {
            width: config.width.max(1.0),
            depth: config.depth.max(1.0),
            threat_radius: config.threat_radius,
            food_regrow_ticks: config.food_regrow_ticks,
            agents: BTreeMap::new(),
            threats: Vec::new(),
            food: BTreeMap::new(),
            meals: BTreeMap::new(),
            departures: Vec::new(),
            next_id: next_id.max(1),
            lethal: true,
        }
    }

    /// Threats and food placed from `seed`.
    pub fn generate(config: &WorldConfig, seed: u64, next_id: u64) -> Self {
        let mut world = Self::empty(config, next_id);
        let mut rng = SplitMix64::new(seed);
        for _ in 0..config.threats {
            let a = world.random_point(&mut rng);
            let b = world.random_point(&mut rng);
            world.threats.push(Threat {
                position: a,
                patrol: [a, b],
                heading: 1,
            });
        }
        for _ in 0..config.food {
            let at = world.random_point(&mut rng);
            world.add_food(at);
        }
        world
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Whether threats kill agents they reach.
    pub fn set_lethal(&mut self, lethal: bool) {
        self.lethal = lethal;
    }

    pub fn threat_radius(&self) -> f32 {
        self.threat_radius
    }

    pub fn in_bounds(&self, at: Vec3) -> bool {
        (0.0..=self.width).contains(&at.x) && (0.0..=self.depth).contains(&at.z)
    }

    pub fn clamp(&self, at: Vec3) -> Vec3 {
        Vec3::new(at.x.clamp(0.0, self.width), at.y, at.z.clamp(0.0, self.depth))
    }

    /// A stationary threat.
    pub fn add_threat(&mut self, at: Vec3) {
        self.threats.push(Threat {
            position: at,
            patrol: [at, at],
            heading: 0,
        });
    }

    pub fn add_food(&mut self, at: Vec3) -> FoodId {
        let id = self.food.keys().next_back().map_or(0, |last| last + 1);
        self.food.insert(
            id,
            Food {
                position: at,
                regrows_at: None,
            },
        );
        id
    }

    pub fn nearest_threat(&self, at: Vec3) -> Option<(Vec3, f32)> {
        self.threats
            .iter()
            .map(|t| (t.position, t.position.distance(at)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn nearest_food(&self, at: Vec3) -> Option<(FoodId, Vec3)> {
        self.food
            .iter()
            .filter(|(_, f)| f.regrows_at.is_none())
            .min_by(|a, b| {
                a.1.position
                    .distance_squared(at)
                    .total_cmp(&b.1.position.distance_squared(at))
            })
            .map(|(id, f)| (*id, f.position))
    }

    pub fn food_available(&self, item: FoodId) -> bool {
        self.food.get(&item).is_some_and(|f| f.regrows_at.is_none())
    }

    pub fn roam_target(&self, rng: &mut dyn DeterministicRng) -> Vec3 {
        Vec3::new(
            rng.next_f32_range(-ROAM_MARGIN, self.width + ROAM_MARGIN),
            0.0,
            rng.next_f32_range(-ROAM_MARGIN, self.depth + ROAM_MARGIN),
        )
    }

    fn random_point(&self, rng: &mut dyn DeterministicRng) -> Vec3 {
        Vec3::new(
            rng.next_f32_range(0.0, self.width),
            0.0,
            rng.next_f32_range(0.0, self.depth),
        )
    }

    /// Take `item` for `agent`. Fails if either is gone or the item was taken meanwhile.
    pub fn harvest(&mut self, agent: u64, item: FoodId, tick: u64) -> bool {
        if !self.is_alive(agent) {
            return false;
        }
        let regrow = self.food_regrow_ticks;
        let Some(food) = self.food.get_mut(&item) else {
            return false;
        };
        if food.regrows_at.is_some() {
            return false;
        }
        food.regrows_at = Some(tick + regrow);
        self.meals.entry(agent).or_default().push(item);
        true
    }

    pub fn take_meals(&mut self, agent: u64) -> Vec<FoodId> {
        self.meals.remove(&agent).unwrap_or_default()
    }

    /// World-side step, run before the agents decide.
    pub fn step(&mut self, tick: u64) {
        for threat in self.threats.iter_mut() {
            let target = threat.patrol[threat.heading];
            threat.position = threat.position.step_towards(target, THREAT_STEP);
            if threat.position.distance(target) <= ARRIVE_DISTANCE {
                threat.heading = 1 - threat.heading;
            }
        }

        for food in self.food.values_mut() {
            if food.regrows_at.is_some_and(|at| at <= tick) {
                food.regrows_at = None;
            }
        }

        let ids: Vec<u64> = self.agents.keys().copied().collect();
        for agent in ids {
            let Some(&position) = self.agents.get(&agent) else {
                continue;
            };
            let kind = if !self.in_bounds(position) {
                DepartureKind::Unloaded
            } else if self.lethal
                && self
                    .nearest_threat(position)
                    .is_some_and(|(_, d)| d <= CATCH_DISTANCE)
            {
                DepartureKind::Died
            } else {
                continue;
            };
            let last_position = self.clamp(position);
            self.agents.remove(&agent);
            self.meals.remove(&agent);
            self.departures.push(Departure {
                agent,
                kind,
                last_position,
            });
        }
    }
}

impl WorldView for GridWorld {
    type Agent = u64;

    fn is_alive(&self, agent: u64) -> bool {
        self.agents.contains_key(&agent)
    }

    fn agents(&self) -> Vec<u64> {
        self.agents.keys().copied().collect()
    }

    fn position(&self, agent: u64) -> Option<Vec3> {
        self.agents.get(&agent).copied()
    }

    fn is_valid_spawn(&self, at: Vec3) -> bool {
        at.is_finite()
            && self.in_bounds(at)
            && self
                .nearest_threat(at)
                .map_or(true, |(_, d)| d > self.threat_radius)
    }

    /// The center, or the first point of a fixed grid of fallbacks that no
    /// threat currently covers. The center if every fallback is covered.
    fn default_spawn(&self) -> Vec3 {
        let center = Vec3::new(self.width / 2.0, 0.0, self.depth / 2.0);
        FALLBACK_FRACTIONS
            .iter()
            .flat_map(|&fx| {
                FALLBACK_FRACTIONS
                    .iter()
                    .map(move |&fz| Vec3::new(self.width * fx, 0.0, self.depth * fz))
            })
            .find(|at| self.is_valid_spawn(*at))
            .unwrap_or(center)
    }

    fn live_count(&self) -> usize {
        self.agents.len()
    }
}

impl WorldMut for GridWorld {
    fn spawn(&mut self, at: Vec3) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.agents.insert(id, at);
        id
    }

    fn despawn(&mut self, agent: u64) {
        self.agents.remove(&agent);
        self.meals.remove(&agent);
    }

    fn find_spawn_location(&mut self, rng: &mut dyn DeterministicRng) -> Option<Vec3> {
        (0..SPAWN_ATTEMPTS)
            .map(|_| self.random_point(rng))
            .find(|at| self.is_valid_spawn(*at))
    }

    fn move_towards(&mut self, agent: u64, target: Vec3, speed: f32) -> bool {
        let Some(position) = self.agents.get_mut(&agent) else {
            return false;
        };
        *position = position.step_towards(target, speed);
        position.distance(target) <= ARRIVE_DISTANCE
    }

    fn take_departures(&mut self) -> Vec<Departure<u64>> {
        std::mem::take(&mut self.departures)
    }
}
