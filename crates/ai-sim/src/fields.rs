use ai_core::Vec3;
use ai_lifecycle::SnapshotSchema;
use ai_memory::{Field, SensorKey};

use crate::world::FoodId;

pub const LAST_MEAL: Field<i64> = Field::persistent("last_meal_tick", || 0);
pub const MEALS: Field<i64> = Field::persistent("meals", || 0);
/// Distinct food items this agent has ever harvested.
pub const FORAGED: Field<Vec<i64>> = Field::persistent("foraged_items", Vec::new);
pub const HOME: Field<Vec3> = Field::persistent("home", || Vec3::ZERO);
pub const HOME_CLAIMED: Field<bool> = Field::persistent("home_claimed", || false);

/// Registry: agents ignore threats while set.
pub const PEACEFUL_MODE: Field<bool> = Field::persistent("peaceful_mode", || false);
/// Registry: next entity id, so ids are never reused across runs.
pub const NEXT_ENTITY: Field<i64> = Field::persistent("next_entity_id", || 1);
/// Registry: tick to resume from.
pub const SIM_TICK: Field<i64> = Field::persistent("sim_tick", || 0);

pub const NEAREST_THREAT: SensorKey<Option<(Vec3, f32)>> = SensorKey::new("nearest_threat");
pub const NEAREST_FOOD: SensorKey<Option<(FoodId, Vec3)>> = SensorKey::new("nearest_food");

pub fn snapshot_schema() -> SnapshotSchema {
    SnapshotSchema::new()
        .field(LAST_MEAL)
        .field(MEALS)
        .field(FORAGED)
        .field(HOME)
        .field(HOME_CLAIMED)
}
