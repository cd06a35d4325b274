use ai_memory::Field;

/// Id of the active goal, persisted so a restarted agent resumes it.
pub const CURRENT_GOAL: Field<String> = Field::persistent("goal_id", String::new);

/// Archetype chosen at first spawn; never re-chosen while it names a known archetype.
pub const ARCHETYPE: Field<String> = Field::persistent("archetype", String::new);
