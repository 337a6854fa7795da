//! Deterministic simulation module
//!
//! All swarm behavior lives here. Given the same config, random source and
//! command/time sequence the outcome is identical:
//! - Fixed timestep only
//! - Injected randomness only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod animation;
pub mod collision;
pub mod drag;
pub mod interaction;
pub mod registry;
pub mod spawn;
pub mod state;
pub mod tick;

pub use animation::{Animator, Facing, Pose};
pub use collision::{Contact, overlaps, reflect, reflect_velocity};
pub use drag::{DragController, DragSession, release_velocity};
pub use interaction::{CloneRequest, PairRule};
pub use registry::Registry;
pub use state::{Entity, EntityId, EntityKind, Signals, SimEvent, SpawnCause};
pub use tick::{Command, Simulation};
