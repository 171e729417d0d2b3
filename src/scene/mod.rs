pub mod camera;
pub mod collider;
pub mod light;
pub mod model;
pub mod registry;
pub mod stage;

pub use camera::{Camera, Projection};
pub use collider::{Aabb, Collider, ColliderShape};
pub use light::{Light, LightKind};
pub use model::Model;
pub use registry::{Node, Registry};
pub use stage::{MachineStep, Scene, SceneId, SceneMachine, SceneOutcome};
