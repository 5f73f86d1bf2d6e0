//! Avatar runtime for the Hackaverse booth scene.
//!
//! The crate owns the pieces of the scene with real state: third-person
//! locomotion with animation cross-fades and a trailing camera, the NPC
//! proximity trigger and the booth quiz. Rendering, asset loading and the
//! wallet flow stay with the host page so the logic can run and be tested
//! headless.

pub mod animation;
pub mod config;
pub mod error;
pub mod input;
pub mod locomotion;
pub mod proximity;
pub mod quiz;
pub mod scene;
pub mod sim;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use animation::{ActionHandle, ActionMap, ActionName, AnimationMixer, ClipAction, FadeState};
pub use config::{Bounds, BoundsPolicy, LocomotionConfig};
pub use error::{LocomotionError, LocomotionResult};
pub use input::{InputSnapshot, InputState, KeyCode, NamedKey};
pub use locomotion::{direction_offset, AvatarState, CameraRig, LocomotionController};
pub use proximity::{ProximityEvent, ProximityTrigger};
pub use quiz::{Question, Quiz, QuizError, QuizOption, QuizOutcome, QuizProgress, QuizSession};
pub use scene::{Npc, Scene};
pub use sim::{InputScript, ScriptStep, Simulation};
