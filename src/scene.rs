use anyhow::{anyhow, bail, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::animation::{ActionMap, ActionName};
use crate::config::{Bounds, LocomotionConfig};
use crate::locomotion::{AvatarState, CameraRig, LocomotionController};
use crate::proximity::ProximityTrigger;

/// Runtime description of the booth room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub avatar: AvatarState,
    pub camera: CameraRig,
    pub npc: Npc,
    pub locomotion: LocomotionConfig,
    /// Clip names reported by the avatar model, in file order.
    pub clips: Vec<String>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            avatar: AvatarState::new(Vec3::new(0.0, 0.0, 5.0)),
            camera: CameraRig::new(Vec3::new(0.0, 5.0, 8.0), Vec3::ZERO),
            npc: Npc::default(),
            locomotion: LocomotionConfig::default(),
            clips: ["Idle", "Run", "TPose", "Walk"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Non-player character the avatar can walk up to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub name: String,
    pub position: Vec3,
    pub radius: f32,
}

impl Default for Npc {
    fn default() -> Self {
        Self {
            name: "Mentor".to_string(),
            position: Vec3::new(0.0, 0.0, -1.2),
            radius: ProximityTrigger::DEFAULT_RADIUS,
        }
    }
}

impl Scene {
    /// Parses a scene XML document. Every section is optional.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        if !root.has_tag_name("scene") {
            bail!("expected <scene> root, found <{}>", root.tag_name().name());
        }
        let mut scene = Scene::default();

        if let Some(node) = child(&root, "avatar") {
            scene.avatar.position =
                parse_vec3(optional_text(&node, "position"), scene.avatar.position)
                    .context("invalid avatar position")?;
            if let Some(action) = optional_text(&node, "action") {
                scene.avatar.current_action = action.parse::<ActionName>()?;
            }
        }

        if let Some(node) = child(&root, "camera") {
            scene.camera.camera_position =
                parse_vec3(optional_text(&node, "position"), scene.camera.camera_position)
                    .context("invalid camera position")?;
            scene.camera.orbit_target =
                parse_vec3(optional_text(&node, "target"), scene.camera.orbit_target)
                    .context("invalid camera target")?;
        }

        if let Some(node) = child(&root, "npc") {
            if let Some(name) = optional_text(&node, "name") {
                scene.npc.name = name;
            }
            scene.npc.position = parse_vec3(optional_text(&node, "position"), scene.npc.position)
                .context("invalid npc position")?;
            scene.npc.radius = parse_f32(optional_text(&node, "radius"), scene.npc.radius)?;
            if !scene.npc.radius.is_finite() || scene.npc.radius <= 0.0 {
                bail!("npc radius must be positive, got {}", scene.npc.radius);
            }
        }

        if let Some(node) = child(&root, "locomotion") {
            scene.locomotion = parse_locomotion(&node, scene.locomotion)?;
        }

        if let Some(clips) = optional_text(&root, "clips") {
            scene.clips = clips.split_whitespace().map(String::from).collect();
        }

        Ok(scene)
    }

    /// Builds a controller over fresh clip actions for the declared clips.
    pub fn controller(&self) -> Result<LocomotionController> {
        let actions = ActionMap::from_clip_names(&self.clips)?;
        let controller = LocomotionController::new(
            self.avatar,
            self.camera,
            actions,
            self.locomotion.clone(),
        )?;
        Ok(controller)
    }

    pub fn proximity_trigger(&self) -> ProximityTrigger {
        ProximityTrigger::new(self.npc.position, self.npc.radius)
    }
}

fn parse_locomotion(node: &Node<'_, '_>, defaults: LocomotionConfig) -> Result<LocomotionConfig> {
    let mut config = defaults;
    config.fade_duration = parse_f32(optional_text(node, "fade"), config.fade_duration)?;
    config.walk_velocity = parse_f32(optional_text(node, "walk"), config.walk_velocity)?;
    config.run_velocity = parse_f32(optional_text(node, "run"), config.run_velocity)?;
    config.turn_step = parse_f32(optional_text(node, "turn"), config.turn_step)?;
    config.eye_height = parse_f32(optional_text(node, "eye-height"), config.eye_height)?;
    config.max_frame_delta = parse_f32(optional_text(node, "max-delta"), config.max_frame_delta)?;
    if let Some(value) = optional_text(node, "run-by-default") {
        config.run_by_default = value
            .parse::<bool>()
            .map_err(|err| anyhow!("failed to parse run-by-default: {err}"))?;
    }
    if let Some(value) = optional_text(node, "bounds") {
        config.bounds = parse_bounds(&value)?;
    }
    if let Some(value) = optional_text(node, "policy") {
        config.bounds_policy = value.parse()?;
    }
    config.validate()?;
    Ok(config)
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name(tag))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_numbers<const N: usize>(value: &str, what: &str) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    let mut components = value.split_whitespace();
    for slot in out.iter_mut() {
        let component = components
            .next()
            .ok_or_else(|| anyhow!("{what} is missing components"))?;
        *slot = component
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse {what} component `{component}`: {err}"))?;
    }
    if components.next().is_some() {
        bail!("{what} has more than {N} components");
    }
    Ok(out)
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let [x, y, z] = parse_numbers::<3>(&value, "vector")?;
    Ok(Vec3::new(x, y, z))
}

fn parse_bounds(value: &str) -> Result<Bounds> {
    let [min_x, min_z, max_x, max_z] = parse_numbers::<4>(value, "bounds")?;
    Ok(Bounds::new(min_x, min_z, max_x, max_z))
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float `{value}`: {err}")),
        None => Ok(default),
    }
}
