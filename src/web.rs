#![cfg(target_arch = "wasm32")]

use std::sync::Arc;

use glam::Vec3;
use wasm_bindgen::prelude::*;

use crate::input::wasm::WasmInputHandler;
use crate::{ActionName, InputState, QuizOutcome, QuizProgress, Scene, Simulation};

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Browser-facing avatar runtime.
///
/// The host page owns rendering and the clip mixer; each frame it calls
/// [`WasmLocomotion::tick`] and copies the avatar, camera and action
/// weights back onto its scene objects.
#[wasm_bindgen]
pub struct WasmLocomotion {
    sim: Simulation,
    input: Arc<InputState>,
    _input_handler: WasmInputHandler,
}

#[wasm_bindgen]
impl WasmLocomotion {
    #[wasm_bindgen(constructor)]
    pub fn new(scene_xml: &str) -> Result<WasmLocomotion, JsValue> {
        let scene = Scene::from_xml(scene_xml)
            .map_err(|err| JsValue::from_str(&format!("failed to parse scene XML: {err:#}")))?;
        let sim = Simulation::new(&scene).map_err(|err| JsValue::from_str(&format!("{err:#}")))?;
        let input = Arc::new(InputState::new());
        let input_handler = WasmInputHandler::attach(Arc::clone(&input)).map_err(js_error)?;
        log::info!("avatar runtime ready with {} clip(s)", scene.clips.len());
        Ok(Self {
            sim,
            input,
            _input_handler: input_handler,
        })
    }

    /// Runs one frame and returns whether the mentor dialog should be shown.
    pub fn tick(&mut self, delta_seconds: f32) -> bool {
        self.sim.step_with_state(delta_seconds, &self.input);
        self.sim.dialog_open()
    }

    pub fn switch_run_toggle(&mut self) {
        self.sim.controller_mut().switch_run_toggle();
    }

    pub fn avatar_position(&self) -> Vec<f32> {
        self.sim.controller().avatar().position.to_array().to_vec()
    }

    /// Facing as `[x, y, z, w]`.
    pub fn avatar_orientation(&self) -> Vec<f32> {
        self.sim.controller().avatar().orientation.to_array().to_vec()
    }

    pub fn camera_position(&self) -> Vec<f32> {
        self.sim.controller().camera().camera_position.to_array().to_vec()
    }

    /// Lets the orbit control write back a camera it moved itself.
    pub fn set_camera_position(&mut self, x: f32, y: f32, z: f32) {
        self.sim.controller_mut().camera_mut().camera_position = Vec3::new(x, y, z);
    }

    pub fn orbit_target(&self) -> Vec<f32> {
        self.sim.controller().camera().orbit_target.to_array().to_vec()
    }

    pub fn current_action(&self) -> String {
        self.sim.controller().current_action().to_string()
    }

    /// Blend weight the host should apply to the named clip.
    pub fn action_weight(&self, name: &str) -> Result<f32, JsValue> {
        let name = name.parse::<ActionName>().map_err(js_error)?;
        Ok(self.sim.controller().mixer().action(name).weight())
    }

    pub fn question(&self) -> String {
        self.sim.quiz().current_question().prompt.clone()
    }

    pub fn options(&self) -> Vec<JsValue> {
        self.sim
            .quiz()
            .current_question()
            .options
            .iter()
            .map(|option| JsValue::from_str(&option.text))
            .collect()
    }

    /// Returns `next`, `passed` or `failed`.
    pub fn answer(&mut self, option: usize) -> Result<String, JsValue> {
        let progress = self.sim.answer(option).map_err(js_error)?;
        let label = match progress {
            QuizProgress::Next(_) => "next",
            QuizProgress::Finished(QuizOutcome::Passed) => "passed",
            QuizProgress::Finished(QuizOutcome::Failed { .. }) => "failed",
        };
        Ok(label.to_string())
    }
}
