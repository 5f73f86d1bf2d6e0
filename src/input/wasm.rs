use std::sync::Arc;

use anyhow::{anyhow, Result};
use gloo_events::EventListener;
use wasm_bindgen::JsCast;
use web_sys::{window, KeyboardEvent};

use super::{InputState, KeyCode};

/// Handles DOM keyboard events and updates the shared [`InputState`].
pub struct WasmInputHandler {
    listeners: Vec<EventListener>,
}

impl WasmInputHandler {
    pub fn attach(input: Arc<InputState>) -> Result<Self> {
        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| anyhow!("document not available"))?;

        let mut listeners = Vec::new();

        // Shift+key only flips the run toggle, matching the page's controls.
        {
            let input_state = Arc::clone(&input);
            listeners.push(EventListener::new(&document, "keydown", move |event| {
                if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                    if let Some(code) = KeyCode::from_name(&event.key()) {
                        input_state.key_pressed(code, event.shift_key());
                    }
                }
            }));
        }

        {
            let input_state = Arc::clone(&input);
            listeners.push(EventListener::new(&document, "keyup", move |event| {
                if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                    if let Some(code) = KeyCode::from_name(&event.key()) {
                        input_state.set_key_up(code);
                    }
                }
            }));
        }

        {
            let input_state = Arc::clone(&input);
            listeners.push(EventListener::new(&window, "blur", move |_event| {
                input_state.clear();
            }));
        }

        Ok(Self { listeners })
    }
}

impl Drop for WasmInputHandler {
    fn drop(&mut self) {
        self.listeners.clear();
    }
}
