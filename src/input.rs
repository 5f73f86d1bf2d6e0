use std::collections::HashSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
pub mod wasm;

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
}

impl KeyCode {
    pub const W: Self = Self::Character('W');
    pub const A: Self = Self::Character('A');
    pub const S: Self = Self::Character('S');
    pub const D: Self = Self::Character('D');

    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) if ch.is_ascii_alphanumeric() => {
                Some(Self::Character(ch.to_ascii_uppercase()))
            }
            _ => None,
        }
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        " " | "Space" => Space,
        "Enter" | "Return" => Enter,
        "Escape" | "Esc" => Escape,
        "Shift" | "ShiftLeft" | "ShiftRight" => Shift,
        "ArrowLeft" | "Left" => Left,
        "ArrowRight" | "Right" => Right,
        "ArrowUp" | "Up" => Up,
        "ArrowDown" | "Down" => Down,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

/// Keys with a name rather than a printable character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Enter,
    Escape,
    Shift,
    Left,
    Right,
    Up,
    Down,
}

/// Held state of the four movement keys for a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub w: bool,
    pub a: bool,
    pub s: bool,
    pub d: bool,
}

impl InputSnapshot {
    pub const NONE: Self = Self {
        w: false,
        a: false,
        s: false,
        d: false,
    };

    /// Builds a snapshot from a loosely keyed map; absent keys are not held.
    pub fn from_pressed<I, S>(pressed: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: AsRef<str>,
    {
        let mut snapshot = Self::NONE;
        for (key, held) in pressed {
            match key.as_ref().to_ascii_lowercase().as_str() {
                "w" => snapshot.w |= held,
                "a" => snapshot.a |= held,
                "s" => snapshot.s |= held,
                "d" => snapshot.d |= held,
                _ => {}
            }
        }
        snapshot
    }

    /// Shorthand such as `"wd"`; characters other than w/a/s/d are ignored.
    pub fn from_keys(keys: &str) -> Self {
        Self::from_pressed(keys.chars().map(|ch| (ch.to_string(), true)))
    }

    pub fn any_direction(&self) -> bool {
        self.w || self.a || self.s || self.d
    }
}

/// Keyboard state shared between event listeners and the frame loop.
#[derive(Debug, Default)]
pub struct InputState {
    keys: RwLock<HashSet<KeyCode>>,
    run_toggles: RwLock<u32>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&self, key: KeyCode) {
        self.keys.write().insert(key);
    }

    pub fn set_key_up(&self, key: KeyCode) {
        self.keys.write().remove(&key);
    }

    /// Key-down handling used by the page: with Shift held the press only
    /// queues a run toggle and is not recorded as held.
    pub fn key_pressed(&self, key: KeyCode, shift: bool) {
        if shift {
            self.request_run_toggle();
        } else {
            self.set_key_down(key);
        }
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.read().contains(&key)
    }

    pub fn is_key_down_by_name(&self, name: &str) -> bool {
        KeyCode::from_name(name).is_some_and(|key| self.is_key_down(key))
    }

    /// Releases every key, e.g. when the page loses focus.
    pub fn clear(&self) {
        self.keys.write().clear();
    }

    pub fn request_run_toggle(&self) {
        *self.run_toggles.write() += 1;
    }

    /// Returns and clears the number of toggles queued since the last call.
    pub fn take_run_toggles(&self) -> u32 {
        std::mem::take(&mut *self.run_toggles.write())
    }

    pub fn snapshot(&self) -> InputSnapshot {
        let keys = self.keys.read();
        InputSnapshot {
            w: keys.contains(&KeyCode::W),
            a: keys.contains(&KeyCode::A),
            s: keys.contains(&KeyCode::S),
            d: keys.contains(&KeyCode::D),
        }
    }
}
