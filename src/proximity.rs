use glam::Vec3;
use log::info;
use serde::{Deserialize, Serialize};

/// Edge reported when the avatar crosses the trigger radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProximityEvent {
    Entered,
    Left,
}

/// Watches the distance between the avatar and a fixed point of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityTrigger {
    center: Vec3,
    radius: f32,
    active: bool,
}

impl ProximityTrigger {
    pub const DEFAULT_RADIUS: f32 = 2.0;

    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius,
            active: false,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Compares `position` against the radius and reports state changes.
    pub fn observe(&mut self, position: Vec3) -> Option<ProximityEvent> {
        let distance = position.distance(self.center);
        match (self.active, distance < self.radius) {
            (false, true) => {
                self.active = true;
                info!("entered proximity at distance {distance:.2}");
                Some(ProximityEvent::Entered)
            }
            (true, false) => {
                self.active = false;
                info!("left proximity at distance {distance:.2}");
                Some(ProximityEvent::Left)
            }
            _ => None,
        }
    }
}
