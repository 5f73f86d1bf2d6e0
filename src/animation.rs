//! Animation actions and the cross-fade bookkeeping behind them.
//!
//! Actions are keyed by a closed [`ActionName`] set. Each [`ClipAction`]
//! carries its own fade state so transitions can be driven and inspected
//! without a real animation engine; hosts that own a native mixer can plug
//! their handles in through [`ActionHandle`] instead.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{LocomotionError, LocomotionResult};

/// Animation states the locomotion controller can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActionName {
    #[default]
    Idle,
    Walk,
    Run,
}

impl ActionName {
    pub const ALL: [ActionName; 3] = [ActionName::Idle, ActionName::Walk, ActionName::Run];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Walk => "Walk",
            Self::Run => "Run",
        }
    }

    /// Walking and running both translate the avatar.
    pub fn is_moving(self) -> bool {
        matches!(self, Self::Walk | Self::Run)
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionName {
    type Err = LocomotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LocomotionError::InvalidConfig(format!("unknown action `{s}`")))
    }
}

/// Operations the controller needs from a playable clip.
pub trait ActionHandle {
    fn play(&mut self);
    fn reset(&mut self);
    fn fade_in(&mut self, duration: f32);
    fn fade_out(&mut self, duration: f32);
    /// Advances local playback and any running fade by `dt` seconds.
    fn advance(&mut self, dt: f32);
}

/// Blend phase of a single action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FadeState {
    #[default]
    Idle,
    FadingIn,
    Playing,
    FadingOut,
}

/// Engine-agnostic action with an explicit fade state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipAction {
    state: FadeState,
    weight: f32,
    time: f32,
    fade_from: f32,
    fade_elapsed: f32,
    fade_duration: f32,
}

impl ClipAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FadeState {
        self.state
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Local playback time in seconds since the last reset.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn is_running(&self) -> bool {
        self.state != FadeState::Idle
    }

    fn fade_target(&self) -> f32 {
        match self.state {
            FadeState::FadingIn => 1.0,
            _ => 0.0,
        }
    }

    fn settle(&mut self) {
        match self.state {
            FadeState::FadingIn => {
                self.state = FadeState::Playing;
                self.weight = 1.0;
            }
            FadeState::FadingOut => {
                self.state = FadeState::Idle;
                self.weight = 0.0;
            }
            FadeState::Idle | FadeState::Playing => {}
        }
        self.fade_elapsed = 0.0;
        self.fade_duration = 0.0;
    }

    fn begin_fade(&mut self, state: FadeState, from: f32, duration: f32) {
        self.state = state;
        self.fade_from = from;
        self.weight = from;
        self.fade_elapsed = 0.0;
        self.fade_duration = duration;
        if duration <= 0.0 {
            self.settle();
        }
    }
}

impl ActionHandle for ClipAction {
    fn play(&mut self) {
        if self.state == FadeState::Idle {
            self.state = FadeState::Playing;
            self.weight = 1.0;
        }
    }

    fn reset(&mut self) {
        self.time = 0.0;
        self.fade_elapsed = 0.0;
        self.fade_duration = 0.0;
        self.state = if self.weight > 0.0 {
            FadeState::Playing
        } else {
            FadeState::Idle
        };
    }

    fn fade_in(&mut self, duration: f32) {
        self.begin_fade(FadeState::FadingIn, 0.0, duration);
    }

    fn fade_out(&mut self, duration: f32) {
        if self.state == FadeState::Idle {
            return;
        }
        let from = self.weight;
        self.begin_fade(FadeState::FadingOut, from, duration);
    }

    fn advance(&mut self, dt: f32) {
        if self.state == FadeState::Idle {
            return;
        }
        self.time += dt;
        if matches!(self.state, FadeState::FadingIn | FadeState::FadingOut) {
            self.fade_elapsed += dt;
            let t = (self.fade_elapsed / self.fade_duration).min(1.0);
            self.weight = self.fade_from + (self.fade_target() - self.fade_from) * t;
            if t >= 1.0 {
                self.settle();
            }
        }
    }
}

/// One handle per [`ActionName`], all guaranteed present.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionMap<A> {
    idle: A,
    walk: A,
    run: A,
}

impl<A> ActionMap<A> {
    pub fn new(idle: A, walk: A, run: A) -> Self {
        Self { idle, walk, run }
    }

    /// Builds the map from loader output, failing on the first missing label.
    ///
    /// Labels outside the closed set (such as a bind pose clip) are skipped.
    pub fn from_entries<I, S>(entries: I) -> LocomotionResult<Self>
    where
        I: IntoIterator<Item = (S, A)>,
        S: AsRef<str>,
    {
        let mut idle = None;
        let mut walk = None;
        let mut run = None;
        for (label, handle) in entries {
            let label = label.as_ref();
            let slot = match label.parse::<ActionName>() {
                Ok(ActionName::Idle) => &mut idle,
                Ok(ActionName::Walk) => &mut walk,
                Ok(ActionName::Run) => &mut run,
                Err(_) => {
                    debug!("ignoring animation clip `{label}`");
                    continue;
                }
            };
            if slot.replace(handle).is_some() {
                warn!("animation clip `{label}` listed twice; keeping the last one");
            }
        }
        Ok(Self {
            idle: idle.ok_or(LocomotionError::MissingAction(ActionName::Idle))?,
            walk: walk.ok_or(LocomotionError::MissingAction(ActionName::Walk))?,
            run: run.ok_or(LocomotionError::MissingAction(ActionName::Run))?,
        })
    }

    pub fn get(&self, name: ActionName) -> &A {
        match name {
            ActionName::Idle => &self.idle,
            ActionName::Walk => &self.walk,
            ActionName::Run => &self.run,
        }
    }

    pub fn get_mut(&mut self, name: ActionName) -> &mut A {
        match name {
            ActionName::Idle => &mut self.idle,
            ActionName::Walk => &mut self.walk,
            ActionName::Run => &mut self.run,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActionName, &A)> {
        ActionName::ALL.into_iter().map(move |name| (name, self.get(name)))
    }

    fn for_each_mut(&mut self, mut f: impl FnMut(&mut A)) {
        f(&mut self.idle);
        f(&mut self.walk);
        f(&mut self.run);
    }
}

impl ActionMap<ClipAction> {
    /// Creates fresh actions for every clip name a loader reported.
    pub fn from_clip_names<I, S>(names: I) -> LocomotionResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_entries(names.into_iter().map(|name| (name, ClipAction::new())))
    }

    pub fn standard() -> Self {
        Self::new(ClipAction::new(), ClipAction::new(), ClipAction::new())
    }
}

/// Owns the action set and advances every action in lockstep.
#[derive(Debug, Clone)]
pub struct AnimationMixer<A = ClipAction> {
    actions: ActionMap<A>,
    time: f32,
}

impl<A: ActionHandle> AnimationMixer<A> {
    pub fn new(actions: ActionMap<A>) -> Self {
        Self { actions, time: 0.0 }
    }

    pub fn advance(&mut self, dt: f32) {
        self.time += dt;
        self.actions.for_each_mut(|action| action.advance(dt));
    }

    /// Total time advanced since construction.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn action(&self, name: ActionName) -> &A {
        self.actions.get(name)
    }

    pub fn action_mut(&mut self, name: ActionName) -> &mut A {
        self.actions.get_mut(name)
    }

    pub fn actions(&self) -> &ActionMap<A> {
        &self.actions
    }

    /// Fades `from` out and restarts `to` with a matching fade in.
    pub fn cross_fade(&mut self, from: ActionName, to: ActionName, duration: f32) {
        self.actions.get_mut(from).fade_out(duration);
        let next = self.actions.get_mut(to);
        next.reset();
        next.fade_in(duration);
        next.play();
    }
}
