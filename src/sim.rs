//! Fixed-step replay of scripted keyboard input.
//!
//! Used by the command-line driver and by tests to exercise the controller
//! the way a browser frame loop would, without a renderer.

use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};

use crate::input::{InputSnapshot, InputState};
use crate::locomotion::LocomotionController;
use crate::proximity::{ProximityEvent, ProximityTrigger};
use crate::quiz::{Quiz, QuizProgress, QuizSession};
use crate::scene::Scene;

/// One instruction of an [`InputScript`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptStep {
    /// Hold exactly these movement keys for a duration in seconds.
    Hold { keys: InputSnapshot, seconds: f32 },
    ToggleRun,
}

impl FromStr for ScriptStep {
    type Err = anyhow::Error;

    /// Accepts `KEYS:SECONDS` (`-` for no keys) or `!` for a run toggle.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "!" {
            return Ok(Self::ToggleRun);
        }
        let (keys, seconds) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("step `{s}` must look like KEYS:SECONDS"))?;
        let seconds = seconds
            .parse::<f32>()
            .with_context(|| format!("invalid duration in step `{s}`"))?;
        if !seconds.is_finite() || seconds < 0.0 {
            bail!("duration in step `{s}` must be a non-negative number");
        }
        let keys = keys.trim();
        if keys != "-" {
            if let Some(bad) = keys
                .chars()
                .find(|ch| !matches!(ch.to_ascii_lowercase(), 'w' | 'a' | 's' | 'd'))
            {
                bail!("unknown key `{bad}` in step `{s}`");
            }
        }
        Ok(Self::Hold {
            keys: InputSnapshot::from_keys(keys),
            seconds,
        })
    }
}

/// Ordered list of steps, e.g. parsed from `w:1 ! wd:0.5 -:0.2`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputScript {
    pub steps: Vec<ScriptStep>,
}

impl FromStr for InputScript {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let steps = s
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<ScriptStep>>>()?;
        Ok(Self { steps })
    }
}

/// Controller, NPC trigger and quiz wired together the way the page does.
pub struct Simulation {
    controller: LocomotionController,
    proximity: ProximityTrigger,
    quiz: QuizSession,
    elapsed: f32,
    events: Vec<(f32, ProximityEvent)>,
}

impl Simulation {
    pub fn new(scene: &Scene) -> Result<Self> {
        let controller = scene.controller().context("failed to build avatar controller")?;
        let quiz = QuizSession::new(Quiz::default_booth())?;
        Ok(Self {
            controller,
            proximity: scene.proximity_trigger(),
            quiz,
            elapsed: 0.0,
            events: Vec::new(),
        })
    }

    pub fn controller(&self) -> &LocomotionController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut LocomotionController {
        &mut self.controller
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn events(&self) -> &[(f32, ProximityEvent)] {
        &self.events
    }

    /// Whether the mentor dialog should be visible.
    pub fn dialog_open(&self) -> bool {
        self.proximity.is_active()
    }

    pub fn quiz(&self) -> &QuizSession {
        &self.quiz
    }

    /// Advances one frame and reports a proximity change, if any.
    pub fn step(&mut self, delta: f32, input: &InputSnapshot) -> Option<ProximityEvent> {
        self.controller.update(delta, input);
        if delta.is_finite() && delta > 0.0 {
            self.elapsed += delta;
        }
        let event = self.proximity.observe(self.controller.avatar().position);
        if let Some(event) = event {
            if event == ProximityEvent::Left {
                self.quiz.reset();
            }
            self.events.push((self.elapsed, event));
        }
        event
    }

    /// Frame driven by live input: queued run toggles apply before the move.
    pub fn step_with_state(&mut self, delta: f32, input: &InputState) -> Option<ProximityEvent> {
        for _ in 0..input.take_run_toggles() {
            self.controller.switch_run_toggle();
        }
        self.step(delta, &input.snapshot())
    }

    /// Replays `script` at a fixed frame time.
    pub fn run(&mut self, script: &InputScript, frame_time: f32) -> Result<()> {
        if !frame_time.is_finite() || frame_time <= 0.0 {
            bail!("frame time must be positive, got {frame_time}");
        }
        for step in &script.steps {
            match *step {
                ScriptStep::ToggleRun => self.controller.switch_run_toggle(),
                ScriptStep::Hold { keys, seconds } => {
                    let frames = hold_frames(seconds, frame_time)?;
                    debug!("holding {keys:?} for {frames} frame(s)");
                    for _ in 0..frames {
                        self.step(frame_time, &keys);
                    }
                }
            }
        }
        info!(
            "simulated {:.2}s, avatar at {}",
            self.elapsed,
            self.controller.avatar().position
        );
        Ok(())
    }

    /// Submits an answer to the mentor; only possible while the dialog is open.
    pub fn answer(&mut self, option: usize) -> Result<QuizProgress> {
        if !self.dialog_open() {
            bail!("the mentor is out of reach");
        }
        Ok(self.quiz.answer(option)?)
    }
}

/// Longest hold a single step may expand to: one hour at 60 frames per second.
pub const MAX_STEP_FRAMES: usize = 60 * 60 * 60;

/// Frames needed to cover `seconds`; any positive duration takes at least one.
fn hold_frames(seconds: f32, frame_time: f32) -> Result<usize> {
    if seconds <= 0.0 {
        return Ok(0);
    }
    let frames = (f64::from(seconds) / f64::from(frame_time)).round().max(1.0);
    if frames > MAX_STEP_FRAMES as f64 {
        bail!(
            "holding for {seconds}s at {frame_time}s per frame exceeds {MAX_STEP_FRAMES} frames"
        );
    }
    Ok(frames as usize)
}
