//! Third-person locomotion and camera follow.
//!
//! [`LocomotionController`] turns the held W/A/S/D keys into an animation
//! state (`Idle`, `Walk`, `Run`), a facing blended towards the camera-relative
//! heading, a frame-rate independent translation and a camera that trails
//! the avatar. It is driven once per rendered frame through
//! [`LocomotionController::update`].

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use glam::{Quat, Vec3};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::animation::{ActionHandle, ActionMap, ActionName, AnimationMixer, ClipAction};
use crate::config::{BoundsPolicy, LocomotionConfig};
use crate::error::LocomotionResult;
use crate::input::InputSnapshot;

/// Transform and animation label of the controlled avatar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvatarState {
    pub position: Vec3,
    pub orientation: Quat,
    pub current_action: ActionName,
}

impl AvatarState {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
            current_action: ActionName::Idle,
        }
    }

    pub fn with_action(mut self, action: ActionName) -> Self {
        self.current_action = action;
        self
    }
}

impl Default for AvatarState {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

/// Render camera position and the point the orbit control looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraRig {
    pub camera_position: Vec3,
    pub orbit_target: Vec3,
}

impl CameraRig {
    pub fn new(camera_position: Vec3, orbit_target: Vec3) -> Self {
        Self {
            camera_position,
            orbit_target,
        }
    }

    /// Unit view direction, or zero when camera and target coincide.
    pub fn forward(&self) -> Vec3 {
        (self.orbit_target - self.camera_position).normalize_or_zero()
    }

    fn translate(&mut self, displacement: Vec3) {
        self.camera_position += displacement;
    }
}

/// Yaw added to the camera heading for the held key combination.
///
/// `w` wins over `s`, and either one combined with `a` or `d` gives a
/// diagonal. `a` wins over `d` when neither `w` nor `s` is held.
pub fn direction_offset(input: &InputSnapshot) -> f32 {
    if input.w {
        if input.a {
            FRAC_PI_4
        } else if input.d {
            -FRAC_PI_4
        } else {
            0.0
        }
    } else if input.s {
        if input.a {
            3.0 * FRAC_PI_4
        } else if input.d {
            -3.0 * FRAC_PI_4
        } else {
            PI
        }
    } else if input.a {
        FRAC_PI_2
    } else if input.d {
        -FRAC_PI_2
    } else {
        0.0
    }
}

/// Rotates `from` towards `to` by at most `max_angle` radians.
pub fn rotate_towards(from: Quat, to: Quat, max_angle: f32) -> Quat {
    let angle = from.angle_between(to);
    if angle <= max_angle {
        return to;
    }
    from.slerp(to, max_angle / angle).normalize()
}

/// Per-frame avatar controller owning the avatar, its camera and its clips.
#[derive(Debug, Clone)]
pub struct LocomotionController<A = ClipAction> {
    avatar: AvatarState,
    camera: CameraRig,
    mixer: AnimationMixer<A>,
    config: LocomotionConfig,
    toggle_run: bool,
}

impl<A: ActionHandle> LocomotionController<A> {
    /// Starts the avatar's current action and takes ownership of the rig.
    pub fn new(
        avatar: AvatarState,
        camera: CameraRig,
        actions: ActionMap<A>,
        config: LocomotionConfig,
    ) -> LocomotionResult<Self> {
        config.validate()?;
        let mut mixer = AnimationMixer::new(actions);
        mixer.action_mut(avatar.current_action).play();
        let toggle_run = config.run_by_default;
        Ok(Self {
            avatar,
            camera,
            mixer,
            config,
            toggle_run,
        })
    }

    /// Same as [`LocomotionController::new`] but takes raw loader output.
    pub fn from_entries<I, S>(
        avatar: AvatarState,
        camera: CameraRig,
        entries: I,
        config: LocomotionConfig,
    ) -> LocomotionResult<Self>
    where
        I: IntoIterator<Item = (S, A)>,
        S: AsRef<str>,
    {
        let actions = ActionMap::from_entries(entries)?;
        Self::new(avatar, camera, actions, config)
    }

    pub fn avatar(&self) -> &AvatarState {
        &self.avatar
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    /// Mutable camera access for orbit controls that reposition the view.
    pub fn camera_mut(&mut self) -> &mut CameraRig {
        &mut self.camera
    }

    pub fn mixer(&self) -> &AnimationMixer<A> {
        &self.mixer
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    pub fn current_action(&self) -> ActionName {
        self.avatar.current_action
    }

    pub fn toggle_run(&self) -> bool {
        self.toggle_run
    }

    /// Flips between running and walking; applied on the next update.
    pub fn switch_run_toggle(&mut self) {
        self.toggle_run = !self.toggle_run;
        debug!("run toggle is now {}", self.toggle_run);
    }

    /// Action selected for the given input under the current run toggle.
    pub fn target_action(&self, input: &InputSnapshot) -> ActionName {
        match (input.any_direction(), self.toggle_run) {
            (false, _) => ActionName::Idle,
            (true, true) => ActionName::Run,
            (true, false) => ActionName::Walk,
        }
    }

    pub fn update(&mut self, delta_seconds: f32, input: &InputSnapshot) {
        let delta = self.sanitize_delta(delta_seconds);

        let next = self.target_action(input);
        let current = self.avatar.current_action;
        if next != current {
            debug!("avatar action {current} -> {next}");
            self.mixer.cross_fade(current, next, self.config.fade_duration);
            self.avatar.current_action = next;
        }

        self.mixer.advance(delta);

        if next.is_moving() {
            self.steer(delta, input, next);
        }
    }

    fn sanitize_delta(&self, delta: f32) -> f32 {
        if !delta.is_finite() || delta < 0.0 {
            debug!("discarding frame delta {delta}");
            return 0.0;
        }
        if delta > self.config.max_frame_delta {
            debug!(
                "clamping frame delta {delta} to {}",
                self.config.max_frame_delta
            );
            return self.config.max_frame_delta;
        }
        delta
    }

    fn steer(&mut self, delta: f32, input: &InputSnapshot, action: ActionName) {
        let to_camera = self.camera.camera_position - self.avatar.position;
        let yaw = to_camera.x.atan2(to_camera.z);
        let offset = direction_offset(input);

        let facing = Quat::from_rotation_y(yaw + offset);
        self.avatar.orientation =
            rotate_towards(self.avatar.orientation, facing, self.config.turn_step);

        let mut heading = self.camera.forward();
        heading.y = 0.0;
        let direction = Quat::from_rotation_y(offset) * heading.normalize_or_zero();

        let speed = if action == ActionName::Run {
            self.config.run_velocity
        } else {
            self.config.walk_velocity
        };
        let displacement = direction * speed * delta;
        let candidate = self.avatar.position + displacement;
        let inside = self.config.bounds.contains(candidate);

        let policy = self.config.bounds_policy;
        match policy {
            BoundsPolicy::Legacy => {
                if !inside {
                    self.avatar.position = candidate;
                    self.camera.translate(displacement);
                }
                self.camera.translate(displacement);
            }
            BoundsPolicy::KeepOut if !inside => self.commit(candidate, displacement),
            BoundsPolicy::KeepIn if inside => self.commit(candidate, displacement),
            BoundsPolicy::KeepOut | BoundsPolicy::KeepIn => {
                trace!("move to {candidate} rejected by bounds");
            }
        }

        self.camera.orbit_target = self.avatar.position + self.config.eye_offset();
    }

    fn commit(&mut self, position: Vec3, displacement: Vec3) {
        self.avatar.position = position;
        self.camera.translate(displacement);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::animation::FadeState;
    use crate::config::Bounds;
    use crate::error::LocomotionError;

    const EPS: f32 = 1e-4;

    fn rig() -> CameraRig {
        CameraRig::new(Vec3::new(0.0, 5.0, 8.0), Vec3::ZERO)
    }

    fn walking_config() -> LocomotionConfig {
        LocomotionConfig {
            run_by_default: false,
            ..LocomotionConfig::default()
        }
    }

    fn controller_at(position: Vec3, config: LocomotionConfig) -> LocomotionController {
        LocomotionController::new(
            AvatarState::new(position),
            rig(),
            ActionMap::standard(),
            config,
        )
        .unwrap()
    }

    fn assert_vec_eq(actual: Vec3, expected: Vec3) {
        assert!(
            actual.abs_diff_eq(expected, EPS),
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn offsets_match_table() {
        let cases = [
            ("wa", FRAC_PI_4),
            ("wd", -FRAC_PI_4),
            ("as", 3.0 * FRAC_PI_4),
            ("sd", -3.0 * FRAC_PI_4),
            ("s", PI),
            ("a", FRAC_PI_2),
            ("d", -FRAC_PI_2),
            ("w", 0.0),
        ];
        for (keys, expected) in cases {
            let offset = direction_offset(&InputSnapshot::from_keys(keys));
            assert_eq!(offset, expected, "keys {keys}");
        }
    }

    #[test]
    fn chords_resolve_by_key_precedence() {
        let cases = [
            ("", 0.0),
            ("ws", 0.0),
            ("wad", FRAC_PI_4),
            ("was", FRAC_PI_4),
            ("wsd", -FRAC_PI_4),
            ("wasd", FRAC_PI_4),
            ("ad", FRAC_PI_2),
            ("asd", 3.0 * FRAC_PI_4),
        ];
        for (keys, expected) in cases {
            assert_eq!(
                direction_offset(&InputSnapshot::from_keys(keys)),
                expected,
                "keys {keys}"
            );
        }
    }

    #[test]
    fn walks_forward_along_camera_heading() {
        let mut controller = controller_at(Vec3::ZERO, walking_config());
        controller.update(1.0, &InputSnapshot::from_keys("w"));

        assert_eq!(controller.current_action(), ActionName::Walk);
        assert_vec_eq(controller.avatar().position, Vec3::new(0.0, 0.0, -2.0));
        assert_vec_eq(
            controller.camera().orbit_target,
            Vec3::new(0.0, 1.0, -2.0),
        );
    }

    #[test]
    fn diagonal_forward_right_walks_at_minus_quarter_turn() {
        let input = InputSnapshot::from_keys("wd");
        assert_eq!(direction_offset(&input), -FRAC_PI_4);

        let mut controller = controller_at(Vec3::ZERO, walking_config());
        controller.update(1.0, &input);

        assert_eq!(controller.current_action(), ActionName::Walk);
        let step = 2.0 * FRAC_PI_4.sin();
        assert_vec_eq(controller.avatar().position, Vec3::new(step, 0.0, -step));
    }

    #[test]
    fn back_left_offset() {
        let input = InputSnapshot::from_pressed([("s", true), ("a", true)]);
        assert_eq!(direction_offset(&input), 3.0 * FRAC_PI_4);
    }

    #[test]
    fn running_uses_run_velocity() {
        let mut controller = controller_at(Vec3::new(0.0, 0.0, 5.0), LocomotionConfig::default());
        controller.update(0.5, &InputSnapshot::from_keys("w"));
        assert_eq!(controller.current_action(), ActionName::Run);
        assert_vec_eq(controller.avatar().position, Vec3::new(0.0, 0.0, 2.5));
    }

    #[test]
    fn releasing_keys_returns_to_idle_in_one_tick() {
        for start in ActionName::ALL {
            let mut controller = LocomotionController::new(
                AvatarState::new(Vec3::new(0.0, 0.0, 5.0)).with_action(start),
                rig(),
                ActionMap::standard(),
                LocomotionConfig::default(),
            )
            .unwrap();
            controller.update(0.016, &InputSnapshot::NONE);
            assert_eq!(controller.current_action(), ActionName::Idle);
        }
    }

    #[test]
    fn toggle_while_stationary_waits_for_movement() {
        let mut controller = controller_at(Vec3::ZERO, LocomotionConfig::default());
        controller.switch_run_toggle();
        assert!(!controller.toggle_run());
        controller.update(0.016, &InputSnapshot::NONE);
        assert_eq!(controller.current_action(), ActionName::Idle);
        assert_eq!(
            controller.mixer().action(ActionName::Idle).state(),
            FadeState::Playing
        );

        controller.update(0.016, &InputSnapshot::from_keys("w"));
        assert_eq!(controller.current_action(), ActionName::Walk);
        controller.switch_run_toggle();
        controller.update(0.016, &InputSnapshot::from_keys("w"));
        assert_eq!(controller.current_action(), ActionName::Run);
    }

    #[test]
    fn transitions_cross_fade() {
        let mut controller = controller_at(Vec3::new(0.0, 0.0, 5.0), walking_config());
        controller.update(0.1, &InputSnapshot::from_keys("w"));
        let idle = controller.mixer().action(ActionName::Idle);
        let walk = controller.mixer().action(ActionName::Walk);
        assert_eq!(idle.state(), FadeState::FadingOut);
        assert_eq!(walk.state(), FadeState::FadingIn);
        assert!((idle.weight() - 0.5).abs() < EPS);
        assert!((walk.weight() - 0.5).abs() < EPS);

        controller.update(0.1, &InputSnapshot::from_keys("w"));
        assert_eq!(
            controller.mixer().action(ActionName::Idle).state(),
            FadeState::Idle
        );
        assert_eq!(
            controller.mixer().action(ActionName::Walk).state(),
            FadeState::Playing
        );
    }

    #[test]
    fn mixer_advances_while_idle() {
        let mut controller = controller_at(Vec3::ZERO, LocomotionConfig::default());
        controller.update(0.25, &InputSnapshot::NONE);
        controller.update(0.25, &InputSnapshot::NONE);
        assert!((controller.mixer().time() - 0.5).abs() < EPS);
        assert!((controller.mixer().action(ActionName::Idle).time() - 0.5).abs() < EPS);
    }

    #[test]
    fn orbit_target_tracks_eye_height_after_moves() {
        let config = LocomotionConfig {
            eye_height: 1.7,
            ..walking_config()
        };
        let mut controller = controller_at(Vec3::new(2.0, 0.0, 3.0), config);
        for keys in ["w", "wa", "d", "s", "sd"] {
            controller.update(0.05, &InputSnapshot::from_keys(keys));
            assert_vec_eq(
                controller.camera().orbit_target,
                controller.avatar().position + Vec3::new(0.0, 1.7, 0.0),
            );
        }
    }

    #[test]
    fn zero_delta_never_moves_the_avatar() {
        let start = Vec3::new(3.0, 0.0, 3.0);
        let mut controller = controller_at(start, LocomotionConfig::default());
        for keys in ["w", "wd", "s", ""] {
            controller.update(0.0, &InputSnapshot::from_keys(keys));
            assert_vec_eq(controller.avatar().position, start);
        }
        controller.update(0.0, &InputSnapshot::from_keys("w"));
        assert_eq!(controller.current_action(), ActionName::Run);
    }

    #[test]
    fn non_finite_delta_is_ignored() {
        let start = Vec3::new(3.0, 0.0, 3.0);
        let mut controller = controller_at(start, LocomotionConfig::default());
        controller.update(f32::NAN, &InputSnapshot::from_keys("w"));
        controller.update(f32::INFINITY, &InputSnapshot::from_keys("w"));
        controller.update(-1.0, &InputSnapshot::from_keys("w"));
        assert_vec_eq(controller.avatar().position, start);
        assert!(controller.camera().camera_position.is_finite());
    }

    #[test]
    fn oversized_delta_is_clamped() {
        let mut controller = controller_at(Vec3::ZERO, walking_config());
        controller.update(30.0, &InputSnapshot::from_keys("w"));
        assert_vec_eq(controller.avatar().position, Vec3::new(0.0, 0.0, -2.0));
    }

    #[test]
    fn legacy_policy_blocks_inside_but_still_moves_camera() {
        let mut controller = controller_at(Vec3::ZERO, walking_config());
        controller.update(0.01, &InputSnapshot::from_keys("w"));

        assert_vec_eq(controller.avatar().position, Vec3::ZERO);
        assert_vec_eq(
            controller.camera().camera_position,
            Vec3::new(0.0, 5.0, 7.98),
        );
        assert_vec_eq(controller.camera().orbit_target, Vec3::Y);
    }

    #[test]
    fn legacy_policy_shifts_camera_twice_on_commit() {
        let mut controller = controller_at(Vec3::ZERO, walking_config());
        controller.update(1.0, &InputSnapshot::from_keys("w"));
        assert_vec_eq(controller.camera().camera_position, Vec3::new(0.0, 5.0, 4.0));
    }

    #[test]
    fn keep_out_policy_moves_camera_with_avatar() {
        let config = LocomotionConfig {
            bounds_policy: BoundsPolicy::KeepOut,
            ..walking_config()
        };
        let mut controller = controller_at(Vec3::new(0.0, 0.0, 3.0), config);
        let offset = controller.camera().camera_position - controller.avatar().position;

        controller.update(0.5, &InputSnapshot::from_keys("w"));
        assert_vec_eq(controller.avatar().position, Vec3::new(0.0, 0.0, 2.0));
        assert_vec_eq(
            controller.camera().camera_position - controller.avatar().position,
            offset,
        );

        // Stepping onto the table is refused and the camera stays put.
        let mut controller = LocomotionController::new(
            AvatarState::new(Vec3::new(0.0, 0.0, 0.7)),
            CameraRig::new(Vec3::new(0.0, 5.0, 8.7), Vec3::new(0.0, 0.0, 0.7)),
            ActionMap::standard(),
            LocomotionConfig {
                bounds_policy: BoundsPolicy::KeepOut,
                ..walking_config()
            },
        )
        .unwrap();
        controller.update(0.1, &InputSnapshot::from_keys("w"));
        assert_vec_eq(controller.avatar().position, Vec3::new(0.0, 0.0, 0.7));
        assert_vec_eq(
            controller.camera().camera_position,
            Vec3::new(0.0, 5.0, 8.7),
        );
    }

    #[test]
    fn keep_in_policy_commits_inside_bounds() {
        let config = LocomotionConfig {
            bounds_policy: BoundsPolicy::KeepIn,
            bounds: Bounds::default(),
            ..walking_config()
        };
        let mut controller = controller_at(Vec3::ZERO, config);
        controller.update(0.1, &InputSnapshot::from_keys("w"));
        assert_vec_eq(controller.avatar().position, Vec3::new(0.0, 0.0, -0.2));
        assert_vec_eq(
            controller.camera().camera_position,
            Vec3::new(0.0, 5.0, 7.8),
        );

        controller.update(1.0, &InputSnapshot::from_keys("w"));
        assert_vec_eq(controller.avatar().position, Vec3::new(0.0, 0.0, -0.2));
    }

    #[test]
    fn facing_turns_by_fixed_step() {
        let mut controller = LocomotionController::new(
            AvatarState::default(),
            CameraRig::new(Vec3::new(8.0, 5.0, 0.0), Vec3::ZERO),
            ActionMap::standard(),
            walking_config(),
        )
        .unwrap();
        controller.update(0.0, &InputSnapshot::from_keys("w"));
        let turned = controller.avatar().orientation.angle_between(Quat::IDENTITY);
        assert!((turned - 0.2).abs() < 1e-3, "turned {turned}");

        for _ in 0..20 {
            controller.update(0.0, &InputSnapshot::from_keys("w"));
        }
        let facing = Quat::from_rotation_y(FRAC_PI_2);
        assert!(controller.avatar().orientation.angle_between(facing) < 1e-2);
    }

    #[test]
    fn rotate_towards_stops_at_target() {
        let target = Quat::from_rotation_y(0.1);
        assert_eq!(rotate_towards(Quat::IDENTITY, target, 0.5), target);
    }

    #[test]
    fn missing_run_clip_fails_construction() {
        let result = LocomotionController::from_entries(
            AvatarState::default(),
            rig(),
            [("Idle", ClipAction::new()), ("Walk", ClipAction::new())],
            LocomotionConfig::default(),
        );
        assert_eq!(
            result.unwrap_err(),
            LocomotionError::MissingAction(ActionName::Run)
        );
    }

    #[test]
    fn invalid_config_fails_construction() {
        let result = LocomotionController::new(
            AvatarState::default(),
            rig(),
            ActionMap::standard(),
            LocomotionConfig {
                fade_duration: -1.0,
                ..LocomotionConfig::default()
            },
        );
        assert!(matches!(result, Err(LocomotionError::InvalidConfig(_))));
    }

    #[derive(Debug)]
    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Recorder {
        fn record(&self, call: &str) {
            self.log.borrow_mut().push(format!("{}.{call}", self.name));
        }
    }

    impl ActionHandle for Recorder {
        fn play(&mut self) {
            self.record("play");
        }

        fn reset(&mut self) {
            self.record("reset");
        }

        fn fade_in(&mut self, duration: f32) {
            self.record(&format!("fade_in({duration})"));
        }

        fn fade_out(&mut self, duration: f32) {
            self.record(&format!("fade_out({duration})"));
        }

        fn advance(&mut self, _dt: f32) {}
    }

    #[test]
    fn external_handles_see_fade_sequence() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let entries = ["Idle", "Walk", "Run"].map(|name| {
            (
                name,
                Recorder {
                    name,
                    log: Rc::clone(&log),
                },
            )
        });
        let mut controller = LocomotionController::from_entries(
            AvatarState::new(Vec3::new(0.0, 0.0, 5.0)),
            rig(),
            entries,
            LocomotionConfig::default(),
        )
        .unwrap();
        controller.update(0.016, &InputSnapshot::from_keys("a"));
        controller.update(0.016, &InputSnapshot::from_keys("a"));

        assert_eq!(
            *log.borrow(),
            vec![
                "Idle.play",
                "Idle.fade_out(0.2)",
                "Run.reset",
                "Run.fade_in(0.2)",
                "Run.play",
            ]
        );
    }
}
