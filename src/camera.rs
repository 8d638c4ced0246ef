//! Free-fly camera driven by keyboard, mouse and scroll deltas.
//!
//! Orientation is parameterized by yaw and pitch in degrees. The front,
//! right and up vectors are derived from those angles every time they
//! change, so they are never observed out of sync with them.

use glam::{Mat4, Vec3};

use crate::input::KeyCode;

/// Movement speed in world units per second.
pub const SPEED: f32 = 3.0;
/// Degrees of rotation per unit of mouse offset.
pub const SENSITIVITY: f32 = 0.25;
pub const WORLD_UP: Vec3 = Vec3::Y;
pub const PITCH_LIMIT: f32 = 89.0;
pub const MIN_FOV: f32 = 1.0;
pub const MAX_FOV: f32 = 45.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;

const DEFAULT_YAW: f32 = -90.0;
const DEFAULT_PITCH: f32 = 0.0;

/// Movement intent relative to the current orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    /// Maps the WASD keys to a movement direction.
    pub fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::W => Some(Self::Forward),
            KeyCode::S => Some(Self::Backward),
            KeyCode::A => Some(Self::Left),
            KeyCode::D => Some(Self::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    front: Vec3,
    right: Vec3,
    up: Vec3,
    yaw: f32,
    pitch: f32,
    fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    /// Camera at (0, 0, 3) looking down -Z.
    pub fn new() -> Self {
        Self::with_orientation(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, WORLD_UP)
    }

    /// Camera with an explicit position, target and up vector.
    ///
    /// The target is kept for reference only. Orientation still starts from
    /// the default yaw and pitch, and `up` is rederived from them.
    pub fn looking_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        Self::with_orientation(position, target, up)
    }

    fn with_orientation(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let mut camera = Self {
            position,
            target,
            front: Vec3::NEG_Z,
            right: Vec3::X,
            up,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            fov: MAX_FOV,
        };
        camera.update_vectors();
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Look-at transform from the current position along `front`.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// GL-convention perspective projection using the current FOV.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov.to_radians(), aspect, NEAR_PLANE, FAR_PLANE)
    }

    pub fn process_keyboard(&mut self, direction: Direction, delta_time: f32) {
        let velocity = SPEED * delta_time;
        match direction {
            Direction::Forward => self.position += self.front * velocity,
            Direction::Backward => self.position -= self.front * velocity,
            Direction::Left => self.position -= self.right * velocity,
            Direction::Right => self.position += self.right * velocity,
        }
    }

    /// Applies a mouse offset, optionally keeping pitch inside ±89° so the
    /// view never flips over the pole.
    pub fn process_mouse(&mut self, xoffset: f32, yoffset: f32, constrain_pitch: bool) {
        self.yaw += xoffset * SENSITIVITY;
        self.pitch += yoffset * SENSITIVITY;

        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        self.update_vectors();
    }

    /// Zooms by narrowing the FOV.
    ///
    /// The offset is only applied while the FOV is inside `[1, 45]`; both
    /// bounds are then reasserted. A FOV pinned at a bound therefore still
    /// takes the step and is clamped back afterwards.
    pub fn process_scroll(&mut self, yoffset: f32) {
        if (MIN_FOV..=MAX_FOV).contains(&self.fov) {
            self.fov -= yoffset;
        }
        if self.fov <= MIN_FOV {
            self.fov = MIN_FOV;
        }
        if self.fov >= MAX_FOV {
            self.fov = MAX_FOV;
        }
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        let front = Vec3::new(pitch.cos() * yaw.cos(), pitch.sin(), pitch.cos() * yaw.sin());
        self.front = front.normalize();
        self.right = self.front.cross(WORLD_UP).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}
