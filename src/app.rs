use parking_lot::RwLock;

use glam::Mat4;

use crate::camera::{Camera, Direction};
use crate::input::{InputEvent, InputState, KeyCode};
use crate::scene::Scene;

const MOVEMENT_KEYS: [KeyCode; 4] = [KeyCode::W, KeyCode::S, KeyCode::A, KeyCode::D];

/// Framebuffer size shared between the event loop and the frame step.
#[derive(Debug)]
pub struct Viewport {
    size: RwLock<(u32, u32)>,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: RwLock::new((width.max(1), height.max(1))),
        }
    }

    pub fn update(&self, width: u32, height: u32) {
        *self.size.write() = (width.max(1), height.max(1));
    }

    pub fn size(&self) -> (u32, u32) {
        *self.size.read()
    }

    pub fn aspect(&self) -> f32 {
        let (width, height) = self.size();
        width as f32 / height as f32
    }
}

/// Time between consecutive frames, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameClock {
    last_frame: f32,
    delta: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances to `now` (seconds since start) and returns the new delta.
    pub fn tick(&mut self, now: f32) -> f32 {
        self.delta = (now - self.last_frame).max(0.0);
        self.last_frame = now;
        self.delta
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }
}

/// Per-window state mutated once per frame.
#[derive(Debug)]
pub struct AppContext {
    pub camera: Camera,
    pub input: InputState,
    pub clock: FrameClock,
    close_requested: bool,
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new(Camera::new())
    }
}

impl AppContext {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            input: InputState::new(),
            clock: FrameClock::new(),
            close_requested: false,
        }
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    /// Runs one frame of input handling: queued events in arrival order,
    /// then movement for every held WASD key scaled by the frame delta.
    pub fn step(&mut self, now: f32, events: impl IntoIterator<Item = InputEvent>) -> f32 {
        let delta = self.clock.tick(now);
        for event in events {
            self.apply(event);
        }
        for key in MOVEMENT_KEYS {
            if !self.input.is_key_down(key) {
                continue;
            }
            if let Some(direction) = Direction::from_key(key) {
                self.camera.process_keyboard(direction, delta);
            }
        }
        delta
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.camera.projection_matrix(aspect) * self.camera.view_matrix()
    }

    fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyPressed(KeyCode::Escape) => self.close_requested = true,
            InputEvent::KeyPressed(key) => self.input.set_key_down(key),
            InputEvent::KeyReleased(key) => self.input.set_key_up(key),
            InputEvent::CursorMoved(position) => {
                if let Some(offset) = self.input.cursor_offset(position) {
                    self.camera.process_mouse(offset.x, offset.y, true);
                }
            }
            InputEvent::Scrolled(yoffset) => self.camera.process_scroll(yoffset),
        }
    }
}

/// One-line description printed before the window opens.
pub fn scene_summary(scene: &Scene) -> String {
    format!(
        "Loaded scene with {} cubes ({} point lights)",
        scene.cubes.len(),
        scene.point_lights.len()
    )
}
