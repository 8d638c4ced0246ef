use std::collections::HashSet;
use std::mem;

use glam::Vec2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Keys the demo reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    W,
    A,
    S,
    D,
    Escape,
}

/// Raw window input captured between two frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyPressed(KeyCode),
    KeyReleased(KeyCode),
    /// Cursor position in window coordinates (y grows downward).
    CursorMoved(Vec2),
    /// Vertical scroll offset in lines.
    Scrolled(f32),
}

/// Event queue filled by window callbacks and drained once per frame.
///
/// Callbacks never touch the camera directly; the frame step applies the
/// drained events in order so there is a single writer per frame.
#[derive(Debug, Default)]
pub struct InputQueue {
    events: Mutex<Vec<InputEvent>>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: InputEvent) {
        self.events.lock().push(event);
    }

    pub fn drain(&self) -> Vec<InputEvent> {
        mem::take(&mut *self.events.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

/// Held keys plus the cursor tracking needed to turn positions into deltas.
#[derive(Debug, Default)]
pub struct InputState {
    keys: HashSet<KeyCode>,
    last_cursor: Option<Vec2>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&mut self, key: KeyCode) {
        self.keys.insert(key);
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    /// Records a cursor sample and returns the look offset since the last
    /// one. The first sample only primes the tracker so the view does not
    /// jump. The y offset is reversed because window y grows downward.
    pub fn cursor_offset(&mut self, position: Vec2) -> Option<Vec2> {
        let previous = self.last_cursor.replace(position)?;
        Some(Vec2::new(position.x - previous.x, previous.y - position.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_state_tracks_keys() {
        let mut state = InputState::new();
        state.set_key_down(KeyCode::W);
        assert!(state.is_key_down(KeyCode::W));
        assert!(!state.is_key_down(KeyCode::S));
        state.set_key_up(KeyCode::W);
        assert!(!state.is_key_down(KeyCode::W));
    }

    #[test]
    fn first_cursor_sample_only_primes() {
        let mut state = InputState::new();
        assert_eq!(state.cursor_offset(Vec2::new(400.0, 300.0)), None);
        assert_eq!(
            state.cursor_offset(Vec2::new(410.0, 290.0)),
            Some(Vec2::new(10.0, 10.0))
        );
        assert_eq!(
            state.cursor_offset(Vec2::new(405.0, 300.0)),
            Some(Vec2::new(-5.0, -10.0))
        );
    }

    #[test]
    fn queue_drains_in_order() {
        let queue = InputQueue::new();
        queue.push(InputEvent::KeyPressed(KeyCode::A));
        queue.push(InputEvent::Scrolled(1.0));
        assert!(!queue.is_empty());
        assert_eq!(
            queue.drain(),
            vec![
                InputEvent::KeyPressed(KeyCode::A),
                InputEvent::Scrolled(1.0)
            ]
        );
        assert!(queue.is_empty());
    }
}
