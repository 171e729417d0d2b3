//! Keyboard, pointer and button state snapshot.
//!
//! `Input` is fed winit window events by the application handler and
//! queried by scenes during their `execute` step. The pointer position
//! is normalized to [0,1]² with the origin at the top-left corner.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use glam::Vec2;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::config::TOGGLE_DEBOUNCE_MS;

pub struct Input {
    keys: HashSet<KeyCode>,
    buttons: HashSet<MouseButton>,
    pointer: Vec2,
    pointer_set: bool,
    window_size: PhysicalSize<u32>,
}

impl Input {
    pub fn new(window_size: PhysicalSize<u32>) -> Self {
        Self {
            keys: HashSet::new(),
            buttons: HashSet::new(),
            pointer: Vec2::ZERO,
            pointer_set: false,
            window_size,
        }
    }

    pub fn set_window_size(&mut self, size: PhysicalSize<u32>) {
        self.window_size = size;
    }

    /// Feed a winit event into the snapshot. Returns true when the
    /// event was consumed.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            self.keys.insert(code);
                        }
                        ElementState::Released => {
                            self.keys.remove(&code);
                        }
                    }
                    return true;
                }
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.update_pointer(position.x, position.y);
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                match state {
                    ElementState::Pressed => {
                        self.buttons.insert(*button);
                    }
                    ElementState::Released => {
                        self.buttons.remove(button);
                    }
                }
                true
            }
            _ => false,
        }
    }

    fn update_pointer(&mut self, x: f64, y: f64) {
        let w = self.window_size.width.max(1) as f32;
        let h = self.window_size.height.max(1) as f32;
        self.pointer = Vec2::new(
            (x as f32 / w).clamp(0.0, 1.0),
            (y as f32 / h).clamp(0.0, 1.0),
        );
        self.pointer_set = true;
    }

    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    /// Pointer in [0,1]², origin top-left.
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// False until the cursor has entered the window at least once.
    pub fn pointer_set(&self) -> bool {
        self.pointer_set
    }
}

/// Guard for key-driven toggles: a transition is accepted only when at
/// least the debounce interval has elapsed since the previous one.
pub struct Debounce {
    last: Option<Instant>,
    interval: Duration,
}

impl Debounce {
    pub fn new() -> Self {
        Self::with_interval(Duration::from_millis(TOGGLE_DEBOUNCE_MS))
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            last: None,
            interval,
        }
    }

    /// Accept and timestamp a transition, or reject it as a bounce.
    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    fn ready_at(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

impl Default for Debounce {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_transition_is_accepted() {
        let mut d = Debounce::new();
        assert!(d.ready());
    }

    #[test]
    fn transitions_within_interval_are_rejected() {
        let mut d = Debounce::with_interval(Duration::from_millis(500));
        let t0 = Instant::now();
        assert!(d.ready_at(t0));
        assert!(!d.ready_at(t0 + Duration::from_millis(100)));
        assert!(!d.ready_at(t0 + Duration::from_millis(499)));
        assert!(d.ready_at(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn pointer_is_normalized_to_unit_square() {
        let mut input = Input::new(PhysicalSize::new(1024, 768));
        input.update_pointer(512.0, 384.0);
        assert!(input.pointer_set());
        assert_eq!(input.pointer(), Vec2::new(0.5, 0.5));
    }

    #[test]
    fn pointer_clamps_outside_the_window() {
        let mut input = Input::new(PhysicalSize::new(100, 100));
        input.update_pointer(250.0, -10.0);
        assert_eq!(input.pointer(), Vec2::new(1.0, 0.0));
    }
}
