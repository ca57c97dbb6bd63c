use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Pointer activity the lab reacts to, in window pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    /// The pointer moved; drives hover highlighting.
    Moved(Vec2),
    /// The primary button was pressed; drives step selection.
    Pressed(Vec2),
    /// The pointer left the window.
    Left,
}

/// Tracks keyboard and pointer state from window events.
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_position: Vec2,
}

impl Default for Input {
    fn default() -> Self {
        Self {
            keys_down: HashSet::new(),
            keys_pressed: HashSet::new(),
            mouse_buttons_down: HashSet::new(),
            mouse_position: Vec2::ZERO,
        }
    }
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the end of each frame to reset per-frame state.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
    }

    /// Process a window event, returning the pointer event it produced.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<PointerEvent> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            if self.keys_down.insert(key) {
                                self.keys_pressed.insert(key);
                            }
                        }
                        ElementState::Released => {
                            self.keys_down.remove(&key);
                        }
                    }
                }
                None
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    let first_press = self.mouse_buttons_down.insert(*button);
                    (first_press && *button == MouseButton::Left)
                        .then_some(PointerEvent::Pressed(self.mouse_position))
                }
                ElementState::Released => {
                    self.mouse_buttons_down.remove(button);
                    None
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_position = Vec2::new(position.x as f32, position.y as f32);
                Some(PointerEvent::Moved(self.mouse_position))
            }
            WindowEvent::CursorLeft { .. } => Some(PointerEvent::Left),
            _ => None,
        }
    }

    /// Returns true if the key was pressed this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Returns true if the mouse button is currently held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons_down.contains(&button)
    }

    /// Current mouse position in window coordinates.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }
}

/// Output surface size, used to normalize pointer coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Converts window pixels to device coordinates in `[-1, 1]`, Y up.
    pub fn to_ndc(&self, pixel: Vec2) -> Vec2 {
        Vec2::new(
            (2.0 * pixel.x / self.width as f32) - 1.0,
            1.0 - (2.0 * pixel.y / self.height as f32),
        )
    }

    /// Converts device coordinates back to window pixels.
    pub fn to_pixels(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.width as f32,
            (1.0 - ndc.y) * 0.5 * self.height as f32,
        )
    }
}
