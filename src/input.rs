//! Keyboard bindings.
//!
//! | Key | Action |
//! |-----|--------|
//! | `M` | toggle the instanced debug mesh |
//! | `R` | toggle the metaball pass |
//! | `D` | toggle downsampled metaballs |
//! | `O` | toggle automatic camera orbit |
//! | `Space` | pause / resume |
//! | `Backspace` | re-seed the particle field |
//! | `Escape` | quit |

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::config::SceneConfig;

/// Something a key press asks the app to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ToggleDebugMesh,
    ToggleRaymarch,
    ToggleDownsample,
    ToggleAutoOrbit,
    TogglePause,
    ResetParticles,
    Quit,
}

impl Action {
    /// Action bound to `key`, if any.
    pub fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::KeyM => Some(Action::ToggleDebugMesh),
            KeyCode::KeyR => Some(Action::ToggleRaymarch),
            KeyCode::KeyD => Some(Action::ToggleDownsample),
            KeyCode::KeyO => Some(Action::ToggleAutoOrbit),
            KeyCode::Space => Some(Action::TogglePause),
            KeyCode::Backspace => Some(Action::ResetParticles),
            KeyCode::Escape => Some(Action::Quit),
            _ => None,
        }
    }

    /// Action for a window key event. Only fresh presses count.
    pub fn from_event(event: &KeyEvent) -> Option<Self> {
        if event.state != ElementState::Pressed || event.repeat {
            return None;
        }
        match event.physical_key {
            PhysicalKey::Code(code) => Self::from_key(code),
            PhysicalKey::Unidentified(_) => None,
        }
    }

    /// Apply a config toggle. Returns `false` for actions the config doesn't own.
    pub fn apply(self, config: &mut SceneConfig) -> bool {
        let (name, value) = match self {
            Action::ToggleDebugMesh => {
                config.render_debug_mesh = !config.render_debug_mesh;
                ("debug mesh", config.render_debug_mesh)
            }
            Action::ToggleRaymarch => {
                config.render_raymarch = !config.render_raymarch;
                ("raymarch", config.render_raymarch)
            }
            Action::ToggleDownsample => {
                config.downsample = !config.downsample;
                ("downsample", config.downsample)
            }
            Action::ToggleAutoOrbit => {
                config.auto_orbit = !config.auto_orbit;
                ("auto orbit", config.auto_orbit)
            }
            Action::TogglePause | Action::ResetParticles | Action::Quit => return false,
        };
        log::info!("{}: {}", name, if value { "on" } else { "off" });
        true
    }
}
