//! Shared state store: the accessory's mirror of hub runtime state.
//!
//! The hub is the only source of truth.  An accessory owns exactly one
//! [`SharedState`] and mutates it only through [`SharedState::apply_command`],
//! [`SharedState::apply_message`] and [`SharedState::apply_snapshot`]; every
//! call returns a [`ChangeReport`].  Other subsystems get `&SharedState` or a
//! copy published on the notification bus.
//!
//! Values survive a disconnect and are shown as possibly stale until the
//! next snapshot overwrites them.

pub mod change;
pub mod snapshot;

use serde::Serialize;

pub use change::{ChangeReport, Field, FieldSet};

use crate::dispatch;
use crate::protocol::SnapshotFrame;

// ───────────────────────────────────────────────────────────────
// Mirrored enums
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SystemMode {
    SuperHero,
    #[default]
    Original,
}

/// Ion arm (red) switch position, only meaningful in [`SystemMode::Original`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum IonArmSwitch {
    #[default]
    Off,
    On,
}

/// Theme year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SystemYear {
    Y1984,
    Y1989,
    #[default]
    Afterlife,
    FrozenEmpire,
}

/// Firing (stream) mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StreamMode {
    #[default]
    Proton,
    Stasis,
    Slime,
    Meson,
    Spectral,
    Halloween,
    Christmas,
    SpectralCustom,
    /// The hub is in its settings menu rather than a firing mode.
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub enum PowerLevel {
    #[default]
    Level1,
    Level2,
    Level3,
    Level4,
    Level5,
}

impl PowerLevel {
    /// 1-based level number as shown to the user.
    pub const fn number(self) -> u8 {
        match self {
            Self::Level1 => 1,
            Self::Level2 => 2,
            Self::Level3 => 3,
            Self::Level4 => 4,
            Self::Level5 => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BarrelState {
    #[default]
    Retracted,
    Extended,
}

// ───────────────────────────────────────────────────────────────
// Shared state
// ───────────────────────────────────────────────────────────────

/// Volume percentages reported by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Volumes {
    pub master: u8,
    pub effects: u8,
    pub music: u8,
}

/// Music playback status mirrored from the hub's audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MusicStatus {
    pub playing: bool,
    pub paused: bool,
    pub looped: bool,
    pub current_track: u16,
    pub track_count: u16,
}

/// Custom spectral colour (hue) and saturation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SpectralColour {
    pub colour: u8,
    pub saturation: u8,
}

/// The mirrored subset of hub runtime state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SharedState {
    pub system_mode: SystemMode,
    pub ion_arm_switch: IonArmSwitch,
    pub system_year: SystemYear,
    pub stream_mode: StreamMode,
    pub power_level: PowerLevel,
    pub power_level_prev: PowerLevel,
    pub barrel: BarrelState,
    pub cyclotron_lid_on: bool,

    /// Hub main power.
    pub pack_on: bool,
    /// Accessory (wand) power.
    pub wand_on: bool,
    pub wand_present: bool,

    pub firing: bool,
    pub overheating: bool,
    pub venting: bool,
    pub alarm: bool,
    /// Cyclotron spin multiplier, 1 = normal.
    pub speed_multiplier: u8,

    pub spectral: SpectralColour,
    pub master_muted: bool,
    pub volumes: Volumes,
    pub music: MusicStatus,

    /// Hub battery voltage in hundredths of a volt.
    pub pack_voltage_centi: u16,
    /// Wand current draw in hundredths of an amp.
    pub wand_amps_centi: u16,

    /// First track index on the audio device.
    #[serde(skip)]
    pub music_track_offset: u16,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(500)
    }
}

impl SharedState {
    pub const fn new(music_track_offset: u16) -> Self {
        Self {
            system_mode: SystemMode::Original,
            ion_arm_switch: IonArmSwitch::Off,
            system_year: SystemYear::Afterlife,
            stream_mode: StreamMode::Proton,
            power_level: PowerLevel::Level1,
            power_level_prev: PowerLevel::Level1,
            barrel: BarrelState::Retracted,
            cyclotron_lid_on: true,
            pack_on: false,
            wand_on: false,
            wand_present: false,
            firing: false,
            overheating: false,
            venting: false,
            alarm: false,
            speed_multiplier: 1,
            spectral: SpectralColour {
                colour: 0,
                saturation: 0,
            },
            master_muted: false,
            volumes: Volumes {
                master: 0,
                effects: 0,
                music: 0,
            },
            music: MusicStatus {
                playing: false,
                paused: false,
                looped: false,
                current_track: 0,
                track_count: 0,
            },
            pack_voltage_centi: 0,
            wand_amps_centi: 0,
            music_track_offset,
        }
    }

    /// Apply one command.  Unknown opcodes are a no-op reporting no change.
    pub fn apply_command(&mut self, opcode: u8, value: u16) -> ChangeReport {
        dispatch::apply_command(self, opcode, value)
    }

    /// Apply one structured message.
    pub fn apply_message(&mut self, opcode: u8, data: [u8; 3]) -> ChangeReport {
        dispatch::apply_message(self, opcode, data)
    }

    /// Overwrite every mirrored field from a snapshot.
    pub fn apply_snapshot(&mut self, frame: &SnapshotFrame) -> ChangeReport {
        snapshot::apply(self, frame)
    }

    /// Inclusive range of playable track indices, once a count is known.
    pub fn track_range(&self) -> Option<(u16, u16)> {
        if self.music.track_count == 0 {
            return None;
        }
        let first = self.music_track_offset;
        Some((first, first.saturating_add(self.music.track_count - 1)))
    }

    pub fn pack_voltage(&self) -> f32 {
        f32::from(self.pack_voltage_centi) / 100.0
    }

    pub fn wand_amps(&self) -> f32 {
        f32::from(self.wand_amps_centi) / 100.0
    }
}
