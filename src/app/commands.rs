//! Requests an accessory makes of the hub.
//!
//! These are the remote-console actions (buttons, web UI) that travel as
//! commands to the hub.  The accessory builds them with
//! [`AccessoryCommand::opcode`]/[`AccessoryCommand::value`]; the hub parses
//! them back with [`AccessoryCommand::from_command`] and hands them to its
//! [`HubDelegate`](super::ports::HubDelegate).

use crate::protocol::Opcode;

/// Commands an accessory may send to the hub while connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessoryCommand {
    TurnPackOn,
    TurnPackOff,

    VolumeIncrease,
    VolumeDecrease,
    EffectsVolumeIncrease,
    EffectsVolumeDecrease,
    MusicVolumeIncrease,
    MusicVolumeDecrease,
    ToggleMute,

    MusicStartStop,
    MusicPauseResume,
    MusicNextTrack,
    MusicPrevTrack,
    /// Play an absolute track index (offset-based, e.g. 500..).
    MusicPlayTrack(u16),
    MusicLoopToggle,

    ManualOverheat,
    WarningCancelled,
    SystemLockout,
    CancelLockout,

    /// Ask the hub to write its runtime settings to EEPROM.
    SaveSettingsPack,
    /// Ask the hub to forward a save request to the wand.
    SaveSettingsWand,
}

/// The same commands, as seen from the hub side.
pub type HubRequest = AccessoryCommand;

impl AccessoryCommand {
    pub const fn opcode(self) -> Opcode {
        match self {
            Self::TurnPackOn => Opcode::TurnPackOn,
            Self::TurnPackOff => Opcode::TurnPackOff,
            Self::VolumeIncrease => Opcode::VolumeIncrease,
            Self::VolumeDecrease => Opcode::VolumeDecrease,
            Self::EffectsVolumeIncrease => Opcode::VolumeEffectsIncrease,
            Self::EffectsVolumeDecrease => Opcode::VolumeEffectsDecrease,
            Self::MusicVolumeIncrease => Opcode::VolumeMusicIncrease,
            Self::MusicVolumeDecrease => Opcode::VolumeMusicDecrease,
            Self::ToggleMute => Opcode::ToggleMute,
            Self::MusicStartStop => Opcode::MusicStartStop,
            Self::MusicPauseResume => Opcode::MusicPauseResume,
            Self::MusicNextTrack => Opcode::MusicNextTrack,
            Self::MusicPrevTrack => Opcode::MusicPrevTrack,
            Self::MusicPlayTrack(_) => Opcode::MusicPlayTrack,
            Self::MusicLoopToggle => Opcode::MusicTrackLoopToggle,
            Self::ManualOverheat => Opcode::ManualOverheat,
            Self::WarningCancelled => Opcode::WarningCancelled,
            Self::SystemLockout => Opcode::SystemLockout,
            Self::CancelLockout => Opcode::CancelLockout,
            Self::SaveSettingsPack => Opcode::SaveEepromSettingsPack,
            Self::SaveSettingsWand => Opcode::SaveEepromSettingsWand,
        }
    }

    pub const fn value(self) -> u16 {
        match self {
            Self::MusicPlayTrack(track) => track,
            _ => 0,
        }
    }

    /// Parse a received command.  `None` for opcodes that are not requests.
    pub fn from_command(op: Opcode, value: u16) -> Option<Self> {
        Some(match op {
            Opcode::TurnPackOn => Self::TurnPackOn,
            Opcode::TurnPackOff => Self::TurnPackOff,
            Opcode::VolumeIncrease => Self::VolumeIncrease,
            Opcode::VolumeDecrease => Self::VolumeDecrease,
            Opcode::VolumeEffectsIncrease => Self::EffectsVolumeIncrease,
            Opcode::VolumeEffectsDecrease => Self::EffectsVolumeDecrease,
            Opcode::VolumeMusicIncrease => Self::MusicVolumeIncrease,
            Opcode::VolumeMusicDecrease => Self::MusicVolumeDecrease,
            Opcode::ToggleMute => Self::ToggleMute,
            Opcode::MusicStartStop => Self::MusicStartStop,
            Opcode::MusicPauseResume => Self::MusicPauseResume,
            Opcode::MusicNextTrack => Self::MusicNextTrack,
            Opcode::MusicPrevTrack => Self::MusicPrevTrack,
            Opcode::MusicPlayTrack => Self::MusicPlayTrack(value),
            Opcode::MusicTrackLoopToggle => Self::MusicLoopToggle,
            Opcode::ManualOverheat => Self::ManualOverheat,
            Opcode::WarningCancelled => Self::WarningCancelled,
            Opcode::SystemLockout => Self::SystemLockout,
            Opcode::CancelLockout => Self::CancelLockout,
            Opcode::SaveEepromSettingsPack => Self::SaveSettingsPack,
            Opcode::SaveEepromSettingsWand => Self::SaveSettingsWand,
            _ => return None,
        })
    }
}
