//! Command dispatcher: opcode → state transition.
//!
//! Each opcode the accessory understands maps to one named transition
//! function in [`command_transition`].  A transition writes one or more
//! fields of [`SharedState`] and returns a [`ChangeReport`].
//!
//! Two write styles are used:
//!
//! - **level** (`ChangeReport::set`): reports only when the value differs.
//! - **pulse** (`ChangeReport::pulse`): always reports, so effects re-trigger
//!   even when the hub repeats an edge the accessory already saw.
//!
//! Composite transitions set several fields together where the hub's state
//! implies it: firing means the whole chain is powered.

use log::debug;

use crate::protocol::Opcode;
use crate::state::{
    BarrelState, ChangeReport, Field, IonArmSwitch, PowerLevel, SharedState, SpectralColour,
    StreamMode, SystemMode, SystemYear, Volumes,
};

/// Signature of a command transition.
pub type CommandFn = fn(&mut SharedState, u16) -> ChangeReport;

/// Apply command `opcode` with `value`.  Unknown opcodes report no change.
pub fn apply_command(state: &mut SharedState, opcode: u8, value: u16) -> ChangeReport {
    let Some(op) = Opcode::from_u8(opcode) else {
        debug!("DISPATCH | unknown opcode {opcode}");
        return ChangeReport::NONE;
    };
    match command_transition(op) {
        Some(transition) => {
            debug!("DISPATCH | {op:?} value={value}");
            transition(state, value)
        }
        None => ChangeReport::NONE,
    }
}

/// Apply message `opcode` carrying `data`.  Unknown opcodes report no change.
pub fn apply_message(state: &mut SharedState, opcode: u8, data: [u8; 3]) -> ChangeReport {
    let op = Opcode::from_u8(opcode);
    debug!("DISPATCH | message {op:?} data={data:?}");
    match op {
        Some(Opcode::VolumeSync) => volume_sync(state, data),
        Some(Opcode::SpectralCustomMode) => {
            let mut r = set_stream(state, StreamMode::SpectralCustom);
            r.merge(spectral_colour(state, data));
            r
        }
        Some(Opcode::SpectralColourData) => spectral_colour(state, data),
        _ => ChangeReport::NONE,
    }
}

/// The dispatch table.  `None` for opcodes with no effect on shared state
/// (sync control, requests travelling the other way).
pub fn command_transition(op: Opcode) -> Option<CommandFn> {
    use Opcode as O;

    let f: CommandFn = match op {
        // Power and presence
        O::PackOn => |s, _| level(&mut s.pack_on, true, Field::PackOn),
        O::PackOff => |s, _| level(&mut s.pack_on, false, Field::PackOn),
        O::WandOn => wand_powered,
        O::WandOff => |s, _| level(&mut s.wand_on, false, Field::WandOn),
        O::WandConnected => |s, _| level(&mut s.wand_present, true, Field::WandPresent),
        O::WandDisconnected => |s, _| level(&mut s.wand_present, false, Field::WandPresent),

        // Pulses
        O::Firing => firing_started,
        O::FiringStopped => firing_stopped,
        O::Overheating => overheating_started,
        O::OverheatingFinished => overheating_finished,
        O::AlarmOn => alarm_on,
        O::AlarmOff => alarm_off,
        O::Venting => venting_started,
        O::VentingFinished => venting_finished,

        // Stream modes
        O::ProtonMode => |s, _| set_stream(s, StreamMode::Proton),
        O::StasisMode => |s, _| set_stream(s, StreamMode::Stasis),
        O::SlimeMode => |s, _| set_stream(s, StreamMode::Slime),
        O::MesonMode => |s, _| set_stream(s, StreamMode::Meson),
        O::SpectralMode => |s, _| set_stream(s, StreamMode::Spectral),
        O::HalloweenMode => |s, _| set_stream(s, StreamMode::Halloween),
        O::ChristmasMode => |s, _| set_stream(s, StreamMode::Christmas),
        O::SpectralCustomMode => |s, _| set_stream(s, StreamMode::SpectralCustom),
        O::SettingsMode => |s, _| set_stream(s, StreamMode::Settings),

        // Power levels
        O::PowerLevel1 => |s, _| set_power(s, PowerLevel::Level1),
        O::PowerLevel2 => |s, _| set_power(s, PowerLevel::Level2),
        O::PowerLevel3 => |s, _| set_power(s, PowerLevel::Level3),
        O::PowerLevel4 => |s, _| set_power(s, PowerLevel::Level4),
        O::PowerLevel5 => |s, _| set_power(s, PowerLevel::Level5),

        // Theme year and system mode
        O::Year1984 => |s, _| level(&mut s.system_year, SystemYear::Y1984, Field::SystemYear),
        O::Year1989 => |s, _| level(&mut s.system_year, SystemYear::Y1989, Field::SystemYear),
        O::YearAfterlife => {
            |s, _| level(&mut s.system_year, SystemYear::Afterlife, Field::SystemYear)
        }
        O::YearFrozenEmpire => {
            |s, _| level(&mut s.system_year, SystemYear::FrozenEmpire, Field::SystemYear)
        }
        O::ModeSuperHero => {
            |s, _| level(&mut s.system_mode, SystemMode::SuperHero, Field::SystemMode)
        }
        O::ModeOriginal => {
            |s, _| level(&mut s.system_mode, SystemMode::Original, Field::SystemMode)
        }
        O::IonArmSwitchOn => {
            |s, _| level(&mut s.ion_arm_switch, IonArmSwitch::On, Field::IonArmSwitch)
        }
        O::IonArmSwitchOff => {
            |s, _| level(&mut s.ion_arm_switch, IonArmSwitch::Off, Field::IonArmSwitch)
        }

        // Hardware positions
        O::BarrelExtended => |s, _| level(&mut s.barrel, BarrelState::Extended, Field::Barrel),
        O::BarrelRetracted => |s, _| level(&mut s.barrel, BarrelState::Retracted, Field::Barrel),
        O::CyclotronLidOn => |s, _| level(&mut s.cyclotron_lid_on, true, Field::CyclotronLid),
        O::CyclotronLidOff => |s, _| level(&mut s.cyclotron_lid_on, false, Field::CyclotronLid),
        O::CyclotronNormalSpeed => {
            |s, _| level(&mut s.speed_multiplier, 1, Field::SpeedMultiplier)
        }
        O::CyclotronIncreaseSpeed => cyclotron_speed_up,

        // Audio
        O::ToggleMute => |s, v| level(&mut s.master_muted, v == 2, Field::MasterMuted),
        O::MusicTrackLoopToggle => |s, v| level(&mut s.music.looped, v == 2, Field::TrackLooped),
        O::MusicIsPlaying => |s, v| music_status(s, true, v),
        O::MusicIsNotPlaying => |s, v| music_status(s, false, v),
        O::MusicIsPaused => |s, _| level(&mut s.music.paused, true, Field::MusicPaused),
        O::MusicIsNotPaused => |s, _| level(&mut s.music.paused, false, Field::MusicPaused),
        O::MusicTrackCountSync => track_count_sync,

        // Telemetry
        O::BatteryVoltagePack => |s, v| level(&mut s.pack_voltage_centi, v, Field::PackVoltage),
        O::WandPowerAmps => |s, v| level(&mut s.wand_amps_centi, v, Field::WandAmps),

        _ => return None,
    };
    Some(f)
}

// ---------------------------------------------------------------------------
// Primitive writes
// ---------------------------------------------------------------------------

fn level<T: PartialEq>(slot: &mut T, value: T, field: Field) -> ChangeReport {
    let mut r = ChangeReport::default();
    r.set(slot, value, field);
    r
}

fn set_stream(s: &mut SharedState, mode: StreamMode) -> ChangeReport {
    level(&mut s.stream_mode, mode, Field::StreamMode)
}

fn set_power(s: &mut SharedState, power: PowerLevel) -> ChangeReport {
    if s.power_level == power {
        return ChangeReport::NONE;
    }
    s.power_level_prev = s.power_level;
    level(&mut s.power_level, power, Field::PowerLevel)
}

// ---------------------------------------------------------------------------
// Composite transitions
// ---------------------------------------------------------------------------

/// Firing implies both the hub and the accessory are powered.
fn firing_started(s: &mut SharedState, _: u16) -> ChangeReport {
    let mut r = ChangeReport::default();
    r.pulse(&mut s.firing, true, Field::Firing);
    r.set(&mut s.pack_on, true, Field::PackOn);
    r.set(&mut s.wand_on, true, Field::WandOn);
    r
}

/// Stopping returns the cyclotron to normal speed unless it is overheating.
fn firing_stopped(s: &mut SharedState, _: u16) -> ChangeReport {
    let mut r = ChangeReport::default();
    r.pulse(&mut s.firing, false, Field::Firing);
    if !s.overheating {
        r.set(&mut s.speed_multiplier, 1, Field::SpeedMultiplier);
    }
    r
}

fn overheating_started(s: &mut SharedState, _: u16) -> ChangeReport {
    let mut r = ChangeReport::default();
    r.pulse(&mut s.overheating, true, Field::Overheating);
    r
}

fn overheating_finished(s: &mut SharedState, _: u16) -> ChangeReport {
    let mut r = ChangeReport::default();
    r.pulse(&mut s.overheating, false, Field::Overheating);
    r.set(&mut s.speed_multiplier, 1, Field::SpeedMultiplier);
    r
}

/// An alarm (ribbon cable off) stops any firing in progress.
fn alarm_on(s: &mut SharedState, _: u16) -> ChangeReport {
    let mut r = ChangeReport::default();
    r.set(&mut s.firing, false, Field::Firing);
    r.pulse(&mut s.alarm, true, Field::Alarm);
    r
}

fn alarm_off(s: &mut SharedState, _: u16) -> ChangeReport {
    let mut r = ChangeReport::default();
    r.pulse(&mut s.alarm, false, Field::Alarm);
    r
}

/// Venting is an overheat phase run at normal cyclotron speed.
fn venting_started(s: &mut SharedState, _: u16) -> ChangeReport {
    let mut r = ChangeReport::default();
    r.set(&mut s.speed_multiplier, 1, Field::SpeedMultiplier);
    r.pulse(&mut s.overheating, true, Field::Overheating);
    r.pulse(&mut s.venting, true, Field::Venting);
    r
}

fn venting_finished(s: &mut SharedState, _: u16) -> ChangeReport {
    let mut r = ChangeReport::default();
    r.pulse(&mut s.overheating, false, Field::Overheating);
    r.pulse(&mut s.venting, false, Field::Venting);
    r
}

/// Powering the accessory implies the hub is powered.
fn wand_powered(s: &mut SharedState, _: u16) -> ChangeReport {
    let mut r = ChangeReport::default();
    r.set(&mut s.wand_on, true, Field::WandOn);
    r.set(&mut s.pack_on, true, Field::PackOn);
    r
}

/// Relative step, so it is not idempotent.
fn cyclotron_speed_up(s: &mut SharedState, _: u16) -> ChangeReport {
    let next = s.speed_multiplier.saturating_add(1);
    level(&mut s.speed_multiplier, next, Field::SpeedMultiplier)
}

/// Playing/stopped status; a non-zero value also names the current track.
fn music_status(s: &mut SharedState, playing: bool, track: u16) -> ChangeReport {
    let mut r = ChangeReport::default();
    r.set(&mut s.music.playing, playing, Field::MusicPlaying);
    r.set(&mut s.music.paused, false, Field::MusicPaused);
    if track > 0 {
        r.set(&mut s.music.current_track, track, Field::CurrentTrack);
    }
    r
}

/// A zero count means "unknown" and leaves the stored count alone.
fn track_count_sync(s: &mut SharedState, count: u16) -> ChangeReport {
    if count == 0 {
        return ChangeReport::NONE;
    }
    level(&mut s.music.track_count, count, Field::TrackCount)
}

// ---------------------------------------------------------------------------
// Message transitions
// ---------------------------------------------------------------------------

fn volume_sync(s: &mut SharedState, data: [u8; 3]) -> ChangeReport {
    level(
        &mut s.volumes,
        Volumes {
            master: data[0],
            effects: data[1],
            music: data[2],
        },
        Field::Volumes,
    )
}

/// Zero bytes leave the corresponding component unchanged.
fn spectral_colour(s: &mut SharedState, data: [u8; 3]) -> ChangeReport {
    let next = SpectralColour {
        colour: if data[0] > 0 { data[0] } else { s.spectral.colour },
        saturation: if data[1] > 0 { data[1] } else { s.spectral.saturation },
    };
    level(&mut s.spectral, next, Field::SpectralColour)
}
