//! Snapshot code tables.
//!
//! A snapshot carries small integer codes.  Decoding them is total: a code
//! outside its table resolves to the table's default and never fails.
//!
//! | Field          | Codes                                         | Default     |
//! |----------------|-----------------------------------------------|-------------|
//! | system_year    | 1=1984 2=1989 3=Afterlife 4=FrozenEmpire      | Afterlife   |
//! | stream_mode    | 1=Proton 2=Stasis 3=Slime 4=Meson 5=Spectral  | Proton      |
//! |                | 6=Halloween 7=Christmas 8=SpectralCustom      |             |
//! | power_level    | 1..=5                                         | Level1      |
//! | system_mode    | 1=SuperHero 2=Original                        | Original    |
//! | ion_arm_switch | 1=Off 2=On                                    | Off         |
//! | master_muted   | 1=no 2=yes                                    | no          |
//! | track_looped   | 1=no 2=yes                                    | no          |
//! | other flags    | 0=no 1=yes                                    | no          |

use super::{
    BarrelState, ChangeReport, Field, IonArmSwitch, MusicStatus, PowerLevel, SharedState,
    SpectralColour, StreamMode, SystemMode, SystemYear, Volumes,
};
use crate::protocol::SnapshotFrame;

// ---------------------------------------------------------------------------
// Lookup tables
// ---------------------------------------------------------------------------

pub fn system_year(code: u8) -> SystemYear {
    match code {
        1 => SystemYear::Y1984,
        2 => SystemYear::Y1989,
        4 => SystemYear::FrozenEmpire,
        _ => SystemYear::Afterlife,
    }
}

pub fn system_year_code(year: SystemYear) -> u8 {
    match year {
        SystemYear::Y1984 => 1,
        SystemYear::Y1989 => 2,
        SystemYear::Afterlife => 3,
        SystemYear::FrozenEmpire => 4,
    }
}

pub fn stream_mode(code: u8) -> StreamMode {
    match code {
        2 => StreamMode::Stasis,
        3 => StreamMode::Slime,
        4 => StreamMode::Meson,
        5 => StreamMode::Spectral,
        6 => StreamMode::Halloween,
        7 => StreamMode::Christmas,
        8 => StreamMode::SpectralCustom,
        _ => StreamMode::Proton,
    }
}

/// `Settings` has no code; it travels as `0` and lands on the default.
pub fn stream_mode_code(mode: StreamMode) -> u8 {
    match mode {
        StreamMode::Proton => 1,
        StreamMode::Stasis => 2,
        StreamMode::Slime => 3,
        StreamMode::Meson => 4,
        StreamMode::Spectral => 5,
        StreamMode::Halloween => 6,
        StreamMode::Christmas => 7,
        StreamMode::SpectralCustom => 8,
        StreamMode::Settings => 0,
    }
}

pub fn power_level(code: u8) -> PowerLevel {
    match code {
        2 => PowerLevel::Level2,
        3 => PowerLevel::Level3,
        4 => PowerLevel::Level4,
        5 => PowerLevel::Level5,
        _ => PowerLevel::Level1,
    }
}

pub fn system_mode(code: u8) -> SystemMode {
    if code == 1 {
        SystemMode::SuperHero
    } else {
        SystemMode::Original
    }
}

pub fn ion_arm_switch(code: u8) -> IonArmSwitch {
    if code == 2 {
        IonArmSwitch::On
    } else {
        IonArmSwitch::Off
    }
}

const fn flag(code: u8) -> bool {
    code == 1
}

const fn flag_code(on: bool) -> u8 {
    if on { 1 } else { 0 }
}

const fn toggle(code: u8) -> bool {
    code == 2
}

const fn toggle_code(on: bool) -> u8 {
    if on { 2 } else { 1 }
}

// ---------------------------------------------------------------------------
// Capture / apply
// ---------------------------------------------------------------------------

/// Build the snapshot a hub sends for `state`.
pub fn capture(state: &SharedState) -> SnapshotFrame {
    SnapshotFrame {
        system_mode: match state.system_mode {
            SystemMode::SuperHero => 1,
            SystemMode::Original => 2,
        },
        ion_arm_switch: match state.ion_arm_switch {
            IonArmSwitch::Off => 1,
            IonArmSwitch::On => 2,
        },
        cyclotron_lid: flag_code(state.cyclotron_lid_on),
        system_year: system_year_code(state.system_year),
        pack_on: flag_code(state.pack_on),
        power_level: state.power_level.number(),
        stream_mode: stream_mode_code(state.stream_mode),
        wand_present: flag_code(state.wand_present),
        barrel_extended: flag_code(state.barrel == BarrelState::Extended),
        wand_firing: flag_code(state.firing),
        overheating: flag_code(state.overheating),
        speed_multiplier: state.speed_multiplier,
        spectral_colour: state.spectral.colour,
        spectral_saturation: state.spectral.saturation,
        master_muted: toggle_code(state.master_muted),
        master_volume: state.volumes.master,
        effects_volume: state.volumes.effects,
        music_volume: state.volumes.music,
        music_playing: flag_code(state.music.playing),
        music_paused: flag_code(state.music.paused),
        track_looped: toggle_code(state.music.looped),
        current_track: state.music.current_track,
        music_count: state.music.track_count,
        pack_voltage: state.pack_voltage_centi,
    }
}

/// Overwrite `state` from `frame`, reporting the fields that differ.
///
/// The alarm and venting flags are not carried; a snapshot clears them and
/// the hub follows up with an alarm command when one is still active.
pub fn apply(state: &mut SharedState, frame: &SnapshotFrame) -> ChangeReport {
    let mut r = ChangeReport::default();

    r.set(&mut state.system_mode, system_mode(frame.system_mode), Field::SystemMode);
    r.set(
        &mut state.ion_arm_switch,
        ion_arm_switch(frame.ion_arm_switch),
        Field::IonArmSwitch,
    );
    r.set(&mut state.cyclotron_lid_on, flag(frame.cyclotron_lid), Field::CyclotronLid);
    r.set(&mut state.system_year, system_year(frame.system_year), Field::SystemYear);
    r.set(&mut state.pack_on, flag(frame.pack_on), Field::PackOn);

    let level = power_level(frame.power_level);
    if state.power_level != level {
        state.power_level_prev = state.power_level;
    }
    r.set(&mut state.power_level, level, Field::PowerLevel);

    r.set(&mut state.stream_mode, stream_mode(frame.stream_mode), Field::StreamMode);
    r.set(&mut state.wand_present, flag(frame.wand_present), Field::WandPresent);
    let barrel = if flag(frame.barrel_extended) {
        BarrelState::Extended
    } else {
        BarrelState::Retracted
    };
    r.set(&mut state.barrel, barrel, Field::Barrel);
    r.set(&mut state.firing, flag(frame.wand_firing), Field::Firing);
    r.set(&mut state.overheating, flag(frame.overheating), Field::Overheating);
    r.set(&mut state.venting, false, Field::Venting);
    r.set(&mut state.alarm, false, Field::Alarm);
    r.set(
        &mut state.speed_multiplier,
        frame.speed_multiplier,
        Field::SpeedMultiplier,
    );
    r.set(
        &mut state.spectral,
        SpectralColour {
            colour: frame.spectral_colour,
            saturation: frame.spectral_saturation,
        },
        Field::SpectralColour,
    );
    r.set(&mut state.master_muted, toggle(frame.master_muted), Field::MasterMuted);
    r.set(
        &mut state.volumes,
        Volumes {
            master: frame.master_volume,
            effects: frame.effects_volume,
            music: frame.music_volume,
        },
        Field::Volumes,
    );

    let music = MusicStatus {
        playing: flag(frame.music_playing),
        paused: flag(frame.music_paused),
        looped: toggle(frame.track_looped),
        current_track: frame.current_track,
        track_count: frame.music_count,
    };
    r.set(&mut state.music.playing, music.playing, Field::MusicPlaying);
    r.set(&mut state.music.paused, music.paused, Field::MusicPaused);
    r.set(&mut state.music.looped, music.looped, Field::TrackLooped);
    r.set(&mut state.music.current_track, music.current_track, Field::CurrentTrack);
    r.set(&mut state.music.track_count, music.track_count, Field::TrackCount);

    r.set(&mut state.pack_voltage_centi, frame.pack_voltage, Field::PackVoltage);

    r
}
