//! Command opcode vocabulary shared by hub and accessory.
//!
//! Both ends must agree on the numbering: an opcode is a single byte on the
//! wire, `0` is never valid, and the highest value doubles as the accessory's
//! end-of-frame sentinel.

/// Every command a hub or accessory may send over the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    ComStart = 1,
    Handshake = 2,
    SyncStart = 3,
    SyncEnd = 4,
    WandOn = 5,
    WandOff = 6,
    Firing = 7,
    FiringStopped = 8,
    ProtonMode = 9,
    SlimeMode = 10,
    StasisMode = 11,
    MesonMode = 12,
    SpectralMode = 13,
    HalloweenMode = 14,
    ChristmasMode = 15,
    SpectralCustomMode = 16,
    SettingsMode = 17,
    Venting = 18,
    VentingFinished = 19,
    Overheating = 20,
    OverheatingFinished = 21,
    WarningCancelled = 22,
    CyclotronLidOn = 23,
    CyclotronLidOff = 24,
    CyclotronNormalSpeed = 25,
    CyclotronIncreaseSpeed = 26,
    PowerLevel1 = 27,
    PowerLevel2 = 28,
    PowerLevel3 = 29,
    PowerLevel4 = 30,
    PowerLevel5 = 31,
    VolumeEffectsIncrease = 32,
    VolumeEffectsDecrease = 33,
    VolumeMusicIncrease = 34,
    VolumeMusicDecrease = 35,
    MusicNextTrack = 36,
    MusicPrevTrack = 37,
    VolumeDecrease = 38,
    VolumeIncrease = 39,
    VolumeSync = 40,
    SaveEepromSettingsPack = 41,
    SaveEepromSettingsWand = 42,
    YearFrozenEmpire = 43,
    YearAfterlife = 44,
    Year1989 = 45,
    Year1984 = 46,
    AlarmOn = 47,
    AlarmOff = 48,
    PackOn = 49,
    PackOff = 50,
    TurnPackOn = 51,
    TurnPackOff = 52,
    PackConnected = 53,
    SpectralColourData = 54,
    MusicStartStop = 55,
    ToggleMute = 56,
    BarrelExtended = 57,
    BarrelRetracted = 58,
    ModeSuperHero = 59,
    ModeOriginal = 60,
    IonArmSwitchOn = 61,
    IonArmSwitchOff = 62,
    ManualOverheat = 63,
    MusicTrackCountSync = 64,
    MusicPauseResume = 65,
    MusicIsPlaying = 66,
    MusicIsNotPlaying = 67,
    MusicIsPaused = 68,
    MusicIsNotPaused = 69,
    MusicPlayTrack = 70,
    MusicTrackLoopToggle = 71,
    BatteryVoltagePack = 72,
    WandPowerAmps = 73,
    WandConnected = 74,
    WandDisconnected = 75,
    SystemLockout = 76,
    CancelLockout = 77,
    RequestPreferencesPack = 78,
    RequestPreferencesWand = 79,
    RequestPreferencesSmoke = 80,
    SendPreferencesPack = 81,
    SendPreferencesWand = 82,
    SendPreferencesSmoke = 83,
    SavePreferencesPack = 84,
    SavePreferencesWand = 85,
    SavePreferencesSmoke = 86,
    SyncData = 87,
    ComEnd = 88,
}

impl Opcode {
    /// Number of defined opcodes (all values in `1..=COUNT`).
    pub const COUNT: usize = 88;

    /// Every opcode in wire order; `ALL[n - 1]` has value `n`.
    pub const ALL: [Opcode; Self::COUNT] = [
        Self::ComStart,
        Self::Handshake,
        Self::SyncStart,
        Self::SyncEnd,
        Self::WandOn,
        Self::WandOff,
        Self::Firing,
        Self::FiringStopped,
        Self::ProtonMode,
        Self::SlimeMode,
        Self::StasisMode,
        Self::MesonMode,
        Self::SpectralMode,
        Self::HalloweenMode,
        Self::ChristmasMode,
        Self::SpectralCustomMode,
        Self::SettingsMode,
        Self::Venting,
        Self::VentingFinished,
        Self::Overheating,
        Self::OverheatingFinished,
        Self::WarningCancelled,
        Self::CyclotronLidOn,
        Self::CyclotronLidOff,
        Self::CyclotronNormalSpeed,
        Self::CyclotronIncreaseSpeed,
        Self::PowerLevel1,
        Self::PowerLevel2,
        Self::PowerLevel3,
        Self::PowerLevel4,
        Self::PowerLevel5,
        Self::VolumeEffectsIncrease,
        Self::VolumeEffectsDecrease,
        Self::VolumeMusicIncrease,
        Self::VolumeMusicDecrease,
        Self::MusicNextTrack,
        Self::MusicPrevTrack,
        Self::VolumeDecrease,
        Self::VolumeIncrease,
        Self::VolumeSync,
        Self::SaveEepromSettingsPack,
        Self::SaveEepromSettingsWand,
        Self::YearFrozenEmpire,
        Self::YearAfterlife,
        Self::Year1989,
        Self::Year1984,
        Self::AlarmOn,
        Self::AlarmOff,
        Self::PackOn,
        Self::PackOff,
        Self::TurnPackOn,
        Self::TurnPackOff,
        Self::PackConnected,
        Self::SpectralColourData,
        Self::MusicStartStop,
        Self::ToggleMute,
        Self::BarrelExtended,
        Self::BarrelRetracted,
        Self::ModeSuperHero,
        Self::ModeOriginal,
        Self::IonArmSwitchOn,
        Self::IonArmSwitchOff,
        Self::ManualOverheat,
        Self::MusicTrackCountSync,
        Self::MusicPauseResume,
        Self::MusicIsPlaying,
        Self::MusicIsNotPlaying,
        Self::MusicIsPaused,
        Self::MusicIsNotPaused,
        Self::MusicPlayTrack,
        Self::MusicTrackLoopToggle,
        Self::BatteryVoltagePack,
        Self::WandPowerAmps,
        Self::WandConnected,
        Self::WandDisconnected,
        Self::SystemLockout,
        Self::CancelLockout,
        Self::RequestPreferencesPack,
        Self::RequestPreferencesWand,
        Self::RequestPreferencesSmoke,
        Self::SendPreferencesPack,
        Self::SendPreferencesWand,
        Self::SendPreferencesSmoke,
        Self::SavePreferencesPack,
        Self::SavePreferencesWand,
        Self::SavePreferencesSmoke,
        Self::SyncData,
        Self::ComEnd,
    ];

    /// Map a wire byte to an opcode.  `0` and anything above
    /// [`Opcode::ComEnd`] yield `None`.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value as usize {
            0 => None,
            n if n <= Self::COUNT => Some(Self::ALL[n - 1]),
            _ => None,
        }
    }

    /// Wire byte for this opcode.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Sync-control opcodes are accepted in every connection state.
    pub const fn is_sync_control(self) -> bool {
        matches!(self, Self::Handshake | Self::SyncStart | Self::SyncEnd)
    }

    /// Edge-style events that always report a change when applied.
    pub const fn is_pulse(self) -> bool {
        matches!(
            self,
            Self::Firing
                | Self::FiringStopped
                | Self::Overheating
                | Self::OverheatingFinished
                | Self::AlarmOn
                | Self::AlarmOff
                | Self::Venting
                | Self::VentingFinished
        )
    }
}
