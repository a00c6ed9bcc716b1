//! Change tracking for [`SharedState`](super::SharedState).
//!
//! Every mutation returns a [`ChangeReport`] naming the fields it touched, so
//! downstream collaborators can skip redundant redraws and replays.

use core::fmt;

use serde::Serialize;

/// One observable field (or tightly coupled field group) of shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Field {
    SystemMode = 0,
    IonArmSwitch = 1,
    CyclotronLid = 2,
    SystemYear = 3,
    PackOn = 4,
    WandOn = 5,
    PowerLevel = 6,
    StreamMode = 7,
    WandPresent = 8,
    Barrel = 9,
    Firing = 10,
    Overheating = 11,
    Venting = 12,
    Alarm = 13,
    SpeedMultiplier = 14,
    SpectralColour = 15,
    MasterMuted = 16,
    Volumes = 17,
    MusicPlaying = 18,
    MusicPaused = 19,
    TrackLooped = 20,
    CurrentTrack = 21,
    TrackCount = 22,
    PackVoltage = 23,
    WandAmps = 24,
}

impl Field {
    pub const COUNT: usize = 25;

    pub const ALL: [Field; Self::COUNT] = [
        Self::SystemMode,
        Self::IonArmSwitch,
        Self::CyclotronLid,
        Self::SystemYear,
        Self::PackOn,
        Self::WandOn,
        Self::PowerLevel,
        Self::StreamMode,
        Self::WandPresent,
        Self::Barrel,
        Self::Firing,
        Self::Overheating,
        Self::Venting,
        Self::Alarm,
        Self::SpeedMultiplier,
        Self::SpectralColour,
        Self::MasterMuted,
        Self::Volumes,
        Self::MusicPlaying,
        Self::MusicPaused,
        Self::TrackLooped,
        Self::CurrentTrack,
        Self::TrackCount,
        Self::PackVoltage,
        Self::WandAmps,
    ];

    /// Bitmask for this field.
    pub const fn mask(self) -> u32 {
        1 << (self as u8)
    }
}

/// Compact set of [`Field`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FieldSet(u32);

impl FieldSet {
    pub const EMPTY: Self = Self(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & ((1 << Field::COUNT) - 1))
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn insert(&mut self, field: Field) {
        self.0 |= field.mask();
    }

    pub const fn contains(self, field: Field) -> bool {
        self.0 & field.mask() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Field> {
        Field::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl From<Field> for FieldSet {
    fn from(field: Field) -> Self {
        Self(field.mask())
    }
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for field in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{field:?}")?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for FieldSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Outcome of one state mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeReport {
    fields: FieldSet,
}

impl ChangeReport {
    pub const NONE: Self = Self {
        fields: FieldSet::EMPTY,
    };

    /// `true` when at least one field changed (or a pulse fired).
    pub const fn changed(&self) -> bool {
        !self.fields.is_empty()
    }

    pub const fn fields(&self) -> FieldSet {
        self.fields
    }

    /// Write `value` into `slot`, recording `field` only if it differs.
    pub fn set<T: PartialEq>(&mut self, slot: &mut T, value: T, field: Field) {
        if *slot != value {
            *slot = value;
            self.fields.insert(field);
        }
    }

    /// Write `value` into `slot` and record `field` unconditionally.
    pub fn pulse<T>(&mut self, slot: &mut T, value: T, field: Field) {
        *slot = value;
        self.fields.insert(field);
    }

    /// Record `field` without writing anything.
    pub fn mark(&mut self, field: Field) {
        self.fields.insert(field);
    }

    pub fn merge(&mut self, other: ChangeReport) {
        self.fields = self.fields.union(other.fields);
    }
}
