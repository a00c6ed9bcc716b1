//! Preference exchange: bulk configuration blocks between hub and accessory.
//!
//! The protocol layer moves preference blocks as opaque bytes.  On the
//! accessory side a [`PreferenceExchange`] stages the last block of each kind
//! for the UI, remembers which kinds have been received, and debounces local
//! edits before pushing them back to the hub.  Pushing is fire-and-forget;
//! the hub's storage layer owns validation.
//!
//! The typed views ([`HubPrefs`], [`AccessoryPrefs`], [`SharedPrefs`]) give
//! the UI named fields over the same bytes.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::protocol::{Opcode, Packet, PreferenceBlock, PreferenceKind};

// ---------------------------------------------------------------------------
// Exchange state
// ---------------------------------------------------------------------------

/// Accessory-side staging area for the three preference kinds.
#[derive(Debug, Clone, Default)]
pub struct PreferenceExchange {
    staged: [Option<PreferenceBlock>; 3],
    received: [bool; 3],
    /// Time of the most recent local edit awaiting push.
    pending_since: [Option<u64>; 3],
    debounce_ms: u32,
}

impl PreferenceExchange {
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            ..Self::default()
        }
    }

    /// The command asking the hub to send its block of `kind`.
    pub fn request(kind: PreferenceKind) -> Packet {
        let op = match kind {
            PreferenceKind::Hub => Opcode::RequestPreferencesPack,
            PreferenceKind::Accessory => Opcode::RequestPreferencesWand,
            PreferenceKind::Shared => Opcode::RequestPreferencesSmoke,
        };
        Packet::command(op, 0)
    }

    /// The command asking the hub to persist settings touched by `kind`.
    /// Shared (smoke) options live in the hub's EEPROM.
    pub fn commit(kind: PreferenceKind) -> Packet {
        let op = match kind {
            PreferenceKind::Hub | PreferenceKind::Shared => Opcode::SaveEepromSettingsPack,
            PreferenceKind::Accessory => Opcode::SaveEepromSettingsWand,
        };
        Packet::command(op, 0)
    }

    /// Stage a block received from the hub.  Returns `true` when the staged
    /// copy or the received flag changed; a repeat delivery returns `false`.
    pub fn on_receive(&mut self, block: PreferenceBlock) -> bool {
        let idx = block.kind().index();
        let was_received = self.received[idx];
        let same = self.staged[idx].as_ref() == Some(&block);
        self.received[idx] = true;
        if same && was_received {
            debug!("PREFS | {:?} unchanged", block.kind());
            return false;
        }
        info!("PREFS | {:?} received ({} bytes)", block.kind(), block.as_bytes().len());
        self.staged[idx] = Some(block);
        // A fresh block from the hub supersedes any unsent local edit.
        self.pending_since[idx] = None;
        true
    }

    /// Stage a locally edited block and schedule it for push once no further
    /// edits arrive within the debounce window.
    pub fn push(&mut self, block: PreferenceBlock, now: u64) {
        let idx = block.kind().index();
        self.staged[idx] = Some(block);
        self.pending_since[idx] = Some(now);
    }

    /// Take the next edited block whose debounce window has elapsed.
    pub fn take_due(&mut self, now: u64) -> Option<PreferenceBlock> {
        for kind in PreferenceKind::ALL {
            let idx = kind.index();
            let Some(since) = self.pending_since[idx] else {
                continue;
            };
            if now.saturating_sub(since) < u64::from(self.debounce_ms) {
                continue;
            }
            self.pending_since[idx] = None;
            if let Some(block) = &self.staged[idx] {
                return Some(block.clone());
            }
        }
        None
    }

    /// Whether a local edit of `kind` is still waiting to be pushed.
    pub fn is_pending(&self, kind: PreferenceKind) -> bool {
        self.pending_since[kind.index()].is_some()
    }

    pub fn staged(&self, kind: PreferenceKind) -> Option<&PreferenceBlock> {
        self.staged[kind.index()].as_ref()
    }

    pub fn is_received(&self, kind: PreferenceKind) -> bool {
        self.received[kind.index()]
    }

    /// Forget received flags so the UI asks again after a reconnect.
    /// Staged bytes are kept for display.
    pub fn mark_stale(&mut self) {
        self.received = [false; 3];
    }
}

// ---------------------------------------------------------------------------
// Typed views
// ---------------------------------------------------------------------------

macro_rules! preference_layout {
    ($(#[$meta:meta])* $name:ident, $kind:expr, { $($field:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
        pub struct $name {
            $(pub $field: u8,)+
        }

        impl $name {
            pub const KIND: PreferenceKind = $kind;

            /// Read the typed view from a block of the matching kind.
            pub fn from_block(block: &PreferenceBlock) -> Option<Self> {
                if block.kind() != Self::KIND {
                    return None;
                }
                let mut bytes = block.as_bytes().iter().copied();
                Some(Self {
                    $($field: bytes.next()?,)+
                })
            }

            pub fn to_block(&self) -> Result<PreferenceBlock, CodecError> {
                PreferenceBlock::new(Self::KIND, &[$(self.$field),+])
            }
        }
    };
}

preference_layout!(
    /// Hub (pack) device options.
    HubPrefs, PreferenceKind::Hub, {
        default_system_mode,
        default_year_theme,
        current_year_theme,
        default_system_volume,
        vibration,
        ribbon_cable_alarm,
        cyclotron_direction,
        demo_light_mode,
        proton_stream_effects,
        overheat_strobe,
        overheat_sync_to_fan,
        overheat_lights_off,
        cyclotron_lid_count,
        cyclotron_lid_hue,
        cyclotron_lid_saturation,
        cyclotron_lid_brightness,
        cyclotron_lid_center,
        cyclotron_lid_fade,
        cyclotron_lid_sim_ring,
        cyclotron_inner_panel,
        cyclotron_panel_brightness,
        cake_count,
        cake_hue,
        cake_saturation,
        cake_brightness,
        cake_grb,
        cavity_count,
        cavity_type,
        cyclotron_video_game_colours,
        powercell_count,
        powercell_inverted,
        powercell_hue,
        powercell_saturation,
        powercell_brightness,
        powercell_video_game_colours,
    }
);

preference_layout!(
    /// Accessory (wand) device options.
    AccessoryPrefs, PreferenceKind::Accessory, {
        led_count,
        led_hue,
        led_saturation,
        rgb_vent_enabled,
        spectral_modes_enabled,
        overheat_enabled,
        default_firing_mode,
        vibration,
        sounds_to_pack,
        quick_venting,
        auto_vent_light,
        beep_loop,
        boot_error,
        default_year_mode,
        default_year_mode_cts,
        bargraph_segments,
        bargraph_inverted,
        bargraph_overheat_blink,
        bargraph_idle_animation,
        bargraph_fire_animation,
    }
);

preference_layout!(
    /// Shared smoke and overheat options, per power level (5 down to 1).
    SharedPrefs, PreferenceKind::Shared, {
        smoke_enabled,
        overheat_continuous5,
        overheat_continuous4,
        overheat_continuous3,
        overheat_continuous2,
        overheat_continuous1,
        overheat_duration5,
        overheat_duration4,
        overheat_duration3,
        overheat_duration2,
        overheat_duration1,
        overheat_level5,
        overheat_level4,
        overheat_level3,
        overheat_level2,
        overheat_level1,
        overheat_delay5,
        overheat_delay4,
        overheat_delay3,
        overheat_delay2,
        overheat_delay1,
    }
);
