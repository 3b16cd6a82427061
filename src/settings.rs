//! Named access to the settings the keyboard keeps in every profile.
//!
//! Every setting is a single byte at a fixed offset of the selected profile. The keyboard never
//! trusts a stored value blindly: anything above the range of a setting falls back to a default
//! when loaded, and switching a setting steps to the next value and wraps around.

use crate::error::Error;
use crate::platform::Platform;
use crate::ProfileStore;

/// Offsets in the order of the board's default seed, followed by the settings that start out as
/// zero padding.
#[derive(strum::FromRepr, strum::Display, strum::EnumIter, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Setting {
    /// Base key layout
    Base = 0,
    /// Kana input method
    Kana = 1,
    /// Host operating system
    Os = 2,
    /// Key repeat delay
    Delay = 3,
    /// Modifier key arrangement
    Modifier = 4,
    /// LED assignment
    Led = 5,
    /// Host IME
    Ime = 6,
    /// Pointing device sensitivity
    Mouse = 7,
    PrefixShift = 8,
}

impl Setting {
    pub const fn offset(self) -> usize {
        self as usize
    }
}

impl<T: Platform> ProfileStore<T> {
    /// The stored value of a setting, or 0 if it is larger than `max`.
    pub fn setting(&self, setting: Setting, max: u8) -> Result<u8, Error> {
        self.setting_or(setting, max, 0)
    }

    /// The stored value of a setting, or `fallback` if it is larger than `max`.
    pub fn setting_or(&self, setting: Setting, max: u8, fallback: u8) -> Result<u8, Error> {
        let value = self.read(setting.offset())?;
        if value > max {
            Ok(fallback)
        } else {
            Ok(value)
        }
    }

    pub fn set_setting(&mut self, setting: Setting, value: u8) -> Result<(), Error> {
        self.write(setting.offset(), value)
    }

    /// Steps a setting to its next value, wrapping to 0 after `max`, and persists it.
    ///
    /// Returns the new value.
    pub fn cycle_setting(&mut self, setting: Setting, max: u8) -> Result<u8, Error> {
        let next = match self.setting(setting, max)? {
            value if value >= max => 0,
            value => value + 1,
        };

        self.set_setting(setting, next)?;
        Ok(next)
    }
}
