#![doc = include_str ! ("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

pub mod error;
mod internal;
pub mod platform;
mod raw;
mod settings;

pub use raw::{BlockState, DEFAULT_REGION_ADDRESS, DEFAULT_REGION_SIZE, DEFAULT_SEED_SIZE, Layout};
pub use settings::Setting;

extern crate alloc;

use crate::error::Error;
use crate::platform::{Platform, is_aligned};
use crate::raw::RawBlock;
use alloc::vec::Vec;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegionStatistics {
    /// State of every block, in address order
    pub blocks: Vec<BlockState>,
    /// Erased blocks, ready to be programmed
    pub blank: u16,
    /// Signed blocks selecting an existing profile, stale copies included
    pub written: u16,
    /// Blocks that are neither, the log restarts when it reaches one
    pub corrupt: u16,
    /// The block a fresh scan would load, `None` if the region holds no record
    pub active: Option<usize>,
}

/// A wear-leveling store for a handful of keyboard profiles.
///
/// The region is used as a log of equally sized blocks. Every change to the profiles writes the
/// complete record into the next block; once the last block has been used the whole region is
/// erased and the log restarts at block 0. Reads never touch the flash, they are served from an
/// in-memory shadow of the active record.
///
/// The store is the only writer of its region and expects a single caller at a time, every
/// mutation takes `&mut self` and runs the erase and program operations to completion before
/// returning.
pub struct ProfileStore<T: Platform> {
    pub(crate) hal: T,
    pub(crate) base_address: usize,
    pub(crate) blocks: usize,
    pub(crate) layout: Layout,
    pub(crate) defaults: Vec<u8>,
    pub(crate) faulted: bool,

    // set after calling self.initialize
    pub(crate) shadow: RawBlock,
    pub(crate) current: usize,
}

impl<T: Platform> ProfileStore<T> {
    /// Validates the region against the flash geometry and loads the active record.
    ///
    /// `defaults` seeds every profile if the region doesn't hold a valid record yet, e.g. on the
    /// very first boot. It is zero padded to the profile size.
    ///
    /// Nothing is written to the flash until the first call to [`write`](Self::write) or
    /// [`select_profile`](Self::select_profile).
    pub fn new(
        region_offset: usize,
        region_size: usize,
        layout: Layout,
        defaults: &[u8],
        hal: T,
    ) -> Result<ProfileStore<T>, Error> {
        layout.validate()?;

        if !is_aligned(layout.block_size, T::WRITE_SIZE)
            || !is_aligned(layout.block_size, T::READ_SIZE)
        {
            return Err(Error::InvalidLayout);
        }

        if !is_aligned(region_offset, T::ERASE_SIZE) {
            return Err(Error::InvalidRegionOffset);
        }

        if region_size == 0
            || !is_aligned(region_size, T::ERASE_SIZE)
            || !is_aligned(region_size, layout.block_size)
        {
            return Err(Error::InvalidRegionSize);
        }

        match region_offset.checked_add(region_size) {
            Some(end) if end <= u32::MAX as usize => {}
            _ => return Err(Error::InvalidRegionSize),
        }

        if defaults.len() > layout.profile_size {
            return Err(Error::DefaultsTooLong);
        }

        let blocks = region_size / layout.block_size;
        if blocks > u16::MAX as usize {
            return Err(Error::InvalidRegionSize);
        }

        let mut store = Self {
            hal,
            base_address: region_offset,
            blocks,
            layout,
            defaults: defaults.to_vec(),
            faulted: false,
            shadow: RawBlock::erased(layout),
            current: blocks - 1,
        };

        store.initialize()?;
        Ok(store)
    }

    /// Scans the region for the active record and loads it into the shadow.
    ///
    /// Blocks are accepted from block 0 upwards as long as they are signed and select an existing
    /// profile, the last accepted one wins. Without any accepted block the shadow is seeded from
    /// the defaults and the next write starts the log over with an erase of the whole region.
    ///
    /// Only reads from the flash. A successful scan clears a previous fault.
    pub fn initialize(&mut self) -> Result<(), Error> {
        match self.load() {
            Ok(()) => {
                self.faulted = false;
                Ok(())
            }
            Err(Error::FlashError) => {
                self.faulted = true;
                Err(Error::FlashError)
            }
            Err(e) => Err(e),
        }
    }

    /// Read a byte of the selected profile. Served from memory.
    pub fn read(&self, offset: usize) -> Result<u8, Error> {
        if offset >= self.layout.profile_size {
            return Err(Error::OffsetOutOfRange(offset));
        }

        let profile = self.shadow.current_profile() as usize;
        Ok(self.shadow.profile(profile)[offset])
    }

    /// Set a byte of the selected profile and write the record to the next block.
    ///
    /// If the flash fails the new value stays visible to [`read`](Self::read), but the store is
    /// marked as faulted and refuses further writes until [`sync`](Self::sync) or
    /// [`initialize`](Self::initialize) succeeds.
    pub fn write(&mut self, offset: usize, value: u8) -> Result<(), Error> {
        if self.faulted {
            return Err(Error::FlashError);
        }

        if offset >= self.layout.profile_size {
            return Err(Error::OffsetOutOfRange(offset));
        }

        let profile = self.shadow.current_profile() as usize;
        self.shadow.profile_mut(profile)[offset] = value;

        self.persist()
    }

    /// Switch to another profile slot and write the record to the next block.
    pub fn select_profile(&mut self, profile: u8) -> Result<(), Error> {
        if self.faulted {
            return Err(Error::FlashError);
        }

        if profile as usize >= self.layout.profile_count {
            return Err(Error::ProfileOutOfRange(profile));
        }

        self.shadow.set_current_profile(profile);

        self.persist()
    }

    /// Write the shadow to the next block, clearing a previous fault.
    ///
    /// This is the recovery path that keeps what [`read`](Self::read) returns. A failure can leave
    /// the region without any record, e.g. when the erase at the end of the log succeeded and
    /// programming block 0 did not, and [`initialize`](Self::initialize) would fall back to the
    /// defaults. A block left half programmed is not blank and restarts the log.
    pub fn sync(&mut self) -> Result<(), Error> {
        self.faulted = false;
        self.persist()
    }

    pub fn current_profile(&self) -> u8 {
        self.shadow.current_profile()
    }

    /// All bytes of a profile slot, selected or not.
    pub fn profile(&self, profile: u8) -> Result<&[u8], Error> {
        if profile as usize >= self.layout.profile_count {
            return Err(Error::ProfileOutOfRange(profile));
        }

        Ok(self.shadow.profile(profile as usize))
    }

    /// Index of the block holding the active record.
    ///
    /// Points at the last block before the first write to a region without a record, so that
    /// the write restarts the log.
    pub fn active_block(&self) -> usize {
        self.current
    }

    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Reads the whole region and reports what every block currently holds
    pub fn statistics(&mut self) -> Result<RegionStatistics, Error> {
        if self.faulted {
            return Err(Error::FlashError);
        }

        let blocks = match self.block_states() {
            Ok(blocks) => blocks,
            Err(Error::FlashError) => {
                self.faulted = true;
                return Err(Error::FlashError);
            }
            Err(e) => return Err(e),
        };

        let (blank, written, corrupt) =
            blocks
                .iter()
                .fold((0, 0, 0), |(blank, written, corrupt), state| match state {
                    BlockState::Blank => (blank + 1, written, corrupt),
                    BlockState::Written => (blank, written + 1, corrupt),
                    BlockState::Corrupt => (blank, written, corrupt + 1),
                });

        let active = blocks
            .iter()
            .take_while(|&&state| state == BlockState::Written)
            .count()
            .checked_sub(1);

        Ok(RegionStatistics {
            blocks,
            blank,
            written,
            corrupt,
            active,
        })
    }
}
