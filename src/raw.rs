use crate::error::Error;
use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

/// Flash address of the profile region on the PIC18F47J53 reference board.
pub const DEFAULT_REGION_ADDRESS: usize = 0x1F800;
/// Size of the profile region on the PIC18F47J53 reference board.
pub const DEFAULT_REGION_SIZE: usize = 1024;
/// Number of seed bytes the board configuration provides for a fresh region.
pub const DEFAULT_SEED_SIZE: usize = 8;

pub(crate) const VALID_SIGNATURE: u8 = Signature::Written as u8;
pub(crate) const ERASED_BYTE: u8 = 0xFF;

// Compile-time assertion to ensure the reference layout fits its block and region
const _: () = assert!(
    Layout::DEFAULT.profile_size * Layout::DEFAULT.profile_count + TRAILER_SIZE
        <= Layout::DEFAULT.block_size
        && DEFAULT_REGION_SIZE % Layout::DEFAULT.block_size == 0
        && DEFAULT_SEED_SIZE <= Layout::DEFAULT.profile_size,
    "Default layout must fit into a block and the region must hold whole blocks"
);

/// `current_profile` and the signature close every block.
const TRAILER_SIZE: usize = 2;

/// Geometry of one block of the log.
///
/// ```text
/// [profile 0][profile 1]..[profile n-1][reserved ...][current_profile][signature]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Layout {
    pub profile_size: usize,
    pub profile_count: usize,
    pub block_size: usize,
}

impl Layout {
    /// Four profiles of ten bytes in a 64 byte block.
    pub const DEFAULT: Layout = Layout {
        profile_size: 10,
        profile_count: 4,
        block_size: 64,
    };

    pub const fn new(profile_size: usize, profile_count: usize, block_size: usize) -> Self {
        Self {
            profile_size,
            profile_count,
            block_size,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.profile_size == 0 || self.profile_count == 0 {
            return Err(Error::InvalidLayout);
        }

        // current_profile is persisted as a single byte
        if self.profile_count > u8::MAX as usize {
            return Err(Error::InvalidLayout);
        }

        let used = self
            .profile_size
            .checked_mul(self.profile_count)
            .and_then(|it| it.checked_add(TRAILER_SIZE))
            .ok_or(Error::InvalidLayout)?;
        if used > self.block_size {
            return Err(Error::InvalidLayout);
        }

        Ok(())
    }

    pub(crate) const fn current_profile_offset(&self) -> usize {
        self.block_size - 2
    }

    pub(crate) const fn signature_offset(&self) -> usize {
        self.block_size - 1
    }

    pub(crate) const fn profile_range(&self, profile: usize) -> Range<usize> {
        let start = profile * self.profile_size;
        start..start + self.profile_size
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub(crate) enum Signature {
    Written = 0x01,
    Erased = 0xFF,
}

/// How a block of the region looks when read back.
#[derive(strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockState {
    /// Every byte is still erased.
    Blank,
    /// Signed and pointing at an existing profile. Either the active record or a stale copy.
    Written,
    /// Anything else: torn programs, foreign data, an out of range profile index.
    Corrupt,
}

/// One block image. Used both for the shadow and as scratch buffer while scanning.
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "debug-logs", derive(Debug))]
pub(crate) struct RawBlock {
    layout: Layout,
    raw: Vec<u8>,
}

impl RawBlock {
    pub(crate) fn erased(layout: Layout) -> Self {
        Self {
            layout,
            raw: vec![ERASED_BYTE; layout.block_size],
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.raw
    }

    pub(crate) fn profile(&self, profile: usize) -> &[u8] {
        &self.raw[self.layout.profile_range(profile)]
    }

    pub(crate) fn profile_mut(&mut self, profile: usize) -> &mut [u8] {
        let range = self.layout.profile_range(profile);
        &mut self.raw[range]
    }

    pub(crate) fn current_profile(&self) -> u8 {
        self.raw[self.layout.current_profile_offset()]
    }

    pub(crate) fn set_current_profile(&mut self, profile: u8) {
        let offset = self.layout.current_profile_offset();
        self.raw[offset] = profile;
    }

    pub(crate) fn signature(&self) -> Option<Signature> {
        Signature::from_repr(self.raw[self.layout.signature_offset()])
    }

    pub(crate) fn mark_written(&mut self) {
        let offset = self.layout.signature_offset();
        self.raw[offset] = VALID_SIGNATURE;
    }

    /// A block is taken as a record only if it is signed and its profile index is usable.
    pub(crate) fn is_record(&self) -> bool {
        self.signature() == Some(Signature::Written)
            && (self.current_profile() as usize) < self.layout.profile_count
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.raw.iter().all(|&it| it == ERASED_BYTE)
    }

    pub(crate) fn state(&self) -> BlockState {
        if self.is_blank() {
            BlockState::Blank
        } else if self.is_record() {
            BlockState::Written
        } else {
            BlockState::Corrupt
        }
    }

    /// Replaces the block with a fresh record: every profile starts with `defaults` and is zero
    /// padded, profile 0 is selected and the block stays unsigned until it gets persisted.
    pub(crate) fn seed(&mut self, defaults: &[u8]) {
        self.raw.fill(ERASED_BYTE);
        for profile in 0..self.layout.profile_count {
            let data = self.profile_mut(profile);
            data.fill(0);
            data[..defaults.len()].copy_from_slice(defaults);
        }
        self.set_current_profile(0);
    }
}
