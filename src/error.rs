use thiserror::Error;

/// Errors that can occur during profile store operations. Marked as non-exhaustive to allow
/// for future additions without breaking the API. Only `FlashError` can show up after
/// construction without a caller mistake.
#[derive(Error, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The region base address has to be aligned to the erase size of the flash
    #[error("invalid region offset")]
    InvalidRegionOffset,

    /// The region size has to be a non-zero multiple of both the erase size and the block size,
    /// and hold at most `u16::MAX` blocks
    #[error("invalid region size")]
    InvalidRegionSize,

    /// The profiles plus the two trailer bytes have to fit into a block, and the block size has
    /// to be a multiple of the flash read and write sizes
    #[error("invalid layout")]
    InvalidLayout,

    /// The default seed is copied into every profile and can't be longer than one
    #[error("default data too long")]
    DefaultsTooLong,

    /// The offset is not inside a profile
    #[error("offset out of range: {0}")]
    OffsetOutOfRange(usize),

    /// There is no profile slot with this index
    #[error("profile out of range: {0}")]
    ProfileOutOfRange(u8),

    /// The internal error value is returned from the provided `&mut impl NorFlash`
    #[error("internal flash error")]
    FlashError,
}
