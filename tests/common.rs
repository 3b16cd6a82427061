#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use profile_nvram::platform::Watchdog;

// PIC18F47J53: 1 KiB erase pages, 64 byte write blocks
pub const ERASE_SIZE: usize = 1024;
pub const WRITE_SIZE: usize = 64;
pub const BLOCK_SIZE: usize = 64;
pub const BLOCKS: usize = 16;
pub const SIGNATURE_OFFSET: usize = BLOCK_SIZE - 1;
pub const CURRENT_PROFILE_OFFSET: usize = BLOCK_SIZE - 2;

pub const DEFAULTS: [u8; 8] = [0x00, 0x01, 0x00, 0x03, 0x00, 0x01, 0x02, 0x01];

/// Flash with the geometry of the reference board, one region at address 0.
pub type Flash = MockFlash<ERASE_SIZE, WRITE_SIZE>;

/// Small geometry for the hand-checked scenarios: 12 byte blocks, erased as a whole region.
pub type TinyFlash = MockFlash<24, 4>;

#[derive(Default)]
pub struct MockFlash<const ERASE: usize, const WRITE: usize> {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    /// only the operation at `fail_after_operation` fails, the ones after it succeed again
    pub transient_fault: bool,
    pub operations: Vec<Operation>,

    pub watchdog_enabled: bool,
    pub watchdog_feeds: usize,
    /// erase or program operations that ran while the watchdog was enabled
    pub unguarded_operations: usize,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Erase { offset: u32, len: usize },
}

impl<const ERASE: usize, const WRITE: usize> MockFlash<ERASE, WRITE> {
    pub fn new(pages: usize) -> Self {
        Self {
            buf: vec![0xffu8; ERASE * pages],
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    pub fn new_with_fault(pages: usize, fail_after_operation: usize) -> Self {
        Self {
            buf: vec![0xffu8; ERASE * pages],
            fail_after_operation,
            ..Default::default()
        }
    }

    pub fn new_with_transient_fault(pages: usize, fail_at_operation: usize) -> Self {
        Self {
            transient_fault: true,
            ..Self::new_with_fault(pages, fail_at_operation)
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    pub fn erases(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Erase { .. }))
            .count()
    }

    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { .. }))
            .count()
    }

    pub fn block(&self, block_size: usize, index: usize) -> &[u8] {
        &self.buf[index * block_size..(index + 1) * block_size]
    }

    /// Puts a block into the flash without going through the driver, like a previous firmware would have.
    pub fn put_block(&mut self, block_size: usize, index: usize, data: &[u8]) {
        self.buf[index * block_size..(index + 1) * block_size].copy_from_slice(data);
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }

    fn check_fault(&mut self) -> Result<(), FlashError> {
        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            if self.transient_fault {
                self.disable_faults();
            }
            return Err(FlashError);
        }
        Ok(())
    }
}

/// A record for the reference layout: four profiles, `current_profile` and the signature.
pub fn record(profiles: [[u8; 10]; 4], current_profile: u8, signature: u8) -> [u8; BLOCK_SIZE] {
    let mut block = [0xffu8; BLOCK_SIZE];
    for (i, profile) in profiles.iter().enumerate() {
        block[i * 10..(i + 1) * 10].copy_from_slice(profile);
    }
    block[CURRENT_PROFILE_OFFSET] = current_profile;
    block[SIGNATURE_OFFSET] = signature;
    block
}

#[derive(Debug)]
pub struct FlashError;

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl<const ERASE: usize, const WRITE: usize> ErrorType for MockFlash<ERASE, WRITE> {
    type Error = FlashError;
}

impl<const ERASE: usize, const WRITE: usize> ReadNorFlash for MockFlash<ERASE, WRITE> {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        println!(
            "    flash: read:  0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );
        self.check_fault()?;
        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl<const ERASE: usize, const WRITE: usize> NorFlash for MockFlash<ERASE, WRITE> {
    const WRITE_SIZE: usize = WRITE;

    const ERASE_SIZE: usize = ERASE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert!(from.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(to.is_multiple_of(Self::ERASE_SIZE as _));

        println!(
            "    flash: erase: {from:04X} - {to:04X} #{:>2}",
            self.operations.len()
        );
        self.check_fault()?;

        if self.watchdog_enabled {
            self.unguarded_operations += 1;
        }

        self.operations.push(Operation::Erase {
            offset: from,
            len: (to - from) as usize,
        });

        for addr in from..to {
            self.buf[addr as usize] = 0xff;
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::WRITE_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::WRITE_SIZE));
        assert!(!bytes.is_empty());

        println!(
            "    flash: write: 0x{offset:04X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );
        self.check_fault()?;

        if self.watchdog_enabled {
            self.unguarded_operations += 1;
        }

        self.operations.push(Operation::Write {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        for (i, &val) in bytes.iter().enumerate() {
            // NOR flash can only flip bits from 1 to 0
            self.buf[offset + i] &= val;
        }
        Ok(())
    }
}

impl<const ERASE: usize, const WRITE: usize> Watchdog for MockFlash<ERASE, WRITE> {
    fn is_enabled(&self) -> bool {
        self.watchdog_enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.watchdog_enabled = enabled;
    }

    fn feed(&mut self) {
        self.watchdog_feeds += 1;
    }
}
