use crate::error::Error;
use crate::platform::{Platform, WatchdogSuspended};
use crate::raw::{BlockState, RawBlock};
use crate::ProfileStore;
use alloc::vec::Vec;
#[cfg(feature = "defmt")]
use defmt::trace;
#[cfg(feature = "defmt")]
use defmt::warn;

impl<T: Platform> ProfileStore<T> {
    pub(crate) fn block_address(&self, index: usize) -> usize {
        self.base_address + index * self.layout.block_size
    }

    fn region_end(&self) -> usize {
        self.block_address(self.blocks)
    }

    pub(crate) fn load(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("load: @{:#08x} blocks: {}", self.base_address, self.blocks);

        let mut scratch = RawBlock::erased(self.layout);
        let mut active = None;
        for index in 0..self.blocks {
            let address = self.block_address(index);
            read_block(&mut self.hal, address, &mut scratch)?;
            if !scratch.is_record() {
                break;
            }
            active = Some(index);
        }

        match active {
            Some(index) => {
                // the scratch block holds the first rejected block by now, read the winner again
                let address = self.block_address(index);
                read_block(&mut self.hal, address, &mut self.shadow)?;
                self.current = index;

                #[cfg(feature = "defmt")]
                trace!("load: active block {}", index);

                #[cfg(feature = "debug-logs")]
                println!("  ProfileStore: loaded block {index} @{address:#08x}");
            }
            None => {
                self.shadow.seed(&self.defaults);
                self.current = self.blocks - 1;

                #[cfg(feature = "defmt")]
                warn!("load: no record found, seeding defaults");

                #[cfg(feature = "debug-logs")]
                println!("  ProfileStore: no record found, seeded defaults");
            }
        }

        Ok(())
    }

    pub(crate) fn persist(&mut self) -> Result<(), Error> {
        self.shadow.mark_written();

        match self.write_next_block() {
            Ok(()) => Ok(()),
            Err(Error::FlashError) => {
                self.faulted = true;
                Err(Error::FlashError)
            }
            Err(e) => Err(e),
        }
    }

    fn write_next_block(&mut self) -> Result<(), Error> {
        let mut next = self.current + 1;
        let next_address = self.block_address(next);
        let region = (self.base_address as u32)..(self.region_end() as u32);
        let mut scratch = RawBlock::erased(self.layout);

        let mut hal = WatchdogSuspended::new(&mut self.hal);

        // anything left behind the active block can't be programmed over
        if next < self.blocks {
            read_block(&mut *hal, next_address, &mut scratch)?;
            if !scratch.is_blank() {
                #[cfg(feature = "defmt")]
                warn!("write: block {} is not blank, restarting log", next);

                #[cfg(feature = "debug-logs")]
                println!("  ProfileStore: block {next} is not blank, restarting log");

                next = self.blocks;
            }
        }

        if next >= self.blocks {
            #[cfg(feature = "defmt")]
            trace!("erase: {:#08x} - {:#08x}", region.start, region.end);

            #[cfg(feature = "debug-logs")]
            println!("  ProfileStore: erase {:#08x} - {:#08x}", region.start, region.end);

            hal.erase(region.start, region.end)
                .map_err(|_| Error::FlashError)?;
            next = 0;
        }

        let address = self.base_address + next * self.layout.block_size;

        #[cfg(feature = "defmt")]
        trace!("write: block {} @{:#08x}", next, address);

        #[cfg(feature = "debug-logs")]
        println!("  ProfileStore: write block {next} @{address:#08x}");

        hal.write(address as u32, self.shadow.as_bytes())
            .map_err(|_| Error::FlashError)?;

        drop(hal);
        self.current = next;

        Ok(())
    }

    pub(crate) fn block_states(&mut self) -> Result<Vec<BlockState>, Error> {
        let mut scratch = RawBlock::erased(self.layout);
        let mut states = Vec::with_capacity(self.blocks);
        for index in 0..self.blocks {
            let address = self.block_address(index);
            read_block(&mut self.hal, address, &mut scratch)?;
            states.push(scratch.state());
        }

        Ok(states)
    }
}

fn read_block<T: Platform>(hal: &mut T, address: usize, block: &mut RawBlock) -> Result<(), Error> {
    hal.read(address as u32, block.as_bytes_mut())
        .map_err(|_| Error::FlashError)
}
