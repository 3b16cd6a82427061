use core::ops::{Deref, DerefMut};
use embedded_storage::nor_flash::{ErrorType, NorFlash, ReadNorFlash};

/// The flash driver of the board together with its watchdog timer.
///
/// Blanket implemented for everything that is both. Boards without a software controlled
/// watchdog can wrap their flash in [`WithoutWatchdog`].
pub trait Platform: Watchdog + NorFlash {}

impl<T: Watchdog + NorFlash> Platform for T {}

/// Software control over the watchdog timer.
///
/// Erasing the region can take longer than the watchdog period, so the store switches the
/// watchdog off around every erase and program and restores the previous state afterwards.
pub trait Watchdog {
    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Restart the watchdog period.
    fn feed(&mut self);
}

impl<T: Watchdog> Watchdog for &mut T {
    fn is_enabled(&self) -> bool {
        T::is_enabled(self)
    }

    fn set_enabled(&mut self, enabled: bool) {
        T::set_enabled(self, enabled)
    }

    fn feed(&mut self) {
        T::feed(self)
    }
}

/// Adapter for flash drivers on boards without a watchdog the store has to care about.
pub struct WithoutWatchdog<F> {
    inner: F,
}

impl<F: NorFlash> WithoutWatchdog<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F: NorFlash> ErrorType for WithoutWatchdog<F> {
    type Error = F::Error;
}

impl<F: NorFlash> ReadNorFlash for WithoutWatchdog<F> {
    const READ_SIZE: usize = F::READ_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.inner.read(offset, bytes)
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

impl<F: NorFlash> NorFlash for WithoutWatchdog<F> {
    const WRITE_SIZE: usize = F::WRITE_SIZE;
    const ERASE_SIZE: usize = F::ERASE_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        self.inner.erase(from, to)
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        self.inner.write(offset, bytes)
    }
}

impl<F> Watchdog for WithoutWatchdog<F> {
    fn is_enabled(&self) -> bool {
        false
    }

    fn set_enabled(&mut self, _enabled: bool) {}

    fn feed(&mut self) {}
}

/// Keeps the watchdog disabled for as long as it is alive and hands out the platform for the
/// flash operations in between. Dropping it puts the watchdog back into the state it was found in.
pub(crate) struct WatchdogSuspended<'a, T: Watchdog> {
    hal: &'a mut T,
    was_enabled: bool,
}

impl<'a, T: Watchdog> WatchdogSuspended<'a, T> {
    pub(crate) fn new(hal: &'a mut T) -> Self {
        let was_enabled = hal.is_enabled();
        if was_enabled {
            hal.feed();
            hal.set_enabled(false);
        }

        Self { hal, was_enabled }
    }
}

impl<T: Watchdog> Deref for WatchdogSuspended<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.hal
    }
}

impl<T: Watchdog> DerefMut for WatchdogSuspended<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.hal
    }
}

impl<T: Watchdog> Drop for WatchdogSuspended<'_, T> {
    fn drop(&mut self) {
        if self.was_enabled {
            self.hal.set_enabled(true);
        }
    }
}

/// Checks that `value` is a multiple of `alignment`, which flash drivers report as a size.
#[inline(always)]
pub(crate) fn is_aligned(value: usize, alignment: usize) -> bool {
    alignment != 0 && value.is_multiple_of(alignment)
}
