//! SPI FLASH command set on top of the bit-banged bus
//!
//! Instructions: (each starts after a CEN pulse)
//! - 0x06: WREN (write enable, sets WEL)
//! - 0x01: WRSR (write status register), 1 status byte follows
//! - 0x05: RDSR (read status register), status byte is clocked in
//! - 0x02: PP (page program), 3 address bytes and data follow
//! - 0x03: READ, 3 address bytes, then data is clocked in
//! - 0x04: WRDI (write disable, not used: WEL clears after each write)
//! - 0x60: chip erase
//!
//! Page program and read must not cross a page boundary.

use crate::FlashError;
use crate::spi::{
	EepromInfo,
	RegisterPort,
	SpiBus,
	Timer,
};

mod commands;
mod ops;

mod consts {
	pub const WRITE_STATUS_OPCODE: u8 = 0x01; // "WRSR"
	pub const WRITE_PAGE_OPCODE:   u8 = 0x02; // "PP"; data must stay within one page
	pub const READ_PAGE_OPCODE:    u8 = 0x03;
	pub const READ_STATUS_OPCODE:  u8 = 0x05; // "RDSR"
	pub const ENABLE_WRITE_OPCODE: u8 = 0x06; // "WREN"
	pub const CHIP_ERASE_OPCODE:   u8 = 0x60;

	// status register
	pub const STATUS_BUSY: u8 = 0x01;
	pub const STATUS_BP_MASK: u8 = 0x3c; // block protect
	pub const STATUS_BPL:  u8 = 0x80; // block protect bits read only

	// the logical address space is 16-bit
	pub const ADDRESS_LIMIT: usize = 0x1_0000;

	// bytes per page program command
	pub const PROGRAM_CHUNK: usize = 1;

	// NVM word holding the checksum, and what words 0..=CHECKSUM_REG
	// must add up to
	pub const CHECKSUM_REG: usize = 0x3f;
	pub const CHECKSUM_SUM: u16 = 0xbaba;
}

pub use self::consts::*;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChecksumStatus {
	Valid(u16),
	Invalid {
		stored: u16,
		computed: u16,
	},
	Repaired {
		stored: u16,
		computed: u16,
	},
}

pub struct Flash<R, T> {
	bus: SpiBus<R, T>,
}

impl<R: RegisterPort, T: Timer> Flash<R, T> {
	pub fn new(bus: SpiBus<R, T>) -> crate::AResult<Self> {
		bus.info().validate()?;
		Ok(Flash { bus })
	}

	pub fn info(&self) -> &EepromInfo {
		self.bus.info()
	}

	pub fn bus(&self) -> &SpiBus<R, T> {
		&self.bus
	}

	/// Take the FLASH lines from the NIC until the session is dropped
	pub fn acquire(&mut self) -> Result<Session<R, T>, FlashError> {
		self.bus.acquire()?;
		Ok(Session { flash: self })
	}
}

/// Owns the FLASH lines; releases them when dropped
///
/// Commands and page I/O are only available through a session; the
/// operations on `Flash` that acquire the bus themselves are not:
///
/// ```compile_fail
/// use e1000_spi_flash::{EepromInfo, Flash, RegisterPort, SpiBus, Timer};
///
/// struct Port;
/// impl RegisterPort for Port {
/// 	fn read(&mut self) -> u32 { 0x20 }
/// 	fn write(&mut self, _value: u32) {}
/// 	fn flush(&mut self) {}
/// }
/// struct NoDelay;
/// impl Timer for NoDelay {
/// 	fn delay_us(&mut self, _usec: u32) {}
/// }
///
/// let mut flash = Flash::new(SpiBus::new(Port, NoDelay, EepromInfo::default())).unwrap();
/// let mut session = flash.acquire().unwrap();
/// session.erase().unwrap();
/// ```
pub struct Session<'a, R: RegisterPort + 'a, T: Timer + 'a> {
	flash: &'a mut Flash<R, T>,
}

impl<'a, R: RegisterPort, T: Timer> Session<'a, R, T> {
	pub fn info(&self) -> &EepromInfo {
		self.flash.bus.info()
	}

	pub fn bus(&self) -> &SpiBus<R, T> {
		&self.flash.bus
	}

	pub fn bus_mut(&mut self) -> &mut SpiBus<R, T> {
		&mut self.flash.bus
	}
}

impl<'a, R: RegisterPort, T: Timer> Drop for Session<'a, R, T> {
	fn drop(&mut self) {
		self.flash.bus.release();
	}
}
