use crate::FlashError;
use crate::spi::{
	Frame,
	RegisterPort,
	Timer,
};

use super::{
	Session,
	consts::*,
};

// opcode followed by a 24-bit big endian address; the top byte is always
// zero for the 16-bit address space
fn address_header(opcode: u8, offset: usize) -> [u8; 4] {
	debug_assert!(offset < ADDRESS_LIMIT);
	[
		opcode,
		(offset >> 16) as u8,
		(offset >> 8) as u8,
		offset as u8,
	]
}

// All commands expect the bus to be acquired already.
impl<'a, R: RegisterPort, T: Timer> Session<'a, R, T> {
	pub(super) fn xfer(&mut self, bit_len: usize, frame: Frame) -> Result<(), FlashError> {
		self.flash.bus.transfer(bit_len, frame, true)
	}

	pub fn enable_write(&mut self) -> Result<(), FlashError> {
		self.flash.bus.standby();
		self.xfer(8, Frame::Out(&[ENABLE_WRITE_OPCODE]))
	}

	pub fn write_status(&mut self, status: u8) -> Result<(), FlashError> {
		self.enable_write()?;
		self.flash.bus.standby();
		self.xfer(16, Frame::Out(&[WRITE_STATUS_OPCODE, status]))
	}

	pub fn read_status(&mut self) -> Result<u8, FlashError> {
		let mut op = [READ_STATUS_OPCODE, 0];
		self.flash.bus.standby();
		self.xfer(16, Frame::InPlace(&mut op))?;
		Ok(op[1])
	}

	/// Program `data` at `offset`; must not cross a page boundary and
	/// needs a preceding `enable_write`
	pub fn write_page(&mut self, data: &[u8], offset: usize) -> Result<(), FlashError> {
		let header = address_header(WRITE_PAGE_OPCODE, offset);

		self.flash.bus.standby();
		self.xfer(8 * header.len(), Frame::Out(&header))?;
		self.xfer(8 * data.len(), Frame::Out(data))
	}

	pub fn read_page(&mut self, data: &mut [u8], offset: usize) -> Result<(), FlashError> {
		let header = address_header(READ_PAGE_OPCODE, offset);

		self.flash.bus.standby();
		self.xfer(8 * header.len(), Frame::Out(&header))?;
		self.xfer(8 * data.len(), Frame::In(data))
	}

	/// Wait until the FLASH finished its last write or erase
	///
	/// There is no retry limit; only a cancellation request (or the
	/// FLASH) ends the loop.
	pub fn poll_ready(&mut self) -> Result<(), FlashError> {
		loop {
			let status = self.read_status()?;
			if 0 == status & STATUS_BUSY {
				return Ok(());
			}
			trace!("{}: FLASH busy (status 0x{:02x})", self.info().name, status);
		}
	}

	/// Clear the block protect bits and check they really are gone
	///
	/// A locked status register (BPL with the WP# pin asserted) ignores
	/// the write; that ends in `ProtectedRegion`.
	pub fn clear_block_protect(&mut self) -> Result<(), FlashError> {
		self.write_status(!(STATUS_BP_MASK | STATUS_BPL))?;
		self.poll_ready()?;

		let status = self.read_status()?;
		if 0 != status & STATUS_BP_MASK {
			debug!("{}: block protect still set (status 0x{:02x})", self.info().name, status);
			return Err(FlashError::ProtectedRegion);
		}
		Ok(())
	}
}
