use std::cmp::min;

use crate::FlashError;
use crate::spi::{
	Frame,
	RegisterPort,
	Timer,
};

use super::{
	ChecksumStatus,
	Flash,
	Session,
	consts::*,
};

fn check_range(offset: usize, length: usize) -> Result<(), FlashError> {
	if length > ADDRESS_LIMIT || ADDRESS_LIMIT - length < offset {
		return Err(FlashError::OutOfRange { offset, length });
	}
	Ok(())
}

impl<'a, R: RegisterPort, T: Timer> Session<'a, R, T> {
	/// Read `data.len()` bytes starting at `offset`, one READ per page
	pub fn dump(&mut self, data: &mut [u8], offset: usize) -> Result<(), FlashError> {
		check_range(offset, data.len())?;
		self.poll_ready()?;

		let page_size = self.info().page_size;
		let mut done = 0;
		while done < data.len() {
			let address = offset + done;
			let page_offset = address & (page_size - 1);
			let chunk = min(page_size - page_offset, data.len() - done);

			self.read_page(&mut data[done..done + chunk], address)?;
			done += chunk;
		}

		Ok(())
	}

	/// Write `data` at `offset`
	///
	/// If the block protect bits can't be cleared the bus gets released
	/// and nothing is written.
	pub fn program(&mut self, data: &[u8], offset: usize) -> Result<(), FlashError> {
		check_range(offset, data.len())?;

		if let Err(e) = self.clear_block_protect() {
			error!("{}: clear_bp failed: {}", self.info().name, e);
			self.flash.bus.release();
			return Err(e);
		}

		let mut address = offset;
		for chunk in data.chunks(PROGRAM_CHUNK) {
			self.poll_ready()?;
			self.enable_write()?;
			self.write_page(chunk, address)?;
			address += chunk.len();
		}

		// last write has to complete
		self.poll_ready()
	}
}

impl<R: RegisterPort, T: Timer> Flash<R, T> {
	/// Erase the whole chip
	///
	/// Doesn't wait for the erase to finish; poll the status (or wait)
	/// before using the FLASH again.
	pub fn erase(&mut self) -> Result<(), FlashError> {
		let mut session = self.acquire()?;

		session.bus_mut().standby();
		if let Err(e) = session.clear_block_protect() {
			error!("{}: clear_bp failed: {}", session.info().name, e);
			return Err(e);
		}

		session.enable_write()?;
		session.bus_mut().standby();
		session.xfer(8, Frame::Out(&[CHIP_ERASE_OPCODE]))?;

		info!("{}: FLASH erase started", session.info().name);
		Ok(())
	}

	/// Clear the block protect bits
	pub fn unlock(&mut self) -> Result<(), FlashError> {
		let mut session = self.acquire()?;

		if log_enabled!(log::Level::Debug) {
			let status = session.read_status()?;
			debug!("{}: status = 0x{:02x}", session.info().name, status);
		}

		session.bus_mut().standby();
		if let Err(e) = session.clear_block_protect() {
			error!("{}: clear_bp failed: {}", session.info().name, e);
			return Err(e);
		}

		if log_enabled!(log::Level::Debug) {
			let status = session.read_status()?;
			debug!("{}: status = 0x{:02x}", session.info().name, status);
		}

		Ok(())
	}

	/// Verify the NVM checksum word; with `repair` a wrong one gets
	/// reprogrammed
	///
	/// Words `0..CHECKSUM_REG` plus the checksum word must add up to
	/// `expected_sum` (wrapping). Words are stored little endian.
	pub fn checksum(&mut self, expected_sum: u16, repair: bool) -> Result<ChecksumStatus, FlashError> {
		let mut session = self.acquire()?;

		let mut buffer = [0u8; 2 * (CHECKSUM_REG + 1)];
		session.dump(&mut buffer, 0)?;

		let word = |index: usize| u16::from_le_bytes([buffer[2 * index], buffer[2 * index + 1]]);
		let sum = (0..CHECKSUM_REG).fold(0u16, |sum, index| sum.wrapping_add(word(index)));
		let computed = expected_sum.wrapping_sub(sum);
		let stored = word(CHECKSUM_REG);

		let name = session.info().name.clone();
		if stored == computed {
			info!("{}: FLASH checksum is correct (0x{:04x})", name, computed);
			return Ok(ChecksumStatus::Valid(computed));
		}

		error!("{}: FLASH checksum is incorrect: register was 0x{:04x}, calculated 0x{:04x}", name, stored, computed);
		if !repair {
			return Ok(ChecksumStatus::Invalid { stored, computed });
		}

		info!("{}: reprogramming the FLASH checksum", name);
		session.program(&computed.to_le_bytes(), 2 * CHECKSUM_REG)?;

		Ok(ChecksumStatus::Repaired { stored, computed })
	}
}
