use crate::FlashError;

use super::{
	RegisterPort,
	SpiBus,
	Timer,
};

pub const GRANT_ATTEMPTS: usize = 1000;
const GRANT_POLL_USEC: u32 = 5;
const GRANT_SETTLE_USEC: u32 = 1;

impl<R: RegisterPort, T: Timer> SpiBus<R, T> {
	/// Request the FLASH lines from the NIC
	///
	/// On success the chip is selected with SK and SI low. Every
	/// successful `acquire` must be paired with a `release`.
	pub fn acquire(&mut self) -> Result<(), FlashError> {
		if !self.info.has_flash() {
			return Ok(());
		}

		let mut fla = self.read_fla();
		fla.set_request();
		self.port.write(fla.0);

		let mut attempts = 0;
		while !fla.is_granted() && attempts < GRANT_ATTEMPTS {
			self.timer.delay_us(GRANT_POLL_USEC);
			fla = self.read_fla();
			attempts += 1;
		}

		if !fla.is_granted() {
			fla.clear_request();
			self.port.write(fla.0);
			warn!("{}: could not acquire FLASH grant: fla={:?}", self.info.name, fla);
			return Err(FlashError::ArbitrationTimeout { fla: fla.0 });
		}

		fla.set_data_out(false).clear_chip_disabled().clear_clock();
		self.port.write(fla.0);
		self.timer.delay_us(GRANT_SETTLE_USEC);

		debug!("{}: acquire succeeded after {} polls", self.info.name, attempts);
		Ok(())
	}

	/// Deselect the chip and hand the lines back to the NIC
	pub fn release(&mut self) {
		if !self.info.has_flash() {
			return;
		}

		let mut fla = self.read_fla();
		fla.set_chip_disabled().clear_clock();
		self.port.write(fla.0);
		self.delay();

		fla.clear_request();
		self.port.write(fla.0);

		debug!("{}: released FLASH", self.info.name);
	}

	/// Pulse CEN so the FLASH drops any partial command
	pub fn standby(&mut self) {
		if !self.info.has_flash() {
			return;
		}

		let mut fla = self.read_fla();
		fla.set_chip_disabled();
		self.write_flushed(fla);
		fla.clear_chip_disabled();
		self.write_flushed(fla);
	}
}
