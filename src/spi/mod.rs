/// Bit-banged SPI master on the FLA register of Intel gigabit NICs
///
/// The FLASH hangs off four lines the NIC exposes in FLA (SK, CEN, SI,
/// SO); the same register carries a REQ/GNT handshake because the NIC
/// itself uses those lines too.
///
/// Only SPI mode 0 is supported: data is set up while SK is low, the
/// FLASH samples it on the rising edge, and SO is read while SK is high.
/// Bits are shifted MSB first.

mod arbiter;
mod clock;
mod fla;
mod hardware;
mod transfer;

pub use self::arbiter::{
	GRANT_ATTEMPTS,
};

pub use self::fla::{
	FL_CEN,
	FL_GNT,
	FL_REQ,
	FL_SI,
	FL_SK,
	FL_SO,
	Fla,
};

pub use self::hardware::{
	RegisterPort,
	Timer,
	reliable_sleep,
};

pub use self::transfer::Frame;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum EepromType {
	None,
	Flash,
}

/// Describes the FLASH attached to a NIC
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EepromInfo {
	pub kind: EepromType,
	pub page_size: usize,
	pub word_size: usize,
	// one clock half period
	pub delay_usec: u32,
	// used as prefix in diagnostics
	pub name: String,
}

impl EepromInfo {
	pub fn has_flash(&self) -> bool {
		self.kind == EepromType::Flash
	}

	pub fn validate(&self) -> crate::AResult<()> {
		ensure!(self.page_size.is_power_of_two(), "{}: FLASH page size must be a power of two, got {}", self.name, self.page_size);
		ensure!(self.word_size > 0, "{}: FLASH word size must not be zero", self.name);
		Ok(())
	}
}

impl Default for EepromInfo {
	fn default() -> Self {
		EepromInfo {
			kind: EepromType::Flash,
			page_size: 256,
			word_size: 2048,
			delay_usec: 1,
			name: String::from("e1000"),
		}
	}
}

pub struct SpiBus<R, T> {
	port: R,
	timer: T,
	info: EepromInfo,
}

impl<R: RegisterPort, T: Timer> SpiBus<R, T> {
	pub fn new(port: R, timer: T, info: EepromInfo) -> Self {
		SpiBus {
			port,
			timer,
			info,
		}
	}

	pub fn info(&self) -> &EepromInfo {
		&self.info
	}

	pub fn port(&self) -> &R {
		&self.port
	}

	pub fn timer_mut(&mut self) -> &mut T {
		&mut self.timer
	}

	fn read_fla(&mut self) -> Fla {
		Fla(self.port.read())
	}

	// wait one clock half period
	fn delay(&mut self) {
		let usec = self.info.delay_usec;
		self.timer.delay_us(usec);
	}

	// write, make sure it reached the NIC, then let the lines settle
	fn write_flushed(&mut self, fla: Fla) {
		self.port.write(fla.0);
		self.port.flush();
		self.delay();
	}
}
