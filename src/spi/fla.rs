use std::fmt;

// FLA (flash access) register bits; everything else in the register is
// left untouched
pub const FL_SK:  u32 = 0x0000_0001; // serial clock
pub const FL_CEN: u32 = 0x0000_0002; // chip enable, active low
pub const FL_SI:  u32 = 0x0000_0004; // serial in (to the FLASH)
pub const FL_SO:  u32 = 0x0000_0008; // serial out (from the FLASH), read only
pub const FL_REQ: u32 = 0x0000_0010; // request FLASH access
pub const FL_GNT: u32 = 0x0000_0020; // access granted, read only

/// Cached value of the FLA register
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fla(pub u32);

impl Fla {
	pub fn is_clock(&self) -> bool {
		0 != self.0 & FL_SK
	}
	pub fn set_clock(&mut self) -> &mut Self {
		self.0 |= FL_SK;
		self
	}
	pub fn clear_clock(&mut self) -> &mut Self {
		self.0 &= !FL_SK;
		self
	}

	pub fn is_chip_disabled(&self) -> bool {
		0 != self.0 & FL_CEN
	}
	pub fn set_chip_disabled(&mut self) -> &mut Self {
		self.0 |= FL_CEN;
		self
	}
	pub fn clear_chip_disabled(&mut self) -> &mut Self {
		self.0 &= !FL_CEN;
		self
	}

	pub fn data_out(&self) -> bool {
		0 != self.0 & FL_SI
	}
	pub fn set_data_out(&mut self, bit: bool) -> &mut Self {
		if bit {
			self.0 |= FL_SI;
		} else {
			self.0 &= !FL_SI;
		}
		self
	}

	pub fn data_in(&self) -> bool {
		0 != self.0 & FL_SO
	}

	pub fn is_request(&self) -> bool {
		0 != self.0 & FL_REQ
	}
	pub fn set_request(&mut self) -> &mut Self {
		self.0 |= FL_REQ;
		self
	}
	pub fn clear_request(&mut self) -> &mut Self {
		self.0 &= !FL_REQ;
		self
	}

	pub fn is_granted(&self) -> bool {
		0 != self.0 & FL_GNT
	}
}

impl fmt::Display for Fla {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:08x}", self.0)
	}
}

impl fmt::Debug for Fla {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:08x} (", self.0)?;
		if self.is_clock() { write!(f, " [SK]")?; }
		if self.is_chip_disabled() { write!(f, " [CEN]")?; }
		if self.data_out() { write!(f, " [SI]")?; }
		if self.data_in() { write!(f, " [SO]")?; }
		if self.is_request() { write!(f, " [REQ]")?; }
		if self.is_granted() { write!(f, " [GNT]")?; }
		write!(f, " )")
	}
}
