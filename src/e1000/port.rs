use crate::pci::PciResource;
use crate::spi::{
	Fla,
	RegisterPort,
};

use super::{
	REG_FLA,
	REG_STATUS,
};

/// FLA register in the memory mapped register BAR of the NIC
pub struct FlaPort<R: PciResource> {
	resource: R,
}

impl<R: PciResource> FlaPort<R> {
	pub fn new(resource: R) -> crate::AResult<Self> {
		ensure!(resource.len() >= REG_FLA + 4,
			"PCI {}: register BAR too small for FLA ({} bytes)", resource.endpoint(), resource.len()
		);
		Ok(FlaPort { resource })
	}
}

impl<R: PciResource> RegisterPort for FlaPort<R> {
	fn read(&mut self) -> u32 {
		let value = self.resource.read_dword(REG_FLA);
		trace!("FLA read : {:?}", Fla(value));
		value
	}

	fn write(&mut self, value: u32) {
		trace!("FLA write: {:?}", Fla(value));
		self.resource.write_dword(REG_FLA, value);
	}

	// posted writes have landed once a read from the device returns
	fn flush(&mut self) {
		self.resource.read_dword(REG_STATUS);
	}
}
