/* Intel 8254x / 8257x gigabit ethernet controllers ("e1000")
 *
 * Parts with an SPI FLASH instead of an EEPROM route its lines through
 * the FLA register; the NIC arbitrates access with REQ/GNT.
 */

use crate::flash::Flash;
use crate::interrupt::HostTimer;
use crate::pci::{
	self,
	MappedResource,
	PciEndpoint,
};
use crate::spi::{
	EepromInfo,
	Fla,
	RegisterPort,
	SpiBus,
};

mod port;

pub use self::port::FlaPort;

pub const INTEL_VENDOR_ID: u16 = 0x8086;

// register offsets in BAR0
pub const REG_STATUS: usize = 0x0008;
pub const REG_FLA: usize = 0x001c;

const REGISTER_BAR: usize = 0;

pub type DeviceFlash = Flash<FlaPort<MappedResource>, HostTimer>;

pub fn is_e1000(ep: PciEndpoint) -> crate::AResult<bool> {
	let class = ep.class()?;
	Ok(
		ep.vendor()?.0 == INTEL_VENDOR_ID
		&& class.class_code.0 == 0x02 // Network Controller
		&& class.subclass_code.0 == 0x00 // Ethernet
	)
}

pub fn open_flash(ep: PciEndpoint, info: EepromInfo, timer: HostTimer) -> crate::AResult<DeviceFlash> {
	ensure!(is_e1000(ep)?, "PCI {}: not an Intel ethernet controller", ep);

	let resource = with_context!(("PCI {}: couldn't map register BAR", ep),
		Ok(pci::open_resource_readwrite(ep, REGISTER_BAR)?)
	)?;
	let mut port = FlaPort::new(resource)?;
	debug!("PCI {}: FLA {:?}", ep, Fla(port.read()));

	Flash::new(SpiBus::new(port, timer, info))
}
