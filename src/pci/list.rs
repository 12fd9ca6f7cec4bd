use std::fs;
use std::io;

use super::PciEndpoint;

pub fn list_all_endpoints() -> io::Result<Vec<PciEndpoint>> {
	let mut list = Vec::new();
	for entry in fs::read_dir("/sys/bus/pci/devices")? {
		let entry = entry?;
		let fname = entry.file_name().into_string().map_err(|e| {
			io::Error::new(io::ErrorKind::Other, format!("Invalid (Non-UTF8) PCI device name {:?}", e))
		})?;
		let ep = fname.parse::<PciEndpoint>().map_err(|e| {
			io::Error::new(io::ErrorKind::Other, format!("Invalid PCI device name: {}", e))
		})?;
		list.push(ep);
	}

	list.sort();
	Ok(list)
}

/// All endpoints for which `filter` returns true, sorted by address
pub fn list_endpoints<F>(mut filter: F) -> crate::AResult<Vec<PciEndpoint>>
where
	F: FnMut(PciEndpoint) -> crate::AResult<bool>,
{
	let mut result = Vec::new();
	for ep in list_all_endpoints()? {
		if filter(ep)? {
			result.push(ep);
		}
	}
	Ok(result)
}
