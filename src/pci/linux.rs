use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::io::FromRawFd;
use std::ptr;

use libc::{
	MAP_SHARED,
	O_CLOEXEC,
	O_RDWR,
	O_SYNC,
	PROT_READ,
	PROT_WRITE,
	c_void,
	mmap,
	munmap,
	open,
};

use super::{
	PciEndpoint,
	PciResource,
};

/// `/sys/bus/pci/devices/<ep>/resource<N>` mapped read-write
#[derive(Debug)]
pub struct MappedResource {
	ptr: ptr::NonNull<u8>, // u8 instead of void for easier offset operations
	len: usize,
	endpoint: PciEndpoint,
}

impl Drop for MappedResource {
	fn drop(&mut self) {
		let res = unsafe { munmap(self.ptr.as_ptr() as *mut c_void, self.len) };
		if 0 != res {
			error!("PCI {}: munmap failed: {}", self.endpoint, io::Error::last_os_error());
		}
	}
}

impl PciResource for MappedResource {
	fn endpoint(&self) -> PciEndpoint {
		self.endpoint
	}

	fn len(&self) -> usize {
		self.len
	}

	// volatile: every access has to reach the device registers
	fn read_dword(&self, offset: usize) -> u32 {
		assert!(offset & 3 == 0);
		assert!(offset + 3 < self.len);
		u32::from_le(unsafe { ptr::read_volatile(self.ptr.as_ptr().add(offset) as *const u32) })
	}

	fn write_dword(&mut self, offset: usize, data: u32) {
		assert!(offset & 3 == 0);
		assert!(offset + 3 < self.len);
		unsafe { ptr::write_volatile(self.ptr.as_ptr().add(offset) as *mut u32, data.to_le()) }
	}
}

// TODO: exclusive open / file locking?
pub fn open_resource_readwrite(endpoint: PciEndpoint, resource: usize) -> io::Result<MappedResource> {
	let path = CString::new(format!("/sys/bus/pci/devices/{}/resource{}", endpoint, resource))?;

	let fd = unsafe { open(path.as_ptr(), O_RDWR | O_CLOEXEC | O_SYNC) };
	if -1 == fd {
		return Err(io::Error::last_os_error());
	}
	// now get fd managed to prevent resource leak
	let f = unsafe { fs::File::from_raw_fd(fd) };

	let size = f.metadata()?.len();
	if size == 0 || size >= !0usize as u64 {
		return Err(io::Error::new(io::ErrorKind::Other, format!("PCI {}: unusable resource{} size {}", endpoint, resource, size)));
	}
	let len = size as usize;

	let area = unsafe {
		mmap(
			ptr::null_mut(),
			len,
			PROT_READ | PROT_WRITE,
			MAP_SHARED,
			fd,
			0,
		)
	};
	if area == libc::MAP_FAILED {
		return Err(io::Error::last_os_error());
	}

	match ptr::NonNull::new(area as *mut u8) {
		None => Err(io::Error::new(io::ErrorKind::Other, "mmap returned NULL")),
		Some(ptr) => Ok(MappedResource {
			ptr,
			len,
			endpoint,
		}),
	}
}
