use std::fmt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use super::PciEndpoint;

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Driver {
	pub(super) path: PathBuf,
}

impl fmt::Display for Driver {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(&self.name())
	}
}

impl Driver {
	/// Last component of the sysfs driver link (e.g. `e1000e`)
	pub fn name(&self) -> String {
		match self.path.file_name() {
			Some(name) => name.to_string_lossy().into_owned(),
			None => self.path.to_string_lossy().into_owned(),
		}
	}

	/// Unbind `ep`; the returned guard binds it again when dropped
	pub fn scoped_unbind(&self, ep: PciEndpoint) -> crate::AResult<ScopedUnbind> {
		self.unbind(ep)?;
		Ok(ScopedUnbind { driver: self.clone(), ep })
	}

	pub fn bind(&self, ep: PciEndpoint) -> crate::AResult<()> {
		// need to write in one syscall for unbind/bind
		let ep_str = ep.to_string();

		with_context!(("bind {} to driver {}", ep_str, self), {
			fs::OpenOptions::new().write(true).open(self.path.join("bind"))?.write_all(ep_str.as_bytes())?;

			Ok(())
		})
	}

	pub fn unbind(&self, ep: PciEndpoint) -> crate::AResult<()> {
		// need to write in one syscall for unbind/bind
		let ep_str = ep.to_string();

		with_context!(("unbind {} from driver {}", ep_str, self), {
			fs::OpenOptions::new().write(true).open(self.path.join("unbind"))?.write_all(ep_str.as_bytes())?;

			Ok(())
		})
	}
}

#[derive(Debug)]
pub struct ScopedUnbind {
	driver: Driver,
	ep: PciEndpoint,
}

impl Drop for ScopedUnbind {
	fn drop(&mut self) {
		if let Err(e) = self.driver.bind(self.ep) {
			error!("Failed rebinding device {} to driver {}: {}", self.ep, self.driver, e);
		}
	}
}
