#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

macro_rules! with_context {
	(( $fmt:tt $($t:tt)* ), $e:expr) => {{
		use failure::Error;

		match (|| { $e })() {
			Ok(v) => Ok(v),
			Err(e) => {
				let e: Error = e;
				let msg = format!(concat!($fmt, ": {}") $($t)*, e);
				Err(Error::from(e.context(msg)))
			}
		}
	}};

	($msg:expr, $e:expr) => {
		with_context!(("{}", $msg), $e)
	};
}

pub type AResult<T> = Result<T, failure::Error>;

pub mod e1000;
pub mod error;
pub mod flash;
pub mod interrupt;
pub mod pci;
pub mod spi;

#[cfg(test)]
mod sim;

pub use self::error::FlashError;

pub use self::flash::{
	ChecksumStatus,
	Flash,
	Session,
};

pub use self::spi::{
	EepromInfo,
	EepromType,
	RegisterPort,
	SpiBus,
	Timer,
};
