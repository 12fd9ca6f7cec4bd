/// Failures of the bit-banged FLASH protocol
///
/// A checksum mismatch is not an error; see `ChecksumStatus`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum FlashError {
	/// GNT never showed up after raising REQ; the NIC keeps the register
	#[fail(display = "could not acquire FLASH grant (fla: 0x{:08x})", fla)]
	ArbitrationTimeout { fla: u32 },

	/// cancellation was requested between two bits of a transfer
	#[fail(display = "interrupted")]
	Cancelled,

	/// the block protect bits couldn't be cleared before writing
	#[fail(display = "clearing the FLASH block protect bits failed")]
	ProtectedRegion,

	#[fail(display = "can't access 0x{:x} bytes at 0x{:04x}: past 0xFFFF", length, offset)]
	OutOfRange { offset: usize, length: usize },
}
