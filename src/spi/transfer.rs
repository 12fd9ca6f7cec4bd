use crate::FlashError;

use super::{
	RegisterPort,
	SpiBus,
	Timer,
};

/// Buffers taking part in one transfer
///
/// Bit `i` of a transfer is bit `7 - i % 8` of byte `i / 8`.
pub enum Frame<'a> {
	/// shift out zeroes, drop whatever comes in
	Idle,
	Out(&'a [u8]),
	In(&'a mut [u8]),
	/// received bits replace the sent ones
	InPlace(&'a mut [u8]),
}

fn bit_mask(index: usize) -> u8 {
	0x80 >> (index & 7)
}

impl<'a> Frame<'a> {
	fn check_capacity(&self, bit_len: usize) {
		let bytes = (bit_len + 7) / 8;
		match self {
			Frame::Idle => (),
			Frame::Out(out) => assert!(out.len() >= bytes),
			Frame::In(input) => assert!(input.len() >= bytes),
			Frame::InPlace(buf) => assert!(buf.len() >= bytes),
		}
	}

	fn output(&self, index: usize) -> bool {
		let byte = match self {
			Frame::Idle | Frame::In(_) => return false,
			Frame::Out(out) => out[index >> 3],
			Frame::InPlace(buf) => buf[index >> 3],
		};
		0 != byte & bit_mask(index)
	}

	fn input(&mut self) -> Option<&mut [u8]> {
		match self {
			Frame::Idle | Frame::Out(_) => None,
			Frame::In(input) | Frame::InPlace(input) => Some(&mut **input),
		}
	}

	fn capture(&mut self, index: usize, bit: bool) {
		if let Some(input) = self.input() {
			if bit {
				input[index >> 3] |= bit_mask(index);
			} else {
				input[index >> 3] &= !bit_mask(index);
			}
		}
	}

	// only whole transferred bits are meaningful; zero the rest of the
	// last byte
	fn clear_tail(&mut self, bit_len: usize) {
		let used = bit_len & 7;
		if 0 == used {
			return;
		}
		if let Some(input) = self.input() {
			input[bit_len >> 3] &= !(0xffu8 >> used);
		}
	}
}

impl<R: RegisterPort, T: Timer> SpiBus<R, T> {
	/// Clock `bit_len` bits out on SI while clocking as many in from SO
	///
	/// With `cancellable` set a pending cancellation request is checked
	/// before every bit and aborts the transfer with `Cancelled`.
	pub fn transfer(&mut self, bit_len: usize, mut frame: Frame, cancellable: bool) -> Result<(), FlashError> {
		frame.check_capacity(bit_len);

		let mut fla = self.read_fla();

		for index in 0..bit_len {
			if cancellable && self.timer.is_cancel_requested() {
				return Err(FlashError::Cancelled);
			}

			// data has to be stable before the rising edge
			fla.set_data_out(frame.output(index));
			self.write_flushed(fla);

			fla = self.raise_clock(fla);

			fla = self.read_fla();
			frame.capture(index, fla.data_in());

			fla = self.lower_clock(fla);
		}

		frame.clear_tail(bit_len);

		Ok(())
	}
}
