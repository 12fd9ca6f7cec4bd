use std::thread;
use std::time::{
	Duration,
	Instant,
};

pub fn reliable_sleep(mut duration: Duration) {
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

/// Access to the single control register shared with the NIC
pub trait RegisterPort {
	fn read(&mut self) -> u32;
	fn write(&mut self, value: u32);

	// the last write must have reached the device when this returns
	fn flush(&mut self);
}

pub trait Timer {
	// delay for (at least) `usec` microseconds
	fn delay_us(&mut self, usec: u32) {
		reliable_sleep(Duration::from_micros(u64::from(usec)));
	}

	fn is_cancel_requested(&mut self) -> bool {
		false
	}
}

impl<'a, R: ?Sized + RegisterPort> RegisterPort for &'a mut R {
	fn read(&mut self) -> u32 {
		R::read(*self)
	}
	fn write(&mut self, value: u32) {
		R::write(*self, value)
	}
	fn flush(&mut self) {
		R::flush(*self)
	}
}

impl<'a, T: ?Sized + Timer> Timer for &'a mut T {
	fn delay_us(&mut self, usec: u32) {
		T::delay_us(*self, usec)
	}
	fn is_cancel_requested(&mut self) -> bool {
		T::is_cancel_requested(*self)
	}
}
