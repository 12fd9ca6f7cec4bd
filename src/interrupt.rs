use std::sync::Arc;
use std::sync::atomic::{
	AtomicBool,
	Ordering,
};

use simple_signal::Signal;

use crate::spi::Timer;

/// Cancellation request set from SIGINT / SIGTERM
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
	requested: Arc<AtomicBool>,
}

impl Interrupt {
	pub fn install() -> Self {
		let interrupt = Interrupt::default();
		let requested = interrupt.requested.clone();
		simple_signal::set_handler(&[Signal::Int, Signal::Term], move |_signals| {
			requested.store(true, Ordering::SeqCst);
		});
		interrupt
	}

	pub fn request(&self) {
		self.requested.store(true, Ordering::SeqCst);
	}

	pub fn is_requested(&self) -> bool {
		self.requested.load(Ordering::SeqCst)
	}
}

/// Real sleeping; cancellable through an `Interrupt`
#[derive(Clone, Debug)]
pub struct HostTimer {
	interrupt: Interrupt,
}

impl HostTimer {
	pub fn new(interrupt: Interrupt) -> Self {
		HostTimer { interrupt }
	}
}

impl Timer for HostTimer {
	fn is_cancel_requested(&mut self) -> bool {
		self.interrupt.is_requested()
	}
}
