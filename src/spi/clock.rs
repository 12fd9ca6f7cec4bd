use super::{
	Fla,
	RegisterPort,
	SpiBus,
	Timer,
};

impl<R: RegisterPort, T: Timer> SpiBus<R, T> {
	/// Raise SK and wait one half period
	pub fn raise_clock(&mut self, mut fla: Fla) -> Fla {
		fla.set_clock();
		self.write_flushed(fla);
		fla
	}

	/// Lower SK and wait one half period
	pub fn lower_clock(&mut self, mut fla: Fla) -> Fla {
		fla.clear_clock();
		self.write_flushed(fla);
		fla
	}
}
