// Simulated FLA register with either a loopback slave (SO returns what
// was clocked out in an earlier transfer) or a small SPI FLASH chip
// behind it.

use std::collections::VecDeque;
use std::mem;

use crate::flash::{
	ADDRESS_LIMIT,
	CHIP_ERASE_OPCODE,
	ENABLE_WRITE_OPCODE,
	Flash,
	READ_PAGE_OPCODE,
	READ_STATUS_OPCODE,
	STATUS_BPL,
	STATUS_BP_MASK,
	STATUS_BUSY,
	WRITE_PAGE_OPCODE,
	WRITE_STATUS_OPCODE,
};
use crate::spi::{
	EepromInfo,
	FL_CEN,
	FL_GNT,
	FL_REQ,
	FL_SI,
	FL_SK,
	FL_SO,
	RegisterPort,
	SpiBus,
	Timer,
};

const PAGE_SIZE: usize = 256;
// write enable latch, set by WREN, cleared by the next write command
const STATUS_WEL: u8 = 0x02;

/// A command the chip saw between selection and deselection
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Command {
	pub opcode: u8,
	pub address: Option<usize>,
	// bytes after opcode and address
	pub data_len: usize,
	pub bytes: Vec<u8>,
}

pub struct SimChip {
	pub memory: Vec<u8>,
	pub status: u8,
	// number of RDSR commands still reporting BUSY
	pub busy_polls: usize,
	pub busy_after_write: usize,
	// WP# asserted: with BPL set the status register ignores WRSR
	pub write_protect: bool,
	pub commands: Vec<Command>,
	rx: Vec<u8>,
	rx_byte: u8,
	rx_bits: usize,
}

impl SimChip {
	fn new() -> Self {
		SimChip {
			memory: vec![0xff; ADDRESS_LIMIT],
			status: 0,
			busy_polls: 0,
			busy_after_write: 0,
			write_protect: false,
			commands: Vec::new(),
			rx: Vec::new(),
			rx_byte: 0,
			rx_bits: 0,
		}
	}

	pub fn opcodes(&self) -> Vec<u8> {
		self.commands.iter().map(|c| c.opcode).collect()
	}

	fn status_byte(&self) -> u8 {
		if self.busy_polls > 0 {
			self.status | STATUS_BUSY
		} else {
			self.status
		}
	}

	fn address(bytes: &[u8]) -> usize {
		(bytes[1] as usize) << 16 | (bytes[2] as usize) << 8 | bytes[3] as usize
	}

	fn output_byte(&self) -> u8 {
		let position = self.rx.len();
		match self.rx.first() {
			Some(&READ_STATUS_OPCODE) if position >= 1 => self.status_byte(),
			Some(&READ_PAGE_OPCODE) if position >= 4 => {
				self.memory[(Self::address(&self.rx) + position - 4) % self.memory.len()]
			},
			_ => 0,
		}
	}

	// rising edge: present the next output bit, sample SI
	fn clock(&mut self, si: bool) -> bool {
		let so = 0 != self.output_byte() & (0x80 >> self.rx_bits);
		self.rx_byte = self.rx_byte << 1 | si as u8;
		self.rx_bits += 1;
		if 8 == self.rx_bits {
			self.rx.push(self.rx_byte);
			self.rx_byte = 0;
			self.rx_bits = 0;
		}
		so
	}

	fn select(&mut self) {
		self.rx.clear();
		self.rx_byte = 0;
		self.rx_bits = 0;
	}

	fn take_write_enable(&mut self) -> bool {
		let wel = 0 != self.status & STATUS_WEL;
		self.status &= !STATUS_WEL;
		wel
	}

	fn is_protected(&self) -> bool {
		0 != self.status & STATUS_BP_MASK
	}

	// commands take effect when CEN goes high
	fn deselect(&mut self) {
		let bytes = mem::replace(&mut self.rx, Vec::new());
		self.rx_byte = 0;
		self.rx_bits = 0;

		let opcode = match bytes.first() {
			Some(opcode) => *opcode,
			None => return,
		};
		let header = match opcode {
			READ_PAGE_OPCODE | WRITE_PAGE_OPCODE => 4,
			_ => 1,
		};
		let address = if header == 4 && bytes.len() >= header {
			Some(Self::address(&bytes))
		} else {
			None
		};

		match opcode {
			ENABLE_WRITE_OPCODE => self.status |= STATUS_WEL,
			WRITE_STATUS_OPCODE if bytes.len() >= 2 => {
				let locked = self.write_protect && 0 != self.status & STATUS_BPL;
				if self.take_write_enable() && !locked {
					let writable = STATUS_BP_MASK | STATUS_BPL;
					self.status = (self.status & !writable) | (bytes[1] & writable);
					self.busy_polls = self.busy_after_write;
				}
			},
			WRITE_PAGE_OPCODE => {
				if let Some(address) = address {
					if self.take_write_enable() && !self.is_protected() {
						let page = address & !(PAGE_SIZE - 1);
						for (i, b) in bytes[header..].iter().enumerate() {
							// programming only clears bits; wraps within the page
							self.memory[page | ((address + i) & (PAGE_SIZE - 1))] &= *b;
						}
						self.busy_polls = self.busy_after_write;
					}
				}
			},
			CHIP_ERASE_OPCODE => {
				if self.take_write_enable() && !self.is_protected() {
					for b in self.memory.iter_mut() {
						*b = 0xff;
					}
					self.busy_polls = self.busy_after_write;
				}
			},
			READ_STATUS_OPCODE => self.busy_polls = self.busy_polls.saturating_sub(1),
			_ => (),
		}

		self.commands.push(Command {
			opcode,
			address,
			data_len: bytes.len().saturating_sub(header),
			bytes,
		});
	}
}

enum Slave {
	Loopback {
		// served on SO, one bit per rising edge
		queue: VecDeque<bool>,
		// SI bits seen since the last replay
		sent: Vec<bool>,
	},
	Chip(SimChip),
}

pub struct SimPort {
	// last written value
	fla: u32,
	// bits of the register the SPI code doesn't own
	foreign: u32,
	so: bool,
	grant_after: Option<usize>,
	request_reads: usize,
	pub writes: Vec<u32>,
	pub flushes: usize,
	pub rising_edges: usize,
	slave: Slave,
}

impl SimPort {
	fn with_slave(slave: Slave) -> Self {
		SimPort {
			fla: FL_CEN,
			foreign: 0,
			so: false,
			grant_after: Some(1),
			request_reads: 0,
			writes: Vec::new(),
			flushes: 0,
			rising_edges: 0,
			slave,
		}
	}

	pub fn loopback() -> Self {
		Self::with_slave(Slave::Loopback { queue: VecDeque::new(), sent: Vec::new() })
	}

	pub fn flash() -> Self {
		Self::with_slave(Slave::Chip(SimChip::new()))
	}

	pub fn set_foreign_bits(&mut self, bits: u32) {
		self.foreign = bits;
	}

	// GNT shows up on the n-th read after REQ was raised
	pub fn grant_after(&mut self, reads: usize) {
		self.grant_after = Some(reads);
	}

	pub fn never_grant(&mut self) {
		self.grant_after = None;
	}

	pub fn preload(&mut self, bits: &[bool]) {
		match &mut self.slave {
			Slave::Loopback { queue, .. } => queue.extend(bits),
			Slave::Chip(_) => panic!("preload needs a loopback slave"),
		}
	}

	// queue everything sent so far to come back on SO
	pub fn replay(&mut self) {
		match &mut self.slave {
			Slave::Loopback { queue, sent } => queue.extend(sent.drain(..)),
			Slave::Chip(_) => panic!("replay needs a loopback slave"),
		}
	}

	pub fn chip(&self) -> &SimChip {
		match &self.slave {
			Slave::Chip(chip) => chip,
			Slave::Loopback { .. } => panic!("no simulated FLASH chip"),
		}
	}

	pub fn chip_mut(&mut self) -> &mut SimChip {
		match &mut self.slave {
			Slave::Chip(chip) => chip,
			Slave::Loopback { .. } => panic!("no simulated FLASH chip"),
		}
	}
}

impl RegisterPort for SimPort {
	fn read(&mut self) -> u32 {
		let mut value = (self.fla & (FL_SK | FL_CEN | FL_SI | FL_REQ)) | self.foreign;
		if 0 != self.fla & FL_REQ {
			self.request_reads += 1;
			if let Some(reads) = self.grant_after {
				if self.request_reads >= reads {
					value |= FL_GNT;
				}
			}
		}
		if self.so {
			value |= FL_SO;
		}
		value
	}

	fn write(&mut self, value: u32) {
		let previous = self.fla;
		self.fla = value;
		self.writes.push(value);

		if 0 == value & FL_REQ {
			self.request_reads = 0;
		}

		let was_selected = 0 == previous & FL_CEN;
		let selected = 0 == value & FL_CEN;
		if let Slave::Chip(chip) = &mut self.slave {
			if was_selected && !selected {
				chip.deselect();
			} else if !was_selected && selected {
				chip.select();
			}
		}

		if 0 == previous & FL_SK && 0 != value & FL_SK {
			self.rising_edges += 1;
			let si = 0 != value & FL_SI;
			self.so = match &mut self.slave {
				Slave::Loopback { queue, sent } => {
					sent.push(si);
					queue.pop_front().unwrap_or(false)
				},
				Slave::Chip(chip) => selected && chip.clock(si),
			};
		}
	}

	fn flush(&mut self) {
		self.flushes += 1;
	}
}

#[derive(Default)]
pub struct SimTimer {
	pub delays: Vec<u32>,
	pub cancel_polls: usize,
	cancel_at: Option<usize>,
}

impl SimTimer {
	// cancellation shows up on the n-th check
	pub fn cancel_at(poll: usize) -> Self {
		SimTimer {
			cancel_at: Some(poll),
			..SimTimer::default()
		}
	}

	pub fn request_cancel_at(&mut self, polls_from_now: usize) {
		self.cancel_at = Some(self.cancel_polls + polls_from_now);
	}
}

impl Timer for SimTimer {
	fn delay_us(&mut self, usec: u32) {
		self.delays.push(usec);
	}

	fn is_cancel_requested(&mut self) -> bool {
		self.cancel_polls += 1;
		match self.cancel_at {
			Some(poll) => self.cancel_polls >= poll,
			None => false,
		}
	}
}

pub fn sim_flash(port: SimPort, timer: SimTimer) -> Flash<SimPort, SimTimer> {
	Flash::new(SpiBus::new(port, timer, EepromInfo::default())).unwrap()
}
