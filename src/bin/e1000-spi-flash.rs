#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate e1000_spi_flash;
use e1000_spi_flash::*;

use std::fs;
use std::io::{
	self,
	Read,
	Write,
};
use std::process::exit;

use e1000_spi_flash::e1000::DeviceFlash;
use e1000_spi_flash::flash::{
	ADDRESS_LIMIT,
	CHECKSUM_SUM,
};
use e1000_spi_flash::interrupt::{
	HostTimer,
	Interrupt,
};

// accepts decimal, 0x-prefixed hex and 0-prefixed octal like strtoul
fn parse_number(s: &str) -> AResult<usize> {
	let (digits, radix) = if s.starts_with("0x") || s.starts_with("0X") {
		(&s[2..], 16)
	} else if s.len() > 1 && s.starts_with('0') {
		(&s[1..], 8)
	} else {
		(s, 10)
	};
	usize::from_str_radix(digits, radix).map_err(|e| {
		let msg = format!("invalid number {:?}: {}", s, e);
		failure::Error::from(e).context(msg).into()
	})
}

fn parse_delay(s: &str) -> AResult<u32> {
	let delay = parse_number(s)?;
	ensure!(delay <= u32::max_value() as usize, "delay {} out of range (max {} microseconds)", s, u32::max_value());
	Ok(delay as u32)
}

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_number(matches: &clap::ArgMatches, name: &str) -> AResult<Option<usize>> {
	match matches.value_of(name) {
		None => Ok(None),
		Some(p) => parse_number(p).map(Some).map_err(|e| {
			let msg = format!("invalid paramater {}: {}", name, e);
			e.context(msg).into()
		}),
	}
}

fn check_range(flash: &DeviceFlash, offset: usize, length: usize) -> AResult<()> {
	let name = &flash.info().name;
	ensure!(length > 0, "{}: requested zero-sized access", name);
	ensure!(length <= ADDRESS_LIMIT && ADDRESS_LIMIT - length >= offset, "{}: can't access past 0xFFFF", name);
	Ok(())
}

fn eeprom_info(matches: &clap::ArgMatches, ep: pci::PciEndpoint) -> AResult<EepromInfo> {
	let mut info = EepromInfo::default();
	info.name = ep.to_string();
	if matches.is_present("no_flash") {
		info.kind = EepromType::None;
	}
	if let Some(page_size) = get_number(matches, "page_size")? {
		info.page_size = page_size;
	}
	if let Some(word_size) = get_number(matches, "word_size")? {
		info.word_size = word_size;
	}
	if let Some(delay) = matches.value_of("delay") {
		info.delay_usec = parse_delay(delay)?;
	}
	info.validate()?;
	Ok(info)
}

fn with_flash_dev<F, R>(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches, f: F) -> AResult<R>
where
	F: FnOnce(&mut DeviceFlash) -> AResult<R>,
{
	let ep: pci::PciEndpoint = get_param(sub_m, "DEVICE")?;
	let allow_unbind = matches.is_present("unbind");
	let info = eeprom_info(matches, ep)?;

	ensure!(e1000::is_e1000(ep)?, "Device {} is not an Intel ethernet controller", ep);
	ensure!(info.has_flash(), "{}: No attached SPI FLASH found!", ep);

	let _se = ep.scoped_enable()?;

	// the NIC driver shares the lines through FLA arbitration; only unbind
	// when asked to
	let _unbound = match ep.driver()? {
		None => None,
		Some(driver) => {
			if allow_unbind {
				Some(driver.scoped_unbind(ep)?)
			} else {
				info!("PCI {}: bound to driver {}, relying on FLASH arbitration", ep, driver);
				None
			}
		}
	};

	let mut flash = e1000::open_flash(ep, info, HostTimer::new(Interrupt::install()))?;
	f(&mut flash)
}

fn hexdump(name: &str, offset: usize, data: &[u8]) {
	print!("{}: ===== Intel e1000 FLASH (0x{:04X} - 0x{:04X}) =====", name, offset, offset + data.len() - 1);
	for (i, b) in data.iter().enumerate() {
		if 0 == i % 16 {
			print!("\n{}: {:04X}: ", name, offset + i);
		} else if 8 == i % 16 {
			print!(" ");
		}
		print!(" {:02x}", b);
	}
	println!();
}

fn list() -> AResult<()> {
	for ep in pci::list_endpoints(e1000::is_e1000)? {
		match ep.driver()? {
			Some(driver) => println!("{} {}:{} (driver {})", ep, ep.vendor()?, ep.device()?, driver),
			None => println!("{} {}:{}", ep, ep.vendor()?, ep.device()?),
		}
	}

	Ok(())
}

fn show(flash: &mut DeviceFlash, sub_m: &clap::ArgMatches) -> AResult<()> {
	let offset = get_number(sub_m, "OFFSET")?.unwrap_or(0);
	let word_bytes = flash.info().word_size * 2;
	let length = match get_number(sub_m, "LENGTH")? {
		Some(length) => length,
		None => word_bytes.saturating_sub(offset),
	};
	check_range(flash, offset, length)?;

	let mut buffer = vec![0u8; length];
	flash.acquire()?.dump(&mut buffer, offset)?;

	hexdump(&flash.info().name, offset, &buffer);
	Ok(())
}

fn dump(flash: &mut DeviceFlash, sub_m: &clap::ArgMatches) -> AResult<()> {
	let offset = get_number(sub_m, "OFFSET")?.unwrap_or(0);
	let length = get_number(sub_m, "LENGTH")?.unwrap_or(0);
	check_range(flash, offset, length)?;

	let mut buffer = vec![0u8; length];
	flash.acquire()?.dump(&mut buffer, offset)?;

	match sub_m.value_of("OUTPUT") {
		None | Some("-") => io::stdout().write_all(&buffer)?,
		Some(path) => fs::write(path, &buffer).map_err(|e| format_err!("couldn't write {}: {}", path, e))?,
	}
	info!("{}: ===== FLASH DUMP COMPLETE =====", flash.info().name);
	Ok(())
}

fn program(flash: &mut DeviceFlash, sub_m: &clap::ArgMatches) -> AResult<()> {
	let path = sub_m.value_of("INPUT").unwrap_or("-");
	let mut data = Vec::new();
	if path == "-" {
		io::stdin().read_to_end(&mut data)?;
	} else {
		data = fs::read(path).map_err(|e| format_err!("couldn't read {}: {}", path, e))?;
	}

	let offset = get_number(sub_m, "OFFSET")?.unwrap_or(0);
	if let Some(length) = get_number(sub_m, "LENGTH")? {
		ensure!(length <= data.len(), "{} only has {} bytes, {} requested", path, data.len(), length);
		data.truncate(length);
	}
	check_range(flash, offset, data.len())?;

	flash.acquire()?.program(&data, offset)?;

	info!("{}: ===== FLASH PROGRAMMED =====", flash.info().name);
	Ok(())
}

fn checksum(flash: &mut DeviceFlash, sub_m: &clap::ArgMatches) -> AResult<()> {
	let update = match sub_m.value_of("update") {
		None => false,
		Some("update") => true,
		Some(arg) => bail!("unknown checksum argument {:?} (expected \"update\")", arg),
	};

	match flash.checksum(CHECKSUM_SUM, update)? {
		ChecksumStatus::Valid(sum) => {
			println!("{}: FLASH checksum is correct (0x{:04x})", flash.info().name, sum);
		},
		ChecksumStatus::Invalid { .. } => {
			bail!("{}: FLASH checksum mismatch (use 'checksum update' to repair)", flash.info().name);
		},
		ChecksumStatus::Repaired { stored, computed } => {
			println!("{}: FLASH checksum repaired: 0x{:04x} -> 0x{:04x}", flash.info().name, stored, computed);
		},
	}
	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg unbind: -u --unbind "temporarily unbind driver if present")
		(@arg no_flash: --no_flash "treat device as having no SPI FLASH attached")
		(@arg page_size: --page_size +takes_value "FLASH page size in bytes (default 256)")
		(@arg word_size: --word_size +takes_value "NVM size in 16-bit words (default 2048)")
		(@arg delay: --delay +takes_value "delay per clock edge in microseconds (default 1)")
		(@subcommand list =>
			(about: "list Intel ethernet PCI devices")
		)
		(@subcommand show =>
			(about: "hexdump FLASH contents")
			(@arg DEVICE: +required "PCI device to use ([domain:]bus:dev.fun)")
			(@arg OFFSET: "start offset (default 0)")
			(@arg LENGTH: "number of bytes (default: up to the end of the NVM words)")
		)
		(@subcommand dump =>
			(about: "dump FLASH contents as binary")
			(@arg DEVICE: +required "PCI device to use ([domain:]bus:dev.fun)")
			(@arg OFFSET: +required "start offset")
			(@arg LENGTH: +required "number of bytes")
			(@arg OUTPUT: "output file (default: stdout)")
		)
		(@subcommand program =>
			(about: "program FLASH from a file")
			(@arg DEVICE: +required "PCI device to use ([domain:]bus:dev.fun)")
			(@arg INPUT: +required "input file ('-' for stdin)")
			(@arg OFFSET: +required "start offset")
			(@arg LENGTH: "number of bytes (default: whole file)")
		)
		(@subcommand checksum =>
			(about: "verify (and with 'update' repair) the NVM checksum")
			(@arg DEVICE: +required "PCI device to use ([domain:]bus:dev.fun)")
			(@arg update: "'update' to reprogram a wrong checksum")
		)
		(@subcommand erase =>
			(about: "erase the whole FLASH")
			(@arg DEVICE: +required "PCI device to use ([domain:]bus:dev.fun)")
		)
		(@subcommand unlock =>
			(about: "clear the FLASH block protect bits")
			(@arg DEVICE: +required "PCI device to use ([domain:]bus:dev.fun)")
		)
	).get_matches();

	match matches.subcommand() {
		("list", _) => {
			list()
		}
		("show", Some(sub_m)) => {
			with_flash_dev(&matches, sub_m, |flash| show(flash, sub_m))
		}
		("dump", Some(sub_m)) => {
			with_flash_dev(&matches, sub_m, |flash| dump(flash, sub_m))
		}
		("program", Some(sub_m)) => {
			with_flash_dev(&matches, sub_m, |flash| program(flash, sub_m))
		}
		("checksum", Some(sub_m)) => {
			with_flash_dev(&matches, sub_m, |flash| checksum(flash, sub_m))
		}
		("erase", Some(sub_m)) => {
			with_flash_dev(&matches, sub_m, |flash| Ok(flash.erase()?))
		}
		("unlock", Some(sub_m)) => {
			with_flash_dev(&matches, sub_m, |flash| Ok(flash.unlock()?))
		}
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
