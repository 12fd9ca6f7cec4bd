mod driver;
mod endpoint;
mod linux;
mod list;
mod resource;

pub use self::driver::{
	Driver,
	ScopedUnbind,
};

pub use self::endpoint::{
	Class,
	DeviceID,
	PciEndpoint,
	ScopedEnable,
	SlotFunction,
	VendorId,
};

pub use self::list::{
	list_all_endpoints,
	list_endpoints,
};

pub use self::resource::{
	PciResource,
};

// OS-specific. for now linux only.
pub use self::linux::{
	MappedResource,
	open_resource_readwrite,
};
