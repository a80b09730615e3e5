pub mod args;
pub mod core;
pub mod irq;
pub mod mem;
pub mod memory;
pub mod mmio;
pub mod sd;
pub mod snapshot;

// Re-export commonly used types
pub use crate::core::{Machine, MachineConfig, QuantumResult, StopReason};
pub use args::{Args, load_kernel_data};
pub use irq::{IrqLine, SharedIrqLine};
pub use mem::{GuestMemory, Ram};
pub use mmio::{CcuState, SdHostState, SocState, SysconState};
pub use sd::{FileCard, SdBus, SdBusError};
pub use snapshot::{DeviceSnapshot, SnapshotError};
