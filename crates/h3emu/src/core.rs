//! Core emulator API for Allwinner H3 emulation.
//!
//! This module provides the main machine interface that can be used both
//! for headless testing and as a library backend: one Cortex-A7 CPU,
//! DRAM, and the modeled peripherals wired together.

use crate::irq::SharedIrqLine;
use crate::mem::Ram;
use crate::memory::{self, KERNEL_LOAD_ADDR};
use crate::mmio::SocState;
use crate::sd::FileCard;
use h3emu_hw::memory_map;
use h3emu_hw::specs::cpu::CORTEX_A7_HZ;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use unicorn_engine::{
    RegisterARM, Unicorn,
    unicorn_const::{Arch, Mode},
};

/// Instructions executed per `step` call, sized so a machine running at
/// real-time speed steps roughly 600 times per emulated second.
const QUANTUM: usize = (CORTEX_A7_HZ / 600) as usize;

/// Configuration for the machine
#[derive(Debug, Clone, Default)]
pub struct MachineConfig {
    /// Optional SD card image path
    pub sd_card: Option<PathBuf>,
    /// Emulated DRAM size in bytes; the default is 128 MiB
    pub dram_size: Option<usize>,
    /// Stop when the CPU reaches this address
    pub stop_pc: Option<u64>,
    /// Stop after this many instructions
    pub max_instructions: Option<usize>,
    /// Optional timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

/// Result of running a single quantum
#[derive(Debug, Clone, PartialEq)]
pub enum QuantumResult {
    /// Quantum completed successfully, continue execution
    Continue,
    /// An error occurred during execution
    Error(String),
}

/// Result of running the machine
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// Reached a stop condition (PC match, max instructions)
    StopCondition,
    /// Timeout reached
    Timeout,
    /// Emulation error occurred
    Error(String),
}

/// An emulated H3 machine: one Cortex-A7, DRAM, SD host, CCU, SYSCON.
pub struct Machine {
    emu: Unicorn<'static, SocState>,

    /// Host end of the SD controller's interrupt line
    sd_irq: SharedIrqLine,

    // Run-loop state
    pc: u64,
    total_executed: usize,
    stopped: bool,

    // Configuration
    stop_pc: Option<u64>,
    max_instructions: Option<usize>,
    timeout_ms: Option<u64>,
    start_time: Instant,
}

impl Machine {
    /// Create a machine and load a flat kernel image into DRAM.
    pub fn new(kernel: &[u8], config: MachineConfig) -> Result<Self, String> {
        let dram_size = config.dram_size.unwrap_or(memory_map::dram::DEFAULT_SIZE);

        info!("=== Creating Machine ===");
        info!("DRAM: {}MB", dram_size / (1024 * 1024));

        // DRAM is owned by the SocState that travels inside the Unicorn;
        // grab the raw backing pointer first so it can also be mapped for
        // the CPU. Boxed storage does not move with its owner.
        let mut dram = Ram::new(memory_map::dram::BASE, dram_size);
        let dram_ptr = dram.as_mut_ptr();

        let card = FileCard::new(config.sd_card.clone());
        let card_present = card.present();
        let sd_irq = SharedIrqLine::new();

        let mut state = SocState::new(dram, Box::new(card), Box::new(sd_irq.clone()));
        // The slot change is an SD bus event, delivered the same way a
        // hotplug would be.
        state.sdhc.set_inserted(card_present);

        let mut emu = Unicorn::new_with_data(Arch::ARM, Mode::LITTLE_ENDIAN, state)
            .map_err(|e| format!("Failed to initialize CPU: {:?}", e))?;

        memory::setup_memory(&mut emu, dram_ptr, dram_size)?;
        memory::load_kernel(&mut emu, kernel)?;

        info!("Kernel entry: {:#X}", KERNEL_LOAD_ADDR);

        Ok(Self {
            emu,
            sd_irq,
            pc: KERNEL_LOAD_ADDR as u64,
            total_executed: 0,
            stopped: false,
            stop_pc: config.stop_pc,
            max_instructions: config.max_instructions,
            timeout_ms: config.timeout_ms,
            start_time: Instant::now(),
        })
    }

    /// Run a single quantum of execution.
    pub fn step(&mut self) -> QuantumResult {
        if self.stopped {
            return QuantumResult::Continue;
        }

        let until = self.stop_pc.unwrap_or(u64::MAX);
        match self.emu.emu_start(self.pc, until, 0, QUANTUM) {
            Ok(_) => {
                self.total_executed += QUANTUM;
                self.pc = self.emu.reg_read(RegisterARM::PC).unwrap_or(self.pc);
            }
            Err(e) => {
                self.pc = self.emu.reg_read(RegisterARM::PC).unwrap_or(self.pc);
                // Stopping at the requested PC surfaces as an error from
                // the backend; everything else is a real fault.
                if self.stop_pc != Some(self.pc) {
                    return QuantumResult::Error(format!("{:?}", e));
                }
            }
        }

        if self.stop_pc == Some(self.pc) {
            self.stopped = true;
        }
        QuantumResult::Continue
    }

    /// Check if any stop condition is met.
    pub fn should_stop(&self) -> bool {
        if self.stopped {
            return true;
        }

        if let Some(max) = self.max_instructions
            && self.total_executed >= max
        {
            return true;
        }

        false
    }

    /// Run until a stop condition is reached.
    pub fn run(&mut self) -> StopReason {
        loop {
            if self.should_stop() {
                return StopReason::StopCondition;
            }

            if let Some(timeout_ms) = self.timeout_ms {
                let elapsed_ms = self.start_time.elapsed().as_millis() as u64;
                if elapsed_ms >= timeout_ms {
                    info!("Timeout reached: {} ms", elapsed_ms);
                    return StopReason::Timeout;
                }
            }

            match self.step() {
                QuantumResult::Continue => {}
                QuantumResult::Error(e) => return StopReason::Error(e),
            }
        }
    }

    /// Get the current PC.
    pub fn pc(&self) -> u64 {
        self.pc
    }

    /// Check if the CPU has stopped (reached the stop PC).
    pub fn cpu_stopped(&self) -> bool {
        self.stopped
    }

    /// Get total instructions executed.
    pub fn total_executed(&self) -> usize {
        self.total_executed
    }

    /// Get elapsed time since start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Current level of the SD controller's interrupt line.
    pub fn sd_irq_level(&self) -> bool {
        self.sd_irq.level()
    }

    /// Device state, for inspection and snapshots.
    pub fn soc(&self) -> &SocState {
        self.emu.get_data()
    }

    /// Mutable device state, for snapshot restore and bus events.
    pub fn soc_mut(&mut self) -> &mut SocState {
        self.emu.get_data_mut()
    }

    /// Read guest memory.
    pub fn mem_read(&self, addr: u64, size: usize) -> Result<Vec<u8>, String> {
        let mut buf = vec![0u8; size];
        self.emu
            .mem_read(addr, &mut buf)
            .map_err(|e| format!("mem read error: {:?}", e))?;
        Ok(buf)
    }

    /// Print final machine state.
    pub fn print_final_state(&self) {
        info!("Total instructions executed: {}", self.total_executed());
        info!("Elapsed time: {:.2?}", self.elapsed());

        let r0 = self.reg(RegisterARM::R0);
        let r1 = self.reg(RegisterARM::R1);
        let r2 = self.reg(RegisterARM::R2);
        let r3 = self.reg(RegisterARM::R3);
        let sp = self.reg(RegisterARM::SP);
        let lr = self.reg(RegisterARM::LR);

        info!(
            "CPU: pc={:#x} r0={:#x} r1={:#x} r2={:#x} r3={:#x} sp={:#x} lr={:#x}",
            self.pc(),
            r0,
            r1,
            r2,
            r3,
            sp,
            lr
        );
    }

    /// Read a CPU register.
    pub fn reg(&self, reg: RegisterARM) -> u64 {
        self.emu.reg_read(reg).unwrap_or(0)
    }
}
