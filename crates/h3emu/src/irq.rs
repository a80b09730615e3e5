//! Outgoing interrupt line plumbing.
//!
//! Devices aggregate their status into a single level-triggered output
//! and drive it through [`IrqLine`]; the machine (or a test) decides
//! where the level goes.

use std::cell::Cell;
use std::rc::Rc;

/// A level-triggered interrupt line.
pub trait IrqLine {
    /// Drive the line to `level`.
    fn set_level(&mut self, level: bool);
}

/// IRQ line backed by a shared cell.
///
/// Cloning yields another handle to the same line, so the machine can
/// hand one end to a device and keep the other to poll.
#[derive(Clone, Default)]
pub struct SharedIrqLine(Rc<Cell<bool>>);

impl SharedIrqLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level of the line.
    pub fn level(&self) -> bool {
        self.0.get()
    }
}

impl IrqLine for SharedIrqLine {
    fn set_level(&mut self, level: bool) {
        self.0.set(level);
    }
}
