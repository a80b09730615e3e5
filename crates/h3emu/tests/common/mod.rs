//! Shared fixtures for the SD host controller tests: a scripted card on
//! the SD bus and a freshly wired controller.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use h3emu::{Ram, SdBus, SdBusError, SdHostState, SharedIrqLine};

#[derive(Default)]
struct CardInner {
    /// Commands seen on the bus, in order
    commands: Vec<(u8, u32)>,
    /// Scripted responses, consumed per submit; an empty queue answers
    /// with an empty (no-response) reply
    responses: VecDeque<Result<Vec<u8>, SdBusError>>,
    /// Bytes the card will stream to the host
    read_data: VecDeque<u8>,
    /// Bytes the host streamed to the card
    written: Vec<u8>,
}

/// A card double driven entirely by the test script. Cloning yields
/// another handle onto the same card, so a test can keep one end while
/// the controller owns the other.
#[derive(Clone, Default)]
pub struct ScriptedCard {
    inner: Rc<RefCell<CardInner>>,
}

impl ScriptedCard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next unanswered command.
    pub fn push_response(&self, resp: Vec<u8>) {
        self.inner.borrow_mut().responses.push_back(Ok(resp));
    }

    /// Queue a bus failure for the next unanswered command.
    pub fn push_error(&self) {
        self.inner
            .borrow_mut()
            .responses
            .push_back(Err(SdBusError::NoCard));
    }

    /// Load the bytes the card should stream on reads.
    pub fn set_read_data(&self, data: Vec<u8>) {
        self.inner.borrow_mut().read_data = data.into();
    }

    /// Commands submitted so far, as (index, argument) pairs.
    pub fn commands(&self) -> Vec<(u8, u32)> {
        self.inner.borrow().commands.clone()
    }

    /// Bytes the host has written to the card so far.
    pub fn written(&self) -> Vec<u8> {
        self.inner.borrow().written.clone()
    }
}

impl SdBus for ScriptedCard {
    fn submit(&mut self, cmd: u8, arg: u32) -> Result<Vec<u8>, SdBusError> {
        let mut inner = self.inner.borrow_mut();
        inner.commands.push((cmd, arg));
        inner.responses.pop_front().unwrap_or(Ok(Vec::new()))
    }

    fn data_ready(&self) -> bool {
        !self.inner.borrow().read_data.is_empty()
    }

    fn read_byte(&mut self) -> u8 {
        self.inner.borrow_mut().read_data.pop_front().unwrap_or(0)
    }

    fn write_byte(&mut self, value: u8) {
        self.inner.borrow_mut().written.push(value);
    }
}

/// A controller wired to a scripted card and an observable IRQ line,
/// plus a small guest RAM for DMA.
pub fn sdhc_fixture() -> (SdHostState, ScriptedCard, SharedIrqLine, Ram) {
    let card = ScriptedCard::new();
    let irq = SharedIrqLine::new();
    let sdhc = SdHostState::new(Box::new(card.clone()), Box::new(irq.clone()));
    let ram = Ram::new(0x4000_0000, 0x4_0000);
    (sdhc, card, irq, ram)
}
