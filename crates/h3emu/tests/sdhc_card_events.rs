//! Card slot change notifications from the SD bus.

mod common;

use common::sdhc_fixture;
use h3emu_hw::mmio::sdhc::{gctl, irq, registers as reg, status};

#[test]
fn insert_then_remove_tracks_presence_and_interrupts() {
    let (mut sdhc, _card, _irq, mut ram) = sdhc_fixture();

    // Start from an empty slot.
    sdhc.write(&mut ram, reg::STAR, status::CARD_PRESENT);

    sdhc.set_inserted(true);
    assert_ne!(sdhc.read(reg::STAR) & status::CARD_PRESENT, 0);
    assert_ne!(sdhc.read(reg::RISR) & irq::CARD_INSERT, 0);
    assert_eq!(sdhc.read(reg::RISR) & irq::CARD_REMOVE, 0);

    sdhc.set_inserted(false);
    assert_eq!(sdhc.read(reg::STAR) & status::CARD_PRESENT, 0);
    assert_eq!(sdhc.read(reg::RISR) & irq::CARD_INSERT, 0);
    assert_ne!(sdhc.read(reg::RISR) & irq::CARD_REMOVE, 0);
}

#[test]
fn slot_events_drive_the_irq_line() {
    let (mut sdhc, _card, irq_line, mut ram) = sdhc_fixture();

    sdhc.write(&mut ram, reg::GCTL, gctl::INT_ENB);
    sdhc.write(&mut ram, reg::IMKR, irq::CARD_INSERT | irq::CARD_REMOVE);
    assert!(!irq_line.level());

    sdhc.set_inserted(true);
    assert!(irq_line.level());

    sdhc.write(&mut ram, reg::RISR, irq::CARD_INSERT);
    assert!(!irq_line.level());

    sdhc.set_inserted(false);
    assert!(irq_line.level());
}
