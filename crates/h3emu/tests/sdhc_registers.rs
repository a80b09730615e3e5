//! Register file semantics: reset values, self-clearing control bits,
//! write-one-to-clear status registers, and the benign handling of
//! unimplemented offsets.

mod common;

use common::sdhc_fixture;
use h3emu_hw::mmio::sdhc::{cmd, gctl, registers as reg, reset};

#[test]
fn registers_read_their_reset_values() {
    let (mut sdhc, _card, _irq, _ram) = sdhc_fixture();

    let expected = [
        (reg::GCTL, reset::GCTL),
        (reg::CKCR, 0),
        (reg::TMOR, reset::TMOR),
        (reg::BWDR, 0),
        (reg::BKSR, reset::BKSR),
        (reg::BYCR, reset::BYCR),
        (reg::CMDR, 0),
        (reg::CAGR, 0),
        (reg::RESP0, 0),
        (reg::RESP1, 0),
        (reg::RESP2, 0),
        (reg::RESP3, 0),
        (reg::IMKR, 0),
        (reg::MISR, 0),
        (reg::RISR, 0),
        (reg::STAR, reset::STAR),
        (reg::FWLR, reset::FWLR),
        (reg::FUNS, 0),
        (reg::DBGC, 0),
        (reg::A12A, reset::A12A),
        (reg::NTSR, reset::NTSR),
        (reg::SDBG, 0),
        (reg::HWRST, reset::HWRST),
        (reg::DMAC, 0),
        (reg::DLBA, 0),
        (reg::IDST, 0),
        (reg::IDIE, 0),
        (reg::THLDC, 0),
        (reg::DSBD, 0),
        (reg::RES_CRC, 0),
        (reg::DATA7_CRC, 0),
        (reg::DATA0_CRC, 0),
        (reg::CRC_STA, 0),
    ];

    for (offset, value) in expected {
        assert_eq!(
            sdhc.read(offset),
            value,
            "reset value mismatch at offset {offset:#X}"
        );
    }

    // The transfer counter starts drained even though BYCR resets to a
    // block's worth of bytes.
    assert_eq!(sdhc.transfer_cnt, 0);
}

#[test]
fn gctl_reset_bits_never_read_back() {
    let (mut sdhc, _card, _irq, mut ram) = sdhc_fixture();

    for value in [
        gctl::SOFT_RST,
        gctl::FIFO_RST | gctl::DMA_RST,
        0xFFFF_FFFF,
        gctl::INT_ENB | gctl::SOFT_RST,
        0,
    ] {
        sdhc.write(&mut ram, reg::GCTL, value);
        assert_eq!(sdhc.read(reg::GCTL) & gctl::RST_MASK, 0);
        assert_eq!(sdhc.read(reg::GCTL), value & !gctl::RST_MASK);
    }
}

#[test]
fn cmdr_load_bit_never_reads_back() {
    let (mut sdhc, _card, _irq, mut ram) = sdhc_fixture();

    for value in [
        cmd::LOAD,
        cmd::LOAD | cmd::RESPONSE | 17,
        cmd::LOAD | cmd::CLKCHANGE,
        cmd::AUTOSTOP | 25,
        0xFFFF_FFFF,
    ] {
        sdhc.write(&mut ram, reg::CMDR, value);
        assert_eq!(sdhc.read(reg::CMDR) & cmd::LOAD, 0);
    }
}

#[test]
fn irq_status_registers_are_write_one_to_clear() {
    let (mut sdhc, _card, _irq, mut ram) = sdhc_fixture();

    sdhc.irq_status = 0xA5A5_0F0F;
    sdhc.write(&mut ram, reg::RISR, 0x0000_0F0F);
    assert_eq!(sdhc.read(reg::RISR), 0xA5A5_0000);

    // MISR writes clear the same underlying status.
    sdhc.write(&mut ram, reg::MISR, 0xA000_0000);
    assert_eq!(sdhc.read(reg::RISR), 0x05A5_0000);

    // Writing zero preserves everything.
    sdhc.write(&mut ram, reg::RISR, 0);
    assert_eq!(sdhc.read(reg::RISR), 0x05A5_0000);
}

#[test]
fn status_register_is_write_one_to_clear() {
    let (mut sdhc, _card, _irq, mut ram) = sdhc_fixture();

    // CARD_PRESENT is set out of reset and can be knocked down too.
    assert_eq!(sdhc.read(reg::STAR), 0x100);
    sdhc.write(&mut ram, reg::STAR, 0x100);
    assert_eq!(sdhc.read(reg::STAR), 0);
}

#[test]
fn misr_reads_through_the_mask() {
    let (mut sdhc, _card, _irq, mut ram) = sdhc_fixture();

    sdhc.irq_status = 0x0000_401E;
    sdhc.write(&mut ram, reg::IMKR, 0x0000_4002);
    assert_eq!(sdhc.read(reg::RISR), 0x0000_401E);
    assert_eq!(sdhc.read(reg::MISR), 0x0000_4002);
}

#[test]
fn bycr_write_reloads_the_transfer_counter() {
    let (mut sdhc, _card, _irq, mut ram) = sdhc_fixture();

    sdhc.write(&mut ram, reg::BYCR, 4096);
    assert_eq!(sdhc.read(reg::BYCR), 4096);
    assert_eq!(sdhc.transfer_cnt, 4096);

    sdhc.write(&mut ram, reg::BYCR, 8);
    assert_eq!(sdhc.transfer_cnt, 8);
}

#[test]
fn crc_registers_ignore_writes() {
    let (mut sdhc, _card, _irq, mut ram) = sdhc_fixture();

    for offset in [
        reg::RES_CRC,
        reg::DATA7_CRC,
        reg::DATA6_CRC,
        reg::DATA5_CRC,
        reg::DATA4_CRC,
        reg::DATA3_CRC,
        reg::DATA2_CRC,
        reg::DATA1_CRC,
        reg::DATA0_CRC,
        reg::CRC_STA,
    ] {
        sdhc.write(&mut ram, offset, 0xDEAD_BEEF);
        assert_eq!(sdhc.read(offset), 0, "CRC register {offset:#X} took a write");
    }
}

#[test]
fn unimplemented_offsets_read_zero_and_drop_writes() {
    let (mut sdhc, _card, _irq, mut ram) = sdhc_fixture();

    for offset in [0x048, 0x064, 0x0F8, 0x1F0, 0xFFC] {
        assert_eq!(sdhc.read(offset), 0);
        sdhc.write(&mut ram, offset, 0xFFFF_FFFF);
        assert_eq!(sdhc.read(offset), 0);
    }

    // Known registers are untouched by the stray writes.
    assert_eq!(sdhc.read(reg::GCTL), 0x300);
}

#[test]
fn reset_restores_every_register() {
    let (mut sdhc, _card, _irq, mut ram) = sdhc_fixture();

    sdhc.write(&mut ram, reg::CKCR, 0x1234);
    sdhc.write(&mut ram, reg::BKSR, 8);
    sdhc.write(&mut ram, reg::BYCR, 64);
    sdhc.write(&mut ram, reg::IMKR, 0xFFFF_FFFF);
    sdhc.irq_status = 0xF;
    sdhc.response = [1, 2, 3, 4];

    sdhc.reset();

    assert_eq!(sdhc.read(reg::CKCR), 0);
    assert_eq!(sdhc.read(reg::BKSR), 0x200);
    assert_eq!(sdhc.read(reg::BYCR), 0x200);
    assert_eq!(sdhc.read(reg::IMKR), 0);
    assert_eq!(sdhc.read(reg::RISR), 0);
    assert_eq!(sdhc.read(reg::RESP0), 0);
    assert_eq!(sdhc.read(reg::RESP3), 0);
    assert_eq!(sdhc.transfer_cnt, 0);
}
