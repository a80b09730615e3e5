//! Register-file peripherals: the CCU's PLL lock handshake and the
//! System Controller's hardwired version register.

use h3emu::{CcuState, DeviceSnapshot, SysconState};
use h3emu_hw::mmio::ccu::{PLL_REGISTERS, pll, registers as ccu_reg};
use h3emu_hw::mmio::syscon::registers as syscon_reg;

#[test]
fn enabled_plls_read_back_locked() {
    let mut ccu = CcuState::new();

    for offset in PLL_REGISTERS {
        ccu.write(offset, pll::ENABLE | 0x0000_1010);
        let value = ccu.read(offset);
        assert_ne!(value & pll::LOCK, 0, "PLL at {offset:#X} never locked");
        assert_ne!(value & pll::ENABLE, 0);
    }
}

#[test]
fn disabled_plls_do_not_lock() {
    let mut ccu = CcuState::new();

    ccu.write(ccu_reg::PLL_CPUX, 0x0000_1010);
    assert_eq!(ccu.read(ccu_reg::PLL_CPUX) & pll::LOCK, 0);
}

#[test]
fn non_pll_registers_store_verbatim() {
    let mut ccu = CcuState::new();

    ccu.write(ccu_reg::SDMMC0_CLK, pll::ENABLE | 0x000F);
    assert_eq!(ccu.read(ccu_reg::SDMMC0_CLK), pll::ENABLE | 0x000F);

    ccu.write(ccu_reg::CPUX_AXI_CFG, 0x0001_0000);
    assert_eq!(ccu.read(ccu_reg::CPUX_AXI_CFG), 0x0001_0000);
}

#[test]
fn ccu_rejects_out_of_range_and_unaligned_offsets() {
    let mut ccu = CcuState::new();

    ccu.write(0x0800, 0xFFFF_FFFF);
    assert_eq!(ccu.read(0x0800), 0);

    ccu.write(0x0002, 0xFFFF_FFFF);
    assert_eq!(ccu.read(0x0002), 0);
}

#[test]
fn ccu_snapshot_roundtrip() {
    let mut ccu = CcuState::new();
    ccu.write(ccu_reg::PLL_PERIPH0, pll::ENABLE | 0x0000_0410);
    ccu.write(ccu_reg::AHB1_APB1_CFG, 0x0000_3180);

    let snapshot = ccu.save_state();
    let mut restored = CcuState::new();
    restored.load_state(&snapshot).expect("snapshot should decode");

    assert_eq!(
        restored.read(ccu_reg::PLL_PERIPH0),
        pll::ENABLE | pll::LOCK | 0x0000_0410
    );
    assert_eq!(restored.read(ccu_reg::AHB1_APB1_CFG), 0x0000_3180);
}

#[test]
fn syscon_version_register_is_hardwired() {
    let mut syscon = SysconState::new();

    let before = syscon.read(syscon_reg::VER);
    syscon.write(syscon_reg::VER, 0xFFFF_FFFF);
    assert_eq!(syscon.read(syscon_reg::VER), before);
}

#[test]
fn syscon_stores_ordinary_registers() {
    let mut syscon = SysconState::new();

    syscon.write(syscon_reg::EMAC_PHY_CLK, 0x0005_8000);
    assert_eq!(syscon.read(syscon_reg::EMAC_PHY_CLK), 0x0005_8000);

    syscon.write(0x2000, 0x1);
    assert_eq!(syscon.read(0x2000), 0);
}

#[test]
fn syscon_snapshot_roundtrip() {
    let mut syscon = SysconState::new();
    syscon.write(syscon_reg::EMAC_PHY_CLK, 0x0005_8000);

    let snapshot = syscon.save_state();
    let mut restored = SysconState::new();
    restored
        .load_state(&snapshot)
        .expect("snapshot should decode");

    assert_eq!(restored.read(syscon_reg::EMAC_PHY_CLK), 0x0005_8000);
}
