//! Integration tests for the TCAM table against the register-level simulator
//!
//! Covers:
//! - Load, read, flush and lookup of ingress entries
//! - Page ordering of the commit sequence
//! - Get-next scans and snapshots
//! - Destination port membership updates
//! - Per-port mode
//! - Egress entries
//! - Transport faults

use msd_hal::{MsdError, MsdStatus};
use msd_tcam::codec::{IngressImage, TcamPage};
use msd_tcam::commit::TcamOp;
use msd_tcam::{FirCodec, ScanCursor, TcamConfig, TcamMode, TcamTable};
use msd_test::{
    assert_commit_order, new_table, sample_egress, sample_entry, started_ops, test_config,
    SimulatedSwitch,
};
use msd_types::LogicalPort;
use pretty_assertions::assert_eq;

const TCAM_DEV: u8 = 0x1F;

#[test]
fn test_load_then_read_returns_entry() {
    let (table, _sim) = new_table();
    let entry = sample_entry(1);

    table.load_entry(5, &entry).unwrap();

    assert_eq!(table.read_entry(5).unwrap(), entry);
    assert_eq!(table.find_entry(5).unwrap(), Some(entry));
}

#[test]
fn test_load_writes_key_page_last() {
    let (table, sim) = new_table();

    table.load_entry(7, &sample_entry(1)).unwrap();
    let writes = sim.writes();
    assert_commit_order(&writes, TCAM_DEV, 7).unwrap();

    let ops: Vec<_> = started_ops(&writes, TCAM_DEV)
        .into_iter()
        .map(|(op, page, _)| (op, page))
        .collect();
    assert_eq!(
        ops,
        vec![
            (TcamOp::Read, TcamPage::Key),
            (TcamOp::Load, TcamPage::Action),
            (TcamOp::Load, TcamPage::Window),
            (TcamOp::Load, TcamPage::Key),
        ]
    );
}

#[test]
fn test_reload_flushes_valid_entry_first() {
    let (table, sim) = new_table();
    table.load_entry(7, &sample_entry(1)).unwrap();
    sim.clear_writes();

    table.load_entry(7, &sample_entry(2)).unwrap();

    let ops = started_ops(&sim.writes(), TCAM_DEV);
    assert_eq!(ops[0], (TcamOp::Read, TcamPage::Key, 7));
    assert_eq!(ops[1], (TcamOp::FlushEntry, TcamPage::Key, 7));
    assert_commit_order(&sim.writes(), TCAM_DEV, 7).unwrap();
    assert_eq!(table.read_entry(7).unwrap(), sample_entry(2));
}

#[test]
fn test_flush_entry_invalidates() {
    let (table, sim) = new_table();
    table.load_entry(3, &sample_entry(3)).unwrap();

    table.flush_entry(3).unwrap();

    assert_eq!(table.find_entry(3).unwrap(), None);
    assert_eq!(sim.ingress_image(3), IngressImage::invalid());
    assert!(table.get_next(ScanCursor::Start).unwrap_err().is_no_such());
}

#[test]
fn test_flush_all_empties_table() {
    let (table, _sim) = new_table();
    table.load_entry(1, &sample_entry(1)).unwrap();
    table.load_entry(200, &sample_entry(2)).unwrap();

    table.flush_all().unwrap();

    assert!(table.entries().unwrap().is_empty());
    let err = table.get_next(ScanCursor::Start).unwrap_err();
    assert_eq!(err.status(), MsdStatus::NoSuch);
}

#[test]
fn test_get_next_walks_in_index_order() {
    let (table, _sim) = new_table();
    table.load_entry(9, &sample_entry(9)).unwrap();
    table.load_entry(5, &sample_entry(5)).unwrap();
    table.load_entry(511, &sample_entry(11)).unwrap();

    let (index, entry) = table.get_next(ScanCursor::Start).unwrap();
    assert_eq!(index, 5);
    assert_eq!(entry, sample_entry(5));

    assert_eq!(table.get_next(ScanCursor::After(5)).unwrap().0, 9);
    assert_eq!(table.get_next(ScanCursor::After(9)).unwrap().0, 511);
    assert!(table
        .get_next(ScanCursor::After(511))
        .unwrap_err()
        .is_no_such());

    let indices: Vec<u16> = table.entries().unwrap().into_iter().map(|(i, _)| i).collect();
    assert_eq!(indices, vec![5, 9, 511]);
}

#[test]
fn test_get_next_with_single_entry() {
    let (table, _sim) = new_table();
    table.load_entry(0, &sample_entry(0)).unwrap();

    assert_eq!(
        table.get_next(ScanCursor::Start).unwrap(),
        (0, sample_entry(0))
    );
    assert!(table.get_next(ScanCursor::After(0)).unwrap_err().is_no_such());
    assert_eq!(table.find_entry(0).unwrap(), Some(sample_entry(0)));
}

#[test]
fn test_get_next_cursor_on_entry_0xff() {
    let (table, _sim) = new_table();
    table.load_entry(0xFF, &sample_entry(1)).unwrap();
    table.load_entry(0x100, &sample_entry(2)).unwrap();

    assert_eq!(table.get_next(ScanCursor::Start).unwrap().0, 0xFF);
    assert_eq!(table.get_next(ScanCursor::After(0xFF)).unwrap().0, 0x100);
}

#[test]
fn test_find_entry_is_exact() {
    let (table, _sim) = new_table();
    table.load_entry(10, &sample_entry(10)).unwrap();

    assert_eq!(table.find_entry(9).unwrap(), None);
    assert_eq!(table.find_entry(11).unwrap(), None);
    assert_eq!(table.find_entry(10).unwrap(), Some(sample_entry(10)));
}

#[test]
fn test_out_of_range_indices() {
    let (table, _sim) = new_table();

    let err = table.load_entry(512, &sample_entry(0)).unwrap_err();
    assert_eq!(err.status(), MsdStatus::BadParam);
    assert_eq!(table.flush_entry(600).unwrap_err().status(), MsdStatus::BadParam);
    assert_eq!(table.find_entry(512).unwrap_err().status(), MsdStatus::BadParam);
    assert_eq!(
        table.get_next(ScanCursor::After(512)).unwrap_err().status(),
        MsdStatus::BadParam
    );
    assert_eq!(
        table
            .egress_load_entry(LogicalPort(0), 0, &sample_egress(1))
            .unwrap_err()
            .status(),
        MsdStatus::BadParam
    );
    assert_eq!(
        table.egress_flush_entry_all_ports(64).unwrap_err().status(),
        MsdStatus::BadParam
    );
}

#[test]
fn test_add_and_remove_entry_port() {
    let (table, sim) = new_table();
    let entry = sample_entry(4);
    table.load_entry(4, &entry).unwrap();
    let before = sim.ingress_image(4);

    table.add_entry_port(4, LogicalPort(3)).unwrap();
    let after = table.read_entry(4).unwrap();
    assert_eq!(after.action.dpv_data, entry.action.dpv_data | 0x008);

    let mut expected = entry.clone();
    expected.action.dpv_data |= 0x008;
    assert_eq!(after, expected);

    // only the DPV word changed
    let image = sim.ingress_image(4);
    assert_eq!(image.key, before.key);
    assert_eq!(image.window, before.window);
    for word in 0..image.action.len() {
        if word != 2 {
            assert_eq!(image.action[word], before.action[word], "action word {}", word);
        }
    }

    table.remove_entry_port(4, LogicalPort(0)).unwrap();
    assert_eq!(table.read_entry(4).unwrap().action.dpv_data, 0x00C);
}

#[test]
fn test_entry_port_update_runs_full_commit() {
    let (table, sim) = new_table();
    table.load_entry(4, &sample_entry(4)).unwrap();
    sim.clear_writes();

    table.add_entry_port(4, LogicalPort(1)).unwrap();

    let ops = started_ops(&sim.writes(), TCAM_DEV);
    assert!(ops.contains(&(TcamOp::FlushEntry, TcamPage::Key, 4)));
    assert_commit_order(&sim.writes(), TCAM_DEV, 4).unwrap();
}

#[test]
fn test_entry_port_on_invalid_entry() {
    let (table, _sim) = new_table();

    let err = table.add_entry_port(100, LogicalPort(1)).unwrap_err();
    assert_eq!(err.status(), MsdStatus::NoSuch);
    let err = table.remove_entry_port(100, LogicalPort(1)).unwrap_err();
    assert_eq!(err.status(), MsdStatus::NoSuch);
}

#[test]
fn test_entry_port_rejects_unusable_ports() {
    let (table, _sim) = new_table();
    table.load_entry(4, &sample_entry(4)).unwrap();

    // hardware port 10 has no DPV bit
    let err = table.add_entry_port(4, LogicalPort(10)).unwrap_err();
    assert_eq!(err.status(), MsdStatus::BadParam);
    // twelve ports configured
    let err = table.add_entry_port(4, LogicalPort(12)).unwrap_err();
    assert_eq!(err.status(), MsdStatus::BadParam);
    assert_eq!(table.read_entry(4).unwrap(), sample_entry(4));
}

#[test]
fn test_entry_port_translates_logical_port() {
    let mut config = test_config();
    config.device.valid_port_vec = 0b1010_1010;
    let sim = SimulatedSwitch::new();
    let table = TcamTable::new(sim.clone(), &config);
    let mut entry = sample_entry(1);
    entry.action.dpv_data = 0;
    table.load_entry(30, &entry).unwrap();

    // logical 2 is the third populated port, hardware 5
    table.add_entry_port(30, LogicalPort(2)).unwrap();

    assert_eq!(table.read_entry(30).unwrap().action.dpv_data, 1 << 5);
}

#[test]
fn test_set_and_get_mode() {
    let (table, sim) = new_table();
    sim.set_register(0x02, 0x0D, 0xF000);

    table.set_mode(LogicalPort(2), TcamMode::Enable96).unwrap();

    assert_eq!(table.get_mode(LogicalPort(2)).unwrap(), TcamMode::Enable96);
    assert_eq!(sim.register(0x02, 0x0D), 0xF002);

    table.set_mode(LogicalPort(2), TcamMode::Enable144).unwrap();
    assert_eq!(table.get_mode(LogicalPort(2)).unwrap(), TcamMode::Enable144);
    assert_eq!(table.get_mode(LogicalPort(3)).unwrap(), TcamMode::Disable);
}

#[test]
fn test_mode_uses_port_register_block() {
    let mut config = test_config();
    config.device.base_reg_addr = 0x10;
    let sim = SimulatedSwitch::new();
    let table = TcamTable::new(sim.clone(), &config);

    table.set_mode(LogicalPort(1), TcamMode::Enable48).unwrap();

    assert_eq!(sim.register(0x11, 0x0D), 0x0001);
}

#[test]
fn test_get_mode_undefined_encoding() {
    let (table, sim) = new_table();
    sim.set_register(0x04, 0x0D, 0x0007);

    let err = table.get_mode(LogicalPort(4)).unwrap_err();
    assert_eq!(err.status(), MsdStatus::NotSupported);
}

#[test]
fn test_egress_load_read_and_scan() {
    let (table, _sim) = new_table();
    let data = sample_egress(100);

    table.egress_load_entry(LogicalPort(2), 5, &data).unwrap();
    table.egress_load_entry(LogicalPort(2), 9, &sample_egress(200)).unwrap();

    assert_eq!(table.egress_read_entry(LogicalPort(2), 5).unwrap(), data);
    assert_eq!(
        table.egress_get_next(LogicalPort(2), ScanCursor::Start).unwrap(),
        (5, data)
    );
    assert_eq!(
        table
            .egress_get_next(LogicalPort(2), ScanCursor::After(5))
            .unwrap()
            .0,
        9
    );
    assert!(table
        .egress_get_next(LogicalPort(2), ScanCursor::After(9))
        .unwrap_err()
        .is_no_such());
    // entries are per port
    assert!(table
        .egress_get_next(LogicalPort(3), ScanCursor::Start)
        .unwrap_err()
        .is_no_such());
}

#[test]
fn test_egress_scan_bounds() {
    let (table, _sim) = new_table();
    table.egress_load_entry(LogicalPort(0), 63, &sample_egress(7)).unwrap();

    assert_eq!(
        table
            .egress_get_next(LogicalPort(0), ScanCursor::Start)
            .unwrap()
            .0,
        63
    );
    assert!(table
        .egress_get_next(LogicalPort(0), ScanCursor::After(63))
        .unwrap_err()
        .is_no_such());
    assert_eq!(
        table
            .egress_get_next(LogicalPort(0), ScanCursor::After(64))
            .unwrap_err()
            .status(),
        MsdStatus::BadParam
    );
}

#[test]
fn test_egress_flush() {
    let (table, sim) = new_table();
    table.egress_load_entry(LogicalPort(2), 5, &sample_egress(1)).unwrap();
    table.egress_load_entry(LogicalPort(3), 5, &sample_egress(2)).unwrap();
    table.egress_load_entry(LogicalPort(3), 6, &sample_egress(3)).unwrap();

    table.egress_flush_entry(LogicalPort(3), 6).unwrap();
    assert_eq!(sim.egress_image(3, 6), [0; 4]);
    assert_ne!(sim.egress_image(3, 5), [0; 4]);

    table.egress_flush_entry_all_ports(5).unwrap();
    assert_eq!(sim.egress_image(2, 5), [0; 4]);
    assert_eq!(sim.egress_image(3, 5), [0; 4]);
}

#[test]
fn test_write_failure_mid_commit() {
    let (table, sim) = new_table();
    // validity probe (1) + extension (1) + action page (13 + 1)
    sim.fail_after_writes(16);

    let err = table.load_entry(6, &sample_entry(6)).unwrap_err();
    assert!(matches!(err, MsdError::Transport { .. }));
    assert_eq!(err.status(), MsdStatus::Fail);

    // the key page never landed, so the entry is not live
    sim.clear_faults();
    assert_eq!(table.find_entry(6).unwrap(), None);
    assert!(!sim.ingress_image(6).is_valid());
}

#[test]
fn test_busy_bit_timeout() {
    let (table, sim) = new_table();
    sim.stick_busy();

    let err = table.flush_all().unwrap_err();
    assert!(matches!(err, MsdError::Timeout { .. }));
    assert_eq!(err.status(), MsdStatus::Fail);
}

#[test]
fn test_slow_busy_bit_within_budget() {
    let (table, sim) = new_table();
    sim.set_busy_polls(5);

    table.load_entry(2, &sample_entry(2)).unwrap();
    assert_eq!(table.read_entry(2).unwrap(), sample_entry(2));
}

#[test]
fn test_alternate_tcam_device_address() {
    let mut config = TcamConfig::default();
    config.device.tcam_dev_addr = 0x1C;
    let sim = SimulatedSwitch::with_tcam_dev_addr(0x1C);
    let table = TcamTable::with_codec(sim.clone(), FirCodec, &config);

    table.load_entry(1, &sample_entry(1)).unwrap();

    assert!(sim.ingress_image(1).is_valid());
    assert!(sim.writes().iter().all(|w| w.dev_addr == 0x1C));
}

#[test]
fn test_key_word_0x00ff_reads_as_invalid() {
    let (table, sim) = new_table();
    let mut image = IngressImage::default();
    image.key[0] = 0x00FF;
    image.key[4] = 0xFF01;
    sim.set_ingress_image(12, image);

    assert_eq!(table.find_entry(12).unwrap(), None);
    assert!(table.get_next(ScanCursor::Start).unwrap_err().is_no_such());
}
