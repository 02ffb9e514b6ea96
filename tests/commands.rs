use cc_debugger::chip::{ChipId, DebugStatus};
use cc_debugger::error::ErrorFlag;
use cc_debugger::instr::{InstructionTable, MAX_BURST};
use cc_debugger::lines::Line;
use cc_debugger::session::{Config, Debugger, State};
use cc_debugger::sim::{Emulator, Event, Loopback, NoDelay, Script, Target, Wire};
use cc_debugger::transfer::Direction;

type Dbg<T> = Debugger<Wire<T>, NoDelay>;

fn debugger<T: Target>(target: T) -> Dbg<T> {
    let _ = env_logger::builder().is_test(true).try_init();
    Debugger::new(Wire::new(target), NoDelay::default(), Config::default())
}

fn entered<T: Target>(target: T) -> Dbg<T> {
    let mut dbg = debugger(target);
    dbg.enter();
    assert_eq!(dbg.state(), State::InSession);
    dbg
}

type Command = (&'static str, fn(&mut Dbg<Emulator>) -> u32);

// Every command that needs a session, with its result widened
fn commands() -> Vec<Command> {
    let list: [Command; 16] = [
        ("exit", |d| u32::from(d.exit())),
        ("get_config", |d| u32::from(d.get_config())),
        ("set_config", |d| u32::from(d.set_config(0x3c))),
        ("exec 1", |d| u32::from(d.exec(&[0x00]))),
        ("exec 2", |d| u32::from(d.exec(&[0x74, 0x01]))),
        ("exec 3", |d| u32::from(d.exec(&[0x75, 0xc7, 0x01]))),
        ("exec_imm", |d| u32::from(d.exec_imm(0x90, 0x6276))),
        ("get_chip_id", |d| u32::from(d.get_chip_id())),
        ("get_pc", |d| u32::from(d.get_pc())),
        ("get_status", |d| u32::from(d.get_status())),
        ("step", |d| u32::from(d.step())),
        ("halt", |d| u32::from(d.halt())),
        ("resume", |d| u32::from(d.resume())),
        ("chip_erase", |d| u32::from(d.chip_erase())),
        ("mass_erase", |d| u32::from(d.mass_erase())),
        ("burst_write", |d| u32::from(d.burst_write(&[1, 2, 3]))),
    ];
    list.to_vec()
}

#[test]
fn everything_is_refused_while_inactive() {
    for (name, command) in commands() {
        let mut dbg = entered(Emulator::default());
        dbg.activate(false);
        let direction = dbg.direction();
        dbg.lines_mut().clear_events();

        assert_eq!(command(&mut dbg), 0, "{}", name);
        assert_eq!(dbg.error(), ErrorFlag::Inactive, "{}", name);
        assert_eq!(dbg.direction(), direction, "{}", name);
        assert!(dbg.lines().events().is_empty(), "{}", name);
    }
}

#[test]
fn everything_is_refused_outside_a_session() {
    for (name, command) in commands() {
        let mut dbg = debugger(Emulator::default());
        dbg.lines_mut().clear_events();

        assert_eq!(command(&mut dbg), 0, "{}", name);
        assert_eq!(dbg.error(), ErrorFlag::NotInSession, "{}", name);
        assert!(dbg.lines().events().is_empty(), "{}", name);
        assert!(dbg.lines().received().is_empty(), "{}", name);
    }
}

#[test]
fn status_before_enter() {
    let mut dbg = debugger(Emulator::default());
    assert_eq!(dbg.get_status(), 0);
    assert_eq!(dbg.error().code(), 2);
}

#[test]
fn rejected_calls_can_be_retried() {
    let mut dbg = debugger(Emulator::default());
    dbg.activate(false);
    dbg.enter();
    assert_eq!(dbg.error(), ErrorFlag::Inactive);

    dbg.activate(true);
    assert_eq!(dbg.error(), ErrorFlag::None);
    dbg.enter();
    assert_eq!(dbg.get_chip_id(), 0xa501);
    assert_eq!(dbg.error(), ErrorFlag::None);
}

#[test]
fn accepted_command_clears_error() {
    let mut dbg = debugger(Emulator::default());
    dbg.get_pc();
    assert_eq!(dbg.error(), ErrorFlag::NotInSession);
    dbg.enter();
    dbg.get_pc();
    assert_eq!(dbg.error(), ErrorFlag::None);
}

#[test]
fn write_config_then_read_it_back() {
    let mut dbg = entered(Emulator::default());
    assert_eq!(dbg.set_config(0x3c), 0x3c);
    assert_eq!(dbg.get_config(), 0x3c);
    assert_eq!(dbg.lines().received(), &[0x18, 0x3c, 0x20]);
    assert_eq!(dbg.direction(), Direction::Drive);
}

#[test]
fn chip_id_is_big_endian() {
    let mut dbg = entered(Script::new([0xa5, 0x01]));
    assert_eq!(dbg.get_chip_id(), 0xa501);
    assert_eq!(dbg.lines().received(), &[0x68]);
    assert_eq!(dbg.lines().target.remaining(), 0);
    assert_eq!(ChipId(0xa501).name(), Some("CC2530"));
}

#[test]
fn pc_is_big_endian() {
    let mut dbg = entered(Script::new([0x12, 0x34]));
    assert_eq!(dbg.get_pc(), 0x1234);
    assert_eq!(dbg.lines().received(), &[0x28]);
}

#[test]
fn exec_framing_follows_length() {
    let mut dbg = entered(Script::new([0x01, 0x02, 0x03, 0x04]));
    assert_eq!(dbg.exec(&[0xa3]), 0x01);
    assert_eq!(dbg.exec(&[0xe5, 0xc7]), 0x02);
    assert_eq!(dbg.exec(&[0x75, 0xc7, 0x01]), 0x03);
    assert_eq!(dbg.exec_imm(0x90, 0x780e), 0x04);
    assert_eq!(dbg.lines().received(), &[
        0x51, 0xa3,
        0x52, 0xe5, 0xc7,
        0x53, 0x75, 0xc7, 0x01,
        0x53, 0x90, 0x78, 0x0e,
    ]);
}

#[test]
fn exec_rejects_bad_lengths_without_sending() {
    let mut dbg = entered(Emulator::default());
    dbg.lines_mut().clear_events();
    for opcodes in [&[][..], &[0, 1, 2, 3][..]] {
        assert_eq!(dbg.exec(opcodes), 0);
        assert_eq!(dbg.error(), ErrorFlag::BadInstruction);
    }
    assert!(dbg.lines().events().is_empty());
    assert!(dbg.in_session());

    // the next accepted call clears it
    assert_eq!(dbg.exec(&[0x74, 0x07]), 0x07);
    assert_eq!(dbg.error(), ErrorFlag::None);
}

#[test]
fn exec_preconditions_come_before_length() {
    let mut dbg = debugger(Emulator::default());
    assert_eq!(dbg.exec(&[]), 0);
    assert_eq!(dbg.error(), ErrorFlag::NotInSession);

    dbg.activate(false);
    dbg.lines_mut().clear_events();
    assert_eq!(dbg.exec(&[]), 0);
    assert_eq!(dbg.error(), ErrorFlag::Inactive);
    assert!(dbg.lines().events().is_empty());
}

#[test]
fn single_byte_commands() {
    let mut dbg = entered(Script::new([0x20, 0x11, 0x22, 0x00, 0x80]));
    assert_eq!(dbg.halt(), 0x20);
    assert_eq!(dbg.step(), 0x11);
    assert_eq!(dbg.get_status(), 0x22);
    assert_eq!(dbg.resume(), 0x00);
    assert_eq!(dbg.chip_erase(), 0x80);
    assert_eq!(dbg.lines().received(), &[0x40, 0x58, 0x30, 0x48, 0x10]);
    // resume leaves the session open
    assert!(dbg.in_session());
}

#[test]
fn halt_and_resume_track_cpu_state() {
    let mut dbg = entered(Emulator::default());
    let halted = DebugStatus::from_bits_retain(dbg.halt());
    assert!(halted.contains(DebugStatus::CPU_HALTED));
    assert_eq!(dbg.get_pc(), 0);
    dbg.step();
    dbg.step();
    assert_eq!(dbg.get_pc(), 2);
    let running = DebugStatus::from_bits_retain(dbg.resume());
    assert!(!running.contains(DebugStatus::CPU_HALTED));
}

#[test]
fn waits_out_a_busy_target() {
    let mut emu = Emulator::default();
    emu.busy_polls = 4;
    emu.config = 0x0e;
    let mut dbg = entered(emu);
    dbg.lines_mut().clear_events();

    assert_eq!(dbg.get_config(), 0x0e);
    // 4 bursts of 8 pulses on top of the 8 + 8 of the two bytes
    let rising = dbg.lines().events().iter()
        .filter(|e| **e == Event::Level(Line::Clock, true))
        .count();
    assert_eq!(rising, 8 + 4 * 8 + 8);
}

#[test]
fn mass_erase_polls_until_done() {
    let mut emu = Emulator::default();
    emu.erase_polls = 3;
    let mut dbg = entered(emu);

    let status = DebugStatus::from_bits_retain(dbg.mass_erase());
    assert!(!status.contains(DebugStatus::CHIP_ERASE_BUSY));
    assert_eq!(dbg.error(), ErrorFlag::None);
    // erase, 3 busy status reads, then the one that shows it done
    assert_eq!(dbg.lines().received(), &[0x10, 0x30, 0x30, 0x30, 0x30]);
}

#[test]
fn burst_write_frames_length() {
    let mut dbg = entered(Emulator::default());
    let data: Vec<u8> = (0..300).map(|i| i as u8).collect();
    dbg.burst_write(&data);
    assert_eq!(dbg.error(), ErrorFlag::None);
    assert_eq!(&dbg.lines().received()[..2], &[0x81, 0x2c]);
    assert_eq!(dbg.lines().target.burst, data);
}

#[test]
fn burst_write_limit() {
    let mut dbg = entered(Emulator::default());
    let data = vec![0xaa; MAX_BURST];
    dbg.burst_write(&data);
    assert_eq!(dbg.error(), ErrorFlag::None);
    // 2048 wraps to a count of 0 in the 11-bit field
    assert_eq!(&dbg.lines().received()[..2], &[0x80, 0x00]);
    assert_eq!(dbg.lines().target.burst.len(), MAX_BURST);

    let mut dbg = entered(Emulator::default());
    dbg.lines_mut().clear_events();
    assert_eq!(dbg.burst_write(&vec![0; MAX_BURST + 1]), 0);
    assert_eq!(dbg.error(), ErrorFlag::BurstTooLong);
    assert!(dbg.lines().events().is_empty());
}

#[test]
fn burst_write_of_nothing_sends_nothing() {
    let mut dbg = entered(Emulator::default());
    dbg.lines_mut().clear_events();
    assert_eq!(dbg.burst_write(&[]), 0);
    assert_eq!(dbg.error(), ErrorFlag::None);
    assert!(dbg.lines().events().is_empty());
}

#[test]
fn cc251x_framing() {
    let mut emu = Emulator::default();
    emu.table = InstructionTable::CC251X;
    emu.chip_id = 0x8103;
    let mut dbg = entered(emu);

    // GET_CHIP_ID is the same in both tables
    let id = ChipId(dbg.get_chip_id());
    dbg.set_instruction_table(id.instruction_table());
    assert_eq!(dbg.instruction_table().version, 2);

    dbg.set_config(0x22);
    assert_eq!(dbg.get_config(), 0x22);
    assert_eq!(dbg.exec(&[0x74, 0x99]), 0x99);
    dbg.exit();
    assert_eq!(dbg.lines().received(), &[0x68, 0x1d, 0x22, 0x24, 0x56, 0x74, 0x99, 0x4c]);
    assert_eq!(dbg.state(), State::OutOfSession);
}

#[test]
fn loopback_round_trip_all_bytes() {
    let mut dbg = entered(Loopback::default());
    for x in 0..=255u8 {
        dbg.write(x);
        assert_eq!(dbg.read(), x);
    }
}

#[test]
fn sessions_can_repeat() {
    let mut dbg = debugger(Emulator::default());
    for _ in 0..3 {
        dbg.enter();
        assert_eq!(dbg.get_chip_id(), 0xa501);
        dbg.exit();
        assert_eq!(dbg.state(), State::OutOfSession);
        assert_eq!(dbg.error(), ErrorFlag::None);
    }
    assert_eq!(dbg.lines().entries(), 3);
}
