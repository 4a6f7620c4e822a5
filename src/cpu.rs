//! The virtual machine proper: fetch, decode, execute, and the per-frame
//! cycle driver that interleaves instructions with the 60Hz timer tick.
use crate::config::Config;
use crate::error::Chip8Error;
use crate::framebuffer::Framebuffer;
use crate::instruction::{Instruction, Op};
use crate::keypad::{KeyWait, Keypad};
use crate::memory::{Chip8Memory, MemoryMap};
use crate::registers::{Registers, VF};
use crate::stack::CallStack;
use crate::timers::Timers;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// whether the cycle driver issues instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Running,
    Paused,
    Quit,
}

/// what a single instruction did, as far as the cycle driver cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// a sprite was drawn
    Drew,
    /// FX0A is still waiting; the same instruction runs next time
    Blocked,
}

/// A complete chip-8 machine with a program loaded.
pub struct Machine {
    config: Config,
    rom: Vec<u8>,
    memory: Chip8Memory,
    registers: Registers,
    stack: CallStack,
    framebuffer: Framebuffer,
    timers: Timers,
    keypad: Keypad,
    key_wait: KeyWait,
    rng: StdRng,
    state: MachineState,
}

impl Machine {
    /// Build a machine and load `rom` at 0x200. A ROM that doesn't fit is
    /// rejected and no machine is produced.
    pub fn new(config: Config, rom: &[u8]) -> Result<Self, Chip8Error> {
        let mut memory = Chip8Memory::new();
        let len = memory.load_program(&mut &rom[..])?;
        log::info!("loaded {} byte program", len);
        let rng = Self::make_rng(&config);
        Ok(Machine {
            config,
            rom: rom.to_vec(),
            memory,
            registers: Registers::new(),
            stack: CallStack::new(),
            framebuffer: Framebuffer::new(),
            timers: Timers::new(),
            keypad: Keypad::new(),
            key_wait: KeyWait::Idle,
            rng,
            state: MachineState::Running,
        })
    }

    fn make_rng(config: &Config) -> StdRng {
        match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Put everything back exactly as `new` left it, with the same ROM. The
    /// keypad belongs to the host and is left alone.
    pub fn reset(&mut self) {
        let mut memory = Chip8Memory::new();
        memory.write_slice(crate::memory::CHIP8_PROGRAM_ADDR, &self.rom);
        self.memory = memory;
        self.registers = Registers::new();
        self.stack = CallStack::new();
        self.framebuffer = Framebuffer::new();
        self.timers = Timers::new();
        self.key_wait = KeyWait::Idle;
        self.rng = Self::make_rng(&self.config);
        self.state = MachineState::Running;
        log::info!("machine reset");
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn set_state(&mut self, state: MachineState) {
        if state != self.state {
            log::info!("machine {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn memory(&self) -> &Chip8Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Chip8Memory {
        &mut self.memory
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut Timers {
        &mut self.timers
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn keypad_mut(&mut self) -> &mut Keypad {
        &mut self.keypad
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Run one frame: the instruction budget, then one timer tick. Does
    /// nothing unless the machine is running. A stack fault stops the
    /// machine and is returned.
    pub fn run_frame(&mut self) -> Result<(), Chip8Error> {
        if self.state != MachineState::Running {
            return Ok(());
        }
        for _ in 0..self.config.instructions_per_frame() {
            match self.step()? {
                Step::Drew if self.config.quirks.single_draw_per_frame => break,
                _ => {}
            }
            if self.state != MachineState::Running {
                break;
            }
        }
        self.timers.tick();
        Ok(())
    }

    /// fetch, decode and execute one instruction
    pub fn step(&mut self) -> Result<Step, Chip8Error> {
        let pc = self.registers.pc;
        let instruction = Instruction::new(self.memory.get_word(pc));
        self.registers.pc = pc.wrapping_add(2);
        let op = instruction.decode();
        if self.config.trace {
            log::trace!("{:#05x}: {:04x} {}", pc, instruction.opcode, op);
        }
        self.execute(op).map_err(|e| {
            log::error!("{:#05x}: {}", pc, e);
            self.set_state(MachineState::Quit);
            e
        })
    }

    /// apply one decoded instruction; PC already points at the next one
    pub fn execute(&mut self, op: Op) -> Result<Step, Chip8Error> {
        let quirks = self.config.quirks;
        let r = &mut self.registers;
        // address of the instruction being executed, for error reports
        let here = r.pc.wrapping_sub(2);

        match op {
            Op::Cls => self.framebuffer.clear(),
            Op::Ret => r.pc = self.stack.pop(here)?,
            Op::Jump(addr) => r.pc = addr,
            Op::Call(addr) => {
                self.stack.push(r.pc, here)?;
                r.pc = addr;
            }
            Op::SkipEqImm(x, nn) => {
                if r.v[x] == nn {
                    r.pc = r.pc.wrapping_add(2);
                }
            }
            Op::SkipNeImm(x, nn) => {
                if r.v[x] != nn {
                    r.pc = r.pc.wrapping_add(2);
                }
            }
            Op::SkipEqReg(x, y) => {
                if r.v[x] == r.v[y] {
                    r.pc = r.pc.wrapping_add(2);
                }
            }
            Op::SkipNeReg(x, y) => {
                if r.v[x] != r.v[y] {
                    r.pc = r.pc.wrapping_add(2);
                }
            }
            Op::LoadImm(x, nn) => r.v[x] = nn,
            Op::AddImm(x, nn) => r.v[x] = r.v[x].wrapping_add(nn),
            Op::Move(x, y) => r.v[x] = r.v[y],
            Op::Or(x, y) | Op::And(x, y) | Op::Xor(x, y) => {
                r.v[x] = match op {
                    Op::Or(..) => r.v[x] | r.v[y],
                    Op::And(..) => r.v[x] & r.v[y],
                    _ => r.v[x] ^ r.v[y],
                };
                if quirks.vf_reset_on_logic_ops {
                    r.v[VF] = 0;
                }
            }
            Op::AddReg(x, y) => {
                let sum = r.v[x] as u16 + r.v[y] as u16;
                r.v[x] = sum as u8;
                r.set_flag(sum > 0xff);
            }
            Op::Sub(x, y) => {
                let (vx, vy) = (r.v[x], r.v[y]);
                r.v[x] = vx.wrapping_sub(vy);
                r.set_flag(vx >= vy);
            }
            Op::SubReverse(x, y) => {
                let (vx, vy) = (r.v[x], r.v[y]);
                r.v[x] = vy.wrapping_sub(vx);
                r.set_flag(vy >= vx);
            }
            Op::ShiftRight(x, y) => {
                let src = if quirks.shift_uses_vy { r.v[y] } else { r.v[x] };
                r.v[x] = src >> 1;
                r.set_flag(src & 0x01 != 0);
            }
            Op::ShiftLeft(x, y) => {
                let src = if quirks.shift_uses_vy { r.v[y] } else { r.v[x] };
                r.v[x] = src << 1;
                r.set_flag(src & 0x80 != 0);
            }
            Op::LoadIndex(addr) => r.i = addr,
            Op::JumpV0(addr) => r.pc = addr.wrapping_add(r.v[0] as u16),
            Op::Random(x, nn) => r.v[x] = self.rng.gen::<u8>() & nn,
            Op::Draw(x, y, n) => {
                let rows = self.memory.read_slice(r.i, n as usize);
                let collision = self.framebuffer.draw_sprite(r.v[x], r.v[y], &rows);
                r.set_flag(collision);
                return Ok(Step::Drew);
            }
            Op::SkipKeyPressed(x) => {
                if self.keypad.is_pressed(r.v[x]) {
                    r.pc = r.pc.wrapping_add(2);
                }
            }
            Op::SkipKeyNotPressed(x) => {
                if !self.keypad.is_pressed(r.v[x]) {
                    r.pc = r.pc.wrapping_add(2);
                }
            }
            Op::WaitKey(x) => {
                match self
                    .key_wait
                    .poll(&self.keypad, quirks.key_wait_requires_release)
                {
                    Some(key) => r.v[x] = key,
                    None => {
                        r.pc = here;
                        return Ok(Step::Blocked);
                    }
                }
            }
            Op::ReadDelay(x) => r.v[x] = self.timers.delay,
            Op::SetDelay(x) => self.timers.delay = r.v[x],
            Op::SetSound(x) => {
                if quirks.sound_timer_read_back {
                    r.v[x] = self.timers.sound;
                } else {
                    self.timers.sound = r.v[x];
                }
            }
            Op::AddIndex(x) => r.i = r.i.wrapping_add(r.v[x] as u16),
            Op::FontGlyph(x) => r.i = Chip8Memory::font_addr(r.v[x]),
            Op::Bcd(x) => {
                let vx = r.v[x];
                self.memory
                    .write_slice(r.i, &[vx / 100, (vx / 10) % 10, vx % 10]);
            }
            Op::StoreRegs(x) => {
                self.memory.write_slice(r.i, &r.v[..=x]);
                if quirks.index_increment_on_mem_ops {
                    r.i = r.i.wrapping_add(x as u16 + 1);
                }
            }
            Op::LoadRegs(x) => {
                let values = self.memory.read_slice(r.i, x + 1);
                r.v[..=x].copy_from_slice(&values);
                if quirks.index_increment_on_mem_ops {
                    r.i = r.i.wrapping_add(x as u16 + 1);
                }
            }
            Op::Unknown(opcode) => {
                log::warn!("{:#05x}: unimplemented opcode {:04x}, skipped", here, opcode);
            }
        }
        Ok(Step::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Quirks;
    use crate::stack::STACK_DEPTH;

    fn config(quirks: Quirks) -> Config {
        Config {
            instructions_per_second: 600,
            quirks,
            seed: Some(0x5eed),
            trace: true,
        }
    }

    fn machine(rom: &[u8]) -> Machine {
        Machine::new(config(Quirks::default()), rom).unwrap()
    }

    fn machine_with(quirks: Quirks, rom: &[u8]) -> Machine {
        Machine::new(config(quirks), rom).unwrap()
    }

    fn run(m: &mut Machine, opcode: u16) -> Step {
        let op = Instruction::new(opcode).decode();
        m.execute(op).unwrap()
    }

    #[test]
    fn test_new_rejects_oversized_rom() {
        let rom = vec![0; 4096 - 0x200 + 1];
        assert!(matches!(
            Machine::new(Config::default(), &rom),
            Err(Chip8Error::RomTooLarge { .. })
        ));
    }

    #[test]
    fn test_initial_state() {
        let m = machine(&[0x12, 0x00]);
        assert_eq!(m.registers().pc, 0x200);
        assert_eq!(m.state(), MachineState::Running);
        assert_eq!(m.memory().get_word(0x200), 0x1200);
        assert_eq!(m.framebuffer().lit_count(), 0);
        assert_eq!(m.timers(), &Timers::new());
    }

    #[test]
    fn test_fetch_advances_pc_before_execute() -> Result<(), Chip8Error> {
        // 6A42: VA = 0x42
        let mut m = machine(&[0x6a, 0x42]);
        assert_eq!(m.step()?, Step::Continue);
        assert_eq!(m.registers().pc, 0x202);
        assert_eq!(m.registers().v[0xa], 0x42);
        Ok(())
    }

    #[test]
    fn test_jump_to_self_is_a_wait_loop() -> Result<(), Chip8Error> {
        let mut m = machine(&[0x12, 0x00]);
        for _ in 0..5 {
            m.step()?;
            assert_eq!(m.registers().pc, 0x200);
        }
        Ok(())
    }

    #[test]
    fn test_call_return_round_trip() -> Result<(), Chip8Error> {
        // 0x200: call 0x206; 0x202: ...; 0x206: return
        let mut m = machine(&[0x22, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0xee]);
        m.step()?;
        assert_eq!(m.registers().pc, 0x206);
        assert_eq!(m.stack_depth(), 1);
        m.step()?;
        assert_eq!(m.registers().pc, 0x202);
        assert_eq!(m.stack_depth(), 0);
        Ok(())
    }

    #[test]
    fn test_return_on_empty_stack_halts() {
        let mut m = machine(&[0x00, 0xee]);
        match m.step() {
            Err(Chip8Error::StackUnderflow { pc }) => assert_eq!(pc, 0x200),
            other => panic!("expected underflow, got {:?}", other),
        }
        assert_eq!(m.state(), MachineState::Quit);
    }

    #[test]
    fn test_unbounded_recursion_overflows() {
        // 0x200: call 0x200
        let mut m = machine(&[0x22, 0x00]);
        for _ in 0..STACK_DEPTH {
            m.step().unwrap();
        }
        assert!(matches!(m.step(), Err(Chip8Error::StackOverflow { pc: 0x200 })));
        assert_eq!(m.state(), MachineState::Quit);
        assert_eq!(m.stack_depth(), STACK_DEPTH);
    }

    #[test]
    fn test_skips() {
        let mut m = machine(&[]);
        m.registers_mut().v[1] = 0x42;
        m.registers_mut().v[2] = 0x42;
        let pc = m.registers().pc;
        run(&mut m, 0x3142);
        assert_eq!(m.registers().pc, pc + 2);
        run(&mut m, 0x4142);
        assert_eq!(m.registers().pc, pc + 2);
        run(&mut m, 0x5120);
        assert_eq!(m.registers().pc, pc + 4);
        run(&mut m, 0x9120);
        assert_eq!(m.registers().pc, pc + 4);
        run(&mut m, 0x4100);
        assert_eq!(m.registers().pc, pc + 6);
        m.registers_mut().v[2] = 0;
        run(&mut m, 0x9120);
        assert_eq!(m.registers().pc, pc + 8);
    }

    #[test]
    fn test_undefined_register_compare_is_noop() {
        let mut m = machine(&[]);
        let pc = m.registers().pc;
        assert_eq!(run(&mut m, 0x5121), Step::Continue);
        assert_eq!(m.registers().pc, pc);
    }

    #[test]
    fn test_add_immediate_wraps_without_flag() {
        let mut m = machine(&[]);
        m.registers_mut().v[3] = 0xff;
        m.registers_mut().v[0xf] = 0x77;
        run(&mut m, 0x7302);
        assert_eq!(m.registers().v[3], 0x01);
        assert_eq!(m.registers().v[0xf], 0x77);
    }

    #[test]
    fn test_add_with_carry_all_values() {
        let mut m = machine(&[]);
        for a in 0..=255u8 {
            for b in (0..=255u8).step_by(7) {
                m.registers_mut().v[1] = a;
                m.registers_mut().v[2] = b;
                run(&mut m, 0x8124);
                assert_eq!(m.registers().v[1], a.wrapping_add(b));
                assert_eq!(m.registers().v[0xf], (a as u16 + b as u16 > 255) as u8);
            }
        }
    }

    #[test]
    fn test_add_into_vf_keeps_flag() {
        let mut m = machine(&[]);
        m.registers_mut().v[0xf] = 0xf0;
        m.registers_mut().v[1] = 0x20;
        run(&mut m, 0x8f14);
        assert_eq!(m.registers().v[0xf], 1);
        m.registers_mut().v[0xf] = 0x10;
        run(&mut m, 0x8f14);
        assert_eq!(m.registers().v[0xf], 0);
    }

    #[test]
    fn test_subtract_flag_from_original_operands() {
        let mut m = machine(&[]);
        for (a, b) in [(5u8, 3u8), (3, 5), (7, 7), (0, 255), (255, 0)] {
            m.registers_mut().v[4] = a;
            m.registers_mut().v[5] = b;
            run(&mut m, 0x8455);
            assert_eq!(m.registers().v[4], a.wrapping_sub(b));
            assert_eq!(m.registers().v[0xf], (a >= b) as u8);

            m.registers_mut().v[4] = a;
            run(&mut m, 0x8457);
            assert_eq!(m.registers().v[4], b.wrapping_sub(a));
            assert_eq!(m.registers().v[0xf], (b >= a) as u8);
        }
    }

    #[test]
    fn test_subtract_into_vf() {
        let mut m = machine(&[]);
        m.registers_mut().v[0xf] = 2;
        m.registers_mut().v[1] = 3;
        run(&mut m, 0x8f15);
        // 2 < 3, so borrow: VF ends up as the flag, not the difference
        assert_eq!(m.registers().v[0xf], 0);
        m.registers_mut().v[0xf] = 9;
        run(&mut m, 0x8f15);
        assert_eq!(m.registers().v[0xf], 1);
    }

    #[test]
    fn test_logic_ops_leave_vf_by_default() {
        let mut m = machine(&[]);
        m.registers_mut().v[0xf] = 0x55;
        m.registers_mut().v[0] = 0b1100;
        m.registers_mut().v[1] = 0b1010;
        run(&mut m, 0x8011);
        assert_eq!(m.registers().v[0], 0b1110);
        m.registers_mut().v[0] = 0b1100;
        run(&mut m, 0x8012);
        assert_eq!(m.registers().v[0], 0b1000);
        m.registers_mut().v[0] = 0b1100;
        run(&mut m, 0x8013);
        assert_eq!(m.registers().v[0], 0b0110);
        assert_eq!(m.registers().v[0xf], 0x55);
    }

    #[test]
    fn test_logic_ops_reset_vf_quirk() {
        let quirks = Quirks {
            vf_reset_on_logic_ops: true,
            ..Quirks::default()
        };
        let mut m = machine_with(quirks, &[]);
        for opcode in [0x8011u16, 0x8012, 0x8013] {
            m.registers_mut().v[0xf] = 0x55;
            run(&mut m, opcode);
            assert_eq!(m.registers().v[0xf], 0, "{:04x}", opcode);
        }
    }

    #[test]
    fn test_shift_in_place_by_default() {
        let mut m = machine(&[]);
        m.registers_mut().v[1] = 0b1000_0011;
        m.registers_mut().v[2] = 0xf0;
        run(&mut m, 0x8126);
        assert_eq!(m.registers().v[1], 0b0100_0001);
        assert_eq!(m.registers().v[0xf], 1);
        run(&mut m, 0x812e);
        assert_eq!(m.registers().v[1], 0b1000_0010);
        assert_eq!(m.registers().v[0xf], 0);
        run(&mut m, 0x812e);
        assert_eq!(m.registers().v[1], 0b0000_0100);
        assert_eq!(m.registers().v[0xf], 1);
        assert_eq!(m.registers().v[2], 0xf0);
    }

    #[test]
    fn test_shift_uses_vy_quirk() {
        let quirks = Quirks {
            shift_uses_vy: true,
            ..Quirks::default()
        };
        let mut m = machine_with(quirks, &[]);
        m.registers_mut().v[1] = 0xff;
        m.registers_mut().v[2] = 0b0000_0110;
        run(&mut m, 0x8126);
        assert_eq!(m.registers().v[1], 0b0000_0011);
        assert_eq!(m.registers().v[0xf], 0);
        m.registers_mut().v[2] = 0b1000_0001;
        run(&mut m, 0x812e);
        assert_eq!(m.registers().v[1], 0b0000_0010);
        assert_eq!(m.registers().v[0xf], 1);
    }

    #[test]
    fn test_index_and_jump_v0() {
        let mut m = machine(&[]);
        run(&mut m, 0xa123);
        assert_eq!(m.registers().i, 0x123);
        m.registers_mut().v[0] = 0x10;
        m.registers_mut().v[1] = 0xff;
        run(&mut m, 0xb300);
        assert_eq!(m.registers().pc, 0x310);
        run(&mut m, 0xf11e);
        assert_eq!(m.registers().i, 0x222);
        assert_eq!(m.registers().v[0xf], 0);
    }

    #[test]
    fn test_random_is_masked_and_seeded() {
        let mut a = machine(&[]);
        let mut b = machine(&[]);
        let mut seen = [false; 256];
        for _ in 0..8192 {
            run(&mut a, 0xc0ff);
            run(&mut b, 0xc0ff);
            assert_eq!(a.registers().v[0], b.registers().v[0]);
            seen[a.registers().v[0] as usize] = true;
            run(&mut a, 0xc10f);
            assert_eq!(a.registers().v[1] & 0xf0, 0);
            run(&mut b, 0xc10f);
        }
        // every byte value turns up
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_timers_read_write() {
        let mut m = machine(&[]);
        m.registers_mut().v[3] = 42;
        run(&mut m, 0xf315);
        assert_eq!(m.timers().delay, 42);
        run(&mut m, 0xf418);
        assert_eq!(m.timers().sound, 0);
        run(&mut m, 0xf318);
        assert_eq!(m.timers().sound, 42);
        m.timers_mut().delay = 7;
        run(&mut m, 0xf507);
        assert_eq!(m.registers().v[5], 7);
    }

    #[test]
    fn test_sound_timer_read_back_quirk() {
        let quirks = Quirks {
            sound_timer_read_back: true,
            ..Quirks::default()
        };
        let mut m = machine_with(quirks, &[]);
        m.timers_mut().sound = 9;
        m.registers_mut().v[2] = 30;
        run(&mut m, 0xf218);
        assert_eq!(m.registers().v[2], 9);
        assert_eq!(m.timers().sound, 9);
    }

    #[test]
    fn test_font_glyph_address() {
        let mut m = machine(&[]);
        m.registers_mut().v[6] = 0xb;
        run(&mut m, 0xf629);
        assert_eq!(m.registers().i, 55);
        assert_eq!(
            m.memory().read_slice(m.registers().i, 5),
            &[0xE0, 0x90, 0xE0, 0x90, 0xE0]
        );
    }

    #[test]
    fn test_bcd() {
        let mut m = machine(&[]);
        m.registers_mut().i = 0x300;
        m.registers_mut().v[0] = 255;
        run(&mut m, 0xf033);
        assert_eq!(m.memory().read_slice(0x300, 3), &[2, 5, 5]);
        m.registers_mut().v[0] = 7;
        run(&mut m, 0xf033);
        assert_eq!(m.memory().read_slice(0x300, 3), &[0, 0, 7]);
        m.registers_mut().v[0] = 40;
        run(&mut m, 0xf033);
        assert_eq!(m.memory().read_slice(0x300, 3), &[0, 4, 0]);
        assert_eq!(m.registers().i, 0x300);
    }

    #[test]
    fn test_register_dump_load_round_trip() {
        let mut m = machine(&[]);
        let original = [1, 2, 3, 4, 5, 6];
        m.registers_mut().v[..6].copy_from_slice(&original);
        m.registers_mut().v[6] = 0x99;
        m.registers_mut().i = 0x400;
        run(&mut m, 0xf555);
        assert_eq!(m.memory().read_slice(0x400, 7), &[1, 2, 3, 4, 5, 6, 0]);
        assert_eq!(m.registers().i, 0x400);

        m.registers_mut().v[..6].copy_from_slice(&[0; 6]);
        run(&mut m, 0xf565);
        assert_eq!(m.registers().v[..6], original);
        assert_eq!(m.registers().v[6], 0x99);
        assert_eq!(m.registers().i, 0x400);
    }

    #[test]
    fn test_index_increment_quirk() {
        let quirks = Quirks {
            index_increment_on_mem_ops: true,
            ..Quirks::default()
        };
        let mut m = machine_with(quirks, &[]);
        m.registers_mut().i = 0x400;
        run(&mut m, 0xf255);
        assert_eq!(m.registers().i, 0x403);
        run(&mut m, 0xf065);
        assert_eq!(m.registers().i, 0x404);
    }

    #[test]
    fn test_draw_clips_at_right_edge() {
        let mut m = machine(&[]);
        m.registers_mut().i = 0x300;
        m.memory_mut().write(0x300, 0xff);
        m.registers_mut().v[0] = 60;
        m.registers_mut().v[1] = 0;
        assert_eq!(run(&mut m, 0xd011), Step::Drew);
        assert_eq!(m.registers().v[0xf], 0);
        let fb = m.framebuffer();
        assert!(fb.pixel(60, 0) && fb.pixel(63, 0));
        assert!(!fb.pixel(0, 0));
        assert_eq!(fb.lit_count(), 4);
    }

    #[test]
    fn test_clear_then_draw() {
        let mut m = machine(&[]);
        m.registers_mut().i = 0x300;
        m.memory_mut().write_slice(0x300, &[0xff, 0xff]);
        run(&mut m, 0xd002);
        run(&mut m, 0x00e0);
        assert_eq!(m.framebuffer().lit_count(), 0);
        // glyph for 0 at (8, 4)
        m.registers_mut().v[2] = 8;
        m.registers_mut().v[3] = 4;
        m.registers_mut().i = 0;
        run(&mut m, 0xd235);
        assert_eq!(m.registers().v[0xf], 0);
        assert_eq!(m.framebuffer().lit_count(), 14);
        assert!(m.framebuffer().pixel(8, 4));
        assert!(!m.framebuffer().pixel(9, 5));
    }

    #[test]
    fn test_draw_collision_sets_vf() {
        let mut m = machine(&[]);
        m.registers_mut().i = 0;
        run(&mut m, 0xd005);
        assert_eq!(m.registers().v[0xf], 0);
        run(&mut m, 0xd005);
        assert_eq!(m.registers().v[0xf], 1);
        assert_eq!(m.framebuffer().lit_count(), 0);
    }

    #[test]
    fn test_draw_coordinates_read_before_vf_reset() {
        let mut m = machine(&[]);
        m.registers_mut().i = 0;
        m.registers_mut().v[0xf] = 10;
        m.registers_mut().v[0] = 2;
        run(&mut m, 0xdf01);
        assert!(m.framebuffer().pixel(10, 2));
    }

    #[test]
    fn test_skip_on_key() {
        let mut m = machine(&[]);
        let pc = m.registers().pc;
        m.registers_mut().v[0] = 0xa;
        run(&mut m, 0xe09e);
        assert_eq!(m.registers().pc, pc);
        run(&mut m, 0xe0a1);
        assert_eq!(m.registers().pc, pc + 2);
        m.keypad_mut().set_key(0xa, true);
        run(&mut m, 0xe09e);
        assert_eq!(m.registers().pc, pc + 4);
        run(&mut m, 0xe0a1);
        assert_eq!(m.registers().pc, pc + 4);
    }

    #[test]
    fn test_key_wait_requires_release_by_default() -> Result<(), Chip8Error> {
        // F50A: wait for key into V5
        let mut m = machine(&[0xf5, 0x0a]);
        assert_eq!(m.step()?, Step::Blocked);
        assert_eq!(m.registers().pc, 0x200);
        m.keypad_mut().set_key(0xc, true);
        assert_eq!(m.step()?, Step::Blocked);
        assert_eq!(m.step()?, Step::Blocked);
        assert_eq!(m.registers().pc, 0x200);
        m.keypad_mut().set_key(0xc, false);
        assert_eq!(m.step()?, Step::Continue);
        assert_eq!(m.registers().v[5], 0xc);
        assert_eq!(m.registers().pc, 0x202);
        Ok(())
    }

    #[test]
    fn test_key_wait_on_press_quirk() -> Result<(), Chip8Error> {
        let quirks = Quirks {
            key_wait_requires_release: false,
            ..Quirks::default()
        };
        let mut m = machine_with(quirks, &[0xf5, 0x0a]);
        assert_eq!(m.step()?, Step::Blocked);
        m.keypad_mut().set_key(0x3, true);
        assert_eq!(m.step()?, Step::Continue);
        assert_eq!(m.registers().v[5], 0x3);
        assert_eq!(m.registers().pc, 0x202);
        Ok(())
    }

    #[test]
    fn test_unknown_opcodes_are_skipped() -> Result<(), Chip8Error> {
        let mut m = machine(&[0x01, 0x23, 0x80, 0x0f, 0xe0, 0x00, 0xf0, 0xff]);
        for _ in 0..4 {
            assert_eq!(m.step()?, Step::Continue);
        }
        assert_eq!(m.registers().pc, 0x208);
        assert_eq!(m.state(), MachineState::Running);
        Ok(())
    }

    #[test]
    fn test_frame_budget_and_single_timer_tick() -> Result<(), Chip8Error> {
        // 7001 forever: V0 += 1, then jump back
        let mut m = machine(&[0x70, 0x01, 0x12, 0x00]);
        m.timers_mut().delay = 10;
        m.run_frame()?;
        // 600 ips -> 10 instructions -> 5 increments
        assert_eq!(m.registers().v[0], 5);
        assert_eq!(m.timers().delay, 9);
        for _ in 0..20 {
            m.run_frame()?;
        }
        assert_eq!(m.timers().delay, 0);
        Ok(())
    }

    #[test]
    fn test_timer_cadence_independent_of_clock_rate() -> Result<(), Chip8Error> {
        let fast = Config {
            instructions_per_second: 6000,
            ..config(Quirks::default())
        };
        let mut m = Machine::new(fast, &[0x70, 0x01, 0x12, 0x00])?;
        m.timers_mut().delay = 10;
        m.run_frame()?;
        assert_eq!(m.registers().v[0], 50);
        assert_eq!(m.timers().delay, 9);
        Ok(())
    }

    #[test]
    fn test_single_draw_per_frame_quirk() -> Result<(), Chip8Error> {
        // D001 then jump back
        let rom = [0xd0, 0x01, 0x12, 0x00];
        let mut m = machine(&rom);
        m.run_frame()?;
        // 10 instructions: five draws, so the pixel ends up lit
        assert!(m.framebuffer().pixel(0, 0));

        let quirks = Quirks {
            single_draw_per_frame: true,
            ..Quirks::default()
        };
        let mut m = machine_with(quirks, &rom);
        m.run_frame()?;
        assert!(m.framebuffer().pixel(0, 0));
        assert_eq!(m.registers().pc, 0x202);
        m.run_frame()?;
        assert!(!m.framebuffer().pixel(0, 0));
        assert_eq!(m.registers().pc, 0x202);
        Ok(())
    }

    #[test]
    fn test_paused_and_quit_issue_nothing() -> Result<(), Chip8Error> {
        let mut m = machine(&[0x70, 0x01, 0x12, 0x00]);
        m.timers_mut().delay = 5;
        m.set_state(MachineState::Paused);
        m.run_frame()?;
        assert_eq!(m.registers().v[0], 0);
        assert_eq!(m.timers().delay, 5);
        m.set_state(MachineState::Running);
        m.run_frame()?;
        assert_eq!(m.registers().v[0], 5);
        m.set_state(MachineState::Quit);
        m.run_frame()?;
        assert_eq!(m.registers().v[0], 5);
        Ok(())
    }

    #[test]
    fn test_fault_mid_frame_stops_frame() {
        let mut m = machine(&[0x70, 0x01, 0x00, 0xee]);
        m.timers_mut().delay = 5;
        assert!(matches!(m.run_frame(), Err(Chip8Error::StackUnderflow { .. })));
        assert_eq!(m.state(), MachineState::Quit);
        assert_eq!(m.registers().v[0], 1);
        assert_eq!(m.timers().delay, 5);
    }

    #[test]
    fn test_reset_reproduces_initial_state() -> Result<(), Chip8Error> {
        // draw a random-width sprite at a random spot, then loop
        let rom = [0xc0, 0xff, 0xc1, 0xff, 0xa0, 0x00, 0xd0, 0x15, 0x12, 0x08];
        let mut m = machine(&rom);
        m.run_frame()?;
        let registers = m.registers().clone();
        let pixels = m.framebuffer().to_packed();

        m.memory_mut().write(0x200, 0x00);
        m.timers_mut().sound = 9;
        m.set_state(MachineState::Paused);
        m.reset();
        assert_eq!(m.registers(), &Registers::new());
        assert_eq!(m.state(), MachineState::Running);
        assert_eq!(m.timers(), &Timers::new());
        assert_eq!(m.memory().read(0x200), 0xc0);

        m.run_frame()?;
        assert_eq!(m.registers(), &registers);
        assert_eq!(m.framebuffer().to_packed(), pixels);
        Ok(())
    }
}
