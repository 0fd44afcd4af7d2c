//! The Interpreter (IP): fetch-decode-execute loop over an assembled image,
//! dispatching to per-opcode handlers and resolving operands across
//! registers, immediates and memory (§4.5).

pub mod decode;
pub mod error;
pub mod handlers;
pub mod registers;

pub use error::{LoadError, RuntimeError};
pub use registers::RegisterFile;

use log::debug;

use crate::encoding;
use crate::host::HostIo;
use crate::memory::{MemoryController, PageCache, DEFAULT_CAPACITY};
use crate::operand::Operand;
use crate::word::Word;

/// Tunable resource limits a run is constructed with (§3's "capacity fixed
/// at build").
#[derive(Debug, Clone, Copy)]
pub struct InterpreterConfig {
    pub ram_words: usize,
    pub cache_capacity: usize,
    pub stack_capacity: usize,
    pub call_stack_capacity: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            ram_words: 4096,
            cache_capacity: DEFAULT_CAPACITY,
            stack_capacity: 256,
            call_stack_capacity: 256,
        }
    }
}

pub struct Interpreter<H: HostIo> {
    registers: RegisterFile,
    operand_stack: Vec<Word>,
    stack_capacity: usize,
    call_stack: Vec<usize>,
    call_stack_capacity: usize,
    pipe: Vec<usize>,
    image: Vec<u8>,
    mc: MemoryController,
    pc_cache: PageCache,
    host: H,
}

impl<H: HostIo> Interpreter<H> {
    /// Load phase (§4.5): walk the image once, building the instruction
    /// pipe. Fails on any structural error before a single instruction runs.
    pub fn load(image: Vec<u8>, host: H, config: InterpreterConfig) -> Result<Self, LoadError> {
        let pipe = decode::build_pipe(&image)?;
        debug!("ip: loaded image, {} instruction(s) in the pipe", pipe.len());
        Ok(Self {
            registers: RegisterFile::new(),
            operand_stack: Vec::new(),
            stack_capacity: config.stack_capacity,
            call_stack: Vec::new(),
            call_stack_capacity: config.call_stack_capacity,
            pipe,
            image,
            mc: MemoryController::new(config.ram_words),
            pc_cache: PageCache::new(config.cache_capacity),
            host,
        })
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Execute phase (§4.5): fetch, advance `IP` unconditionally, then
    /// dispatch. Control-transfer handlers overwrite `IP` themselves.
    pub fn execute(&mut self) -> Result<(), RuntimeError> {
        loop {
            let ip = self.registers.ip() as usize;
            if ip >= self.pipe.len() {
                break;
            }
            self.registers.set_pc(ip as Word);
            let offset = self.pipe[ip];
            let (instr, _) =
                decode::decode_at(&self.image, offset).expect("pipe offsets were validated at load time");
            self.registers.set_ip((ip + 1) as Word);

            let info = encoding::lookup_opcode(instr.opcode).expect("load phase rejects unknown opcodes");
            handlers::dispatch(self, info.mnemonic, instr.lhs, instr.rhs)?;
        }
        Ok(())
    }

    pub(crate) fn pc_index(&self) -> usize {
        self.registers.pc() as usize
    }

    pub(crate) fn registers_snapshot(&self) -> &RegisterFile {
        &self.registers
    }

    pub(crate) fn operand_stack_depth(&self) -> usize {
        self.operand_stack.len()
    }

    pub(crate) fn call_stack_depth(&self) -> usize {
        self.call_stack.len()
    }

    pub(crate) fn registers_zero_flag(&self) -> bool {
        self.registers.zero_flag()
    }

    pub(crate) fn registers_carry_flag(&self) -> bool {
        self.registers.carry_flag()
    }

    pub(crate) fn set_zero_flag(&mut self, value: bool) {
        self.registers.set_zero_flag(value);
    }

    pub(crate) fn set_carry_flag(&mut self, value: bool) {
        self.registers.set_carry_flag(value);
    }

    fn reg(&self, index: u8) -> Result<Word, RuntimeError> {
        self.registers.get(index).ok_or(RuntimeError::RegisterOutOfRange(index))
    }

    fn effective_addr(&self, operand: Operand) -> Result<u32, RuntimeError> {
        match operand {
            Operand::MemImm(addr) => Ok(addr),
            Operand::MemReg(r) => self.reg(r),
            Operand::MemRegImm(r, imm) => Ok(self.reg(r)?.wrapping_add(imm as u32)),
            Operand::MemRegReg(r1, r2) => Ok(self.reg(r1)?.wrapping_add(self.reg(r2)?)),
            _ => unreachable!("effective_addr called on a non-memory operand"),
        }
    }

    fn check_ram_bounds(&self, addr: u32) -> Result<(), RuntimeError> {
        if addr as usize + 4 > self.mc.size_bytes() {
            return Err(RuntimeError::RamOutOfRange(addr));
        }
        Ok(())
    }

    fn ram_read(&mut self, addr: u32) -> Result<Word, RuntimeError> {
        self.check_ram_bounds(addr)?;
        let mut out = 0;
        if !self.pc_cache.try_read(addr, &mut out) {
            self.pc_cache.add_entry(addr, &mut self.mc)?;
            self.pc_cache.fetch_entry(addr, &self.mc)?;
            self.pc_cache.try_read(addr, &mut out);
        }
        Ok(out)
    }

    fn ram_write(&mut self, addr: u32, value: Word) -> Result<(), RuntimeError> {
        self.check_ram_bounds(addr)?;
        if !self.pc_cache.try_write(addr, value) {
            self.pc_cache.add_entry(addr, &mut self.mc)?;
            self.pc_cache.fetch_entry(addr, &self.mc)?;
            self.pc_cache.try_write(addr, value);
        }
        Ok(())
    }

    /// `pull(arg)`: the read-side operand resolution primitive (§4.5).
    pub(crate) fn pull(&mut self, operand: Operand) -> Result<Word, RuntimeError> {
        match operand {
            Operand::Imm(v) => Ok(crate::word::from_i32(v)),
            Operand::Flt(v) => Ok(crate::word::from_f32(v)),
            Operand::Reg(r) => self.reg(r),
            Operand::MemImm(_) | Operand::MemReg(_) | Operand::MemRegImm(..) | Operand::MemRegReg(..) => {
                let addr = self.effective_addr(operand)?;
                Ok(self.ram_read(addr)?)
            }
            Operand::Nul | Operand::Lbl(_) => Err(RuntimeError::NotReadable),
        }
    }

    /// `move(arg, word)`: the write-side operand resolution primitive (§4.5).
    pub(crate) fn move_to(&mut self, operand: Operand, value: Word) -> Result<(), RuntimeError> {
        match operand {
            Operand::Reg(r) => {
                if self.registers.set(r, value) {
                    Ok(())
                } else {
                    Err(RuntimeError::RegisterOutOfRange(r))
                }
            }
            Operand::MemImm(_) | Operand::MemReg(_) | Operand::MemRegImm(..) | Operand::MemRegReg(..) => {
                let addr = self.effective_addr(operand)?;
                Ok(self.ram_write(addr, value)?)
            }
            Operand::Imm(_) | Operand::Flt(_) | Operand::Lbl(_) | Operand::Nul => Err(RuntimeError::NotWritable),
        }
    }

    pub(crate) fn jump(&mut self, operand: Operand) -> Result<(), RuntimeError> {
        let target: i64 = match operand {
            Operand::Imm(v) => self.registers.pc() as i64 + v as i64,
            Operand::Lbl(disp) => self.registers.pc() as i64 + disp as i64,
            Operand::Reg(_) | Operand::MemImm(_) | Operand::MemReg(_) | Operand::MemRegImm(..) | Operand::MemRegReg(..) => {
                self.pull(operand)? as i64
            }
            Operand::Nul | Operand::Flt(_) => return Err(RuntimeError::NotReadable),
        };
        self.set_ip_checked(target)
    }

    pub(crate) fn jump_if(&mut self, operand: Operand, taken: bool) -> Result<(), RuntimeError> {
        if taken {
            self.jump(operand)
        } else {
            Ok(())
        }
    }

    pub(crate) fn call(&mut self, operand: Operand) -> Result<(), RuntimeError> {
        if self.call_stack.len() >= self.call_stack_capacity {
            return Err(RuntimeError::CallStackOverflow);
        }
        self.call_stack.push(self.registers.pc() as usize + 1);
        self.jump(operand)
    }

    pub(crate) fn ret(&mut self) -> Result<(), RuntimeError> {
        let target = self.call_stack.pop().ok_or(RuntimeError::CallStackUnderflow)?;
        self.set_ip_checked(target as i64)
    }

    /// `loop(arg)`: `IP := arg.signed_value`, absolute within the pipe —
    /// distinct from `jmp`'s pc-relative displacement (§4.5's note: the
    /// source admits only a bare label operand here).
    pub(crate) fn do_loop(&mut self, operand: Operand) -> Result<(), RuntimeError> {
        let target = match operand {
            Operand::Lbl(disp) => disp as i64,
            _ => unreachable!("the encoder restricts 'loop' to a label operand"),
        };
        self.set_ip_checked(target)
    }

    fn set_ip_checked(&mut self, target: i64) -> Result<(), RuntimeError> {
        if target < 0 || target as usize >= self.pipe.len() {
            return Err(RuntimeError::JumpOutOfRange {
                index: target,
                len: self.pipe.len(),
            });
        }
        self.registers.set_ip(target as Word);
        Ok(())
    }

    pub(crate) fn stack_push(&mut self, src: Operand) -> Result<(), RuntimeError> {
        let value = self.pull(src)?;
        if self.operand_stack.len() >= self.stack_capacity {
            return Err(RuntimeError::StackOverflow);
        }
        self.operand_stack.push(value);
        Ok(())
    }

    pub(crate) fn stack_pop(&mut self, dst: Operand) -> Result<(), RuntimeError> {
        let value = self.operand_stack.pop().ok_or(RuntimeError::StackUnderflow)?;
        self.move_to(dst, value)
    }

    pub(crate) fn stack_dup(&mut self) -> Result<(), RuntimeError> {
        let value = *self.operand_stack.last().ok_or(RuntimeError::StackUnderflow)?;
        if self.operand_stack.len() >= self.stack_capacity {
            return Err(RuntimeError::StackOverflow);
        }
        self.operand_stack.push(value);
        Ok(())
    }

    pub(crate) fn halt(&mut self) -> Result<(), RuntimeError> {
        self.registers.set_ip(self.pipe.len() as Word);
        Ok(())
    }

    pub(crate) fn interaction_in(&mut self) -> Result<(), RuntimeError> {
        let value = self.host.read_word()?;
        if self.operand_stack.len() >= self.stack_capacity {
            return Err(RuntimeError::StackOverflow);
        }
        self.operand_stack.push(value);
        Ok(())
    }

    pub(crate) fn interaction_out(&mut self) -> Result<(), RuntimeError> {
        let value = self.operand_stack.pop().ok_or(RuntimeError::StackUnderflow)?;
        self.host.write_word(value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::host::ScriptedHost;

    fn run(src: &str, host: ScriptedHost) -> Result<Interpreter<ScriptedHost>, RuntimeError> {
        let image = assemble(src).unwrap();
        let mut vm = Interpreter::load(image, host, InterpreterConfig::default()).unwrap();
        vm.execute()?;
        Ok(vm)
    }

    #[test]
    fn arithmetic_round_trip() {
        let src = "mov ax, 3\nmov bx, 4\nadd ax, bx\npush ax\nout\nhlt\n";
        let vm = run(src, ScriptedHost::new([])).unwrap();
        assert_eq!(vm.host().outputs, vec![7]);
    }

    #[test]
    fn division_by_zero_is_a_runtime_error_at_the_div_instruction() {
        let src = "mov ax, 1\nmov bx, 0\ndiv ax, bx\n";
        let err = run(src, ScriptedHost::new([])).unwrap_err();
        assert_eq!(err, RuntimeError::DivisionByZero(2));
    }

    #[test]
    fn recursive_fib_of_six_is_eight() {
        // fib(n): ax holds n on entry, fib(n) on return. Anything that must
        // survive a recursive `call` is kept on the operand stack rather
        // than in a register, since registers are not callee-saved.
        let src = r#"
            mov ax, 6
            call fib
            push ax
            out
            hlt
        fib:
            cmp ax, 1
            jg recurse
            ret
        recurse:
            mov bx, ax
            dec bx
            push bx
            dec bx
            push bx
            pop ax
            call fib
            pop bx
            push ax
            mov ax, bx
            call fib
            pop bx
            add ax, bx
            ret
        "#;
        let vm = run(src, ScriptedHost::new([])).unwrap();
        assert_eq!(vm.registers().get(0), Some(8));
        assert_eq!(vm.host().outputs, vec![8]);
    }

    #[test]
    fn dump_and_ok_never_alter_machine_state() {
        let src = "mov ax, 5\ndump\nok\npush ax\nout\nhlt\n";
        let vm = run(src, ScriptedHost::new([])).unwrap();
        assert_eq!(vm.registers().get(0), Some(5));
        assert_eq!(vm.host().outputs, vec![5]);
    }

    #[test]
    fn ram_access_past_the_configured_size_is_out_of_range() {
        let src = "mov ax, 1\nmov [100000], ax\n";
        let image = assemble(src).unwrap();
        let config = InterpreterConfig {
            ram_words: 16,
            ..InterpreterConfig::default()
        };
        let mut vm = Interpreter::load(image, ScriptedHost::new([]), config).unwrap();
        let err = vm.execute().unwrap_err();
        assert_eq!(err, RuntimeError::RamOutOfRange(100000));
    }

    #[test]
    fn stack_underflow_on_bare_pop() {
        let err = run("pop ax\n", ScriptedHost::new([])).unwrap_err();
        assert_eq!(err, RuntimeError::StackUnderflow);
    }

    #[test]
    fn jmp_skips_the_intervening_instruction() {
        let src = "jmp skip\nmov ax, 99\nskip:\nmov ax, 1\nhlt\n";
        let image = assemble(src).unwrap();
        let mut vm = Interpreter::load(image, ScriptedHost::new([]), InterpreterConfig::default()).unwrap();
        vm.execute().unwrap();
        assert_eq!(vm.registers().get(0), Some(1));
    }

    #[test]
    fn conditional_jump_truth_table_jg() {
        let src = "mov ax, 5\nmov bx, 3\ncmp ax, bx\njg taken\nmov cx, 0\nhlt\ntaken:\nmov cx, 1\nhlt\n";
        let image = assemble(src).unwrap();
        let mut vm = Interpreter::load(image, ScriptedHost::new([]), InterpreterConfig::default()).unwrap();
        vm.execute().unwrap();
        assert_eq!(vm.registers().get(2), Some(1));
    }
}
