//! Per-opcode handlers (§4.5/§6). Each handler reads its operands through
//! `Interpreter::pull`/`Interpreter::move_to`, so a single definition of
//! "what is readable/writable" governs every opcode instead of each handler
//! re-deciding it.

use log::{debug, trace};

use super::error::RuntimeError;
use super::Interpreter;
use crate::host::HostIo;
use crate::operand::Operand;
use crate::word;

fn binary_int<H: HostIo>(vm: &mut Interpreter<H>, lhs: Operand, rhs: Operand, op: impl Fn(i32, i32) -> i32) -> Result<(), RuntimeError> {
    let a = word::as_i32(vm.pull(lhs)?);
    let b = word::as_i32(vm.pull(rhs)?);
    vm.move_to(lhs, word::from_i32(op(a, b)))
}

fn binary_float<H: HostIo>(vm: &mut Interpreter<H>, lhs: Operand, rhs: Operand, op: impl Fn(f32, f32) -> f32) -> Result<(), RuntimeError> {
    let a = word::as_f32(vm.pull(lhs)?);
    let b = word::as_f32(vm.pull(rhs)?);
    vm.move_to(lhs, word::from_f32(op(a, b)))
}

fn unary_float<H: HostIo>(vm: &mut Interpreter<H>, lhs: Operand, op: impl Fn(f32) -> f32) -> Result<(), RuntimeError> {
    let a = word::as_f32(vm.pull(lhs)?);
    vm.move_to(lhs, word::from_f32(op(a)))
}

pub fn dispatch<H: HostIo>(vm: &mut Interpreter<H>, mnemonic: &str, lhs: Operand, rhs: Operand) -> Result<(), RuntimeError> {
    trace!("ip: executing '{mnemonic}' lhs={lhs:?} rhs={rhs:?}");
    match mnemonic {
        "hlt" => vm.halt(),
        "in" => vm.interaction_in(),
        "out" => vm.interaction_out(),
        "ok" => Ok(()),
        "dump" => {
            debug!(
                "ip: dump — registers={:?} operand_stack_depth={} call_stack_depth={} ip={} pc={}",
                vm.registers_snapshot(),
                vm.operand_stack_depth(),
                vm.call_stack_depth(),
                vm.registers_snapshot().ip(),
                vm.registers_snapshot().pc(),
            );
            Ok(())
        }

        "push" => vm.stack_push(lhs),
        "pop" => vm.stack_pop(lhs),
        "dup" => vm.stack_dup(),

        "mov" => {
            let v = vm.pull(rhs)?;
            vm.move_to(lhs, v)
        }

        "call" => vm.call(lhs),
        "ret" => vm.ret(),
        "loop" => vm.do_loop(lhs),
        "jmp" => vm.jump(lhs),
        "jz" | "je" => vm.jump_if(lhs, vm.registers_zero_flag()),
        "jnz" | "jne" => vm.jump_if(lhs, !vm.registers_zero_flag()),
        "jg" => vm.jump_if(lhs, !vm.registers_carry_flag() && !vm.registers_zero_flag()),
        "jge" => vm.jump_if(lhs, !vm.registers_carry_flag() || vm.registers_zero_flag()),
        "jl" => vm.jump_if(lhs, vm.registers_carry_flag() && !vm.registers_zero_flag()),
        "jle" => vm.jump_if(lhs, vm.registers_carry_flag() || vm.registers_zero_flag()),

        "add" => binary_int(vm, lhs, rhs, |a, b| a.wrapping_add(b)),
        "sub" => binary_int(vm, lhs, rhs, |a, b| a.wrapping_sub(b)),
        "mul" => binary_int(vm, lhs, rhs, |a, b| a.wrapping_mul(b)),
        "div" => {
            let divisor = word::as_i32(vm.pull(rhs)?);
            if divisor == 0 {
                return Err(RuntimeError::DivisionByZero(vm.pc_index()));
            }
            let dividend = word::as_i32(vm.pull(lhs)?);
            vm.move_to(lhs, word::from_i32(dividend.wrapping_div(divisor)))
        }
        "mod" => {
            let divisor = word::as_i32(vm.pull(rhs)?);
            if divisor == 0 {
                return Err(RuntimeError::DivisionByZero(vm.pc_index()));
            }
            let dividend = word::as_i32(vm.pull(lhs)?);
            vm.move_to(lhs, word::from_i32(dividend.wrapping_rem(divisor)))
        }
        "inc" => {
            let a = word::as_i32(vm.pull(lhs)?);
            vm.move_to(lhs, word::from_i32(a.wrapping_add(1)))
        }
        "dec" => {
            let a = word::as_i32(vm.pull(lhs)?);
            vm.move_to(lhs, word::from_i32(a.wrapping_sub(1)))
        }
        "and" => {
            let a = vm.pull(lhs)?;
            let b = vm.pull(rhs)?;
            vm.move_to(lhs, a & b)
        }
        "or" => {
            let a = vm.pull(lhs)?;
            let b = vm.pull(rhs)?;
            vm.move_to(lhs, a | b)
        }
        "xor" => {
            let a = vm.pull(lhs)?;
            let b = vm.pull(rhs)?;
            vm.move_to(lhs, a ^ b)
        }
        "inv" => {
            let a = vm.pull(lhs)?;
            vm.move_to(lhs, !a)
        }
        "cmp" => {
            let a = vm.pull(lhs)?;
            let b = vm.pull(rhs)?;
            vm.set_zero_flag(a == b);
            vm.set_carry_flag(a < b);
            Ok(())
        }

        "fadd" => binary_float(vm, lhs, rhs, |a, b| a + b),
        "fsub" => binary_float(vm, lhs, rhs, |a, b| a - b),
        "fmul" => binary_float(vm, lhs, rhs, |a, b| a * b),
        "fdiv" => binary_float(vm, lhs, rhs, |a, b| a / b),
        "ftoi" => {
            let a = word::as_f32(vm.pull(lhs)?);
            vm.move_to(lhs, word::from_i32(a as i32))
        }
        "itof" => {
            let a = word::as_i32(vm.pull(lhs)?);
            vm.move_to(lhs, word::from_f32(a as f32))
        }
        "fsin" => unary_float(vm, lhs, f32::sin),
        "fcos" => unary_float(vm, lhs, f32::cos),
        "fsqrt" => unary_float(vm, lhs, f32::sqrt),
        "fcmp" => {
            let a = word::as_f32(vm.pull(lhs)?);
            let b = word::as_f32(vm.pull(rhs)?);
            if a.is_nan() || b.is_nan() {
                vm.set_zero_flag(false);
                vm.set_carry_flag(true);
            } else {
                vm.set_zero_flag(a == b);
                vm.set_carry_flag(a < b);
            }
            Ok(())
        }

        other => unreachable!("encoding registry admitted unknown mnemonic '{other}'"),
    }
}
