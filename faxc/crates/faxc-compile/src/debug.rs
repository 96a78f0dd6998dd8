//! Bytecode disassembler, used by the `print_code` feature and by the VM's
//! own `trace_exec` feature for per-instruction tracing.

use fgc::{Chunk, Obj, OpCode};

/// Disassembles every instruction in `chunk`, one line each, prefixed by a
/// `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = format!("== {name} ==\n");
    let mut offset = 0;
    while offset < chunk.code.len() {
        let (line, next) = disassemble_instruction(chunk, offset);
        out.push_str(&line);
        out.push('\n');
        offset = next;
    }
    out
}

/// Disassembles the single instruction starting at `offset`, returning its
/// text and the offset of the next instruction. Every offset in
/// `[0, chunk.code.len())` that is itself an instruction start is visited
/// exactly once by repeated calls walking `next`.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> (String, usize) {
    let mut out = format!("{offset:04} ");
    if offset > 0 && chunk.lines[offset] == chunk.lines[offset - 1] {
        out.push_str("   | ");
    } else {
        out.push_str(&format!("{:4} ", chunk.lines[offset]));
    }

    let op = OpCode::from_byte(chunk.code[offset]);
    let next = match op {
        OpCode::Constant => constant_instruction("OP_CONSTANT", chunk, offset, &mut out),
        OpCode::Nil => simple_instruction("OP_NIL", offset, &mut out),
        OpCode::True => simple_instruction("OP_TRUE", offset, &mut out),
        OpCode::False => simple_instruction("OP_FALSE", offset, &mut out),
        OpCode::Pop => simple_instruction("OP_POP", offset, &mut out),
        OpCode::GetLocal => byte_instruction("OP_GET_LOCAL", chunk, offset, &mut out),
        OpCode::SetLocal => byte_instruction("OP_SET_LOCAL", chunk, offset, &mut out),
        OpCode::GetGlobal => constant_instruction("OP_GET_GLOBAL", chunk, offset, &mut out),
        OpCode::DefineGlobal => constant_instruction("OP_DEFINE_GLOBAL", chunk, offset, &mut out),
        OpCode::SetGlobal => constant_instruction("OP_SET_GLOBAL", chunk, offset, &mut out),
        OpCode::GetUpvalue => byte_instruction("OP_GET_UPVALUE", chunk, offset, &mut out),
        OpCode::SetUpvalue => byte_instruction("OP_SET_UPVALUE", chunk, offset, &mut out),
        OpCode::GetProperty => constant_instruction("OP_GET_PROPERTY", chunk, offset, &mut out),
        OpCode::SetProperty => constant_instruction("OP_SET_PROPERTY", chunk, offset, &mut out),
        OpCode::GetSuper => constant_instruction("OP_GET_SUPER", chunk, offset, &mut out),
        OpCode::Equal => simple_instruction("OP_EQUAL", offset, &mut out),
        OpCode::Greater => simple_instruction("OP_GREATER", offset, &mut out),
        OpCode::Less => simple_instruction("OP_LESS", offset, &mut out),
        OpCode::Add => simple_instruction("OP_ADD", offset, &mut out),
        OpCode::Subtract => simple_instruction("OP_SUBTRACT", offset, &mut out),
        OpCode::Multiply => simple_instruction("OP_MULTIPLY", offset, &mut out),
        OpCode::Divide => simple_instruction("OP_DIVIDE", offset, &mut out),
        OpCode::Not => simple_instruction("OP_NOT", offset, &mut out),
        OpCode::Negate => simple_instruction("OP_NEGATE", offset, &mut out),
        OpCode::Print => simple_instruction("OP_PRINT", offset, &mut out),
        OpCode::Jump => jump_instruction("OP_JUMP", 1, chunk, offset, &mut out),
        OpCode::JumpIfFalse => jump_instruction("OP_JUMP_IF_FALSE", 1, chunk, offset, &mut out),
        OpCode::Loop => jump_instruction("OP_LOOP", -1, chunk, offset, &mut out),
        OpCode::Call => byte_instruction("OP_CALL", chunk, offset, &mut out),
        OpCode::Invoke => invoke_instruction("OP_INVOKE", chunk, offset, &mut out),
        OpCode::SuperInvoke => invoke_instruction("OP_SUPER_INVOKE", chunk, offset, &mut out),
        OpCode::Closure => closure_instruction(chunk, offset, &mut out),
        OpCode::CloseUpvalue => simple_instruction("OP_CLOSE_UPVALUE", offset, &mut out),
        OpCode::Return => simple_instruction("OP_RETURN", offset, &mut out),
        OpCode::Class => constant_instruction("OP_CLASS", chunk, offset, &mut out),
        OpCode::Inherit => simple_instruction("OP_INHERIT", offset, &mut out),
        OpCode::Method => constant_instruction("OP_METHOD", chunk, offset, &mut out),
    };
    (out, next)
}

fn simple_instruction(name: &str, offset: usize, out: &mut String) -> usize {
    out.push_str(name);
    offset + 1
}

fn byte_instruction(name: &str, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let slot = chunk.code[offset + 1];
    out.push_str(&format!("{name:<16} {slot:4}"));
    offset + 2
}

fn constant_instruction(name: &str, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let idx = chunk.code[offset + 1];
    out.push_str(&format!(
        "{name:<16} {idx:4} '{}'",
        chunk.constants[idx as usize]
    ));
    offset + 2
}

fn jump_instruction(name: &str, sign: i32, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let hi = chunk.code[offset + 1] as u16;
    let lo = chunk.code[offset + 2] as u16;
    let jump = (hi << 8) | lo;
    let target = offset as isize + 3 + sign as isize * jump as isize;
    out.push_str(&format!("{name:<16} {offset:4} -> {target}"));
    offset + 3
}

fn invoke_instruction(name: &str, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let name_idx = chunk.code[offset + 1];
    let argc = chunk.code[offset + 2];
    out.push_str(&format!(
        "{name:<16} ({argc} args) {name_idx:4} '{}'",
        chunk.constants[name_idx as usize]
    ));
    offset + 3
}

fn closure_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let idx = chunk.code[offset + 1];
    out.push_str(&format!(
        "{:<16} {idx:4} '{}'",
        "OP_CLOSURE", chunk.constants[idx as usize]
    ));
    let mut next = offset + 2;

    let upvalue_count = match &chunk.constants[idx as usize] {
        fgc::Value::Obj(obj) if fgc::kind_of(*obj) == fgc::ObjKind::Function => {
            let function = <fgc::ObjFunction as Obj>::as_ref(*obj);
            unsafe { function.as_ref() }.upvalue_count
        }
        _ => 0,
    };
    for _ in 0..upvalue_count {
        let is_local = chunk.code[next];
        let index = chunk.code[next + 1];
        out.push_str(&format!(
            "\n{next:04}      |                     {} {index}",
            if is_local == 1 { "local" } else { "upvalue" }
        ));
        next += 2;
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use fgc::{Chunk, OpCode, Value};

    #[test]
    fn disassembly_covers_every_byte_exactly_once() {
        let mut chunk = Chunk::new();
        let idx = chunk.add_constant(Value::Number(1.5)).unwrap();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write(idx, 1);
        chunk.write_op(OpCode::Negate, 1);
        chunk.write_op(OpCode::Return, 2);

        let mut offset = 0;
        let mut count = 0;
        while offset < chunk.code.len() {
            let (_, next) = disassemble_instruction(&chunk, offset);
            assert!(next > offset);
            offset = next;
            count += 1;
        }
        assert_eq!(offset, chunk.code.len());
        assert_eq!(count, 3);
    }

    #[test]
    fn same_line_as_previous_instruction_prints_a_pipe() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Nil, 4);
        chunk.write_op(OpCode::Return, 4);
        let (first, next) = disassemble_instruction(&chunk, 0);
        assert!(first.contains('4'));
        let (second, _) = disassemble_instruction(&chunk, next);
        assert!(second.contains('|'));
    }
}
