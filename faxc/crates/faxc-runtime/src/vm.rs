//! The dispatch loop: call frames, the call/invoke protocol, upvalue
//! capture/close and runtime error reporting (spec §4.6, §7).

use std::ptr::NonNull;

use faxc_util::RuntimeError;
use fgc::{
    Heap, Obj, ObjBoundMethod, ObjClass, ObjClosure, ObjFunction, ObjInstance, ObjNative,
    ObjString, ObjUpvalue, OpCode, Table, Value,
};

use crate::natives;

/// Call depth limit (spec §4.6 CallFrame array, spec §7 "stack overflow").
const FRAMES_MAX: usize = 64;
/// `FRAMES_MAX` frames of up to 256 locals each (spec §4.4 locals cap) — the
/// value stack is sized once and never grows (spec §1 non-goal: no
/// resizable value stack).
const STACK_MAX: usize = FRAMES_MAX * 256;

struct CallFrame {
    closure: NonNull<ObjClosure>,
    ip: usize,
    slot_base: usize,
}

/// A failed `Vm::interpret` call. The driver maps this to an exit code
/// (spec §6): 65 for `CompileError`, 70 for `Runtime`.
#[derive(Debug)]
pub enum InterpretError {
    CompileError,
    Runtime(RuntimeError),
}

impl From<RuntimeError> for InterpretError {
    fn from(e: RuntimeError) -> Self {
        InterpretError::Runtime(e)
    }
}

pub struct Vm {
    heap: Heap,
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: Table,
    open_upvalues: Vec<NonNull<ObjUpvalue>>,
    init_string: NonNull<ObjString>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let init_string = heap.intern("init");

        let mut vm = Self {
            heap,
            stack: Vec::with_capacity(STACK_MAX),
            frames: Vec::with_capacity(FRAMES_MAX),
            globals: Table::new(),
            open_upvalues: Vec::new(),
            init_string,
        };
        vm.define_native("clock", natives::clock);
        vm
    }

    fn define_native(&mut self, name: &str, function: fgc::NativeFn) {
        let name = self.heap.intern(name);
        let native = self.heap.new_native(function);
        self.globals.set(name, Value::Obj(native.cast()));
    }

    /// The heap this VM allocates into. The driver compiles each program
    /// against this same heap (spec §4.6) before calling [`Vm::interpret`],
    /// so a REPL session shares one intern table and one object graph
    /// across lines.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Runs one already-compiled program (spec §4.6). Globals, the intern
    /// table and every other heap object persist across calls on the same
    /// `Vm` (a REPL reuses one instance, one call per line), but the value
    /// stack and call frames always start empty.
    pub fn interpret(&mut self, function: NonNull<ObjFunction>) -> Result<(), InterpretError> {
        self.stack.clear();
        self.frames.clear();

        let closure = self.heap.new_closure(function, Vec::new());
        self.stack.push(Value::Obj(closure.cast()));
        self.call_closure(closure, 0)?;

        match self.run() {
            Ok(()) => Ok(()),
            Err(err) => {
                self.report_runtime_error(&err);
                self.stack.clear();
                self.frames.clear();
                Err(InterpretError::Runtime(err))
            }
        }
    }

    // ---- stack helpers --------------------------------------------------

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("stack underflow: compiler bug")
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    // ---- garbage collection ---------------------------------------------

    /// Collects now if the heap has grown past its threshold (or the
    /// `stress_gc` feature forces every call), marking every VM root (spec
    /// §4.7 "Roots"). Call sites that build a new object out of values
    /// already popped off the stack must `peek` instead, so the operands
    /// stay root-visible across this call (spec §5 "concatenate").
    fn collect_if_needed(&mut self) {
        if !self.heap.should_collect() {
            return;
        }
        let stack = &self.stack;
        let frames = &self.frames;
        let open_upvalues = &self.open_upvalues;
        let globals = &self.globals;
        let init_string = self.init_string;
        self.heap.collect_garbage(|h| {
            for &value in stack.iter() {
                h.mark_root(value);
            }
            for frame in frames.iter() {
                h.mark_root_obj(frame.closure.cast());
            }
            for &upvalue in open_upvalues.iter() {
                h.mark_root_obj(upvalue.cast());
            }
            h.mark_table(globals);
            h.mark_root_obj(init_string.cast());
        });
    }

    // ---- calls ------------------------------------------------------------

    fn call_value(&mut self, callee: Value, argc: u8) -> Result<(), RuntimeError> {
        if let Value::Obj(obj) = callee {
            match fgc::kind_of(obj) {
                fgc::ObjKind::Closure => {
                    let closure = <ObjClosure as Obj>::as_ref(obj);
                    return self.call_closure(closure, argc);
                }
                fgc::ObjKind::Native => {
                    let native = <ObjNative as Obj>::as_ref(obj);
                    let function = unsafe { native.as_ref() }.function;
                    let base = self.stack.len() - argc as usize;
                    let result = function(&self.stack[base..]);
                    self.stack.truncate(base - 1);
                    self.push(result);
                    return Ok(());
                }
                fgc::ObjKind::Class => {
                    let class = <ObjClass as Obj>::as_ref(obj);
                    self.collect_if_needed();
                    let instance = self.heap.new_instance(class);
                    let slot = self.stack.len() - argc as usize - 1;
                    self.stack[slot] = Value::Obj(instance.cast());

                    let initializer = unsafe { class.as_ref() }.methods.get(self.init_string);
                    if let Some(Value::Obj(init_obj)) = initializer {
                        let init_closure = <ObjClosure as Obj>::as_ref(init_obj);
                        return self.call_closure(init_closure, argc);
                    } else if argc != 0 {
                        return Err(RuntimeError::ArityMismatch {
                            expected: 0,
                            got: argc,
                        });
                    }
                    return Ok(());
                }
                fgc::ObjKind::BoundMethod => {
                    let bound = <ObjBoundMethod as Obj>::as_ref(obj);
                    let (receiver, method) = {
                        let bound_ref = unsafe { bound.as_ref() };
                        (bound_ref.receiver, bound_ref.method)
                    };
                    let slot = self.stack.len() - argc as usize - 1;
                    self.stack[slot] = receiver;
                    return self.call_closure(method, argc);
                }
                _ => {}
            }
        }
        Err(RuntimeError::NotCallable)
    }

    fn call_closure(
        &mut self,
        closure: NonNull<ObjClosure>,
        argc: u8,
    ) -> Result<(), RuntimeError> {
        let function = unsafe { closure.as_ref() }.function;
        let arity = unsafe { function.as_ref() }.arity;
        if argc != arity {
            return Err(RuntimeError::ArityMismatch {
                expected: arity,
                got: argc,
            });
        }
        if self.frames.len() >= FRAMES_MAX {
            return Err(RuntimeError::StackOverflow);
        }
        let slot_base = self.stack.len() - argc as usize - 1;
        self.frames.push(CallFrame {
            closure,
            ip: 0,
            slot_base,
        });
        Ok(())
    }

    fn invoke_from_class(
        &mut self,
        class: NonNull<ObjClass>,
        name: NonNull<ObjString>,
        argc: u8,
    ) -> Result<(), RuntimeError> {
        match unsafe { class.as_ref() }.methods.get(name) {
            Some(Value::Obj(method_obj)) => {
                let method = <ObjClosure as Obj>::as_ref(method_obj);
                self.call_closure(method, argc)
            }
            _ => Err(RuntimeError::UndefinedProperty(name_str(name))),
        }
    }

    fn invoke(&mut self, name: NonNull<ObjString>, argc: u8) -> Result<(), RuntimeError> {
        let receiver = self.peek(argc as usize);
        let instance = receiver
            .as_instance()
            .ok_or(RuntimeError::NotAnInstance)?;
        let (fields_hit, class) = {
            let instance_ref = unsafe { instance.as_ref() };
            (instance_ref.fields.get(name), instance_ref.class)
        };
        if let Some(value) = fields_hit {
            let slot = self.stack.len() - argc as usize - 1;
            self.stack[slot] = value;
            return self.call_value(value, argc);
        }
        self.invoke_from_class(class, name, argc)
    }

    fn bind_method(&mut self, class: NonNull<ObjClass>, name: NonNull<ObjString>) -> Result<(), RuntimeError> {
        let method = match unsafe { class.as_ref() }.methods.get(name) {
            Some(Value::Obj(method_obj)) => <ObjClosure as Obj>::as_ref(method_obj),
            _ => return Err(RuntimeError::UndefinedProperty(name_str(name))),
        };
        let receiver = self.peek(0);
        self.collect_if_needed();
        let bound = self.heap.new_bound_method(receiver, method);
        self.pop();
        self.push(Value::Obj(bound.cast()));
        Ok(())
    }

    // ---- upvalues -----------------------------------------------------

    fn capture_upvalue(&mut self, location: usize) -> NonNull<ObjUpvalue> {
        let mut insert_at = self.open_upvalues.len();
        for (i, &uv) in self.open_upvalues.iter().enumerate() {
            let existing_location = unsafe { uv.as_ref() }.location.get();
            if existing_location == location {
                return uv;
            }
            if existing_location < location {
                insert_at = i;
                break;
            }
        }
        self.collect_if_needed();
        let upvalue = self.heap.new_upvalue(location);
        self.open_upvalues.insert(insert_at, upvalue);
        upvalue
    }

    fn close_upvalues(&mut self, from: usize) {
        while let Some(&uv) = self.open_upvalues.first() {
            let uv_ref = unsafe { uv.as_ref() };
            if uv_ref.location.get() < from {
                break;
            }
            uv_ref.closed.set(self.stack[uv_ref.location.get()]);
            uv_ref.is_open.set(false);
            self.open_upvalues.remove(0);
        }
    }

    fn read_upvalue(&self, uv: NonNull<ObjUpvalue>) -> Value {
        let uv_ref = unsafe { uv.as_ref() };
        if uv_ref.is_open.get() {
            self.stack[uv_ref.location.get()]
        } else {
            uv_ref.closed.get()
        }
    }

    fn write_upvalue(&mut self, uv: NonNull<ObjUpvalue>, value: Value) {
        let uv_ref = unsafe { uv.as_ref() };
        if uv_ref.is_open.get() {
            self.stack[uv_ref.location.get()] = value;
        } else {
            uv_ref.closed.set(value);
        }
    }

    // ---- dispatch loop ----------------------------------------------------

    fn frame(&self) -> &CallFrame {
        self.frames.last().expect("run() always has a frame")
    }

    fn frame_mut(&mut self) -> &mut CallFrame {
        self.frames.last_mut().expect("run() always has a frame")
    }

    fn chunk_byte(&self, ip: usize) -> u8 {
        let function = unsafe { self.frame().closure.as_ref() }.function;
        unsafe { function.as_ref() }.chunk.code[ip]
    }

    fn read_byte(&mut self) -> u8 {
        let ip = self.frame().ip;
        self.frame_mut().ip += 1;
        self.chunk_byte(ip)
    }

    fn read_short(&mut self) -> u16 {
        let hi = self.read_byte() as u16;
        let lo = self.read_byte() as u16;
        (hi << 8) | lo
    }

    fn read_constant(&mut self) -> Value {
        let idx = self.read_byte();
        let function = unsafe { self.frame().closure.as_ref() }.function;
        unsafe { function.as_ref() }.chunk.constants[idx as usize]
    }

    fn read_string(&mut self) -> NonNull<ObjString> {
        self.read_constant()
            .as_string()
            .expect("compiler only emits READ_STRING over string constants")
    }

    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            #[cfg(feature = "trace_exec")]
            self.trace_step();

            let op = OpCode::from_byte(self.read_byte());
            match op {
                OpCode::Constant => {
                    let value = self.read_constant();
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let value = self.stack[self.frame().slot_base + slot];
                    self.push(value);
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let value = self.peek(0);
                    let base = self.frame().slot_base;
                    self.stack[base + slot] = value;
                }
                OpCode::GetGlobal => {
                    let name = self.read_string();
                    match self.globals.get(name) {
                        Some(value) => self.push(value),
                        None => return Err(RuntimeError::UndefinedVariable(name_str(name))),
                    }
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string();
                    let value = self.peek(0);
                    self.globals.set(name, value);
                    self.pop();
                }
                OpCode::SetGlobal => {
                    let name = self.read_string();
                    let value = self.peek(0);
                    if self.globals.set(name, value) {
                        self.globals.delete(name);
                        return Err(RuntimeError::UndefinedVariable(name_str(name)));
                    }
                }
                OpCode::GetUpvalue => {
                    let slot = self.read_byte() as usize;
                    let closure = self.frame().closure;
                    let uv = unsafe { closure.as_ref() }.upvalues[slot];
                    self.push(self.read_upvalue(uv));
                }
                OpCode::SetUpvalue => {
                    let slot = self.read_byte() as usize;
                    let closure = self.frame().closure;
                    let uv = unsafe { closure.as_ref() }.upvalues[slot];
                    let value = self.peek(0);
                    self.write_upvalue(uv, value);
                }
                OpCode::GetProperty => {
                    let receiver = self.peek(0);
                    let instance = receiver.as_instance().ok_or(RuntimeError::NotAnInstance)?;
                    let name = self.read_string();
                    let (field, class) = {
                        let instance_ref = unsafe { instance.as_ref() };
                        (instance_ref.fields.get(name), instance_ref.class)
                    };
                    if let Some(value) = field {
                        self.pop();
                        self.push(value);
                    } else {
                        self.bind_method(class, name)?;
                    }
                }
                OpCode::SetProperty => {
                    let receiver = self.peek(1);
                    let mut instance = receiver.as_instance().ok_or(RuntimeError::NotAnInstance)?;
                    let name = self.read_string();
                    let value = self.peek(0);
                    unsafe { instance.as_mut() }.fields.set(name, value);
                    let value = self.pop();
                    self.pop();
                    self.push(value);
                }
                OpCode::GetSuper => {
                    let name = self.read_string();
                    let superclass = self.pop().as_class().expect("compiler always pushes a class before OP_GET_SUPER");
                    self.bind_method(superclass, name)?;
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b));
                }
                OpCode::Greater => self.numeric_compare(|a, b| a > b)?,
                OpCode::Less => self.numeric_compare(|a, b| a < b)?,
                OpCode::Add => self.add()?,
                OpCode::Subtract => self.numeric_binary(|a, b| a - b)?,
                OpCode::Multiply => self.numeric_binary(|a, b| a * b)?,
                OpCode::Divide => self.numeric_binary(|a, b| a / b)?,
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsey()));
                }
                OpCode::Negate => {
                    let value = self.peek(0);
                    match value {
                        Value::Number(n) => {
                            self.pop();
                            self.push(Value::Number(-n));
                        }
                        _ => return Err(RuntimeError::OperandMustBeNumber),
                    }
                }
                OpCode::Print => {
                    let value = self.pop();
                    println!("{value}");
                }
                OpCode::Jump => {
                    let offset = self.read_short();
                    self.frame_mut().ip += offset as usize;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_short();
                    if self.peek(0).is_falsey() {
                        self.frame_mut().ip += offset as usize;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_short();
                    self.frame_mut().ip -= offset as usize;
                }
                OpCode::Call => {
                    let argc = self.read_byte();
                    let callee = self.peek(argc as usize);
                    self.call_value(callee, argc)?;
                }
                OpCode::Invoke => {
                    let name = self.read_string();
                    let argc = self.read_byte();
                    self.invoke(name, argc)?;
                }
                OpCode::SuperInvoke => {
                    let name = self.read_string();
                    let argc = self.read_byte();
                    let superclass = self.pop().as_class().expect("compiler always pushes a class before OP_SUPER_INVOKE");
                    self.invoke_from_class(superclass, name, argc)?;
                }
                OpCode::Closure => {
                    let function = self
                        .read_constant()
                        .as_function()
                        .expect("OP_CLOSURE constant is always a function");
                    let upvalue_count = unsafe { function.as_ref() }.upvalue_count;
                    let mut upvalues = Vec::with_capacity(upvalue_count as usize);
                    for _ in 0..upvalue_count {
                        let is_local = self.read_byte() == 1;
                        let index = self.read_byte() as usize;
                        if is_local {
                            let location = self.frame().slot_base + index;
                            upvalues.push(self.capture_upvalue(location));
                        } else {
                            let enclosing = self.frame().closure;
                            upvalues.push(unsafe { enclosing.as_ref() }.upvalues[index]);
                        }
                    }
                    self.collect_if_needed();
                    let closure = self.heap.new_closure(function, upvalues);
                    self.push(Value::Obj(closure.cast()));
                }
                OpCode::CloseUpvalue => {
                    self.close_upvalues(self.stack.len() - 1);
                    self.pop();
                }
                OpCode::Return => {
                    let result = self.pop();
                    let slot_base = self.frame().slot_base;
                    self.close_upvalues(slot_base);
                    self.frames.pop();
                    if self.frames.is_empty() {
                        self.pop();
                        return Ok(());
                    }
                    self.stack.truncate(slot_base);
                    self.push(result);
                }
                OpCode::Class => {
                    let name = self.read_string();
                    self.collect_if_needed();
                    let class = self.heap.new_class(name);
                    self.push(Value::Obj(class.cast()));
                }
                OpCode::Inherit => {
                    let superclass_val = self.peek(1);
                    let superclass = superclass_val
                        .as_class()
                        .ok_or(RuntimeError::SuperclassMustBeAClass)?;
                    let mut subclass = self
                        .peek(0)
                        .as_class()
                        .expect("compiler always pushes a class before OP_INHERIT");
                    let entries = unsafe { superclass.as_ref() }.methods.live_entries();
                    for (key, value) in entries {
                        unsafe { subclass.as_mut() }.methods.set(key, value);
                    }
                    self.pop();
                }
                OpCode::Method => {
                    let name = self.read_string();
                    let method = self.peek(0);
                    let mut class = self
                        .peek(1)
                        .as_class()
                        .expect("compiler always pushes a class before OP_METHOD");
                    unsafe { class.as_mut() }.methods.set(name, method);
                    self.pop();
                }
            }
        }
    }

    fn add(&mut self) -> Result<(), RuntimeError> {
        let b = self.peek(0);
        let a = self.peek(1);
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                self.pop();
                self.pop();
                self.push(Value::Number(x + y));
                Ok(())
            }
            _ => {
                let (a_str, b_str) = match (a.as_string(), b.as_string()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(RuntimeError::OperandsMustBeNumbersOrStrings),
                };
                let mut concatenated =
                    String::with_capacity(unsafe { a_str.as_ref() }.chars.len() + unsafe {
                        b_str.as_ref()
                    }
                    .chars
                    .len());
                concatenated.push_str(&unsafe { a_str.as_ref() }.chars);
                concatenated.push_str(&unsafe { b_str.as_ref() }.chars);
                self.collect_if_needed();
                let interned = self.heap.intern(&concatenated);
                self.pop();
                self.pop();
                self.push(Value::Obj(interned.cast()));
                Ok(())
            }
        }
    }

    fn numeric_binary(&mut self, op: impl Fn(f64, f64) -> f64) -> Result<(), RuntimeError> {
        let (a, b) = self.numeric_operands()?;
        self.push(Value::Number(op(a, b)));
        Ok(())
    }

    fn numeric_compare(&mut self, op: impl Fn(f64, f64) -> bool) -> Result<(), RuntimeError> {
        let (a, b) = self.numeric_operands()?;
        self.push(Value::Bool(op(a, b)));
        Ok(())
    }

    fn numeric_operands(&mut self) -> Result<(f64, f64), RuntimeError> {
        match (self.peek(1), self.peek(0)) {
            (Value::Number(a), Value::Number(b)) => {
                self.pop();
                self.pop();
                Ok((a, b))
            }
            _ => Err(RuntimeError::OperandsMustBeNumbers),
        }
    }

    fn report_runtime_error(&self, err: &RuntimeError) {
        eprintln!("{err}");
        for frame in self.frames.iter().rev() {
            let function = unsafe { frame.closure.as_ref() }.function;
            let function_ref = unsafe { function.as_ref() };
            let line = function_ref.chunk.lines[frame.ip.saturating_sub(1)];
            match function_ref.name {
                Some(name) => eprintln!("[line {line}] in {}()", unsafe { &name.as_ref().chars }),
                None => eprintln!("[line {line}] in script"),
            }
        }
    }

    #[cfg(feature = "trace_exec")]
    fn trace_step(&self) {
        let stack: Vec<String> = self.stack.iter().map(|v| format!("[ {v} ]")).collect();
        log::trace!("{}", stack.concat());
        let function = unsafe { self.frame().closure.as_ref() }.function;
        let (line, _) =
            faxc_compile::disassemble_instruction(unsafe { &function.as_ref().chunk }, self.frame().ip);
        log::trace!("{line}");
    }
}

fn name_str(name: NonNull<ObjString>) -> String {
    unsafe { name.as_ref() }.chars.to_string()
}
