//! The heap: allocation, string interning and tri-color mark-sweep
//! collection (spec §4.2 "Heap / GC").
//!
//! Every `Obj*` allocation is `Box::leak`'d and threaded onto an intrusive
//! singly-linked list via `GcHeader::next`; the heap is the only owner of
//! that list and the only thing that ever frees a node (in `sweep`).
//!
//! Collection is a classic three-color scheme without a background thread:
//! a `gray` worklist holds objects that are reachable but not yet scanned;
//! `collect_garbage` drains it (`trace_references` / "blacken") until it's
//! empty, interned strings that were never reached are dropped from the
//! intern table (`Table::remove_white`) so they don't resurrect during
//! `sweep`, and finally every unmarked node is unlinked and freed.

use std::ptr::NonNull;

use crate::chunk::Chunk;
use crate::object::{
    fnv1a, GcHeader, NativeFn, Obj, ObjBoundMethod, ObjClass, ObjClosure, ObjFunction,
    ObjInstance, ObjKind, ObjNative, ObjString, ObjUpvalue,
};
use crate::table::Table;
use crate::value::Value;

const INITIAL_NEXT_GC: usize = 1024 * 1024;
const HEAP_GROW_FACTOR: usize = 2;

/// Heap-allocated state shared by the compiler and the VM: every object
/// that has ever been allocated, the string intern table, and the GC's
/// bookkeeping. There is exactly one per running program.
pub struct Heap {
    objects: Option<NonNull<GcHeader>>,
    pub strings: Table,
    bytes_allocated: usize,
    next_gc: usize,
    gray_stack: Vec<NonNull<GcHeader>>,
    /// Extra roots pushed by the compiler while it still holds an
    /// in-progress `ObjFunction` that isn't reachable from any chunk yet
    /// (spec §9 design note: "thread the compiler's in-progress functions
    /// onto the heap as roots instead of a parallel compiler-stack scan").
    extra_roots: Vec<Value>,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Self {
            objects: None,
            strings: Table::new(),
            bytes_allocated: 0,
            next_gc: INITIAL_NEXT_GC,
            gray_stack: Vec::new(),
            extra_roots: Vec::new(),
        }
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    /// True once `bytes_allocated` has grown past the collection
    /// threshold, or always true under the `stress_gc` feature (spec §6).
    pub fn should_collect(&self) -> bool {
        cfg!(feature = "stress_gc") || self.bytes_allocated > self.next_gc
    }

    pub fn push_root(&mut self, value: Value) {
        self.extra_roots.push(value);
    }

    pub fn pop_root(&mut self) {
        self.extra_roots.pop();
    }

    fn link<T: Obj>(&mut self, boxed: Box<T>) -> NonNull<T> {
        self.bytes_allocated += std::mem::size_of::<T>();
        let ptr = NonNull::from(Box::leak(boxed));
        let header_ptr: NonNull<GcHeader> = ptr.cast();
        unsafe { header_ptr.as_ref() }.next.set(self.objects);
        self.objects = Some(header_ptr);
        #[cfg(feature = "log_gc")]
        log::trace!(
            "alloc {:p} size {} kind {:?}",
            ptr,
            std::mem::size_of::<T>(),
            unsafe { header_ptr.as_ref() }.kind
        );
        ptr
    }

    /// Interns `chars`, returning the existing `ObjString` if content
    /// already exists in the string table (spec §4.2 "strings are
    /// interned").
    pub fn intern(&mut self, chars: &str) -> NonNull<ObjString> {
        let hash = fnv1a(chars.as_bytes());
        if let Some(existing) = self.strings.find_string(chars, hash) {
            return existing;
        }
        let obj = self.link(Box::new(ObjString {
            header: GcHeader::new(ObjKind::String),
            hash,
            chars: chars.into(),
        }));
        // `link`'s `size_of::<ObjString>()` only counts the `Box<str>` fat
        // pointer, not the string bytes it points at.
        self.bytes_allocated += chars.len();
        self.strings.set(obj, Value::Nil);
        obj
    }

    pub fn new_function(&mut self) -> NonNull<ObjFunction> {
        self.link(Box::new(ObjFunction {
            header: GcHeader::new(ObjKind::Function),
            arity: 0,
            upvalue_count: 0,
            chunk: Chunk::new(),
            name: None,
        }))
    }

    pub fn new_native(&mut self, function: NativeFn) -> NonNull<ObjNative> {
        self.link(Box::new(ObjNative {
            header: GcHeader::new(ObjKind::Native),
            function,
        }))
    }

    pub fn new_closure(
        &mut self,
        function: NonNull<ObjFunction>,
        upvalues: Vec<NonNull<ObjUpvalue>>,
    ) -> NonNull<ObjClosure> {
        self.link(Box::new(ObjClosure {
            header: GcHeader::new(ObjKind::Closure),
            function,
            upvalues,
        }))
    }

    pub fn new_upvalue(&mut self, location: usize) -> NonNull<ObjUpvalue> {
        self.link(Box::new(ObjUpvalue {
            header: GcHeader::new(ObjKind::Upvalue),
            location: std::cell::Cell::new(location),
            closed: std::cell::Cell::new(Value::Nil),
            is_open: std::cell::Cell::new(true),
        }))
    }

    pub fn new_class(&mut self, name: NonNull<ObjString>) -> NonNull<ObjClass> {
        self.link(Box::new(ObjClass {
            header: GcHeader::new(ObjKind::Class),
            name,
            methods: Table::new(),
        }))
    }

    pub fn new_instance(&mut self, class: NonNull<ObjClass>) -> NonNull<ObjInstance> {
        self.link(Box::new(ObjInstance {
            header: GcHeader::new(ObjKind::Instance),
            class,
            fields: Table::new(),
        }))
    }

    pub fn new_bound_method(
        &mut self,
        receiver: Value,
        method: NonNull<ObjClosure>,
    ) -> NonNull<ObjBoundMethod> {
        self.link(Box::new(ObjBoundMethod {
            header: GcHeader::new(ObjKind::BoundMethod),
            receiver,
            method,
        }))
    }

    fn mark_value(&mut self, value: Value) {
        if let Value::Obj(obj) = value {
            self.mark_object(obj);
        }
    }

    fn mark_object(&mut self, obj: NonNull<GcHeader>) {
        let header = unsafe { obj.as_ref() };
        if header.marked.get() {
            return;
        }
        header.marked.set(true);
        self.gray_stack.push(obj);
    }

    /// Scans one gray object's children, marking each ("blackening" it).
    fn blacken(&mut self, obj: NonNull<GcHeader>) {
        #[cfg(feature = "log_gc")]
        log::trace!("blacken {:p}", obj);
        match unsafe { obj.as_ref() }.kind {
            ObjKind::String | ObjKind::Native => {}
            ObjKind::Upvalue => {
                let upvalue = <ObjUpvalue as Obj>::as_ref(obj);
                self.mark_value(unsafe { upvalue.as_ref() }.closed.get());
            }
            ObjKind::Function => {
                let fun = <ObjFunction as Obj>::as_ref(obj);
                let fun_ref = unsafe { fun.as_ref() };
                if let Some(name) = fun_ref.name {
                    self.mark_object(name.cast());
                }
                for &constant in &fun_ref.chunk.constants {
                    self.mark_value(constant);
                }
            }
            ObjKind::Closure => {
                let closure = <ObjClosure as Obj>::as_ref(obj);
                let closure_ref = unsafe { closure.as_ref() };
                self.mark_object(closure_ref.function.cast());
                for &upvalue in &closure_ref.upvalues {
                    self.mark_object(upvalue.cast());
                }
            }
            ObjKind::Class => {
                let class = <ObjClass as Obj>::as_ref(obj);
                let (name, methods) = {
                    let class_ref = unsafe { class.as_ref() };
                    (class_ref.name, class_ref.methods.live_entries())
                };
                self.mark_object(name.cast());
                for (key, value) in methods {
                    self.mark_object(key.cast());
                    self.mark_value(value);
                }
            }
            ObjKind::Instance => {
                let instance = <ObjInstance as Obj>::as_ref(obj);
                let (class, fields) = {
                    let instance_ref = unsafe { instance.as_ref() };
                    (instance_ref.class, instance_ref.fields.live_entries())
                };
                self.mark_object(class.cast());
                for (key, value) in fields {
                    self.mark_object(key.cast());
                    self.mark_value(value);
                }
            }
            ObjKind::BoundMethod => {
                let bound = <ObjBoundMethod as Obj>::as_ref(obj);
                let bound_ref = unsafe { bound.as_ref() };
                self.mark_value(bound_ref.receiver);
                self.mark_object(bound_ref.method.cast());
            }
        }
    }

    fn trace_references(&mut self) {
        while let Some(obj) = self.gray_stack.pop() {
            self.blacken(obj);
        }
    }

    fn sweep(&mut self) {
        let mut prev: Option<NonNull<GcHeader>> = None;
        let mut current = self.objects;
        while let Some(obj) = current {
            let header = unsafe { obj.as_ref() };
            let next = header.next.get();
            if header.marked.get() {
                header.marked.set(false);
                prev = Some(obj);
                current = next;
            } else {
                match prev {
                    Some(p) => unsafe { p.as_ref() }.next.set(next),
                    None => self.objects = next,
                }
                current = next;
                self.free(obj);
            }
        }
    }

    fn free(&mut self, obj: NonNull<GcHeader>) {
        #[cfg(feature = "log_gc")]
        log::trace!("free {:p} kind {:?}", obj, unsafe { obj.as_ref() }.kind);
        unsafe {
            match obj.as_ref().kind {
                ObjKind::String => {
                    let ptr = obj.cast::<ObjString>();
                    let extra = ptr.as_ref().chars.len();
                    drop(Box::from_raw(ptr.as_ptr()));
                    self.bytes_allocated -= std::mem::size_of::<ObjString>() + extra;
                }
                ObjKind::Function => {
                    drop(Box::from_raw(obj.cast::<ObjFunction>().as_ptr()));
                    self.bytes_allocated -= std::mem::size_of::<ObjFunction>();
                }
                ObjKind::Native => {
                    drop(Box::from_raw(obj.cast::<ObjNative>().as_ptr()));
                    self.bytes_allocated -= std::mem::size_of::<ObjNative>();
                }
                ObjKind::Closure => {
                    drop(Box::from_raw(obj.cast::<ObjClosure>().as_ptr()));
                    self.bytes_allocated -= std::mem::size_of::<ObjClosure>();
                }
                ObjKind::Upvalue => {
                    drop(Box::from_raw(obj.cast::<ObjUpvalue>().as_ptr()));
                    self.bytes_allocated -= std::mem::size_of::<ObjUpvalue>();
                }
                ObjKind::Class => {
                    drop(Box::from_raw(obj.cast::<ObjClass>().as_ptr()));
                    self.bytes_allocated -= std::mem::size_of::<ObjClass>();
                }
                ObjKind::Instance => {
                    drop(Box::from_raw(obj.cast::<ObjInstance>().as_ptr()));
                    self.bytes_allocated -= std::mem::size_of::<ObjInstance>();
                }
                ObjKind::BoundMethod => {
                    drop(Box::from_raw(obj.cast::<ObjBoundMethod>().as_ptr()));
                    self.bytes_allocated -= std::mem::size_of::<ObjBoundMethod>();
                }
            }
        }
    }

    /// Runs one full collection cycle. `mark_roots` is supplied by the
    /// caller (the VM) and should mark every stack slot, call-frame
    /// closure, open upvalue and global; the heap additionally marks its
    /// own `extra_roots` (the compiler's in-progress functions).
    pub fn collect_garbage(&mut self, mark_roots: impl FnOnce(&mut Heap)) {
        #[cfg(feature = "log_gc")]
        log::trace!("-- gc begin");
        let before = self.bytes_allocated;

        mark_roots(self);
        let extra_roots = std::mem::take(&mut self.extra_roots);
        for &root in &extra_roots {
            self.mark_value(root);
        }
        self.extra_roots = extra_roots;

        self.trace_references();
        self.strings.remove_white();
        self.sweep();

        self.next_gc = self.bytes_allocated.max(INITIAL_NEXT_GC) * HEAP_GROW_FACTOR;

        #[cfg(feature = "log_gc")]
        log::trace!(
            "-- gc end: collected {} bytes (from {} to {}), next at {}",
            before.saturating_sub(self.bytes_allocated),
            before,
            self.bytes_allocated,
            self.next_gc
        );
        let _ = before;
    }

    /// Marks a single value as a root; exposed so the VM's `mark_roots`
    /// closure can call back into the heap for each stack slot / global /
    /// open upvalue it walks.
    pub fn mark_root(&mut self, value: Value) {
        self.mark_value(value);
    }

    pub fn mark_root_obj(&mut self, obj: NonNull<GcHeader>) {
        self.mark_object(obj);
    }

    /// Marks every live entry of a table the VM owns directly (the globals
    /// table), mirroring what `blacken` does for a class's method table.
    pub fn mark_table(&mut self, table: &Table) {
        for (key, value) in table.live_entries() {
            self.mark_object(key.cast());
            self.mark_value(value);
        }
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        let mut current = self.objects;
        while let Some(obj) = current {
            let next = unsafe { obj.as_ref() }.next.get();
            self.free(obj);
            current = next;
        }
    }
}
