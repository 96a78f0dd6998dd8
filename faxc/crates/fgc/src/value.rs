//! Tagged value representation (spec §3 "Value").
//!
//! `Value` is a plain Rust enum rather than a packed NaN-boxed word: the
//! teacher's own object model favours clarity over the last bit of
//! performance, and the workload here (a tree-walking-speed bytecode VM,
//! not a JIT) doesn't need it.

use std::fmt;

use crate::object::{self, GcHeader, ObjBoundMethod, ObjClass, ObjClosure, ObjFunction,
    ObjInstance, ObjKind, ObjNative, ObjString, ObjUpvalue};
use std::ptr::NonNull;

#[derive(Clone, Copy)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Obj(NonNull<GcHeader>),
}

impl Value {
    /// `nil` and `false` are falsey; everything else is truthy (spec §3).
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_obj_kind(&self, kind: ObjKind) -> bool {
        matches!(self, Value::Obj(o) if object::kind_of(*o) == kind)
    }

    pub fn as_string(&self) -> Option<NonNull<ObjString>> {
        match self {
            Value::Obj(o) if object::kind_of(*o) == ObjKind::String => {
                Some(<ObjString as object::Obj>::as_ref(*o))
            }
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<NonNull<ObjFunction>> {
        match self {
            Value::Obj(o) if object::kind_of(*o) == ObjKind::Function => {
                Some(<ObjFunction as object::Obj>::as_ref(*o))
            }
            _ => None,
        }
    }

    pub fn as_native(&self) -> Option<NonNull<ObjNative>> {
        match self {
            Value::Obj(o) if object::kind_of(*o) == ObjKind::Native => {
                Some(<ObjNative as object::Obj>::as_ref(*o))
            }
            _ => None,
        }
    }

    pub fn as_closure(&self) -> Option<NonNull<ObjClosure>> {
        match self {
            Value::Obj(o) if object::kind_of(*o) == ObjKind::Closure => {
                Some(<ObjClosure as object::Obj>::as_ref(*o))
            }
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<NonNull<ObjClass>> {
        match self {
            Value::Obj(o) if object::kind_of(*o) == ObjKind::Class => {
                Some(<ObjClass as object::Obj>::as_ref(*o))
            }
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<NonNull<ObjInstance>> {
        match self {
            Value::Obj(o) if object::kind_of(*o) == ObjKind::Instance => {
                Some(<ObjInstance as object::Obj>::as_ref(*o))
            }
            _ => None,
        }
    }

    pub fn as_bound_method(&self) -> Option<NonNull<ObjBoundMethod>> {
        match self {
            Value::Obj(o) if object::kind_of(*o) == ObjKind::BoundMethod => {
                Some(<ObjBoundMethod as object::Obj>::as_ref(*o))
            }
            _ => None,
        }
    }

    pub fn as_upvalue(&self) -> Option<NonNull<ObjUpvalue>> {
        match self {
            Value::Obj(o) if object::kind_of(*o) == ObjKind::Upvalue => {
                Some(<ObjUpvalue as object::Obj>::as_ref(*o))
            }
            _ => None,
        }
    }
}

/// Equality per spec §3: numbers by value, strings by content (guaranteed by
/// interning to coincide with pointer identity), everything else by
/// reference identity. `nil == nil`, and values of different kinds are
/// never equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Obj(a), Value::Obj(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Obj(o) => fmt_obj(*o, f),
        }
    }
}

fn fmt_obj(obj: NonNull<GcHeader>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match object::kind_of(obj) {
        ObjKind::String => {
            let s = <ObjString as object::Obj>::as_ref(obj);
            write!(f, "{}", unsafe { &s.as_ref().chars })
        }
        ObjKind::Function => {
            let fun = <ObjFunction as object::Obj>::as_ref(obj);
            let fun_ref = unsafe { fun.as_ref() };
            match fun_ref.name {
                Some(_) => write!(f, "<fn {}>", object::function_name(fun_ref)),
                None => write!(f, "<script>"),
            }
        }
        ObjKind::Native => write!(f, "<native fn>"),
        ObjKind::Closure => {
            let closure = <ObjClosure as object::Obj>::as_ref(obj);
            let fun = unsafe { closure.as_ref().function };
            write!(f, "<fn {}>", object::function_name(unsafe { fun.as_ref() }))
        }
        ObjKind::Upvalue => write!(f, "upvalue"),
        ObjKind::Class => {
            let class = <ObjClass as object::Obj>::as_ref(obj);
            let name = unsafe { class.as_ref().name };
            write!(f, "{}", unsafe { &name.as_ref().chars })
        }
        ObjKind::Instance => {
            let instance = <ObjInstance as object::Obj>::as_ref(obj);
            let class = unsafe { instance.as_ref().class };
            let name = unsafe { class.as_ref().name };
            write!(f, "{} instance", unsafe { &name.as_ref().chars })
        }
        ObjKind::BoundMethod => {
            let bound = <ObjBoundMethod as object::Obj>::as_ref(obj);
            let closure = unsafe { bound.as_ref().method };
            let fun = unsafe { closure.as_ref().function };
            write!(f, "<fn {}>", object::function_name(unsafe { fun.as_ref() }))
        }
    }
}
