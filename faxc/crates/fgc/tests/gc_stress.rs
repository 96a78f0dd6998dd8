use fgc::{Heap, Value};

/// Repeatedly allocates and immediately drops references to strings and
/// closures, collecting after every batch, the way `stress_gc` forces a
/// collection before every allocation that would grow the heap.
#[test]
fn repeated_alloc_and_collect_does_not_corrupt_the_heap() {
    let mut heap = Heap::new();
    let mut survivor: Option<Value> = None;

    for i in 0..2_000 {
        let s = heap.intern(&format!("value-{i}"));
        if i == 1_000 {
            survivor = Some(Value::Obj(s.cast()));
        }
        if i % 50 == 0 {
            let keep = survivor;
            heap.collect_garbage(|h| {
                if let Some(v) = keep {
                    h.mark_root(v);
                }
            });
        }
    }

    let hash = fgc::fnv1a(b"value-1000");
    assert!(heap.strings.find_string("value-1000", hash).is_some());
    let hash_gone = fgc::fnv1a(b"value-0");
    assert!(heap.strings.find_string("value-0", hash_gone).is_none());
}

#[test]
fn closure_graph_survives_through_upvalues() {
    let mut heap = Heap::new();
    let function = heap.new_function();
    let upvalue = heap.new_upvalue(0);
    let closure = heap.new_closure(function, vec![upvalue]);
    let root = Value::Obj(closure.cast());

    for _ in 0..10 {
        heap.collect_garbage(|h| h.mark_root(root));
    }

    assert_eq!(unsafe { closure.as_ref() }.upvalues.len(), 1);
}
