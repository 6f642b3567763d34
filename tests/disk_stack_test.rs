//! Disk Stack Tests
//!
//! Single-threaded behavior of the public handle: LIFO order, size
//! accounting, persistence across reopen, corruption and closed-handle
//! errors.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use diskstack::{
    DiskStack, Error, FixedWidthCodec, StackConfig, FRAME_OVERHEAD, HEADER_SIZE,
};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use tempfile::tempdir;

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).unwrap().len()
}

fn overwrite(path: &Path, offset: u64, bytes: &[u8]) {
    let mut f = OpenOptions::new().write(true).open(path).unwrap();
    f.seek(SeekFrom::Start(offset)).unwrap();
    f.write_all(bytes).unwrap();
}

fn shrink(path: &Path, by: u64) {
    let f = OpenOptions::new().write(true).open(path).unwrap();
    let len = f.metadata().unwrap().len();
    f.set_len(len - by).unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Task {
    id: u32,
    name: String,
    deps: Vec<u32>,
}

// ============================================================================
// Basic behavior
// ============================================================================

/// Push one value, pop it back, then find the stack empty.
#[test]
fn test_single_element() {
    let dir = tempdir().unwrap();
    let stack: DiskStack<i64> = DiskStack::open(dir.path().join("stack")).unwrap();

    stack.push(&123).unwrap();
    assert_eq!(stack.pop().unwrap(), Some(123));

    // Empty is a normal outcome, not an error.
    assert_eq!(stack.pop().unwrap(), None);
}

#[test]
fn test_fresh_store_is_header_only() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack");
    let stack: DiskStack<i64> = DiskStack::open(&path).unwrap();

    assert_eq!(file_len(&path), HEADER_SIZE);
    assert_eq!(stack.size().unwrap(), HEADER_SIZE);
    assert_eq!(stack.len().unwrap(), 0);
    assert!(stack.is_empty().unwrap());
    assert!(!stack.is_degraded().unwrap());
}

/// After every push is matched by a pop the store returns to baseline.
#[test]
fn test_drain_to_baseline() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack");
    let stack: DiskStack<Task> = DiskStack::open(&path).unwrap();
    let baseline = file_len(&path);

    for i in 0..200u32 {
        let task = Task {
            id: i,
            name: "x".repeat(i as usize % 17),
            deps: (0..i % 5).collect(),
        };
        stack.push(&task).unwrap();
        if i % 3 == 0 {
            stack.pop().unwrap().unwrap();
        }
    }
    assert!(stack.size().unwrap() > baseline);
    assert_eq!(file_len(&path), stack.size().unwrap());

    while stack.pop().unwrap().is_some() {}

    assert_eq!(stack.len().unwrap(), 0);
    assert_eq!(stack.size().unwrap(), baseline);
    assert_eq!(file_len(&path), baseline);
}

#[test]
fn test_structured_values_lifo() {
    let dir = tempdir().unwrap();
    let stack: DiskStack<Task> = DiskStack::open(dir.path().join("stack")).unwrap();

    let a = Task { id: 1, name: "fetch".into(), deps: vec![] };
    let b = Task { id: 2, name: "parse".into(), deps: vec![1] };
    stack.push(&a).unwrap();
    stack.push(&b).unwrap();

    assert_eq!(stack.pop().unwrap(), Some(b));
    assert_eq!(stack.pop().unwrap(), Some(a));
}

#[test]
fn test_size_matches_frame_arithmetic() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack");
    let stack: DiskStack<u32, FixedWidthCodec<u32>> =
        DiskStack::open_with_codec(&path, FixedWidthCodec::new(), StackConfig::default()).unwrap();

    for i in 0..10u32 {
        stack.push(&i).unwrap();
    }
    let expected = HEADER_SIZE + 10 * (4 + FRAME_OVERHEAD);
    assert_eq!(stack.size().unwrap(), expected);
    assert_eq!(file_len(&path), expected);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_reopen_restores_len_and_size() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack");

    let size = {
        let stack: DiskStack<String> = DiskStack::open(&path).unwrap();
        for i in 0..100 {
            stack.push(&format!("item-{}", i)).unwrap();
        }
        let size = stack.size().unwrap();
        stack.close().unwrap();
        size
    };

    let stack: DiskStack<String> = DiskStack::open(&path).unwrap();
    assert_eq!(stack.len().unwrap(), 100);
    assert_eq!(stack.size().unwrap(), size);

    for i in (0..100).rev() {
        assert_eq!(stack.pop().unwrap(), Some(format!("item-{}", i)));
    }
    assert_eq!(stack.size().unwrap(), HEADER_SIZE);
}

#[test]
fn test_reopen_with_other_type_is_incompatible() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack");
    {
        let stack: DiskStack<u64> = DiskStack::open(&path).unwrap();
        stack.push(&1).unwrap();
    }

    let result: Result<DiskStack<String>, _> = DiskStack::open(&path);
    assert!(matches!(result, Err(Error::IncompatibleStore(_))));
}

#[test]
fn test_reopen_with_other_codec_is_incompatible() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack");
    {
        let _stack: DiskStack<u64> = DiskStack::open(&path).unwrap();
    }

    let result: Result<DiskStack<u64, FixedWidthCodec<u64>>, _> =
        DiskStack::open_with_codec(&path, FixedWidthCodec::new(), StackConfig::default());
    assert!(matches!(result, Err(Error::IncompatibleStore(_))));
}

#[test]
fn test_open_failed_on_bad_path() {
    let dir = tempdir().unwrap();
    let result: Result<DiskStack<u8>, _> = DiskStack::open(dir.path().join("missing/dir/stack"));
    assert!(matches!(result, Err(Error::OpenFailed { .. })));
}

#[test]
fn test_torn_tail_repaired_on_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack");
    {
        let stack: DiskStack<u64> = DiskStack::open(&path).unwrap();
        for i in 0..3 {
            stack.push(&i).unwrap();
        }
    }
    shrink(&path, 3);

    let stack: DiskStack<u64> = DiskStack::open(&path).unwrap();
    assert_eq!(stack.len().unwrap(), 2);
    assert_eq!(stack.size().unwrap(), HEADER_SIZE + 2 * (8 + FRAME_OVERHEAD));
    assert_eq!(file_len(&path), stack.size().unwrap());
    assert_eq!(stack.pop().unwrap(), Some(1));
}

#[test]
fn test_torn_tail_rejected_when_repair_disabled() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack");
    {
        let stack: DiskStack<u64> = DiskStack::open(&path).unwrap();
        stack.push(&7).unwrap();
    }
    shrink(&path, 1);

    let config = StackConfig::new().with_repair_torn_tail(false);
    let result: Result<DiskStack<u64>, _> = DiskStack::open_with_config(&path, config);
    assert!(matches!(result, Err(Error::TruncatedFrame { .. })));
}

// ============================================================================
// Corruption
// ============================================================================

/// A payload that no longer decodes is reported and left in place.
#[test]
fn test_mangled_payload_is_corrupt() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack");
    {
        let stack: DiskStack<String> = DiskStack::open(&path).unwrap();
        stack.push(&"ab".to_string()).unwrap();
    }

    // header | len(8) | strlen(8) | "ab" | len(8)
    overwrite(&path, HEADER_SIZE + 8 + 8, &[0xFF, 0xFE]);

    let stack: DiskStack<String> = DiskStack::open(&path).unwrap();
    assert_eq!(stack.len().unwrap(), 1);
    assert!(matches!(stack.pop(), Err(Error::CorruptPayload(_))));
    assert_eq!(stack.len().unwrap(), 1);
    assert_eq!(file_len(&path), stack.size().unwrap());
}

/// Disagreeing length markers ahead of valid data are caught by the
/// open-time scan and never repaired.
#[test]
fn test_mangled_length_marker_is_corrupt() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack");
    {
        let stack: DiskStack<u64> = DiskStack::open(&path).unwrap();
        stack.push(&1).unwrap();
        stack.push(&2).unwrap();
    }
    let full = file_len(&path);

    // Trailing marker of the first frame: claim 4 bytes instead of 8.
    overwrite(&path, HEADER_SIZE + 8 + 8, &4u64.to_le_bytes());

    let result: Result<DiskStack<u64>, _> = DiskStack::open(&path);
    assert!(matches!(result, Err(Error::CorruptPayload(_))));
    assert_eq!(file_len(&path), full);
}

/// A crash can leave the file at full length with the last marker unwritten.
#[test]
fn test_zero_filled_tail_repaired_on_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack");
    {
        let stack: DiskStack<u64> = DiskStack::open(&path).unwrap();
        stack.push(&1).unwrap();
        stack.push(&2).unwrap();
    }
    let full = file_len(&path);
    overwrite(&path, full - 8, &[0u8; 8]);

    let stack: DiskStack<u64> = DiskStack::open(&path).unwrap();
    assert_eq!(stack.len().unwrap(), 1);
    assert_eq!(stack.size().unwrap(), HEADER_SIZE + 8 + FRAME_OVERHEAD);
    assert_eq!(file_len(&path), stack.size().unwrap());
    assert_eq!(stack.pop().unwrap(), Some(1));
}

#[test]
fn test_mangled_header_is_incompatible() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack");
    {
        let _stack: DiskStack<u64> = DiskStack::open(&path).unwrap();
    }
    overwrite(&path, 5, &[0xAA]);

    let result: Result<DiskStack<u64>, _> = DiskStack::open(&path);
    assert!(matches!(result, Err(Error::IncompatibleStore(_))));
}

// ============================================================================
// Closed handle
// ============================================================================

#[test]
fn test_operations_after_close() {
    let dir = tempdir().unwrap();
    let stack: DiskStack<i64> = DiskStack::open(dir.path().join("stack")).unwrap();
    stack.push(&1).unwrap();
    stack.close().unwrap();

    assert!(matches!(stack.push(&2), Err(Error::HandleClosed)));
    assert!(matches!(stack.pop(), Err(Error::HandleClosed)));
    assert!(matches!(stack.size(), Err(Error::HandleClosed)));
    assert!(matches!(stack.len(), Err(Error::HandleClosed)));
    assert!(matches!(stack.is_degraded(), Err(Error::HandleClosed)));

    let mut out = 0;
    assert!(matches!(stack.pop_into(&mut out), Err(Error::HandleClosed)));
}

#[test]
fn test_close_persists_for_next_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stack");
    let stack: DiskStack<i64> = DiskStack::open(&path).unwrap();
    stack.push(&-9).unwrap();
    stack.close().unwrap();

    let stack: DiskStack<i64> = DiskStack::open(&path).unwrap();
    assert_eq!(stack.pop().unwrap(), Some(-9));
}

// ============================================================================
// Model check
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Push(u16),
    Pop,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![any::<u16>().prop_map(Op::Push), Just(Op::Pop)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The stack behaves like a `Vec` and its size follows the frames.
    #[test]
    fn prop_matches_vec_model(ops in proptest::collection::vec(op_strategy(), 0..64)) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stack");
        let stack: DiskStack<u16> = DiskStack::open(&path).unwrap();
        let mut model: Vec<u16> = Vec::new();

        for op in ops {
            match op {
                Op::Push(v) => {
                    stack.push(&v).unwrap();
                    model.push(v);
                }
                Op::Pop => {
                    prop_assert_eq!(stack.pop().unwrap(), model.pop());
                }
            }
            prop_assert_eq!(stack.len().unwrap(), model.len());
            let expected = HEADER_SIZE + model.len() as u64 * (2 + FRAME_OVERHEAD);
            prop_assert_eq!(stack.size().unwrap(), expected);
        }
        prop_assert_eq!(file_len(&path), stack.size().unwrap());
    }
}
