// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use super::*;

fn io_error() -> LogError {
    LogError::io(
        &PathBuf::from("/tmp/x"),
        io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
    )
}

#[yare::parameterized(
    io = { io_error(), ErrorCode::IoFailure, true },
    corrupt = { LogError::CorruptFile { path: PathBuf::from("a"), len: 7, record_size: 5 }, ErrorCode::CorruptFile, false },
    lock = { LogError::LockTimeout { path: PathBuf::from("l"), attempts: 3 }, ErrorCode::LockTimeout, true },
    index = { LogError::IndexOutOfBounds { index: 4, count: 2 }, ErrorCode::IndexOutOfBounds, false },
)]
fn code_and_recoverability(err: LogError, code: ErrorCode, recoverable: bool) {
    assert_eq!(err.code(), code);
    assert_eq!(err.is_recoverable(), recoverable);
    assert!(err.to_string().starts_with(code.as_str()));
}

#[test]
fn corrupt_file_message_names_sizes() {
    let err = LogError::CorruptFile { path: PathBuf::from("ScreenStateLog"), len: 7, record_size: 5 };
    let msg = err.to_string();
    assert!(msg.contains("ScreenStateLog"), "{msg}");
    assert!(msg.contains("length 7"), "{msg}");
    assert!(msg.contains("5-byte"), "{msg}");
}

#[test]
fn io_error_exposes_source() {
    let err = io_error();
    assert!(std::error::Error::source(&err).is_some());
}
