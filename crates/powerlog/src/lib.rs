// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod archive;
pub mod battery;
pub mod clock;
pub mod compact;
pub mod config;
pub mod daemon;
pub mod error;
pub mod event;
pub mod keys;
pub mod lock;
pub mod marker;
pub mod paths;
pub mod record;
pub mod recovery;
pub mod source;
pub mod store;
pub mod test_support;
