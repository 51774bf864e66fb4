//! # clipr - Clipboard Coordination for File Managers
//!
//! Stages copy/cut selections, resolves paste destinations and hands the
//! resulting jobs to a [`FileOperationExecutor`].
//!
//! ## Key Features
//! - Last-writer-wins copy/cut staging
//! - KDE and GNOME clipboard encodings, written together and read together
//! - Cut clipboards are consumed by the first paste
//! - Executor contract shared with the browser core

pub mod clipboard;
pub mod codec;
pub mod error;
pub mod item;
pub mod operations;

// Re-export main types for easy use
pub use clipboard::{
    ClipboardBackend, ClipboardCoordinator, InMemoryClipboard, PasteTarget, SelectionProvider,
};
pub use codec::{ClipboardCodec, CodecSet, DecodedClipboard, GnomeCodec, KdeCodec, MimeData};
pub use error::{ClipError, ClipResult};
pub use item::{ClipboardOperation, ClipboardSet};
pub use operations::{FileOperation, FileOperationExecutor, PasteOperation};
