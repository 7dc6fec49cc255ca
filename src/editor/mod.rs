//! The editor shell: tab rules, undo/redo history, the per-project
//! session and its autosave task.
//!
//! Session registry and orchestration live in
//! [`crate::service::editor_service`]; this module holds no I/O except the
//! autosave writer.

pub mod autosave;
pub mod history;
pub mod session;
pub mod tabs;

pub use autosave::{AutosavePolicy, Flusher};
pub use history::History;
pub use session::{EditorSession, SessionSnapshot, SyncStatus};
pub use tabs::EditorTab;
