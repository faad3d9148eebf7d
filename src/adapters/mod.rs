// Adapters layer: concrete implementations of the domain ports (session storage, toasts, navigation).

pub mod navigation;
pub mod notify;
pub mod storage;

pub use navigation::MemoryNavigator;
pub use notify::{RecordingNotifier, Toast, TracingNotifier};
pub use storage::{FileSessionStore, MemorySessionStore};
