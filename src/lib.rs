//! Workspace root crate.
//!
//! This package exists only to host the end-to-end test suites under
//! `tests/integration/` that exercise the full control plane (the
//! [`camera-ws-server`](../camera_ws_server/index.html) binary crate) the
//! same way `rt-protocol` and `server` are wired together in this
//! codebase's other end-to-end suites. There is no standalone library
//! surface here.
