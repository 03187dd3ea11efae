//! Host-independent method-call bridge.
//!
//! A host sends [`MethodCall`]s naming one of the facade operations; the
//! [`HandlerRegistry`] turns each into a [`MethodResponse`]. [`BridgeWorker`] runs the
//! registry against a single manager on its own thread so async callers can share it.

mod protocol;
mod registry;
mod worker;

pub use protocol::{INVALID_ARGUMENTS, MethodCall, MethodError, MethodResponse, ResponseEnvelope};
pub use registry::{Handler, HandlerRegistry};
pub use worker::BridgeWorker;
