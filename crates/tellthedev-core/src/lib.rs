//! Platform-independent core of the TellTheDev feedback widget.
//!
//! Everything here runs on the host for tests; the WASM app binds these
//! types to the browser DOM, `fetch`, timers, and `postMessage`.

pub mod bridge;
pub mod compression;
pub mod credential;
pub mod environment;
pub mod feedback;
pub mod form;
pub mod mount;
pub mod submission;
pub mod transport;

pub use bridge::{BridgeMessage, OriginPolicy, ResizeHeight};
pub use compression::{CompressionError, CompressionOptions, ImageCompressor, RasterCompressor};
pub use credential::{
    Credential, CredentialKind, EmbedAttributes, TrustVerdict, WidgetRole, WidgetStatus,
};
pub use environment::{Environment, WidgetConfig};
pub use feedback::{FeedbackType, FieldErrors, RawImage};
pub use form::{AlertTicket, FormController, FormField, FormView, SubmitOutcome, submit_feedback};
pub use mount::{ErrorPanel, HostEffect, HostPanels, HostSession, ToggleOutcome};
pub use submission::{ResetTicket, SubmissionEvent, SubmissionMachine, SubmissionState};
pub use transport::{TransportError, WidgetRequest, WidgetResponse, WidgetTransport};

pub const LOG_TARGET: &str = "tellthedev";

#[cfg(test)]
mod testing;
