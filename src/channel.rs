//! Push-notification channel shim
//!
//! Thin lifecycle wrapper over an external channel-management facility. Only
//! the boundary behavior lives here: expose the channel's URI and expiration,
//! and close it through the facility, treating "already closed / not found"
//! as success. Every close records a telemetry event carrying the outcome
//! code, whether the close succeeded or not.

use std::sync::Arc;
use std::time::SystemTime;

use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// Outcome code recorded when a close completes cleanly.
const CLOSE_OK: i32 = 0;

/// Failure reported by the channel-management facility.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// The channel is already closed or was never known to the facility.
    #[error("channel not found")]
    NotFound,

    #[error("channel operation failed with code {code}: {message}")]
    Failed { code: i32, message: String },
}

impl ChannelError {
    pub fn code(&self) -> i32 {
        match self {
            // Facility convention for a missing channel.
            ChannelError::NotFound => 2,
            ChannelError::Failed { code, .. } => *code,
        }
    }
}

/// External channel-management facility.
pub trait ChannelManager: Send + Sync {
    fn close_channel(&self, app_id: &str, channel_id: &str) -> Result<(), ChannelError>;
}

/// Identity and addressing details of one open channel.
#[derive(Debug, Clone)]
pub struct ChannelDetails {
    pub app_id: String,
    pub channel_id: String,
    pub uri: String,
    pub expiration: SystemTime,
}

/// One push-notification channel handed out to the application.
pub struct PushNotificationChannel {
    details: ChannelDetails,
    manager: Arc<dyn ChannelManager>,
    telemetry: Arc<dyn TelemetrySink>,
}

// Records the close outcome on scope exit, so the event fires on every
// return path, including the re-raise.
struct CloseTelemetryGuard {
    telemetry: Arc<dyn TelemetrySink>,
    code: i32,
}

impl Drop for CloseTelemetryGuard {
    fn drop(&mut self) {
        self.telemetry
            .record(TelemetryEvent::new("channel_close", self.code));
    }
}

impl PushNotificationChannel {
    /// A channel recording its close outcome to the globally configured
    /// telemetry sink.
    pub fn new(details: ChannelDetails, manager: Arc<dyn ChannelManager>) -> Self {
        Self::with_telemetry_sink(details, manager, crate::telemetry::get_telemetry_sink())
    }

    /// A channel recording to an explicitly supplied sink.
    pub fn with_telemetry_sink(
        details: ChannelDetails,
        manager: Arc<dyn ChannelManager>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            details,
            manager,
            telemetry,
        }
    }

    pub fn uri(&self) -> &str {
        &self.details.uri
    }

    pub fn expiration_time(&self) -> SystemTime {
        self.details.expiration
    }

    /// Close the channel through the management facility.
    ///
    /// "Already closed / not found" is not an error, though its code is
    /// still the one recorded; any other failure is re-raised. The outcome
    /// code is recorded in every case.
    pub fn close(&self) -> Result<(), ChannelError> {
        let mut guard = CloseTelemetryGuard {
            telemetry: Arc::clone(&self.telemetry),
            code: CLOSE_OK,
        };

        match self
            .manager
            .close_channel(&self.details.app_id, &self.details.channel_id)
        {
            Ok(()) => Ok(()),
            Err(err @ ChannelError::NotFound) => {
                guard.code = err.code();
                Ok(())
            }
            Err(err) => {
                guard.code = err.code();
                Err(err)
            }
        }
    }
}
