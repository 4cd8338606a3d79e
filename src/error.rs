//! Error types used by the slotvisor runtime, handlers and poll waits.
//!
//! This module defines the error enums and the closed status-code set:
//!
//! - [`RuntimeError`]: errors raised by runtime operations (require, emit, slot creation...).
//! - [`HandlerError`]: errors raised by service, slot and poll handlers.
//! - [`WaitError`]: outcome of an unsuccessful [`wait`](crate::Runtime::wait) on a poll slot.
//! - [`Status`]: the `OK / WEAK / ERR / TIMEOUT` code set every operation maps onto.
//!
//! All error types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use thiserror::Error;

/// Closed set of exit codes returned (directly or via conversion) by every operation.
///
/// ## Codes
/// - `Ok` = `0`
/// - `Weak` = `1` (startup succeeded, but the service does not keep the runtime alive)
/// - `Err` = `-1`
/// - `Timeout` = `-2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Operation succeeded.
    Ok,
    /// Successful startup excluded from the live-service count.
    Weak,
    /// Operation failed.
    Err,
    /// A bounded wait expired without a result.
    Timeout,
}

impl Status {
    /// Returns the numeric code of this status.
    ///
    /// # Example
    /// ```
    /// use slotvisor::Status;
    ///
    /// assert_eq!(Status::Ok.code(), 0);
    /// assert_eq!(Status::Weak.code(), 1);
    /// assert_eq!(Status::Err.code(), -1);
    /// assert_eq!(Status::Timeout.code(), -2);
    /// ```
    pub fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Weak => 1,
            Status::Err => -1,
            Status::Timeout => -2,
        }
    }

    /// Returns `true` for `Ok` and `Weak`.
    pub fn is_success(self) -> bool {
        matches!(self, Status::Ok | Status::Weak)
    }
}

/// # Errors produced by runtime operations.
///
/// These represent misuse or refused operations: a stopping target, a duplicated
/// name, a service that could not be found or failed to start, and so on.
/// None of them unwinds; they are returned locally without side effects.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Configuration change or start requested after the worker pool was started.
    #[error("runtime already started")]
    AlreadyStarted,

    /// The whole runtime is shutting down.
    #[error("runtime is stopping")]
    RuntimeStopping,

    /// The calling (emitting) service is stopping.
    #[error("service {service:?} is stopping")]
    ServiceStopping {
        /// Name of the stopping service.
        service: String,
    },

    /// The target slot (or its owning service) is stopping.
    #[error("target {slot:?} is stopping")]
    TargetStopping {
        /// Qualified name of the target slot.
        slot: String,
    },

    /// A slot or service with this qualified name already exists.
    #[error("name {name:?} is already taken")]
    NameTaken {
        /// The colliding name.
        name: String,
    },

    /// The name exceeds the maximum allowed length.
    #[error("name {name:?} is too long (max {max} bytes)")]
    NameTooLong {
        /// The rejected name.
        name: String,
        /// Maximum length in bytes.
        max: usize,
    },

    /// The name is empty or contains forbidden characters.
    #[error("invalid name {name:?}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// Neither the preload table nor the module resolver knows this service.
    #[error("service {name:?} not found")]
    ServiceNotFound {
        /// Requested service name.
        name: String,
    },

    /// The startup handler of the service failed.
    #[error("service {name:?} failed to start: {reason}")]
    StartupFailed {
        /// Service name.
        name: String,
        /// Failure message from the handler.
        reason: String,
    },

    /// No slot or service is registered under this name.
    #[error("slot {name:?} not found")]
    SlotNotFound {
        /// Requested qualified name.
        name: String,
    },

    /// A poll-only operation was invoked on a queued slot.
    #[error("slot {slot:?} is not a poll")]
    NotAPoll {
        /// Qualified slot name.
        slot: String,
    },

    /// The operation needs an active protected-call context on this thread.
    #[error("no active context on this thread")]
    NoContext,

    /// An OS thread could not be created.
    #[error("failed to spawn thread {thread:?}: {reason}")]
    SpawnFailed {
        /// Name of the thread that failed to spawn.
        thread: String,
        /// OS error message.
        reason: String,
    },

    /// The signal payload exceeds the 24-bit size field.
    #[error("payload of {size} bytes exceeds limit of {max}")]
    PayloadTooLarge {
        /// Payload size in bytes.
        size: usize,
        /// Maximum payload size.
        max: usize,
    },

    /// Signal type tag does not fit into 7 bits.
    #[error("signal kind {kind} does not fit into 7 bits")]
    InvalidKind {
        /// Rejected tag.
        kind: u8,
    },

    /// The runtime instance has been torn down.
    #[error("runtime is closed")]
    Closed,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use slotvisor::RuntimeError;
    ///
    /// let err = RuntimeError::NameTaken { name: "echo.ping".into() };
    /// assert_eq!(err.as_label(), "runtime_name_taken");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyStarted => "runtime_already_started",
            RuntimeError::RuntimeStopping => "runtime_stopping",
            RuntimeError::ServiceStopping { .. } => "runtime_service_stopping",
            RuntimeError::TargetStopping { .. } => "runtime_target_stopping",
            RuntimeError::NameTaken { .. } => "runtime_name_taken",
            RuntimeError::NameTooLong { .. } => "runtime_name_too_long",
            RuntimeError::InvalidName { .. } => "runtime_invalid_name",
            RuntimeError::ServiceNotFound { .. } => "runtime_service_not_found",
            RuntimeError::StartupFailed { .. } => "runtime_startup_failed",
            RuntimeError::SlotNotFound { .. } => "runtime_slot_not_found",
            RuntimeError::NotAPoll { .. } => "runtime_not_a_poll",
            RuntimeError::NoContext => "runtime_no_context",
            RuntimeError::SpawnFailed { .. } => "runtime_spawn_failed",
            RuntimeError::PayloadTooLarge { .. } => "runtime_payload_too_large",
            RuntimeError::InvalidKind { .. } => "runtime_invalid_kind",
            RuntimeError::Closed => "runtime_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }

    /// Every runtime error maps onto [`Status::Err`].
    pub fn as_status(&self) -> Status {
        Status::Err
    }
}

/// # Errors produced by handlers.
///
/// Returned (or raised through a panic) by service startup handlers, slot handlers,
/// interception hooks and poll bodies. The nearest protected-call boundary catches
/// them, runs the cleanup stack, and converts them into a status.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Handler reported a failure.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Handler deliberately discarded the current protected call.
    #[error("protected call discarded")]
    Discarded,

    /// Handler panicked; the panic was caught at the protected-call boundary.
    #[error("handler panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        HandlerError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use slotvisor::HandlerError;
    ///
    /// assert_eq!(HandlerError::fail("boom").as_label(), "handler_failed");
    /// assert_eq!(HandlerError::Discarded.as_label(), "handler_discarded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Discarded => "handler_discarded",
            HandlerError::Panicked { .. } => "handler_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HandlerError::Fail { error } => format!("error: {error}"),
            HandlerError::Discarded => "discarded".to_string(),
            HandlerError::Panicked { info } => format!("panic: {info}"),
        }
    }
}

impl From<RuntimeError> for HandlerError {
    fn from(err: RuntimeError) -> Self {
        HandlerError::Fail {
            error: err.to_string(),
        }
    }
}

impl From<WaitError> for HandlerError {
    fn from(err: WaitError) -> Self {
        HandlerError::Fail {
            error: err.to_string(),
        }
    }
}

/// # Unsuccessful outcome of a poll wait.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// Nothing arrived before the deadline; the caller may retry.
    #[error("wait timed out")]
    Timeout,

    /// The poll is stopping and its queue is empty; nothing will ever arrive.
    #[error("poll is closed")]
    Closed,

    /// The slot is a queued slot, not a poll.
    #[error("slot {slot:?} is not a poll")]
    NotAPoll {
        /// Qualified slot name.
        slot: String,
    },
}

impl WaitError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WaitError::Timeout => "wait_timeout",
            WaitError::Closed => "wait_closed",
            WaitError::NotAPoll { .. } => "wait_not_a_poll",
        }
    }

    /// `Timeout` maps onto [`Status::Timeout`], everything else onto [`Status::Err`].
    pub fn as_status(&self) -> Status {
        match self {
            WaitError::Timeout => Status::Timeout,
            _ => Status::Err,
        }
    }

    /// Indicates whether retrying the wait can still yield a signal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WaitError::Timeout)
    }
}
