use std::fmt;

/// Result of a single backend call.
///
/// Warnings report degraded quality; the call still took effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    Success,
    Warning(BackendWarning),
    Error(BackendError),
}

impl BackendStatus {
    #[inline]
    pub fn is_ok(self) -> bool {
        !matches!(self, Self::Error(_))
    }

    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Keeps warnings as success, turns errors into `Err`.
    #[inline]
    pub fn into_result(self) -> Result<(), BackendError> {
        match self {
            Self::Error(e) => Err(e),
            _ => Ok(()),
        }
    }
}

impl From<BackendError> for BackendStatus {
    #[inline]
    fn from(e: BackendError) -> Self {
        Self::Error(e)
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("Success"),
            Self::Warning(w) => write!(f, "Warning: {w}"),
            Self::Error(e) => write!(f, "Error: {e}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendWarning {
    OldDriver,
    TooFewFrames,
    FrameIdMismatch,
    MissingPresentStatus,
    ResourceSizeMismatch,
    Unknown(i32),
}

impl fmt::Display for BackendWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OldDriver => f.write_str("Old driver"),
            Self::TooFewFrames => f.write_str("Too few frames"),
            Self::FrameIdMismatch => f.write_str("Frames ID mismatch"),
            Self::MissingPresentStatus => f.write_str("Missing present status"),
            Self::ResourceSizeMismatch => f.write_str("Resource sizes mismatch"),
            Self::Unknown(code) => write!(f, "Unknown warning code {code}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendError {
    UnsupportedDevice,
    UnsupportedDriver,
    Uninitialized,
    InvalidArgument,
    DeviceOutOfMemory,
    Device,
    NotImplemented,
    InvalidContext,
    OperationInProgress,
    Unsupported,
    CantLoadLibrary,
    MismatchInputResources,
    IncorrectOutputResources,
    IncorrectInputResources,
    LatencyReductionUnsupported,
    LatencyReductionFunctionMissing,
    HresultFailure,
    DxgiInvalidCall,
    PointerStillInUse,
    InvalidDescriptorHeap,
    WrongCallOrder,
    Unknown(i32),
    /// The entry point was not resolved from the backend module.
    Unresolved(&'static str),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnsupportedDevice => "Unsupported device",
            Self::UnsupportedDriver => "Unsupported driver",
            Self::Uninitialized => "Uninitialized",
            Self::InvalidArgument => "Invalid argument",
            Self::DeviceOutOfMemory => "Device out of memory",
            Self::Device => "Device error",
            Self::NotImplemented => "Not implemented",
            Self::InvalidContext => "Invalid context",
            Self::OperationInProgress => "Operation in progress",
            Self::Unsupported => "Unsupported",
            Self::CantLoadLibrary => "Can't load library",
            Self::MismatchInputResources => "Mismatch input resources",
            Self::IncorrectOutputResources => "Incorrect output resources",
            Self::IncorrectInputResources => "Incorrect input resources",
            Self::LatencyReductionUnsupported => "Latency reduction unsupported",
            Self::LatencyReductionFunctionMissing => "Latency reduction function missing",
            Self::HresultFailure => "HRESULT failure",
            Self::DxgiInvalidCall => "DXGI invalid call",
            Self::PointerStillInUse => "Pointer still in use",
            Self::InvalidDescriptorHeap => "Invalid descriptor heap",
            Self::WrongCallOrder => "Wrong call order",
            Self::Unknown(code) => return write!(f, "Unknown result code {code}"),
            Self::Unresolved(name) => return write!(f, "entry point '{name}' not resolved"),
        };
        f.write_str(s)
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_count_as_ok() {
        assert!(BackendStatus::Success.is_ok());
        assert!(BackendStatus::Warning(BackendWarning::TooFewFrames).is_ok());
        assert!(!BackendStatus::Warning(BackendWarning::TooFewFrames).is_success());
        assert!(!BackendStatus::Error(BackendError::Device).is_ok());
    }

    #[test]
    fn display_reads_like_a_log_line() {
        assert_eq!(
            BackendStatus::Error(BackendError::WrongCallOrder).to_string(),
            "Error: Wrong call order"
        );
        assert_eq!(
            BackendError::Unresolved("xefgSwapChainSetPresentId").to_string(),
            "entry point 'xefgSwapChainSetPresentId' not resolved"
        );
    }
}
