use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid transition: {action} while {from}")]
pub struct TransitionError {
    pub from: &'static str,
    pub action: &'static str,
}

/// Lifecycle of one generation as seen by the front-end.
///
/// ```text
/// Idle ──begin──> Generating ──first_fragment──> Streaming ──complete──> Displaying
///                     │                              │
///                     └──────────complete────────────┴──> Displaying
///
///            any active ───fail──> Errored
/// ```
/// `Displaying` and `Errored` may `begin` again; the previous text is discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GenerationState {
    #[default]
    Idle,
    /// Request sent, nothing received yet
    Generating,
    /// Fragments are arriving
    Streaming,
    Displaying,
    Errored(String),
}

impl GenerationState {
    pub fn name(&self) -> &'static str {
        match self {
            GenerationState::Idle => "idle",
            GenerationState::Generating => "generating",
            GenerationState::Streaming => "streaming",
            GenerationState::Displaying => "displaying",
            GenerationState::Errored(_) => "errored",
        }
    }

    /// A request is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, GenerationState::Generating | GenerationState::Streaming)
    }

    pub fn begin(&mut self) -> Result<(), TransitionError> {
        if self.is_busy() {
            return Err(self.reject("begin"));
        }
        *self = GenerationState::Generating;
        Ok(())
    }

    /// Generating -> Streaming; a no-op once already streaming
    pub fn first_fragment(&mut self) -> Result<(), TransitionError> {
        match self {
            GenerationState::Generating => {
                *self = GenerationState::Streaming;
                Ok(())
            }
            GenerationState::Streaming => Ok(()),
            _ => Err(self.reject("first_fragment")),
        }
    }

    pub fn complete(&mut self) -> Result<(), TransitionError> {
        if !self.is_busy() {
            return Err(self.reject("complete"));
        }
        *self = GenerationState::Displaying;
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        if !self.is_busy() {
            return Err(self.reject("fail"));
        }
        *self = GenerationState::Errored(message.into());
        Ok(())
    }

    fn reject(&self, action: &'static str) -> TransitionError {
        TransitionError {
            from: self.name(),
            action,
        }
    }
}
