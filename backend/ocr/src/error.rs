use thiserror::Error;

/// Terminal failures of one recognition call.
///
/// Per-attempt poll failures are not terminal and never appear here
/// directly; the last one is folded into [`OcrError::Timeout`] when the
/// deadline elapses.
#[derive(Debug, Error)]
pub enum OcrError {
    /// Transport failure reaching the trigger endpoint.
    #[error("workflow trigger failed: {0}")]
    Trigger(String),

    /// Trigger endpoint answered with a non-200 status.
    #[error("workflow returned {status}: {body}")]
    TriggerStatus { status: u16, body: String },

    /// Trigger endpoint returned a 200 body that was not JSON.
    #[error("workflow response was not JSON")]
    MalformedResponse,

    /// Trigger response parsed but carried no executionId.
    #[error("no executionId in workflow response")]
    MissingExecutionId,

    /// The execution finished as failed or cancelled; carries the remote
    /// error message verbatim.
    #[error("{0}")]
    RemoteFailed(String),

    /// The execution succeeded but no JSON object could be recovered from
    /// the agent's text output.
    #[error("could not extract structured data from the agent output")]
    Extraction,

    /// The execution succeeded but the output payload had an unrecognized
    /// shape.
    #[error("unexpected workflow output format")]
    UnexpectedOutput,

    /// The polling deadline elapsed; carries the last recorded poll error,
    /// or a generic message when every attempt was silent.
    #[error("{0}")]
    Timeout(String),
}
