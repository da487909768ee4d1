pub type Result<T> = std::result::Result<T, StructuralError>;

/// Fatal problems with the structural input. Never repaired silently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("Undecodable input: {message}")]
    Decode { message: String },

    #[error("Document declares no process")]
    MissingProcess,

    #[error("Duplicate id `{id}` in scope `{scope}`")]
    DuplicateId { id: String, scope: String },

    #[error("Flow `{flow}` references unknown node `{reference}` in scope `{scope}`")]
    DanglingFlowReference {
        flow: String,
        reference: String,
        scope: String,
    },

    #[error("Lane `{lane}` lists unknown node `{node}`")]
    DanglingLaneMember { lane: String, node: String },

    #[error("Boundary event `{event}` is attached to unknown node `{host}`")]
    DanglingAttachment { event: String, host: String },

    #[error("Participant `{participant}` references unknown process `{process}`")]
    DanglingParticipantProcess {
        participant: String,
        process: String,
    },

    #[error("Message flow `{flow}` references unknown element `{reference}`")]
    DanglingMessageFlow { flow: String, reference: String },
}

impl StructuralError {
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

impl From<roxmltree::Error> for StructuralError {
    fn from(err: roxmltree::Error) -> Self {
        Self::decode(err.to_string())
    }
}

impl From<serde_json::Error> for StructuralError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}
