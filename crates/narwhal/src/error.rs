#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "graph contains a link with a missing endpoint: link #{link_index} references node {node_id}"
    )]
    MissingEndpoint { link_index: usize, node_id: u64 },

    #[error("graph contains duplicate node id {node_id}")]
    DuplicateNode { node_id: u64 },

    #[error("link #{link_index} has an invalid weight {weight} (expected a finite value >= 0)")]
    InvalidWeight { link_index: usize, weight: f64 },

    #[error("node {node_id} has an invalid size {size} (expected a finite value >= 0)")]
    InvalidSize { node_id: u64, size: f64 },

    #[error("invalid setting `{name}` = {value}: {reason}")]
    InvalidSetting {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("node {node_id} has a non-finite position")]
    NonFinitePosition { node_id: u64 },

    #[error("failed to build the layout worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("layout step failed during {phase}")]
    Phase {
        phase: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn in_phase(self, phase: &'static str) -> Self {
        Self::Phase {
            phase,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
