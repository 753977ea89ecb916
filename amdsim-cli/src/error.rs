use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Engines disagree for seed {seed}: abs {abs} vs des {des}")]
    EngineMismatch { seed: u64, abs: String, des: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Sweep worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
