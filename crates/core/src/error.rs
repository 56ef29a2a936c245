use thiserror::Error;

#[derive(Error, Debug)]
pub enum SluiceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown cost model selector: {0}")]
    UnknownCostModel(i64),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Solver exited with status {code}")]
    SolverExit { code: i32 },

    #[error("Malformed solver output: {line:?}")]
    MalformedSolverOutput { line: String },

    #[error("Malformed DIMACS line: {line:?}")]
    MalformedDimacs { line: String },
}
