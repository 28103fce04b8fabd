use thiserror::Error;

#[derive(Error, Debug)]
pub enum BnkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed container: {0}")]
    MalformedContainer(String),
    #[error("WEM {id} spans {offset}..{offset}+{size}, but DATA holds {data_len} bytes")]
    IndexOutOfRange {
        id: u32,
        offset: u32,
        size: u32,
        data_len: usize,
    },
    #[error("WEM conversion error: {0}")]
    Wem(#[from] wem::WemError),
}

impl BnkError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        BnkError::MalformedContainer(message.into())
    }
}

pub type Result<T> = std::result::Result<T, BnkError>;
