#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no such interface: {0}")]
    NoSuchInterface(String),

    #[error("kernel I/O error: {0}")]
    KernelIoError(#[from] std::io::Error),

    #[error("message builder overflow")]
    BufferFull,

    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("bad prefix: {0}")]
    BadPrefix(#[from] prefix::BadPrefix),
}
