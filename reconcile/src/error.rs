#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("bad prefix: {0}")]
    BadPrefix(#[from] prefix::BadPrefix),

    #[error("no vrf configured yet")]
    NoVrf,

    #[error("connected route not found for {prefix} on {port}")]
    RouteNotFound { prefix: String, port: String },
}
