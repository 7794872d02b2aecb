#![deny(clippy::all, clippy::perf, clippy::correctness, rust_2018_idioms)]
#![warn(clippy::unwrap_used)]

pub mod api_info;
pub mod rpc;

pub use api_info::ApiInfo;
pub use rpc::{MinerRpcClient, RpcError};
