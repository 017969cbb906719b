//! RPC request and response definitions

pub(crate) mod json_rpc;
pub use json_rpc::*;

pub(crate) mod compute;
pub use compute::*;
