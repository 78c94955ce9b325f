//! JSON-WSP service description documents for an `rpcmesh-core` callable
//! tree: the machine-readable interface description a server can hand out
//! at its description endpoint, derived from the same argument tables and
//! type descriptors dispatch itself uses.

mod describe;
mod filler;

pub use describe::describe;
