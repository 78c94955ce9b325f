//! A small demo [`Callable`] tree — two `math` procedures and one `echo`
//! procedure — used by `rpcmesh serve`/`rpcmesh call` and by the
//! integration tests exercising the end-to-end JSON-RPC scenarios.

use std::sync::Arc;

use rpcmesh_core::rpc::{Callable, RpcObjectBuilder};

mod echo;
mod math;

/// Builds the demo callable tree: `math.sum`, `math.multiply`, `echo.say`.
#[must_use]
pub fn build() -> Arc<dyn Callable> {
    let math_ns = RpcObjectBuilder::new()
        .child("sum", math::sum())
        .child("multiply", math::multiply())
        .build();
    let echo_ns = RpcObjectBuilder::new().child("say", echo::say()).build();

    Arc::new(
        RpcObjectBuilder::new()
            .child("math", math_ns)
            .child("echo", echo_ns)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_demo_method() {
        let root = build();
        assert!(root.resolve("math.sum").is_some());
        assert!(root.resolve("math.multiply").is_some());
        assert!(root.resolve("echo.say").is_some());
        assert!(root.resolve("math.missing").is_none());
    }
}
