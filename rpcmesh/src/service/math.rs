//! Two arithmetic procedures, declared with `rpc_method!` so their
//! argument table is generated instead of hand-assembled.

use rpcmesh_derive::rpc_method;

rpc_method! {
    /// Adds two integers.
    pub fn sum(
        #[doc = "the first addend"]
        left: i64,
        #[doc = "the second addend"]
        right: i64,
    ) -> i64 {
        left + right
    }
}

rpc_method! {
    /// Multiplies two integers.
    pub fn multiply(
        #[doc = "the first factor"]
        left: i64,
        #[doc = "the second factor"]
        right: i64,
    ) -> i64 {
        left * right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_adds() {
        assert_eq!(sum().invoke((2, 3)), 5);
    }

    #[test]
    fn multiply_multiplies() {
        assert_eq!(multiply().invoke((4, 5)), 20);
    }
}
