//! A single identity procedure used to exercise the string codec path.

use rpcmesh_derive::rpc_method;

rpc_method! {
    /// Returns `message` unchanged.
    pub fn say(
        #[doc = "the text to echo back"]
        message: String,
    ) -> String {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_its_argument() {
        assert_eq!(say().invoke(("hello".to_string(),)), "hello");
    }
}
