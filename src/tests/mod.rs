mod server_test;

pub(crate) mod support;
