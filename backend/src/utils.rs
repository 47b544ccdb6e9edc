pub(crate) mod http_client;

pub(crate) use http_client::{create_http_client, with_timeout};
