pub(crate) mod errors;
pub(crate) mod stripe;
pub(crate) mod traits;
pub(crate) mod types;

pub(crate) use errors::ProcessorError;
pub(crate) use stripe::StripeProcessor;
