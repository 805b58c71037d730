pub(crate) mod context;
pub(crate) mod recovery;
pub(crate) mod request;
pub(crate) mod response;
pub(crate) mod timeout;
pub(crate) mod validation;
