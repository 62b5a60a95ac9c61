pub(crate) mod certs;

pub(crate) mod fixtures;

pub(crate) mod logging;
