//! Command handlers, one module per subcommand.

pub(crate) mod cancel;
pub(crate) mod download;
pub(crate) mod info;
pub(crate) mod status;
pub(crate) mod watch;
