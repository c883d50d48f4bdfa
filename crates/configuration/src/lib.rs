//! The `configuration.json` file naming the databases querygate connects to.

pub mod configuration;
pub mod environment;
pub mod error;
pub mod values;
pub mod version1;

pub use configuration::{generate_latest_schema, Configuration, ResolvedDestination};
pub use values::uri::ConnectionUri;
pub use version1::{
    make_runtime_configuration, parse_configuration, write_parsed_configuration,
    ParsedConfiguration,
};
