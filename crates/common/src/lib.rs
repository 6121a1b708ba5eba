// rpcdesk-common: schema model and record types shared across the rpcdesk crates

pub mod jsonc;
pub mod schema;
pub mod types;
