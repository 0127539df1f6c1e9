//! Capability negotiation during initialization.

use crate::types::{InitializeParams, InitializeResult, MCP_VERSION};

/// Answer an `initialize` request. The server offers the same capabilities to every
/// client, so nothing is retained between calls.
pub fn negotiate(params: &InitializeParams) -> InitializeResult {
    if params.protocol_version != MCP_VERSION {
        tracing::warn!(
            "Client requested protocol version {}, server speaks {}; continuing with {}",
            params.protocol_version,
            MCP_VERSION,
            MCP_VERSION
        );
    }

    tracing::info!(
        "Initialized with client: {} v{}",
        params.client_info.name,
        params.client_info.version
    );
    tracing::debug!(
        "Client capabilities: sampling={} roots={}",
        params.capabilities.sampling.is_some(),
        params.capabilities.roots.is_some()
    );

    InitializeResult::default_result()
}
