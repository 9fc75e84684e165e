use comms::specs::server::ServerSpec;

use super::PServer;
use crate::{initialization, optimization, parameters::ShardState};

/// Builds `PServer` instances out of their wire specifications.
#[derive(Default)]
pub struct ServerBuilder;

impl ServerBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Materializes the spec's shard and wires it to its optimizer.
    ///
    /// # Arguments
    /// * `spec` - The server bootstrap specification.
    ///
    /// # Returns
    /// A ready `PServer`, or an error if the initialization plan is invalid.
    pub fn build(&self, spec: ServerSpec) -> Result<PServer, initialization::InitErr> {
        let params =
            initialization::materialize(&spec.init, spec.seed, spec.range, spec.total_params)?;
        let optimizer = optimization::from_spec(spec.optimizer, params.len());

        Ok(PServer::new(ShardState::new(params, optimizer)))
    }
}
