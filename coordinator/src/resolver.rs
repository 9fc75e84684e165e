use comms::specs::cluster::{ClusterConfig, ClusterSpec, TaskType};

use crate::CoordinatorError;

/// Resolves the cluster topology this process belongs to.
///
/// The launcher exports the topology as JSON in an environment variable; this
/// reads it back, so the coordinator sees exactly what the CLI described.
#[derive(Debug, Clone)]
pub struct ClusterResolver {
    config: ClusterConfig,
}

impl ClusterResolver {
    /// Reads the cluster configuration from the environment.
    pub fn from_env() -> Result<Self, CoordinatorError> {
        ClusterConfig::from_env()
            .map(Self::from_config)
            .map_err(|e| CoordinatorError::InvalidConfig(e.to_string()))
    }

    /// Wraps an already-built configuration.
    pub fn from_config(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn cluster(&self) -> &ClusterSpec {
        &self.config.cluster
    }

    pub fn task_type(&self) -> TaskType {
        self.config.task.task_type
    }

    pub fn task_index(&self) -> usize {
        self.config.task.index
    }

    pub fn num_workers(&self) -> usize {
        self.config.cluster.num_workers()
    }

    pub fn num_ps(&self) -> usize {
        self.config.cluster.num_ps()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_echoes_the_config() {
        let spec = ClusterSpec::from_host_lists("w0:1,w1:2", "p0:3,p1:4,p2:5").unwrap();
        let config = ClusterConfig::new(spec, TaskType::Chief, 0).unwrap();
        let resolver = ClusterResolver::from_config(config);

        assert_eq!(resolver.task_type(), TaskType::Chief);
        assert_eq!(resolver.task_index(), 0);
        assert_eq!(resolver.num_workers(), 2);
        assert_eq!(resolver.num_ps(), 3);
    }
}
