use std::{
    env,
    error::Error,
    fmt::{self, Display},
};

use serde::{Deserialize, Serialize};

/// Environment variable holding the JSON cluster configuration.
///
/// The launcher exports it before dispatching on its role; the coordinator's
/// cluster resolver reads it back.
pub const CONFIG_ENV: &str = "TRAIN_CONFIG";

/// The role a process plays in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Worker,
    Ps,
    Chief,
}

impl TaskType {
    /// Maps a role string onto a task type. Anything that is not a server
    /// role falls through to `Chief`, which proceeds as coordinator.
    pub fn from_role(role: &str) -> Self {
        match role {
            "worker" => Self::Worker,
            "ps" => Self::Ps,
            _ => Self::Chief,
        }
    }
}

impl Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Worker => "worker",
            Self::Ps => "ps",
            Self::Chief => "chief",
        };

        write!(f, "{s}")
    }
}

/// Role to ordered `host:port` lists for the whole cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub worker: Vec<String>,
    pub ps: Vec<String>,
}

impl ClusterSpec {
    /// Builds a cluster spec from comma-separated host lists.
    ///
    /// # Arguments
    /// * `worker_hosts` - Comma-separated `host:port` list for the worker role.
    /// * `ps_hosts` - Comma-separated `host:port` list for the ps role.
    ///
    /// # Returns
    /// The parsed spec, or an error if either list is empty or has a blank entry.
    pub fn from_host_lists(worker_hosts: &str, ps_hosts: &str) -> Result<Self, ClusterErr> {
        Ok(Self {
            worker: Self::split_hosts(TaskType::Worker, worker_hosts)?,
            ps: Self::split_hosts(TaskType::Ps, ps_hosts)?,
        })
    }

    pub fn num_workers(&self) -> usize {
        self.worker.len()
    }

    pub fn num_ps(&self) -> usize {
        self.ps.len()
    }

    /// Returns the host list for `role`, or `None` for roles without one.
    pub fn hosts(&self, role: TaskType) -> Option<&[String]> {
        match role {
            TaskType::Worker => Some(&self.worker),
            TaskType::Ps => Some(&self.ps),
            TaskType::Chief => None,
        }
    }

    fn split_hosts(role: TaskType, hosts: &str) -> Result<Vec<String>, ClusterErr> {
        if hosts.is_empty() {
            return Err(ClusterErr::EmptyHostList { role });
        }

        hosts
            .split(',')
            .enumerate()
            .map(|(index, host)| {
                if host.is_empty() {
                    Err(ClusterErr::EmptyHost { role, index })
                } else {
                    Ok(host.to_string())
                }
            })
            .collect()
    }
}

/// This process's role and index within its role list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub index: usize,
}

/// The full cluster configuration exported through [`CONFIG_ENV`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub cluster: ClusterSpec,
    pub task: TaskSpec,
}

impl ClusterConfig {
    /// Creates a validated cluster configuration.
    ///
    /// # Arguments
    /// * `cluster` - The role to host-list mapping.
    /// * `task_type` - This process's role.
    /// * `index` - This process's index within its role list.
    ///
    /// # Returns
    /// The configuration, or an error if `index` is out of range for a server role.
    pub fn new(cluster: ClusterSpec, task_type: TaskType, index: usize) -> Result<Self, ClusterErr> {
        if let Some(hosts) = cluster.hosts(task_type) {
            if index >= hosts.len() {
                return Err(ClusterErr::IndexOutOfRange {
                    role: task_type,
                    index,
                    len: hosts.len(),
                });
            }
        }

        Ok(Self {
            cluster,
            task: TaskSpec { task_type, index },
        })
    }

    /// Returns this task's own `host:port`, or `None` for roles without a host list.
    pub fn task_addr(&self) -> Option<&str> {
        self.cluster
            .hosts(self.task.task_type)
            .map(|hosts| hosts[self.task.index].as_str())
    }

    /// Serializes the configuration for the [`CONFIG_ENV`] variable.
    pub fn to_json(&self) -> Result<String, ClusterErr> {
        serde_json::to_string(self).map_err(ClusterErr::BadJson)
    }

    /// Reads the configuration back from [`CONFIG_ENV`].
    pub fn from_env() -> Result<Self, ClusterErr> {
        let json = env::var(CONFIG_ENV).map_err(|_| ClusterErr::MissingEnv)?;
        serde_json::from_str(&json).map_err(ClusterErr::BadJson)
    }
}

/// Cluster topology construction failures.
#[derive(Debug)]
pub enum ClusterErr {
    EmptyHostList {
        role: TaskType,
    },
    EmptyHost {
        role: TaskType,
        index: usize,
    },
    IndexOutOfRange {
        role: TaskType,
        index: usize,
        len: usize,
    },
    MissingEnv,
    BadJson(serde_json::Error),
}

impl Display for ClusterErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyHostList { role } => write!(f, "empty host list for role {role}"),
            Self::EmptyHost { role, index } => {
                write!(f, "empty host at position {index} of the {role} list")
            }
            Self::IndexOutOfRange { role, index, len } => write!(
                f,
                "task index {index} is out of range for role {role} with {len} host(s)"
            ),
            Self::MissingEnv => write!(f, "environment variable {CONFIG_ENV} is not set"),
            Self::BadJson(e) => write!(f, "bad cluster configuration json: {e}"),
        }
    }
}

impl Error for ClusterErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::BadJson(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_list_length_is_commas_plus_one() {
        let spec = ClusterSpec::from_host_lists("w0:50000,w1:50001,w2:50002", "h1:1,h2:2").unwrap();
        assert_eq!(spec.num_workers(), 3);
        assert_eq!(spec.num_ps(), 2);
        assert_eq!(spec.ps, vec!["h1:1".to_string(), "h2:2".to_string()]);
    }

    #[test]
    fn rejects_empty_lists_and_blank_entries() {
        assert!(ClusterSpec::from_host_lists("", "h1:1").is_err());
        assert!(ClusterSpec::from_host_lists("w0:1,,w2:3", "h1:1").is_err());
    }

    #[test]
    fn config_echoes_role_and_index() {
        let spec = ClusterSpec::from_host_lists("w0:1,w1:2", "p0:3").unwrap();
        let config = ClusterConfig::new(spec, TaskType::Worker, 1).unwrap();

        assert_eq!(config.task.task_type, TaskType::Worker);
        assert_eq!(config.task.index, 1);
        assert_eq!(config.task_addr(), Some("w1:2"));
    }

    #[test]
    fn rejects_out_of_range_index() {
        let spec = ClusterSpec::from_host_lists("w0:1", "p0:3").unwrap();
        assert!(ClusterConfig::new(spec, TaskType::Ps, 1).is_err());
    }

    #[test]
    fn chief_has_no_host_entry() {
        let spec = ClusterSpec::from_host_lists("w0:1", "p0:3").unwrap();
        let config = ClusterConfig::new(spec, TaskType::Chief, 0).unwrap();
        assert_eq!(config.task_addr(), None);
    }

    #[test]
    fn json_roundtrip() {
        let spec = ClusterSpec::from_host_lists("w0:1,w1:2", "p0:3").unwrap();
        let config = ClusterConfig::new(spec, TaskType::Chief, 0).unwrap();

        let json = config.to_json().unwrap();
        let back: ClusterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
