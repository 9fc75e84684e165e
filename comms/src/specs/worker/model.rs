use serde::{Deserialize, Serialize};

/// Shape of one input sample, channels last.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InputSpec {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl InputSpec {
    pub fn features(&self) -> usize {
        self.height * self.width * self.channels
    }
}

/// Activation function specification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    Relu,
}

/// Sequential layer specification.
///
/// Convolutions use valid padding and stride 1; pooling uses square windows
/// with stride equal to the window size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Conv2d {
        filters: usize,
        kernel: usize,
        act_fn: Option<ActFnSpec>,
    },
    MaxPool2d {
        pool: usize,
    },
    Flatten,
    Dense {
        units: usize,
        act_fn: Option<ActFnSpec>,
    },
}

/// Model selection and configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSpec {
    Sequential {
        input: InputSpec,
        layers: Vec<LayerSpec>,
    },
}
