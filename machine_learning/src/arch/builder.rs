use comms::specs::{
    server::{DistributionSpec, WeightGenSpec},
    worker::{LayerSpec, ModelSpec},
};

use super::{
    Sequential,
    activations::ActFn,
    layers::{Conv2d, Dense, Flatten, Layer, MaxPool2d},
};
use crate::{MlErr, Result};

/// The feature shape flowing between layers while walking a model spec.
#[derive(Debug, Clone, Copy)]
enum FeatureShape {
    Spatial(usize, usize, usize),
    Flat(usize),
}

impl FeatureShape {
    fn features(self) -> usize {
        match self {
            Self::Spatial(h, w, c) => h * w * c,
            Self::Flat(n) => n,
        }
    }
}

/// Builds a runnable model from its wire specification.
pub fn build(spec: &ModelSpec) -> Result<Sequential> {
    walk(spec).map(|(layers, _)| Sequential::new(layers))
}

/// Derives the initialization plan of the flat parameter stream: one
/// Glorot-uniform entry per kernel and one zero entry per bias, in parameter
/// order. Parameter servers regenerate their shard from this plan.
pub fn init_plan(spec: &ModelSpec) -> Result<Vec<WeightGenSpec>> {
    walk(spec).map(|(_, plan)| plan)
}

/// The total parameter count of a model spec.
pub fn param_count(spec: &ModelSpec) -> Result<usize> {
    init_plan(spec).map(|plan| plan.iter().map(WeightGenSpec::limit).sum())
}

fn walk(spec: &ModelSpec) -> Result<(Vec<Layer>, Vec<WeightGenSpec>)> {
    let ModelSpec::Sequential { input, layers } = spec;

    if input.features() == 0 {
        return Err(MlErr::BadLayer {
            index: 0,
            reason: "input shape has no features".to_string(),
        });
    }

    let mut shape = FeatureShape::Spatial(input.height, input.width, input.channels);
    let mut built = Vec::with_capacity(layers.len());
    let mut plan = Vec::new();

    for (index, layer) in layers.iter().enumerate() {
        let bad = |reason: String| MlErr::BadLayer { index, reason };

        match *layer {
            LayerSpec::Conv2d {
                filters,
                kernel,
                act_fn,
            } => {
                let FeatureShape::Spatial(h, w, c) = shape else {
                    return Err(bad("convolution needs spatial input".to_string()));
                };

                if filters == 0 || kernel == 0 {
                    return Err(bad(format!(
                        "convolution with {filters} filters and kernel {kernel}"
                    )));
                }

                if kernel > h || kernel > w {
                    return Err(bad(format!("kernel {kernel} exceeds input {h}x{w}")));
                }

                plan.push(WeightGenSpec::Rand {
                    distribution: DistributionSpec::GlorotUniform {
                        fan_in: kernel * kernel * c,
                        fan_out: kernel * kernel * filters,
                    },
                    limit: kernel * kernel * c * filters,
                });
                plan.push(WeightGenSpec::Const {
                    value: 0.0,
                    limit: filters,
                });

                let conv = Conv2d::new((h, w, c), filters, kernel, act_fn.map(ActFn::from_spec));
                shape = {
                    let (oh, ow, oc) = conv.out_shape();
                    FeatureShape::Spatial(oh, ow, oc)
                };
                built.push(Layer::Conv2d(conv));
            }
            LayerSpec::MaxPool2d { pool } => {
                let FeatureShape::Spatial(h, w, c) = shape else {
                    return Err(bad("pooling needs spatial input".to_string()));
                };

                if pool == 0 || pool > h || pool > w {
                    return Err(bad(format!("pool {pool} does not fit input {h}x{w}")));
                }

                let max_pool = MaxPool2d::new((h, w, c), pool);
                shape = {
                    let (oh, ow, oc) = max_pool.out_shape();
                    FeatureShape::Spatial(oh, ow, oc)
                };
                built.push(Layer::MaxPool2d(max_pool));
            }
            LayerSpec::Flatten => {
                shape = FeatureShape::Flat(shape.features());
                built.push(Layer::Flatten(Flatten::new()));
            }
            LayerSpec::Dense { units, act_fn } => {
                let FeatureShape::Flat(input) = shape else {
                    return Err(bad("dense needs flattened input".to_string()));
                };

                if units == 0 {
                    return Err(bad("dense with zero units".to_string()));
                }

                plan.push(WeightGenSpec::Rand {
                    distribution: DistributionSpec::GlorotUniform {
                        fan_in: input,
                        fan_out: units,
                    },
                    limit: input * units,
                });
                plan.push(WeightGenSpec::Const {
                    value: 0.0,
                    limit: units,
                });

                built.push(Layer::Dense(Dense::new(
                    (input, units),
                    act_fn.map(ActFn::from_spec),
                )));
                shape = FeatureShape::Flat(units);
            }
        }
    }

    Ok((built, plan))
}

#[cfg(test)]
mod tests {
    use comms::specs::worker::{ActFnSpec, InputSpec};

    use super::*;
    use crate::arch::Model;

    /// The fixed training topology: two convolution+pool blocks, flatten and
    /// two dense layers.
    fn convnet_spec() -> ModelSpec {
        ModelSpec::Sequential {
            input: InputSpec {
                height: 28,
                width: 28,
                channels: 1,
            },
            layers: vec![
                LayerSpec::Conv2d {
                    filters: 32,
                    kernel: 3,
                    act_fn: Some(ActFnSpec::Relu),
                },
                LayerSpec::MaxPool2d { pool: 2 },
                LayerSpec::Conv2d {
                    filters: 64,
                    kernel: 3,
                    act_fn: Some(ActFnSpec::Relu),
                },
                LayerSpec::MaxPool2d { pool: 2 },
                LayerSpec::Flatten,
                LayerSpec::Dense {
                    units: 64,
                    act_fn: Some(ActFnSpec::Relu),
                },
                LayerSpec::Dense {
                    units: 10,
                    act_fn: None,
                },
            ],
        }
    }

    #[test]
    fn convnet_parameter_count() {
        // 320 + 18_496 + 102_464 + 650
        assert_eq!(param_count(&convnet_spec()).unwrap(), 121_930);

        let model = build(&convnet_spec()).unwrap();
        assert_eq!(model.size(), 121_930);
    }

    #[test]
    fn plan_limits_cover_every_parameter() {
        let plan = init_plan(&convnet_spec()).unwrap();

        // One kernel and one bias entry per parameterized layer.
        assert_eq!(plan.len(), 8);
        let total: usize = plan.iter().map(WeightGenSpec::limit).sum();
        assert_eq!(total, 121_930);
    }

    #[test]
    fn rejects_dense_on_spatial_input() {
        let spec = ModelSpec::Sequential {
            input: InputSpec {
                height: 4,
                width: 4,
                channels: 1,
            },
            layers: vec![LayerSpec::Dense {
                units: 2,
                act_fn: None,
            }],
        };

        assert!(build(&spec).is_err());
    }

    #[test]
    fn rejects_oversized_kernel() {
        let spec = ModelSpec::Sequential {
            input: InputSpec {
                height: 2,
                width: 2,
                channels: 1,
            },
            layers: vec![LayerSpec::Conv2d {
                filters: 1,
                kernel: 3,
                act_fn: None,
            }],
        };

        assert!(build(&spec).is_err());
    }
}
