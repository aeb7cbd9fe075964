use {
    crate::{Backend, Device, InferError, ModelSource, Session},
    ndarray::ArrayD,
    ort::{inputs, session::Session as OrtSession, value::TensorRef},
    prism_base::Tensor,
    std::collections::HashMap,
};

/// [`Backend`] running ONNX models through ONNX Runtime.
#[derive(Debug, Clone, Default)]
pub struct OnnxBackend {
    device: Device,
}

impl OnnxBackend {
    pub fn new(device: Device) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl Backend for OnnxBackend {
    fn name(&self) -> &str {
        "onnx"
    }

    fn load_model(&self, model: &ModelSource) -> Result<Box<dyn Session>, InferError> {
        let device = &self.device;
        let mut builder = OrtSession::builder().map_err(|e| {
            InferError::ModelLoad(format!("failed to create session builder: {}", e))
        })?;

        builder = match device {
            Device::Cpu => {
                log::debug!("onnx: using CPU execution provider");
                builder
            }
            #[cfg(feature = "cuda")]
            Device::Cuda { device_id } => {
                use ort::ep::ExecutionProvider;
                use ort::execution_providers::CUDAExecutionProvider;
                let ep = CUDAExecutionProvider::default().with_device_id(*device_id);
                let available = ep.is_available().unwrap_or(false);
                log::info!(
                    "onnx: CUDA EP requested (device_id={}), available: {}",
                    device_id,
                    available
                );
                builder
                    .with_execution_providers([ep.build()])
                    .map_err(|_| InferError::UnsupportedDevice(device.clone()))?
            }
            #[cfg(not(feature = "cuda"))]
            Device::Cuda { .. } => {
                return Err(InferError::UnsupportedDevice(device.clone()));
            }
        };

        let session = match model {
            ModelSource::File(path) => builder.commit_from_file(path).map_err(|e| {
                InferError::ModelLoad(format!("failed to load {}: {}", path.display(), e))
            })?,
            ModelSource::Memory(bytes) => builder.commit_from_memory(bytes).map_err(|e| {
                InferError::ModelLoad(format!("failed to load model from memory: {}", e))
            })?,
        };

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|input| input.name().to_string())
            .collect();
        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|output| output.name().to_string())
            .collect();
        log::info!(
            "onnx: model loaded on {}, inputs {:?}, outputs {:?}",
            device,
            input_names,
            output_names
        );

        Ok(Box::new(OnnxSession {
            session,
            input_names,
            output_names,
        }))
    }
}

pub struct OnnxSession {
    session: OrtSession,
    input_names: Vec<String>,
    output_names: Vec<String>,
}

impl Session for OnnxSession {
    fn run(
        &mut self,
        inputs: &[(&str, &Tensor<f32>)],
    ) -> Result<HashMap<String, Tensor<f32>>, InferError> {
        for (name, _) in inputs {
            if !self.input_names.iter().any(|known| known == name) {
                return Err(InferError::InvalidInput {
                    name: name.to_string(),
                    expected_names: self.input_names.clone(),
                });
            }
        }

        let outputs = match inputs {
            [(name, tensor)] => {
                let array = tensor_to_ndarray(tensor)?;
                let tensor_ref = TensorRef::from_array_view(array.view()).map_err(|e| {
                    InferError::Backend(format!("failed to create tensor ref: {}", e))
                })?;
                self.session
                    .run(inputs![*name => tensor_ref])
                    .map_err(|e| InferError::Backend(format!("inference failed: {}", e)))?
            }
            [(name1, tensor1), (name2, tensor2)] => {
                let array1 = tensor_to_ndarray(tensor1)?;
                let array2 = tensor_to_ndarray(tensor2)?;
                let tensor_ref1 = TensorRef::from_array_view(array1.view()).map_err(|e| {
                    InferError::Backend(format!("failed to create tensor ref 1: {}", e))
                })?;
                let tensor_ref2 = TensorRef::from_array_view(array2.view()).map_err(|e| {
                    InferError::Backend(format!("failed to create tensor ref 2: {}", e))
                })?;
                self.session
                    .run(inputs![*name1 => tensor_ref1, *name2 => tensor_ref2])
                    .map_err(|e| InferError::Backend(format!("inference failed: {}", e)))?
            }
            _ => {
                return Err(InferError::Backend(format!(
                    "{} inputs given, only 1 or 2 are supported",
                    inputs.len()
                )));
            }
        };

        let mut result = HashMap::new();
        for output_name in &self.output_names {
            let value = &outputs[output_name.as_str()];
            let array = value.try_extract_array::<f32>().map_err(|e| {
                InferError::Backend(format!("output '{}' is not f32: {}", output_name, e))
            })?;
            result.insert(output_name.clone(), ndarray_to_tensor(array)?);
        }

        Ok(result)
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }
}

pub fn tensor_to_ndarray(tensor: &Tensor<f32>) -> Result<ArrayD<f32>, InferError> {
    ArrayD::from_shape_vec(tensor.shape.clone(), tensor.data.clone()).map_err(|e| {
        InferError::ShapeMismatch {
            expected: format!("{:?}", tensor.shape),
            got: e.to_string(),
        }
    })
}

pub fn ndarray_to_tensor(
    array: ndarray::ArrayView<'_, f32, ndarray::IxDyn>,
) -> Result<Tensor<f32>, InferError> {
    let shape = array.shape().to_vec();
    let data = array.iter().copied().collect();
    Ok(Tensor::new(shape, data)?)
}
