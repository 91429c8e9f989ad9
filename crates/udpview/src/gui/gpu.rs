use anyhow::anyhow;
use wgpu::{
    Adapter, AdapterInfo, Backends, Device, DeviceDescriptor, Features, Instance, Limits, Queue,
};

/// The graphics device windows render with.
pub struct Gpu {
    instance: Instance,
    adapter: Adapter,
    device: Device,
    queue: Queue,
}

impl Gpu {
    /// Opens a suitable default GPU.
    pub async fn open() -> anyhow::Result<Self> {
        // The OpenGL backend panics spuriously, so don't enable it.
        let backends = Backends::PRIMARY;
        let instance = Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        log::info!("available graphics adapters:");
        for adapter in instance.enumerate_adapters(backends) {
            log_adapter("-", &adapter.get_info());
        }

        let adapter = instance
            .request_adapter(&Default::default())
            .await
            .ok_or_else(|| anyhow!("no graphics adapter found"))?;
        log_adapter("using", &adapter.get_info());
        log::debug!("adapter limits: {:?}", adapter.limits());

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: None,
                    features: Features::empty(),
                    // Use the texture size limits of the adapter, so that large frames fit.
                    limits: Limits::downlevel_defaults().using_resolution(adapter.limits()),
                },
                None,
            )
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }
}

fn log_adapter(prefix: &str, info: &AdapterInfo) {
    log::info!(
        "{prefix} {} ({:?}, {:?}, driver: {} {})",
        info.name,
        info.device_type,
        info.backend,
        info.driver,
        info.driver_info,
    );
}
