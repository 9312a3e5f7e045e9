//! Explicit dependency resolution.
//!
//! Resources are registered by name into a [`Dependencies`] set and looked up
//! by the names a configuration declares. A missing name is a construction
//! error; nothing is looked up after construction.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hardware::{BaseEmulator, MovementBase, ServoDriver};
use shared::{BaseControlConfig, Camera, TrackerConfig, VisionService};
use tracing::{debug, info};

use crate::control::ControlParams;
use crate::controller::TrackingController;
use crate::error::{ComponentKind, TrackerError, TrackerResult};
use crate::sampler::DetectionSampler;

/// Named resources available to a component under construction.
#[derive(Default, Clone)]
pub struct Dependencies {
    servos: HashMap<String, Arc<dyn ServoDriver>>,
    bases: HashMap<String, Arc<dyn MovementBase>>,
    cameras: HashMap<String, Arc<dyn Camera>>,
    visions: HashMap<String, Arc<dyn VisionService>>,
}

fn lookup<T: ?Sized>(
    map: &HashMap<String, Arc<T>>,
    kind: ComponentKind,
    name: &str,
) -> TrackerResult<Arc<T>> {
    match map.get(name) {
        Some(resource) => {
            debug!("Resolved {} {:?}", kind, name);
            Ok(resource.clone())
        }
        None => Err(TrackerError::ComponentUnavailable {
            kind,
            name: name.to_string(),
        }),
    }
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_servo(mut self, servo: Arc<dyn ServoDriver>) -> Self {
        self.servos.insert(servo.name().to_string(), servo);
        self
    }

    pub fn with_base(mut self, base: Arc<dyn MovementBase>) -> Self {
        self.bases.insert(base.name().to_string(), base);
        self
    }

    pub fn with_camera(mut self, camera: Arc<dyn Camera>) -> Self {
        self.cameras.insert(camera.name().to_string(), camera);
        self
    }

    pub fn with_vision(mut self, vision: Arc<dyn VisionService>) -> Self {
        self.visions.insert(vision.name().to_string(), vision);
        self
    }

    pub fn servo(&self, name: &str) -> TrackerResult<Arc<dyn ServoDriver>> {
        lookup(&self.servos, ComponentKind::Servo, name)
    }

    pub fn base(&self, name: &str) -> TrackerResult<Arc<dyn MovementBase>> {
        lookup(&self.bases, ComponentKind::Base, name)
    }

    pub fn camera(&self, name: &str) -> TrackerResult<Arc<dyn Camera>> {
        lookup(&self.cameras, ComponentKind::Camera, name)
    }

    pub fn vision(&self, name: &str) -> TrackerResult<Arc<dyn VisionService>> {
        lookup(&self.visions, ComponentKind::Vision, name)
    }
}

/// Build a base emulator over the servos named in `config`, bounding every
/// servo command by `command_timeout`.
pub fn base_from_config(
    name: &str,
    config: &BaseControlConfig,
    deps: &Dependencies,
    command_timeout: Duration,
) -> TrackerResult<BaseEmulator> {
    let pan = deps.servo(&config.pan)?;
    let tilt = deps.servo(&config.tilt)?;
    Ok(BaseEmulator::new(name, pan, tilt).with_command_timeout(command_timeout))
}

impl TrackingController {
    /// Build a controller from its configuration, starting it when
    /// `auto_start` is set.
    ///
    /// Dependencies resolve in the order base, vision, camera; the first
    /// missing one is reported.
    pub async fn from_config(
        name: &str,
        config: &TrackerConfig,
        deps: &Dependencies,
        params: ControlParams,
    ) -> TrackerResult<Self> {
        config.validate()?;
        params.validate()?;

        let base = deps.base(&config.base_name)?;
        let vision = deps.vision(&config.vision_name)?;
        let camera = deps.camera(&config.camera_name)?;

        let sampler = DetectionSampler::new(
            camera,
            vision,
            config.object_label.clone(),
            config.confidence_level,
        )
        .with_timeout(params.io_timeout);

        let controller = TrackingController::new(name, base, sampler, params);
        info!(
            "{}: built over base={} camera={} vision={}",
            name, config.base_name, config.camera_name, config.vision_name
        );
        if config.auto_start {
            controller.start().await?;
        }
        Ok(controller)
    }
}
