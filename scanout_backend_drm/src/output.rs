// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One output: a device, an overlay plane and its connector.

use std::path::Path;

use drm::control::{self, Device as _};
use scanout_core::error::CapabilityAbsent;
use scanout_core::presenter::{PlaneConfig, PlanePresenter};
use scanout_core::property::ColorProperties;

use crate::device::{DrmDevice, object};
use crate::props::discover_color_properties;

/// An opened output ready to present on.
///
/// Mode-setting and picking the plane, CRTC and connector happen elsewhere;
/// this checks that the chosen objects exist and discovers their colorimetry
/// properties.
#[derive(Debug)]
pub struct DrmOutput {
    device: DrmDevice,
    config: PlaneConfig,
    properties: ColorProperties,
}

impl DrmOutput {
    /// Opens the device node at `path` and binds `config`'s objects.
    pub fn open(path: impl AsRef<Path>, config: PlaneConfig) -> Result<Self, CapabilityAbsent> {
        Self::with_device(DrmDevice::open(path)?, config)
    }

    /// Binds `config`'s objects on an already open device.
    pub fn with_device(device: DrmDevice, config: PlaneConfig) -> Result<Self, CapabilityAbsent> {
        object::<control::plane::Handle>(config.plane.0, "plane")
            .and_then(|handle| device.get_plane(handle))
            .map_err(|err| {
                log::error!("overlay plane {:?} is unusable: {err}", config.plane);
                CapabilityAbsent::Property("overlay plane")
            })?;
        object::<control::connector::Handle>(config.connector.0, "connector")
            .and_then(|handle| device.get_connector(handle, false))
            .map_err(|err| {
                log::error!("connector {:?} is unusable: {err}", config.connector);
                CapabilityAbsent::Property("connector")
            })?;

        let properties = discover_color_properties(&device, config.plane, config.connector)
            .unwrap_or_else(|err| {
                log::warn!("failed to read colorimetry properties: {err}");
                ColorProperties::NONE
            });

        Ok(Self {
            device,
            config,
            properties,
        })
    }

    /// The device.
    #[must_use]
    pub fn device(&self) -> &DrmDevice {
        &self.device
    }

    /// The plane configuration.
    #[must_use]
    pub fn config(&self) -> PlaneConfig {
        self.config
    }

    /// The discovered colorimetry properties.
    #[must_use]
    pub fn properties(&self) -> &ColorProperties {
        &self.properties
    }

    /// A presenter borrowing this output's device.
    #[must_use]
    pub fn presenter(&self) -> PlanePresenter<&DrmDevice> {
        PlanePresenter::new(&self.device, self.config, self.properties.clone())
    }

    /// A presenter owning the device.
    #[must_use]
    pub fn into_presenter(self) -> PlanePresenter<DrmDevice> {
        PlanePresenter::new(self.device, self.config, self.properties)
    }
}
