use loadfarm_common::config::AppConfig;

use crate::id::ControllerId;

#[derive(Debug, Clone)]
#[readonly::make]
pub struct ControllerOptions {
    pub controller_id: ControllerId,
    pub listen_host: String,
    pub listen_port: u16,
    pub external_host: String,
    /// The port advertised in report callback URLs, or `None` to use the bound port.
    pub external_port: Option<u16>,
}

impl ControllerOptions {
    pub fn new(config: &AppConfig) -> Self {
        let controller = &config.controller;
        Self {
            controller_id: ControllerId::random(),
            listen_host: controller.listen_host.clone(),
            listen_port: controller.listen_port,
            external_host: controller.external_host.clone(),
            external_port: (controller.external_port > 0).then_some(controller.external_port),
        }
    }
}
