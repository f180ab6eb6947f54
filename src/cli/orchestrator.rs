use std::sync::Arc;

use crate::config::{AppConfig, DeliveryMode, PresenterConfig};
use crate::core::Result;
use crate::orchestrator::{Orchestrator, ResultDispatcher};
use crate::platform::{ScriptedPresenter, StaticAuthority};

/// Wires the configured platform fixture into an orchestrator. With queued
/// delivery the delivery loop is spawned onto the current runtime.
pub fn create_orchestrator(config: &AppConfig, presenter: &PresenterConfig) -> Result<Orchestrator> {
    let authority = Arc::new(StaticAuthority::from_config(&config.platform)?);
    let presenter = ScriptedPresenter::from_config(Arc::clone(&authority), presenter)?;

    let dispatcher = match config.delivery.mode {
        DeliveryMode::Runtime => ResultDispatcher::current()?,
        DeliveryMode::Queued => {
            let (dispatcher, delivery_loop) = ResultDispatcher::queued();
            tokio::spawn(delivery_loop.run());
            dispatcher
        }
    };

    Orchestrator::builder(authority, Arc::new(presenter))
        .dispatcher(dispatcher)
        .build()
}
