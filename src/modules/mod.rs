pub mod bootstrap;
pub mod health;

use std::sync::Arc;

use bedrock_db::{BootstrapPlan, Engine};
use bedrock_kernel::{settings::Settings, ModuleRegistry};

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, engine: Arc<dyn Engine>, settings: &Settings) {
    registry.register_custom(health::create_module(engine.clone()));
    registry.register_custom(bootstrap::create_module(
        engine,
        BootstrapPlan::from(&settings.bootstrap),
    ));
}
