//! Shared application state

use std::sync::Arc;

use handlebars::Handlebars;

use estate_core::Services;
use estate_shared::config::ServerSettings;

use crate::dashboard;

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub settings: Arc<ServerSettings>,
    pub templates: Arc<Handlebars<'static>>,
    /// Actor recorded in audit fields when a request carries no `X-Actor`.
    pub default_actor: Arc<str>,
}

impl AppState {
    pub fn new(
        services: Services,
        settings: ServerSettings,
        default_actor: &str,
    ) -> Result<Self, handlebars::TemplateError> {
        Ok(Self {
            services,
            settings: Arc::new(settings),
            templates: Arc::new(dashboard::templates()?),
            default_actor: Arc::from(default_actor),
        })
    }
}
