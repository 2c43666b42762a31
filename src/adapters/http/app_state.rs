use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    infra::config::AppConfig,
    use_cases::{billing::BillingUseCases, generation::GenerationUseCases},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub billing_use_cases: Arc<BillingUseCases>,
    pub generation_use_cases: Arc<GenerationUseCases>,
}

impl FromRef<AppState> for Arc<BillingUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.billing_use_cases.clone()
    }
}

impl FromRef<AppState> for Arc<GenerationUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.generation_use_cases.clone()
    }
}
