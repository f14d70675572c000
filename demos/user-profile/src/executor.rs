//! Effect executor of the profile view.

use crate::api::ProfileApi;
use crate::profile::{ProfileEffect, ProfileEvent};
use single_entry_core::effect::EffectExecutor;
use std::future::Future;
use std::pin::Pin;

/// Runs [`ProfileEffect`]s against a [`ProfileApi`]
///
/// Each effect performs exactly one API call and yields exactly one
/// completion event. API failures travel inside that event.
#[derive(Debug, Clone)]
pub struct ProfileExecutor<A> {
    api: A,
}

impl<A: ProfileApi> ProfileExecutor<A> {
    /// Create an executor backed by `api`
    #[must_use]
    pub const fn new(api: A) -> Self {
        Self { api }
    }

    /// The injected API
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }
}

impl<A: ProfileApi> EffectExecutor<ProfileEffect, ProfileEvent> for ProfileExecutor<A> {
    fn execute(&self, effect: ProfileEffect) -> Pin<Box<dyn Future<Output = ProfileEvent> + Send + '_>> {
        Box::pin(async move {
            match effect {
                ProfileEffect::LoadProfile(ticket) => {
                    let result = self.api.load_profile().await;
                    if let Err(error) = &result {
                        tracing::warn!(error = %error, "Profile load failed");
                    }
                    ProfileEvent::NetworkFinishesLoadingProfile(ticket, result)
                },
                ProfileEffect::SaveProfile(ticket, profile) => {
                    let result = self.api.save_profile(profile).await;
                    if let Err(error) = &result {
                        tracing::warn!(error = %error, "Profile save failed");
                    }
                    ProfileEvent::NetworkFinishesSavingProfile(ticket, result)
                },
            }
        })
    }
}
