//! # User Profile Example
//!
//! Two views handled through a single entry point.
//!
//! This example showcases:
//! - A synchronous reducer ([`email_form`]): typing and confirming an email
//! - An effectful reducer ([`profile`]): loading and saving a profile over
//!   the network, with in-flight indicators guarding every completion
//! - A provider boundary ([`api`]) with HTTP and in-memory implementations
//! - An effect executor ([`executor`]) turning API results into completion
//!   events
//!
//! ## Example
//!
//! ```no_run
//! use single_entry_core::SystemClock;
//! use single_entry_runtime::Store;
//! use user_profile::api::{InMemoryProfileApi, Profile};
//! use user_profile::executor::ProfileExecutor;
//! use user_profile::profile::{ProfileEnvironment, ProfileEvent, ProfileReducer, ProfileState};
//!
//! # async fn example() -> Result<(), single_entry_runtime::StoreError> {
//! let api = InMemoryProfileApi::new(Profile {
//!     email: "john@example.com".to_string(),
//!     display_name: None,
//! });
//! let store = Store::new(
//!     ProfileState::default(),
//!     ProfileReducer::new(),
//!     ProfileEnvironment::new(SystemClock),
//!     ProfileExecutor::new(api),
//! );
//!
//! let mut handle = store.handle(ProfileEvent::SystemShowsUserProfileView).await?;
//! assert!(store.state(ProfileState::is_loading).await);
//!
//! handle.wait().await;
//! assert_eq!(store.state(|s| s.email.clone()).await, "john@example.com");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod email_form;
pub mod executor;
pub mod profile;

pub use api::{HttpProfileApi, InMemoryProfileApi, Profile, ProfileApi, ProfileApiConfig};
pub use email_form::{EmailFormEvent, EmailFormReducer, EmailFormState};
pub use executor::ProfileExecutor;
pub use profile::{ProfileEffect, ProfileEnvironment, ProfileEvent, ProfileReducer, ProfileState};
