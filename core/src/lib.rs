//! Declarative HTTP resource clients.
//!
//! # Overview
//! A `ResourceClient` wraps one endpoint template such as `users/{id}` and
//! exposes CRUD-style verbs (`get_one`, `get_many`, `create`, `update`,
//! `remove`). Each call resolves the template against the injected base url,
//! sends the request through a `Transport`, and reshapes the JSON reply into
//! records or collections chosen by a `ResponseShape`.
//!
//! # Design
//! - Template parsing and url building live in `endpoint` and do no IO.
//! - The base url is an injected `BaseUrlProvider`, never a global.
//! - Transports only move bytes; status and payload policy stay in the client.
//! - `build_request` is public so hosts can inspect or execute requests
//!   themselves.
//!
//! ```no_run
//! use std::sync::Arc;
//! use resource_core::{ApiOptions, Parameters, ResourceClient};
//!
//! # async fn run() -> Result<(), resource_core::ApiError> {
//! let options = Arc::new(ApiOptions::new("http://localhost:3000"));
//! let users = ResourceClient::new("users/{id}").with_base_url(options);
//!
//! let user = users.get_one(Some(&Parameters::new().with("id", 2))).await?;
//! println!("{:?}", user.get("name"));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod shape;

pub use client::{BeforeSend, CallEvent, ListOptions, ResourceClient, Verb};
pub use config::{ApiOptions, BaseUrlProvider, DEFAULT_TIMEOUT};
pub use endpoint::{resolve, Parameter, Parameters, ResolvedRequest};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use shape::{unwrap_envelope, Generic, Record, ResponseShape, Typed, TypedCollection};
