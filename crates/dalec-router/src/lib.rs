// Copyright (c) Contributors to the Dalec project.
// SPDX-License-Identifier: Apache-2.0
// https://github.com/dalec-build/dalec

//! Dispatches requested build targets to registered distro
//! handlers: prefix routing, platform fan-out and the
//! introspection subrequests.

mod dispatch;
mod error;
mod router;

pub use dispatch::{Frontend, Subrequest};
pub use error::{Error, Result};
pub use router::{BuildProduct, BuildRequest, Handler, Router, RouterBuilder};
