// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]

#[macro_use]
mod logging;

pub mod demand;
pub mod gated_stream;
pub mod pull_controller;
pub mod source;

pub use self::demand::{demand_pair, Acquire, DemandGate, DemandHandle};
pub use self::gated_stream::DemandGated;
pub use self::pull_controller::{push_source, PullController, PushSource, PushStream};
pub use self::source::{BoxItemStream, Source, SourceExt, StreamSource, Subscription};
