// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod abi;
mod activation;
mod composition;
mod config;
mod conversion;
mod param;
mod registry;
mod wire;

pub use abi::AbiError;
pub use activation::ActivationError;
pub use composition::CompositionError;
pub use config::{BuildError, ConfigError, ValidationError};
pub use conversion::ConversionError;
pub use param::ParamError;
pub use registry::RegistryError;
pub use wire::WireError;
