// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # bench-params
//!
//! `bench-params` resolves the parameters of benchmark runs. Parameters live
//! in named lists of typed values checked against a policy's schema. Each
//! list belongs to a family that decides its default values, and each list
//! can be overridden per layer with specs such as `99@lev2-4`.
//!
//! This crate contains the library behind the `bparams` CLI; the parameter
//! modules do no I/O besides table printing and can be embedded directly.
//!
//! ## Core Modules
//!
//! * [`value`]: The typed [`Value`] sum type, its textual encoding and
//!   widening rules.
//! * [`schema`]: [`ParamTraits`], [`ExpectedParams`] and the
//!   [`ParamsPolicy`] strategy trait.
//! * [`list`]: [`ParameterList`], schema-checked storage with family
//!   defaults, constraints and override application.
//! * [`dictionary`]: [`ParameterDictionary`], named lists with predicate
//!   lookup and per-layer resolution.
//! * [`overrides`]: [`OverridesHolder`], the parser of layer-tagged specs.
//! * [`example`]: A built-in demonstration policy.
//! * [`config`]: Merges config files, environment and command-line values
//!   into a `Config`.
//! * [`cli`]: Defines the `clap`-based command-line interface.
//! * [`error`]: Defines the custom error types for the library.
//! * [`logging`]: Provides the `setup_tracing` utility.

pub mod cli;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod example;
pub mod list;
pub mod logging;
pub mod overrides;
pub mod schema;
pub mod value;

pub use dictionary::ParameterDictionary;
pub use error::ParamsError;
pub use list::ParameterList;
pub use overrides::OverridesHolder;
pub use schema::ExpectedParams;
pub use schema::ParamTraits;
pub use schema::ParamsPolicy;
pub use schema::PrintOptions;
pub use value::Value;
pub use value::ValueType;
