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
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "Resolver of layered benchmark parameters")]
pub struct Cli {
  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
  /// Apply defaults and print the parameter table.
  Show {
    #[command(flatten)]
    source: SourceArgs,

    /// Print only this list.
    #[arg(long)]
    list: Option<String>,

    /// Resolve the list's overrides for this layer.
    #[arg(long, requires = "list")]
    layer: Option<usize>,

    /// Let print converters emit their debug rendering.
    #[arg(long)]
    debug_tables: bool,
  },

  /// Print the canonical text of one value.
  Get {
    #[command(flatten)]
    source: SourceArgs,

    list: String,

    key: String,

    /// Resolve the list's overrides for this layer.
    #[arg(long)]
    layer: Option<usize>,
  },

  /// Check a candidate value against a key's constraints.
  /// Exits with failure when the value is not allowed.
  Check {
    #[command(flatten)]
    source: SourceArgs,

    list: String,

    key: String,

    value: String,
  },

  /// Print every resolved list as JSON.
  Dump {
    #[command(flatten)]
    source: SourceArgs,

    /// Resolve overrides for this layer.
    #[arg(long)]
    layer: Option<usize>,
  },
}

/// Where parameter values come from.
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
  /// Configuration file with `[lists.<name>]` and `[overrides.<name>]`
  /// tables. TOML, or JSON when the extension is `.json`.
  #[arg(long, env = "BPARAMS_CONFIG")]
  pub config: Option<PathBuf>,

  /// Built-in parameter policy.
  #[arg(long, default_value = "example")]
  pub policy: String,

  /// Set a value. Example: --set foo.integer=7
  #[arg(long = "set", value_name = "LIST.KEY=VALUE")]
  pub sets: Vec<String>,

  /// Add a layer override. Example: --override foo.integer=99@lev2-4
  #[arg(long = "override", value_name = "LIST.KEY=SPEC")]
  pub overrides: Vec<String>,
}
