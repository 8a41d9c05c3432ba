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
use Commands::Check;
use Commands::Dump;
use Commands::Get;
use Commands::Show;
use anyhow::Result;
use bench_params::ParameterDictionary;
use bench_params::ParameterList;
use bench_params::PrintOptions;
use bench_params::cli::Cli;
use bench_params::cli::Commands;
use bench_params::config::Config;
use bench_params::logging::setup_tracing;
use clap::Parser;
use std::collections::BTreeMap;
use std::io::Write;

/// A list as seen on `layer`, or the base list when no layer is given.
fn resolve(dictionary: &ParameterDictionary, name: &str, layer: Option<usize>) -> Result<ParameterList> {
  Ok(match layer {
    Some(layer) => dictionary.get_on_layer(name, layer)?,
    None => dictionary.get(name)?.clone(),
  })
}

fn main() -> Result<()> {
  let _guard = setup_tracing()?;

  let Cli { command } = Cli::parse();
  let main_span = tracing::info_span!("bparams");
  let _enter = main_span.enter();

  let mut out = std::io::stdout().lock();

  match command {
    Show {
      source,
      list,
      layer,
      debug_tables,
    } => {
      let dictionary = Config::try_from(source)?.into_dictionary()?;
      let options = PrintOptions { debug_tables };
      match list {
        Some(name) => resolve(&dictionary, &name, layer)?.print_to(&mut out, &name, &options)?,
        None => dictionary.print_to(&mut out, &options)?,
      }
    }
    Get {
      source,
      list,
      key,
      layer,
    } => {
      let dictionary = Config::try_from(source)?.into_dictionary()?;
      let value = resolve(&dictionary, &list, layer)?.get_value_as_string(&key)?;
      writeln!(out, "{value}")?;
    }
    Check {
      source,
      list,
      key,
      value,
    } => {
      let dictionary = Config::try_from(source)?.into_dictionary()?;
      let params = dictionary.get(&list)?;
      params.traits(&key)?;
      if !params.is_value_allowed(&key, value.as_str()) {
        anyhow::bail!("Value '{value}' is not allowed for '{key}' in list '{list}'");
      }
      writeln!(out, "Value '{value}' is allowed for '{key}'")?;
    }
    Dump { source, layer } => {
      let dictionary = Config::try_from(source)?.into_dictionary()?;
      let mut resolved = BTreeMap::new();
      for name in dictionary.names() {
        if !ParameterDictionary::is_override_name(name) {
          resolved.insert(name, resolve(&dictionary, name, layer)?);
        }
      }
      writeln!(out, "{}", serde_json::to_string_pretty(&resolved)?)?;
    }
  }

  Ok(())
}
