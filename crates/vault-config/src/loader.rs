//! Multi-file configuration loading.
//!
//! A file may name other files in `include`, either a single string or an
//! array of strings. Includes nest, and a relative include resolves against
//! the directory of the file that names it. Every top-level section must be
//! defined in exactly one file.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

const INCLUDE_KEY: &str = "include";

/// Loads a configuration entry file together with everything it includes.
pub struct ConfigLoader {
	/// Directory the entry file is resolved against.
	base_dir: PathBuf,
	/// Files on the current include path, outermost first.
	chain: Vec<PathBuf>,
	/// Every file merged so far.
	merged_files: HashSet<PathBuf>,
	/// File that defined each top-level section.
	origins: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_dir: impl AsRef<Path>) -> Self {
		Self {
			base_dir: base_dir.as_ref().to_path_buf(),
			chain: Vec::new(),
			merged_files: HashSet::new(),
			origins: HashMap::new(),
		}
	}

	/// Loads `entry`, merges its includes and validates the result.
	pub async fn load_config(&mut self, entry: impl AsRef<Path>) -> Result<Config, ConfigError> {
		let entry = locate(&self.base_dir, entry.as_ref()).await?;

		let mut merged = toml::Table::new();
		self.merge_file(entry, &mut merged).await?;

		let rendered = toml::to_string(&merged).map_err(|e| {
			ConfigError::Parse(format!("Failed to render merged configuration: {}", e))
		})?;
		rendered.parse()
	}

	async fn merge_file(&mut self, path: PathBuf, into: &mut toml::Table) -> Result<(), ConfigError> {
		if let Some(start) = self.chain.iter().position(|p| *p == path) {
			let cycle: Vec<String> = self.chain[start..]
				.iter()
				.chain(std::iter::once(&path))
				.map(|p| p.display().to_string())
				.collect();
			return Err(ConfigError::Validation(format!(
				"Circular include: {}",
				cycle.join(" -> ")
			)));
		}
		if !self.merged_files.insert(path.clone()) {
			return Err(ConfigError::Validation(format!(
				"{} is included more than once",
				path.display()
			)));
		}

		let raw = tokio::fs::read_to_string(&path).await?;
		let mut table: toml::Table = toml::from_str(&resolve_env_vars(&raw)?)?;
		let includes = match table.remove(INCLUDE_KEY) {
			Some(value) => include_list(value)?,
			None => Vec::new(),
		};

		for (section, value) in table {
			if let Some(first) = self.origins.get(&section) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}",
					section,
					first.display(),
					path.display()
				)));
			}
			self.origins.insert(section.clone(), path.clone());
			into.insert(section, value);
		}

		let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
		self.chain.push(path);
		for include in includes {
			let resolved = locate(&dir, &include).await?;
			Box::pin(self.merge_file(resolved, into)).await?;
		}
		self.chain.pop();

		Ok(())
	}
}

/// Canonical path of `path`, resolved against `dir` when relative.
async fn locate(dir: &Path, path: &Path) -> Result<PathBuf, ConfigError> {
	let candidate = if path.is_absolute() {
		path.to_path_buf()
	} else {
		dir.join(path)
	};
	tokio::fs::canonicalize(&candidate).await.map_err(|e| {
		ConfigError::Io(std::io::Error::new(
			e.kind(),
			format!("Configuration file not found: {} ({})", candidate.display(), e),
		))
	})
}

fn include_list(value: toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
	match value {
		toml::Value::String(path) => Ok(vec![PathBuf::from(path)]),
		toml::Value::Array(items) => items
			.into_iter()
			.map(|item| match item {
				toml::Value::String(path) => Ok(PathBuf::from(path)),
				other => Err(ConfigError::Validation(format!(
					"include entries must be strings, found {}",
					other.type_str()
				))),
			})
			.collect(),
		other => Err(ConfigError::Validation(format!(
			"include must be a string or an array of strings, found {}",
			other.type_str()
		))),
	}
}
