//! Configuration for locating the LLVM shared library.
//!
//! The library is located, in order of preference, by:
//!
//! 1. An explicit path to the library file.
//! 2. Each of the configured search directories combined with each candidate
//!    file name.
//! 3. Each candidate file name on its own, leaving the search to the
//!    platform's dynamic loader.

use std::{
    env,
    path::{Path, PathBuf},
};

use crate::constant::{
    LIBRARY_ENV_VAR,
    LIBRARY_PATH_ENV_VAR,
    SUPPORTED_MAJOR_VERSIONS,
};

/// Describes where to look for the LLVM shared library.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LibraryConfig {
    /// An explicit library file to load, tried before anything else.
    pub path: Option<PathBuf>,

    /// Directories in which to look for each of the candidate names.
    pub search_dirs: Vec<PathBuf>,

    /// The file names the library may be found under.
    pub names: Vec<String>,
}

impl LibraryConfig {
    /// Creates the default configuration overlaid with the `LLVMC_LIBRARY` and
    /// `LLVMC_LIBRARY_PATH` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(path) = env::var_os(LIBRARY_ENV_VAR).filter(|p| !p.is_empty()) {
            config.path = Some(PathBuf::from(path));
        }

        if let Some(dirs) = env::var_os(LIBRARY_PATH_ENV_VAR) {
            config.search_dirs.extend(env::split_paths(&dirs).filter(|d| !d.as_os_str().is_empty()));
        }

        config
    }

    /// Gets every candidate that should be passed to the dynamic loader, in
    /// the order they should be tried.
    #[must_use]
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        candidates.extend(self.path.clone());
        for dir in &self.search_dirs {
            candidates.extend(self.names.iter().map(|name| dir.join(name)));
        }
        candidates.extend(self.names.iter().map(PathBuf::from));
        candidates
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            path:        None,
            search_dirs: Vec::new(),
            names:       default_library_names(),
        }
    }
}

/// The names that LLVM's shared library is installed under on this platform.
#[must_use]
pub fn default_library_names() -> Vec<String> {
    if cfg!(target_os = "windows") {
        vec!["LLVM-C.dll".to_string()]
    } else {
        let extension = if cfg!(target_os = "macos") { "dylib" } else { "so" };
        let mut names = vec![format!("libLLVM.{extension}")];
        for major in SUPPORTED_MAJOR_VERSIONS {
            names.push(format!("libLLVM-{major}.{extension}"));
            names.push(format!("libLLVM.{extension}.{major}"));
        }
        names
    }
}

/// A builder for [`LibraryConfig`] instances.
#[derive(Clone, Debug, Default)]
pub struct LibraryConfigBuilder {
    config: LibraryConfig,
}

impl LibraryConfigBuilder {
    /// Creates a builder starting from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder starting from [`LibraryConfig::from_env`].
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            config: LibraryConfig::from_env(),
        }
    }

    /// Sets the explicit library file to try first.
    #[must_use]
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Adds a directory to search for the candidate names.
    #[must_use]
    pub fn with_search_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.search_dirs.push(dir.as_ref().to_path_buf());
        self
    }

    /// Replaces the candidate library names.
    #[must_use]
    pub fn with_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.config.names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> LibraryConfig {
        self.config
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use crate::library::config::{default_library_names, LibraryConfig, LibraryConfigBuilder};

    #[test]
    fn default_names_cover_versioned_libraries() {
        let names = default_library_names();
        assert!(!names.is_empty());
        if cfg!(target_os = "linux") {
            assert_eq!(names[0], "libLLVM.so");
            assert!(names.contains(&"libLLVM-18.so".to_string()));
            assert!(names.contains(&"libLLVM.so.18".to_string()));
        }
    }

    #[test]
    fn candidates_are_ordered_by_preference() {
        let config = LibraryConfigBuilder::new()
            .with_path("/opt/llvm/lib/libLLVM.so")
            .with_search_dir("/usr/lib/llvm-18/lib")
            .with_names(["libLLVM-18.so"])
            .build();

        assert_eq!(
            config.candidates(),
            vec![
                PathBuf::from("/opt/llvm/lib/libLLVM.so"),
                PathBuf::from("/usr/lib/llvm-18/lib/libLLVM-18.so"),
                PathBuf::from("libLLVM-18.so"),
            ]
        );
    }

    #[test]
    fn default_config_defers_to_the_loader() {
        let config = LibraryConfig::default();
        assert!(config.path.is_none());
        assert_eq!(config.candidates().len(), config.names.len());
    }
}
