use std::path::{Path, PathBuf};

use framegen_core::sync::HookSuppression;
use libloading::Library;

#[derive(Debug)]
pub struct LibraryLoadError {
    pub name: &'static str,
    pub tried: Vec<PathBuf>,
    pub message: String,
}

impl std::fmt::Display for LibraryLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} (tried {} path(s))", self.name, self.message, self.tried.len())
    }
}

impl std::error::Error for LibraryLoadError {}

/// Where a backend module was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryOrigin {
    Configured(PathBuf),
    HostDir(PathBuf),
    /// Symbols already loaded into this process by someone else.
    InProcess,
}

pub struct LoadedLibrary {
    pub lib: Library,
    pub origin: LibraryOrigin,
}

/// Finds a backend module: configured path, then next to the host module, then the
/// copy already mapped into the process.
#[derive(Debug, Clone)]
pub struct LibraryLocator {
    file_name: &'static str,
    configured: Option<PathBuf>,
    host_dir: Option<PathBuf>,
}

impl LibraryLocator {
    pub fn new(file_name: &'static str, configured: Option<&Path>) -> Self {
        let host_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf));
        Self {
            file_name,
            configured: configured.map(Path::to_path_buf),
            host_dir,
        }
    }

    #[inline]
    pub fn with_host_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.host_dir = dir;
        self
    }

    #[inline]
    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    /// File-system candidates in search order.
    pub fn candidates(&self) -> Vec<(PathBuf, LibraryOrigin)> {
        let mut out = Vec::with_capacity(2);
        if let Some(cfg) = &self.configured {
            let path = if cfg.is_dir() || cfg.file_name().is_none() {
                cfg.join(self.file_name)
            } else {
                cfg.clone()
            };
            out.push((path.clone(), LibraryOrigin::Configured(path)));
        }
        if let Some(dir) = &self.host_dir {
            let path = dir.join(self.file_name);
            out.push((path.clone(), LibraryOrigin::HostDir(path)));
        }
        out
    }

    /// Host API interception stays suppressed for the whole search.
    pub fn open(&self, hooks: &HookSuppression) -> Result<LoadedLibrary, LibraryLoadError> {
        let _suppressed = hooks.suppress();
        let mut tried = Vec::new();

        for (path, origin) in self.candidates() {
            log::info!(target: "framegen::loader", "trying to load {} from '{}'", self.file_name, path.display());
            match unsafe { Library::new(&path) } {
                Ok(lib) => {
                    log::info!(target: "framegen::loader", "loaded '{}'", path.display());
                    return Ok(LoadedLibrary { lib, origin });
                }
                Err(e) => {
                    log::debug!(target: "framegen::loader", "Library::new failed for '{}': {e}", path.display());
                    tried.push(path);
                }
            }
        }

        log::info!(target: "framegen::loader", "trying {} already loaded in process", self.file_name);
        match open_in_process(self.file_name) {
            Ok(lib) => Ok(LoadedLibrary {
                lib,
                origin: LibraryOrigin::InProcess,
            }),
            Err(e) => Err(LibraryLoadError {
                name: self.file_name,
                tried,
                message: format!("not found: {e}"),
            }),
        }
    }
}

/// Resolves one exported function, `None` when the module does not export it.
///
/// # Safety
/// `T` must match the exported function's signature.
pub(crate) unsafe fn symbol<T: Copy>(lib: &Library, name: &[u8]) -> Option<T> {
    unsafe { lib.get::<T>(name) }.ok().map(|s| *s)
}

#[cfg(windows)]
fn open_in_process(name: &str) -> Result<Library, libloading::Error> {
    libloading::os::windows::Library::open_already_loaded(name).map(Library::from)
}

#[cfg(unix)]
fn open_in_process(_name: &str) -> Result<Library, libloading::Error> {
    Ok(Library::from(libloading::os::unix::Library::this()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_directory_gets_default_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let locator = LibraryLocator::new("libxess_fg.dll", Some(dir.path()))
            .with_host_dir(Some(PathBuf::from("/opt/host")));

        let paths: Vec<PathBuf> = locator.candidates().into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            vec![
                dir.path().join("libxess_fg.dll"),
                PathBuf::from("/opt/host").join("libxess_fg.dll"),
            ]
        );
    }

    #[test]
    fn configured_file_is_used_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom_fg.dll");
        std::fs::write(&file, b"not a library").unwrap();

        let locator = LibraryLocator::new("libxess_fg.dll", Some(&file)).with_host_dir(None);
        let candidates = locator.candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].1, LibraryOrigin::Configured(file));
    }

    #[test]
    fn suppression_is_released_after_search() {
        let dir = tempfile::tempdir().unwrap();
        let hooks = HookSuppression::new();
        let locator = LibraryLocator::new("framegen_missing_module.dll", Some(dir.path()))
            .with_host_dir(Some(dir.path().to_path_buf()));

        // The in-process fallback may or may not succeed depending on the platform.
        let _ = locator.open(&hooks);
        assert!(!hooks.is_suppressed());
    }
}
