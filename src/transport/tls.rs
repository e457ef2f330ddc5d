//! Per-host CA certificate overrides.
//!
//! A [`CertTable`] maps an exact host name, or the wildcard `*`, to a PEM CA
//! certificate file. Lookups only apply to `https` URLs: the exact host wins
//! over the wildcard, and when neither is present the transport keeps its
//! default trust roots.
//!
//! A process-wide table can be installed once at startup with
//! [`CertTable::install_global`]; it is immutable afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::debug;
use url::Url;

/// Host key matching every host without an exact entry.
pub const WILDCARD_HOST: &str = "*";

static GLOBAL_CERTS: OnceLock<CertTable> = OnceLock::new();

/// Host → CA certificate path table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertTable {
    entries: HashMap<String, PathBuf>,
}

impl CertTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry; `host` may be [`WILDCARD_HOST`]. Hosts are compared case-insensitively.
    #[must_use]
    pub fn with_cert(mut self, host: &str, path: impl Into<PathBuf>) -> Self {
        self.insert(host, path);
        self
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, host: &str, path: impl Into<PathBuf>) {
        self.entries.insert(host.trim().to_ascii_lowercase(), path.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves the certificate override for a target URL.
    #[must_use]
    pub fn resolve(&self, url: &Url) -> Option<&Path> {
        if url.scheme() != "https" {
            return None;
        }
        let host = url.host_str()?.to_ascii_lowercase();
        let resolved = self
            .entries
            .get(&host)
            .or_else(|| self.entries.get(WILDCARD_HOST))
            .map(PathBuf::as_path);
        if let Some(path) = resolved {
            debug!(host = %host, cert = %path.display(), "using CA certificate override");
        }
        resolved
    }

    /// Installs the process-wide table.
    ///
    /// # Errors
    ///
    /// Returns the rejected table when a global table is already in place
    /// (including the empty one frozen by an earlier [`CertTable::global`] call).
    pub fn install_global(table: CertTable) -> Result<(), CertTable> {
        GLOBAL_CERTS.set(table)
    }

    /// The process-wide table, empty if none was installed.
    #[must_use]
    pub fn global() -> &'static CertTable {
        GLOBAL_CERTS.get_or_init(CertTable::default)
    }
}
