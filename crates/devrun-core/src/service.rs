//! Resolved service descriptors handed to the manager

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Registry key: at most one live run per key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceKey {
    /// Owning project
    pub project_id: String,
    /// Service within the project
    pub service_name: String,
}

impl ServiceKey {
    /// Create a key
    #[must_use]
    pub fn new(project_id: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            service_name: service_name.into(),
        }
    }
}

impl std::fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.project_id, self.service_name)
    }
}

/// A named command within a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Service name
    pub name: String,
    /// Shell command line
    pub cmd: String,
    /// Working directory, relative to the project root
    pub cwd: Option<PathBuf>,
    /// Port the service must own, checked before spawning
    pub port: Option<u16>,
}

impl ServiceSpec {
    /// Create a spec running `cmd` in the project root
    #[must_use]
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            cwd: None,
            port: None,
        }
    }

    /// Set the working directory
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set the strict port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }
}

/// A service ready to run: spec plus where its project lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTarget {
    /// Owning project
    pub project_id: String,
    /// Project root directory
    pub project_root: PathBuf,
    /// The service itself
    pub service: ServiceSpec,
}

impl ServiceTarget {
    /// Create a target
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        project_root: impl Into<PathBuf>,
        service: ServiceSpec,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            project_root: project_root.into(),
            service,
        }
    }

    /// Registry key of this target
    #[must_use]
    pub fn key(&self) -> ServiceKey {
        ServiceKey::new(&self.project_id, &self.service.name)
    }

    /// Directory the command runs in
    #[must_use]
    pub fn working_dir(&self) -> PathBuf {
        match &self.service.cwd {
            Some(cwd) => self.project_root.join(cwd),
            None => self.project_root.clone(),
        }
    }

    /// Project root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.project_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        assert_eq!(ServiceKey::new("web", "api").to_string(), "web::api");
    }

    #[test]
    fn test_working_dir() {
        let target = ServiceTarget::new("web", "/srv/web", ServiceSpec::new("api", "make"));
        assert_eq!(target.working_dir(), PathBuf::from("/srv/web"));

        let nested = ServiceTarget::new(
            "web",
            "/srv/web",
            ServiceSpec::new("ui", "npm run dev").with_cwd("frontend"),
        );
        assert_eq!(nested.working_dir(), PathBuf::from("/srv/web/frontend"));

        let absolute = ServiceTarget::new(
            "web",
            "/srv/web",
            ServiceSpec::new("ui", "npm run dev").with_cwd("/opt/ui"),
        );
        assert_eq!(absolute.working_dir(), PathBuf::from("/opt/ui"));
    }
}
