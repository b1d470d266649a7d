//! Service catalog
//!
//! Validated view of the configured projects, and the resolution of a
//! `(projectId, serviceName?)` request into a runnable [`ServiceTarget`].

use super::config::{expand_home, ProjectConfig};
use devrun_core::{ServiceSpec, ServiceTarget};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Catalog validation and lookup errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("project id must not be empty")]
    EmptyProjectId,

    #[error("duplicate project id: {0}")]
    DuplicateProject(String),

    #[error("project {project} has a service without a name")]
    EmptyServiceName { project: String },

    #[error("project {project} declares service {service} more than once")]
    DuplicateService { project: String, service: String },

    #[error("service {project}/{service} has an empty command")]
    EmptyCommand { project: String, service: String },

    #[error("Unknown project: {0}")]
    UnknownProject(String),

    #[error("Unknown service {service} in project {project}")]
    UnknownService { project: String, service: String },
}

/// A configured project
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub root: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_service: Option<String>,
    #[serde(skip)]
    pub services: Vec<ServiceSpec>,
}

impl Project {
    fn find_service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services
            .iter()
            .find(|s| s.name == name)
            .or_else(|| {
                self.services
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(name))
            })
    }

    /// Service picked when a request names none
    fn fallback_service(&self) -> Option<&ServiceSpec> {
        self.default_service
            .as_deref()
            .and_then(|name| self.find_service(name))
            .or_else(|| self.services.first())
    }
}

/// All configured projects, in configuration order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    projects: Vec<Project>,
}

impl Catalog {
    /// Validate configured projects
    pub fn from_config(projects: &[ProjectConfig]) -> Result<Self, CatalogError> {
        let mut seen_projects = HashSet::new();
        let mut out = Vec::with_capacity(projects.len());

        for project in projects {
            let id = project.id.trim();
            if id.is_empty() {
                return Err(CatalogError::EmptyProjectId);
            }
            if !seen_projects.insert(id.to_string()) {
                return Err(CatalogError::DuplicateProject(id.to_string()));
            }

            let mut seen_services = HashSet::new();
            let mut services = Vec::with_capacity(project.services.len());
            for service in &project.services {
                let name = service.name.trim();
                if name.is_empty() {
                    return Err(CatalogError::EmptyServiceName {
                        project: id.to_string(),
                    });
                }
                if !seen_services.insert(name.to_lowercase()) {
                    return Err(CatalogError::DuplicateService {
                        project: id.to_string(),
                        service: name.to_string(),
                    });
                }
                if service.cmd.trim().is_empty() {
                    return Err(CatalogError::EmptyCommand {
                        project: id.to_string(),
                        service: name.to_string(),
                    });
                }

                let mut spec = ServiceSpec::new(name, service.cmd.trim());
                if let Some(cwd) = service.cwd.as_deref().filter(|c| !c.trim().is_empty()) {
                    spec = spec.with_cwd(cwd);
                }
                if let Some(port) = service.port {
                    spec = spec.with_port(port);
                }
                services.push(spec);
            }

            out.push(Project {
                id: id.to_string(),
                name: if project.name.trim().is_empty() {
                    id.to_string()
                } else {
                    project.name.clone()
                },
                root: expand_home(&project.root),
                default_service: project.default_service.clone(),
                services,
            });
        }

        Ok(Self { projects: out })
    }

    /// Projects in configuration order
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Project by id
    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Resolve a request to a runnable target
    pub fn resolve(
        &self,
        project_id: &str,
        service_name: Option<&str>,
    ) -> Result<ServiceTarget, CatalogError> {
        let project = self
            .project(project_id)
            .ok_or_else(|| CatalogError::UnknownProject(project_id.to_string()))?;

        let requested = service_name.map(str::trim).filter(|s| !s.is_empty());
        let service = match requested {
            Some(name) => project.find_service(name),
            None => project.fallback_service(),
        }
        .ok_or_else(|| CatalogError::UnknownService {
            project: project.id.clone(),
            service: requested.unwrap_or_default().to_string(),
        })?;

        Ok(ServiceTarget::new(
            &project.id,
            &project.root,
            service.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::config::ServiceConfig;

    fn service(name: &str, cmd: &str) -> ServiceConfig {
        ServiceConfig {
            name: name.to_string(),
            cmd: cmd.to_string(),
            cwd: None,
            port: None,
        }
    }

    fn project(id: &str, services: Vec<ServiceConfig>) -> ProjectConfig {
        ProjectConfig {
            id: id.to_string(),
            name: String::new(),
            root: "/srv/shop".to_string(),
            default_service: None,
            services,
        }
    }

    #[test]
    fn test_resolution_order() {
        let mut shop = project(
            "shop",
            vec![service("Web", "npm run dev"), service("worker", "make work")],
        );
        shop.default_service = Some("worker".to_string());
        shop.services[0].cwd = Some("apps/web".to_string());
        let catalog = Catalog::from_config(&[shop]).unwrap();

        let exact = catalog.resolve("shop", Some("Web")).unwrap();
        assert_eq!(exact.service.name, "Web");
        assert_eq!(exact.working_dir(), PathBuf::from("/srv/shop/apps/web"));

        let folded = catalog.resolve("shop", Some("web")).unwrap();
        assert_eq!(folded.service.name, "Web");

        let defaulted = catalog.resolve("shop", None).unwrap();
        assert_eq!(defaulted.service.name, "worker");
        assert_eq!(defaulted.working_dir(), PathBuf::from("/srv/shop"));
    }

    #[test]
    fn test_first_service_without_default() {
        let catalog =
            Catalog::from_config(&[project("shop", vec![service("api", "cargo run")])]).unwrap();
        assert_eq!(catalog.resolve("shop", Some("")).unwrap().service.name, "api");
        assert_eq!(catalog.projects()[0].name, "shop");
    }

    #[test]
    fn test_unknown_lookups() {
        let catalog =
            Catalog::from_config(&[project("shop", vec![service("api", "cargo run")])]).unwrap();
        assert_eq!(
            catalog.resolve("blog", None).unwrap_err(),
            CatalogError::UnknownProject("blog".to_string())
        );
        assert!(matches!(
            catalog.resolve("shop", Some("db")),
            Err(CatalogError::UnknownService { .. })
        ));

        let empty = Catalog::from_config(&[project("bare", vec![])]).unwrap();
        assert!(empty.resolve("bare", None).is_err());
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            Catalog::from_config(&[project(" ", vec![])]).unwrap_err(),
            CatalogError::EmptyProjectId
        );
        assert!(matches!(
            Catalog::from_config(&[project("a", vec![]), project("a", vec![])]),
            Err(CatalogError::DuplicateProject(_))
        ));
        assert!(matches!(
            Catalog::from_config(&[project(
                "a",
                vec![service("web", "x"), service("WEB", "y")]
            )]),
            Err(CatalogError::DuplicateService { .. })
        ));
        assert!(matches!(
            Catalog::from_config(&[project("a", vec![service("web", "  ")])]),
            Err(CatalogError::EmptyCommand { .. })
        ));
    }
}
