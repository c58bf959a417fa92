//! Built-in feature templates.

use aitea_core::{Template, TemplateFeature};

/// Registry of the templates shipped with the tool.
pub struct TemplateRegistry {
    templates: Vec<Template>,
}

impl TemplateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            templates: Vec::new(),
        }
    }

    /// Registry populated with the built-in templates.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(web_app());
        registry.register(mobile_app());
        registry.register(api_service());
        registry.register(data_pipeline());
        registry
    }

    /// Register a template. A later template replaces one with the same name.
    pub fn register(&mut self, template: Template) {
        self.templates.retain(|t| !t.name.eq_ignore_ascii_case(&template.name));
        self.templates.push(template);
    }

    /// Get a template by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
    }

    /// List all templates.
    pub fn list(&self) -> &[Template] {
        &self.templates
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Builder for creating templates.
pub struct TemplateBuilder {
    name: String,
    description: String,
    features: Vec<TemplateFeature>,
}

impl TemplateBuilder {
    /// Create a new template builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            features: Vec::new(),
        }
    }

    /// Set description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Add a feature.
    pub fn feature(
        mut self,
        name: impl Into<String>,
        team: impl Into<String>,
        process: impl Into<String>,
        seed_hours: f64,
    ) -> Self {
        self.features.push(TemplateFeature {
            name: name.into(),
            team: team.into(),
            process: process.into(),
            seed_hours,
        });
        self
    }

    /// Build the template.
    pub fn build(self) -> Template {
        Template {
            name: self.name,
            description: self.description,
            features: self.features,
        }
    }
}

fn web_app() -> Template {
    TemplateBuilder::new("web-app")
        .description("Browser-based application with accounts and an admin area")
        .feature("User Registration", "backend", "development", 8.0)
        .feature("User Login", "backend", "development", 6.0)
        .feature("Password Reset", "backend", "development", 4.0)
        .feature("User Profile", "frontend", "development", 6.0)
        .feature("Dashboard", "frontend", "development", 12.0)
        .feature("Admin Panel", "frontend", "development", 16.0)
        .feature("UI Design", "design", "design", 20.0)
        .feature("End-to-End Tests", "qa", "testing", 12.0)
        .build()
}

fn mobile_app() -> Template {
    TemplateBuilder::new("mobile-app")
        .description("Native or cross-platform mobile client")
        .feature("User Login", "mobile", "development", 8.0)
        .feature("Push Notifications", "mobile", "development", 10.0)
        .feature("Offline Sync", "mobile", "development", 24.0)
        .feature("In-App Settings", "mobile", "development", 6.0)
        .feature("App Store Release", "devops", "deployment", 8.0)
        .feature("Mobile UI Design", "design", "design", 24.0)
        .feature("Device Testing", "qa", "testing", 16.0)
        .build()
}

fn api_service() -> Template {
    TemplateBuilder::new("api-service")
        .description("Backend HTTP API with persistence and auth")
        .feature("API Authentication", "backend", "development", 10.0)
        .feature("CRUD Endpoints", "backend", "development", 16.0)
        .feature("Database Schema", "backend", "development", 8.0)
        .feature("Rate Limiting", "backend", "development", 6.0)
        .feature("API Documentation", "backend", "documentation", 6.0)
        .feature("CI Pipeline", "devops", "deployment", 8.0)
        .feature("Integration Tests", "qa", "testing", 12.0)
        .build()
}

fn data_pipeline() -> Template {
    TemplateBuilder::new("data-pipeline")
        .description("Batch ingestion, transformation and reporting")
        .feature("Data Ingestion", "data", "development", 16.0)
        .feature("Data Validation", "data", "development", 10.0)
        .feature("Transformation Jobs", "data", "development", 20.0)
        .feature("Scheduling", "devops", "deployment", 6.0)
        .feature("Reporting Views", "data", "development", 12.0)
        .feature("Pipeline Monitoring", "devops", "operations", 8.0)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_present() {
        let registry = TemplateRegistry::builtin();
        let names: Vec<_> = registry.list().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["web-app", "mobile-app", "api-service", "data-pipeline"]);
    }

    #[test]
    fn test_get_case_insensitive() {
        let registry = TemplateRegistry::builtin();
        assert!(registry.get("Web-App").is_some());
        assert!(registry.get("desktop-app").is_none());
    }

    #[test]
    fn test_builtin_feature_names_unique() {
        for template in TemplateRegistry::builtin().list() {
            let mut names: Vec<_> = template.features.iter().map(|f| f.name.to_lowercase()).collect();
            let total = names.len();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), total, "duplicate feature in {}", template.name);
            assert!(template.total_seed_hours() > 0.0);
        }
    }

    #[test]
    fn test_builder_and_register_replaces() {
        let mut registry = TemplateRegistry::new();
        registry.register(TemplateBuilder::new("custom").feature("A", "t", "p", 1.0).build());
        registry.register(
            TemplateBuilder::new("CUSTOM")
                .description("second")
                .feature("B", "t", "p", 2.0)
                .feature("C", "t", "p", 3.0)
                .build(),
        );

        assert_eq!(registry.list().len(), 1);
        let template = registry.get("custom").unwrap();
        assert_eq!(template.description, "second");
        assert_eq!(template.total_seed_hours(), 5.0);
    }
}
