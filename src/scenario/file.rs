//! YAML scenario files

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::common::{Error, Result};

use super::{RetryPolicy, Scenario, Step};

/// A scenario as written in a YAML file
#[derive(Deserialize, Debug)]
pub struct ScenarioFile {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// Initial context variables
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
    /// Default retry policy for every step
    pub retry: Option<RetryPolicy>,
    /// The sequence of steps to execute
    pub steps: Vec<Step>,
}

/// Values supplied from outside the file when building a scenario
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Used only when the file does not declare the variable itself
    pub defaults: BTreeMap<String, Value>,
    /// Always win over the file's own variables
    pub overrides: BTreeMap<String, Value>,
    /// Used when the file has no retry policy
    pub retry: Option<RetryPolicy>,
}

impl ScenarioFile {
    /// Read and parse a scenario file
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content).map_err(|e| match e {
            Error::Yaml(err) => Error::validation(
                &path.display().to_string(),
                format!("failed to parse scenario file: {}", err),
            ),
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Build a validated [`Scenario`]
    pub fn into_scenario(self, options: &LoadOptions) -> Result<Scenario> {
        let mut scenario = Scenario::new(self.name);
        if let Some(description) = self.description {
            scenario = scenario.with_description(description);
        }

        for (name, value) in &options.defaults {
            if !self.variables.contains_key(name) {
                scenario.set_variable(name.clone(), value.clone());
            }
        }
        for (name, value) in self.variables {
            scenario.set_variable(name, value);
        }
        for (name, value) in &options.overrides {
            scenario.set_variable(name.clone(), value.clone());
        }

        if let Some(retry) = self.retry.or_else(|| options.retry.clone()) {
            scenario = scenario.with_retry(retry)?;
        }

        if self.steps.is_empty() {
            return Err(Error::validation(scenario.name(), "scenario has no steps"));
        }
        for step in self.steps {
            scenario.add_step(step)?;
        }
        Ok(scenario)
    }
}

/// Load and validate a scenario file in one go
pub fn load(path: &Path, options: &LoadOptions) -> Result<Scenario> {
    ScenarioFile::read(path)?.into_scenario(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const YAML: &str = r#"
name: Fixed object
variables:
  fixedId: ff808181932badb60194cca874214129
steps:
  - name: Get fixed object
    method: GET
    url: "{{base_url}}/objects/{{fixedId}}"
"#;

    #[test]
    fn test_defaults_and_overrides() {
        let mut options = LoadOptions::default();
        options
            .defaults
            .insert("base_url".into(), json!("https://api.restful-api.dev"));
        options.defaults.insert("fixedId".into(), json!("ignored"));

        let scenario = ScenarioFile::parse(YAML)
            .unwrap()
            .into_scenario(&options)
            .unwrap();
        assert_eq!(
            scenario.variables()["fixedId"],
            json!("ff808181932badb60194cca874214129")
        );
        assert_eq!(scenario.variables()["base_url"], json!("https://api.restful-api.dev"));

        options.overrides.insert("fixedId".into(), json!("override"));
        let scenario = ScenarioFile::parse(YAML)
            .unwrap()
            .into_scenario(&options)
            .unwrap();
        assert_eq!(scenario.variables()["fixedId"], json!("override"));
    }

    #[test]
    fn test_missing_base_url_fails_validation() {
        let err = ScenarioFile::parse(YAML)
            .unwrap()
            .into_scenario(&LoadOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_empty_scenario_is_invalid() {
        let file = ScenarioFile::parse("name: empty\nsteps: []").unwrap();
        assert!(matches!(
            file.into_scenario(&LoadOptions::default()),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_file_retry_wins_over_default() {
        let yaml = r#"
name: retrying
retry:
  max_retries: 1
  backoff: fixed
  delay_ms: 10
steps:
  - name: list
    method: GET
    url: http://localhost/objects
"#;
        let options = LoadOptions {
            retry: Some(RetryPolicy::fixed(5, std::time::Duration::from_millis(1))),
            ..LoadOptions::default()
        };
        let scenario = ScenarioFile::parse(yaml)
            .unwrap()
            .into_scenario(&options)
            .unwrap();
        assert_eq!(scenario.retry().unwrap().max_retries, 1);
    }
}
