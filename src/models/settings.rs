//! Datasource instance settings

use serde::{Deserialize, Serialize};

use super::error::{ModelError, ModelResult};

/// Connection settings and query defaults for one datasource instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatasourceSettings {
    pub region: String,
    pub default_region: String,
    pub endpoint: String,
    pub profile: String,

    pub default_database: String,
    pub default_table: String,
    pub default_measure: String,
}

impl DatasourceSettings {
    /// Load host-supplied JSON settings
    ///
    /// A region of `""` or `"default"` falls back to `defaultRegion`.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let mut settings = if json.trim().len() > 1 {
            serde_json::from_str::<DatasourceSettings>(json)
                .map_err(|e| ModelError::Settings(e.to_string()))?
        } else {
            DatasourceSettings::default()
        };
        settings.resolve_region();
        Ok(settings)
    }

    /// Replace an unset region with the default region
    pub fn resolve_region(&mut self) {
        if self.region.is_empty() || self.region == "default" {
            self.region = self.default_region.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_settings() {
        let settings = DatasourceSettings::from_json(
            r#"{"region":"us-west-2","profile":"dev","defaultDatabase":"db","defaultTable":"t","defaultMeasure":"m"}"#,
        )
        .unwrap();
        assert_eq!(settings.region, "us-west-2");
        assert_eq!(settings.profile, "dev");
        assert_eq!(settings.default_database, "db");
        assert_eq!(settings.default_table, "t");
        assert_eq!(settings.default_measure, "m");
    }

    #[test]
    fn test_default_region_fallback() {
        let settings =
            DatasourceSettings::from_json(r#"{"region":"default","defaultRegion":"eu-west-1"}"#)
                .unwrap();
        assert_eq!(settings.region, "eu-west-1");

        let settings = DatasourceSettings::from_json(r#"{"defaultRegion":"eu-west-1"}"#).unwrap();
        assert_eq!(settings.region, "eu-west-1");
    }

    #[test]
    fn test_empty_settings() {
        assert_eq!(
            DatasourceSettings::from_json("").unwrap(),
            DatasourceSettings::default()
        );
    }

    #[test]
    fn test_malformed_settings() {
        let err = DatasourceSettings::from_json("{not json").unwrap_err();
        assert!(matches!(err, ModelError::Settings(_)));
    }
}
