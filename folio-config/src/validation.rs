use thiserror::Error;

use crate::models::engine::EngineConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error("invalid page size limit [{min}, {max}]: {reason}")]
    InvalidPageSizeLimit { min: u64, max: u64, reason: String },
    #[error("default page size {size} is outside the page size limit [{min}, {max}]")]
    DefaultPageSizeOutOfRange { size: u64, min: u64, max: u64 },
    #[error("sort token separator must not be empty")]
    EmptySeparator,
    #[error("query parameter name for {field} must not be empty")]
    EmptyParameterName { field: &'static str },
    #[error("query parameter `{name}` is used by both {first} and {second}")]
    ParameterCollision {
        name: String,
        first: &'static str,
        second: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn apply_guard_rails(
    config: &EngineConfig,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();
    let pagination = &config.pagination;
    let sort = &config.sort;

    let params = [
        ("pagination.page_param", pagination.page_param.as_str()),
        ("pagination.page_size_param", pagination.page_size_param.as_str()),
        ("sort.sort_param", sort.sort_param.as_str()),
    ];
    for (idx, &(field, name)) in params.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(ConfigGuardRailError::EmptyParameterName { field });
        }
        if let Some(&(other, _)) = params[..idx].iter().find(|(_, other)| *other == name) {
            return Err(ConfigGuardRailError::ParameterCollision {
                name: name.to_string(),
                first: other,
                second: field,
            });
        }
    }

    if sort.separator.is_empty() {
        return Err(ConfigGuardRailError::EmptySeparator);
    }
    if sort.separator.starts_with('-') {
        warnings.push_with_hint(
            "sort separator starts with '-', which also marks descending attributes",
            "Use ',' or ';' as the separator",
        );
    }

    match pagination.page_size_limit {
        Some((min, max)) => {
            if min == 0 {
                return Err(ConfigGuardRailError::InvalidPageSizeLimit {
                    min,
                    max,
                    reason: "minimum must be at least 1".into(),
                });
            }
            if min > max {
                return Err(ConfigGuardRailError::InvalidPageSizeLimit {
                    min,
                    max,
                    reason: "minimum exceeds maximum".into(),
                });
            }
            let size = pagination.default_page_size;
            if size != 0 && !(min..=max).contains(&size) {
                return Err(ConfigGuardRailError::DefaultPageSizeOutOfRange {
                    size,
                    min,
                    max,
                });
            }
        }
        None => warnings.push_with_hint(
            "page size limit disabled; the page size parameter will be ignored",
            "Set pagination.page_size_limit to let clients choose a page size",
        ),
    }

    if pagination.default_page_size == 0 {
        warnings.push("default page size is 0; every request returns all records");
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_without_warnings() {
        let warnings = apply_guard_rails(&EngineConfig::default()).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn rejects_inverted_limit() {
        let mut config = EngineConfig::default();
        config.pagination.page_size_limit = Some((30, 10));
        assert!(matches!(
            config.validate(),
            Err(ConfigGuardRailError::InvalidPageSizeLimit { min: 30, max: 10, .. })
        ));
    }

    #[test]
    fn rejects_default_outside_limit() {
        let mut config = EngineConfig::default();
        config.pagination.default_page_size = 100;
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigGuardRailError::DefaultPageSizeOutOfRange {
                size: 100,
                min: 1,
                max: 50
            }
        );
    }

    #[test]
    fn rejects_colliding_parameters() {
        let mut config = EngineConfig::default();
        config.sort.sort_param = "page".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigGuardRailError::ParameterCollision {
                first: "pagination.page_param",
                second: "sort.sort_param",
                ..
            })
        ));
    }

    #[test]
    fn rejects_empty_separator_and_names() {
        let mut config = EngineConfig::default();
        config.sort.separator.clear();
        assert_eq!(config.validate().unwrap_err(), ConfigGuardRailError::EmptySeparator);

        let mut config = EngineConfig::default();
        config.pagination.page_size_param = " ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigGuardRailError::EmptyParameterName { .. })
        ));
    }

    #[test]
    fn unbounded_settings_only_warn() {
        let mut config = EngineConfig::default();
        config.pagination.page_size_limit = None;
        config.pagination.default_page_size = 0;
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.items.len(), 2);
        assert!(warnings.items[0].hint.is_some());
    }
}
