use serde::Deserialize;

/// Arguments passed to the native instantiate entry point.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstantiateParams {
    /// Name the component uses in its own log messages.
    pub instance_name: String,
    /// Must match the GUID the component was generated with.
    pub guid: String,
    /// URI of the unpacked component resources (may be empty).
    pub resource_location: String,
    pub visible: bool,
    /// Only meaningful for ABI v1.
    pub interactive: bool,
    pub logging_on: bool,
    /// Communication timeout in milliseconds (ABI v1 only; `0.0` means none).
    pub timeout: f64,
}

impl Default for InstantiateParams {
    fn default() -> Self {
        Self {
            instance_name: "instance".to_string(),
            guid: String::new(),
            resource_location: String::new(),
            visible: false,
            interactive: false,
            logging_on: false,
            timeout: 0.0,
        }
    }
}

impl InstantiateParams {
    pub fn new(instance_name: impl Into<String>, guid: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            guid: guid.into(),
            ..Self::default()
        }
    }
}

/// Simulation interval and tolerances handed to setup.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Experiment {
    pub start_time: f64,
    /// `None`, or a value not strictly after `start_time`, means open-ended.
    pub stop_time: Option<f64>,
    pub tolerance: Option<f64>,
    /// Preferred communication step size.
    pub step_size: f64,
}

impl Default for Experiment {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            stop_time: None,
            tolerance: None,
            step_size: 1e-3,
        }
    }
}

impl Experiment {
    pub fn new(start_time: f64, stop_time: f64) -> Self {
        Self {
            start_time,
            stop_time: Some(stop_time),
            ..Self::default()
        }
    }

    /// The stop time to report to the component, if it is defined.
    pub fn defined_stop_time(&self) -> Option<f64> {
        self.stop_time.filter(|stop| *stop > self.start_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_time_before_start_is_undefined() {
        assert_eq!(Experiment::new(0.0, 10.0).defined_stop_time(), Some(10.0));
        assert_eq!(Experiment::new(5.0, 5.0).defined_stop_time(), None);
        assert_eq!(Experiment::new(5.0, 1.0).defined_stop_time(), None);
        assert_eq!(Experiment::default().defined_stop_time(), None);
    }

    #[test]
    fn instantiate_params_default_name() {
        let params = InstantiateParams::new("ball", "{1234}");
        assert_eq!(params.instance_name, "ball");
        assert_eq!(params.guid, "{1234}");
        assert!(!params.logging_on);
    }

    #[test]
    fn deserializes_partial_documents() {
        let params: InstantiateParams =
            serde_json::from_str(r#"{"guid":"{abcd}","loggingOn":true}"#).unwrap();
        assert_eq!(params.instance_name, "instance");
        assert_eq!(params.guid, "{abcd}");
        assert!(params.logging_on);

        let experiment: Experiment =
            serde_json::from_str(r#"{"startTime":1.0,"stopTime":2.0}"#).unwrap();
        assert_eq!(experiment.defined_stop_time(), Some(2.0));
        assert_eq!(experiment.step_size, 1e-3);
    }
}
