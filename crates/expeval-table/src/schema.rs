use serde::{Deserialize, Serialize};

/// Names of the experiment columns in an observation table.
///
/// The defaults match the column layout produced by the experimentation
/// platform exports: an `assignments` label column, an `is_treated`
/// indicator, an `assignments_freq` weight and `<metric>_pre` covariates.
///
/// Any field may be omitted from a JSON configuration file; omitted fields
/// keep their default.
///
/// # Examples
///
/// ```
/// use expeval_table::ExperimentColumns;
///
/// let columns: ExperimentColumns = serde_json::from_str(r#"{ "weight": "w" }"#).unwrap();
/// assert_eq!(columns.weight, "w");
/// assert_eq!(columns.is_treated, "is_treated");
/// assert_eq!(columns.pre_metric("revenue"), "revenue_pre");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentColumns {
    /// Categorical column holding the group label of each row.
    pub assignment: String,
    /// Boolean or 0/1 column flagging treated rows.
    pub is_treated: String,
    /// Non-negative row weight (assignment frequency).
    pub weight: String,
    /// Suffix appended to a metric name to find its pre-experiment covariate.
    pub pre_suffix: String,
    /// Label of the control group in the assignment column.
    pub control_label: String,
    /// Label of the treatment group in the assignment column.
    pub treatment_label: String,
}

impl Default for ExperimentColumns {
    fn default() -> Self {
        Self {
            assignment: "assignments".to_owned(),
            is_treated: "is_treated".to_owned(),
            weight: "assignments_freq".to_owned(),
            pre_suffix: "_pre".to_owned(),
            control_label: "control".to_owned(),
            treatment_label: "treatment".to_owned(),
        }
    }
}

impl ExperimentColumns {
    /// Name of the pre-experiment covariate column for `metric`.
    #[must_use]
    pub fn pre_metric(&self, metric: &str) -> String {
        format!("{metric}{}", self.pre_suffix)
    }

    /// Group label for a treatment indicator.
    #[must_use]
    pub fn label(&self, is_treated: bool) -> &str {
        if is_treated {
            &self.treatment_label
        } else {
            &self.control_label
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        let columns = ExperimentColumns::default();
        assert_eq!(columns.assignment, "assignments");
        assert_eq!(columns.weight, "assignments_freq");
        assert_eq!(columns.label(false), "control");
        assert_eq!(columns.label(true), "treatment");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = serde_json::from_str::<ExperimentColumns>(r#"{ "wieght": "w" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_suffix() {
        let columns = ExperimentColumns {
            pre_suffix: "_baseline".to_owned(),
            ..ExperimentColumns::default()
        };
        assert_eq!(columns.pre_metric("y"), "y_baseline");
    }
}
