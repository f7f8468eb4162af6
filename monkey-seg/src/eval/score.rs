use crate::common::*;

/// Why an average precision could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Undefined {
    /// There was no image to evaluate on.
    EmptyTestSet,
    /// An evaluated image has no visible ground truth instance.
    NoGroundTruth,
    /// Training or inference failed.
    Failed(String),
}

impl Display for Undefined {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTestSet => write!(f, "empty test set"),
            Self::NoGroundTruth => write!(f, "no ground truth"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// An average precision value that may be undefined.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApScore {
    Defined(R64),
    Undefined(Undefined),
}

impl ApScore {
    /// The mean of several scores.
    ///
    /// The mean is undefined when there are no scores or when any score is undefined. The
    /// reason of the first undefined score is kept.
    pub fn mean<I>(scores: I) -> Self
    where
        I: IntoIterator<Item = ApScore>,
    {
        let mut sum = r64(0.0);
        let mut count = 0;

        for score in scores {
            match score {
                Self::Defined(value) => {
                    sum += value;
                    count += 1;
                }
                Self::Undefined(reason) => return Self::Undefined(reason),
            }
        }

        if count == 0 {
            Self::Undefined(Undefined::EmptyTestSet)
        } else {
            Self::Defined(sum / count as f64)
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Defined(_))
    }

    pub fn value(&self) -> Option<R64> {
        match *self {
            Self::Defined(value) => Some(value),
            Self::Undefined(_) => None,
        }
    }

    /// The raw value, where undefined becomes NaN.
    pub fn to_f64(&self) -> f64 {
        self.value().map(|value| value.raw()).unwrap_or(f64::NAN)
    }
}

impl From<R64> for ApScore {
    fn from(value: R64) -> Self {
        Self::Defined(value)
    }
}

impl Display for ApScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined(value) => write!(f, "{:.4}", value.raw()),
            Self::Undefined(reason) => write!(f, "undefined ({})", reason),
        }
    }
}

/// Serialized as a number, or `null` when undefined.
impl Serialize for ApScore {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.value().map(|value| value.raw()).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_defined_scores() {
        let mean = ApScore::mean(vec![r64(0.5).into(), r64(1.0).into(), r64(0.0).into()]);
        assert_eq!(mean, ApScore::Defined(r64(0.5)));
        assert_eq!(mean.to_f64(), 0.5);
        assert_eq!(format!("{}", mean), "0.5000");
    }

    #[test]
    fn undefined_propagates() {
        let mean = ApScore::mean(vec![
            r64(0.5).into(),
            ApScore::Undefined(Undefined::EmptyTestSet),
            ApScore::Undefined(Undefined::Failed("boom".into())),
        ]);
        assert_eq!(mean, ApScore::Undefined(Undefined::EmptyTestSet));
        assert!(mean.to_f64().is_nan());
        assert!(!mean.is_defined());

        assert_eq!(
            ApScore::mean(vec![]),
            ApScore::Undefined(Undefined::EmptyTestSet)
        );
    }

    #[test]
    fn score_to_json() {
        assert_eq!(
            serde_json::to_string(&ApScore::Defined(r64(0.25))).unwrap(),
            "0.25"
        );
        assert_eq!(
            serde_json::to_string(&ApScore::Undefined(Undefined::NoGroundTruth)).unwrap(),
            "null"
        );
    }
}
