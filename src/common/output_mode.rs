use crate::common::{SpotError, SpotResult};

/// Requested artifact kind; exactly one per request.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Overlay,
    #[default] Json,
}

impl OutputMode {
    pub fn from_str(mode: &str) -> Option<Self> {
        match mode.to_lowercase().as_str() {
            "overlay" | "png" => Some(OutputMode::Overlay),
            "json" => Some(OutputMode::Json),
            _ => None,
        }
    }

    pub fn str(&self) -> &'static str {
        match self {
            OutputMode::Overlay => "overlay",
            OutputMode::Json => "json",
        }
    }
}

impl std::str::FromStr for OutputMode {
    type Err = SpotError;

    fn from_str(s: &str) -> SpotResult<Self> {
        OutputMode::from_str(s)
            .ok_or_else(|| SpotError::Config(format!("unknown output mode {s:?}, expected overlay or json")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_modes() {
        assert_eq!("overlay".parse::<OutputMode>().unwrap(), OutputMode::Overlay);
        assert_eq!("JSON".parse::<OutputMode>().unwrap(), OutputMode::Json);
        assert!("base64".parse::<OutputMode>().is_err());
    }
}
