use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LecternError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("whiteboard error: {0}")]
    Whiteboard(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("bus.heartbeat_interval = 0".into());
        assert_eq!(
            err.to_string(),
            "config validation error: bus.heartbeat_interval = 0"
        );
    }

    #[test]
    fn lectern_error_from_config() {
        let config_err = ConfigError::ParseError("bad toml".into());
        let err: LecternError = config_err.into();
        assert!(matches!(err, LecternError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn lectern_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: LecternError = io_err.into();
        assert!(matches!(err, LecternError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn lectern_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: LecternError = json_err.into();
        assert!(matches!(err, LecternError::Json(_)));
    }

    #[test]
    fn lectern_error_other_variants() {
        let err = LecternError::Network("timeout".into());
        assert_eq!(err.to_string(), "network error: timeout");

        let err = LecternError::Session("token request failed: room full".into());
        assert_eq!(
            err.to_string(),
            "session error: token request failed: room full"
        );

        let err = LecternError::Whiteboard("pane right is read-only".into());
        assert_eq!(err.to_string(), "whiteboard error: pane right is read-only");

        let err = LecternError::Other("something went wrong".into());
        assert_eq!(err.to_string(), "something went wrong");
    }
}
