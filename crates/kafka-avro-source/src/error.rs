use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error(transparent)]
    Types(#[from] cdc_types::CdcTypesError),

    #[error("Consumer error: {0}")]
    Consumer(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_error_is_transparent() {
        let err: Error = cdc_types::CdcTypesError::TimestampRules("bad suffixes".to_string()).into();
        assert!(matches!(err, Error::Types(_)));
        assert_eq!(err.to_string(), "Invalid timestamp rules: bad suffixes");
    }

    #[test]
    fn test_sink_io_errors_convert() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
