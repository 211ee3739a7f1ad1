use prometheus::{Encoder, TextEncoder};

use super::error::DiagError;

pub async fn handler() -> Result<String, DiagError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|err| DiagError::Other(err.into()))?;
    String::from_utf8(buffer).map_err(|err| DiagError::Other(err.into()))
}
